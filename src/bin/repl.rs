use std::env;
use std::fs::File;
use std::io::{self, BufReader, IsTerminal};

use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use schemelet::session::{run, run_interactive};
use schemelet::{LineSource, PromptedReader, Session, Tokenizer};
use tracing_subscriber::EnvFilter;

/// Line source backed by a line editor with history
struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    fn new() -> Result<Self, ReadlineError> {
        Ok(Terminal {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(line + "\n")
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Interrupted. Use Ctrl+D or quit to exit.");
                Ok("\n".to_string())
            }
            Err(ReadlineError::Eof) => Ok(String::new()),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }
    if args.len() > 1 {
        anyhow::bail!("expected at most one source file, got {}", args.len());
    }

    println!("schemelet {}", env!("CARGO_PKG_VERSION"));
    println!("Type quit or Ctrl+D to exit.");

    let session = Session::new();
    let mut out = io::stdout();

    if let Some(path) = args.first() {
        let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
        let mut tokenizer = Tokenizer::new(PromptedReader::silent(BufReader::new(file)));
        let outcome = run(&mut tokenizer, &session, &mut out)
            .with_context(|| format!("failed to read {path}"))?;
        tracing::debug!(?outcome, path = %path, "finished source file");
    }

    let stdin = io::stdin();
    let outcome = if stdin.is_terminal() {
        let mut tokenizer = Tokenizer::new(Terminal::new()?);
        run_interactive(&mut tokenizer, &session, &mut out)?
    } else {
        let reader = PromptedReader::new(stdin.lock(), io::stdout());
        run_interactive(&mut Tokenizer::new(reader), &session, &mut out)?
    };
    tracing::debug!(?outcome, "finished interactive input");
    Ok(())
}

fn print_help() {
    println!("Usage: schemelet [SOURCE]");
    println!();
    println!("Evaluates the forms in SOURCE, if given, then reads forms from standard input.");
    println!("A line holding only `quit` ends the current input.");
    println!();
    println!("Special forms: if, while, set, begin, lambda, 'quote");
    println!("Primitives:    + - * / < > = cons car cdr print");
    println!("               number? symbol? list? null? primop? closure?");
    println!();
    println!("Set RUST_LOG (for example RUST_LOG=schemelet=debug) to trace evaluation on stderr.");
}
