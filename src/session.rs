//! Form grouping and the read-eval-print loop.
//!
//! The tokenizer knows nothing about forms. This module collects tokens until a
//! newline arrives at parenthesis depth zero, parses that group as one top-level
//! form and evaluates it in a fresh frame below the session's global frame.

use std::io::{self, Write};

use tracing::debug;

use crate::FormError;
use crate::ast::Value;
use crate::environment::Env;
use crate::evaluator::eval;
use crate::parser::parse_form;
use crate::tokenizer::{LineSource, PromptedReader, Token, TokenKind, Tokenizer};

/// Name that ends the session when it makes up a whole form
pub const QUIT: &str = "quit";

/// One unit of input handed from the reader to the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    /// The tokens of one complete top-level form, newlines removed
    Tokens(Vec<Token>),
    /// The form consisting solely of `quit`
    Quit,
}

/// Why [`run`] stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Quit,
    EndOfInput,
}

/// Collect the tokens of the next top-level form
///
/// A form ends at the first newline where the parenthesis count is back at zero or
/// below. Blank lines are skipped. Returns `None` at end of input, discarding any
/// unfinished form.
pub fn read_form<S: LineSource>(tokenizer: &mut Tokenizer<S>) -> io::Result<Option<Form>> {
    let mut tokens = Vec::new();
    let mut depth: i64 = 0;
    tokenizer.set_continuation(false);

    while let Some(token) = tokenizer.next_token()? {
        match token.kind {
            TokenKind::Newline => {
                if depth <= 0 && !tokens.is_empty() {
                    return Ok(Some(classify(tokens)));
                }
                tokenizer.set_continuation(!tokens.is_empty());
                continue;
            }
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
        tokens.push(token);
    }
    Ok(None)
}

fn classify(tokens: Vec<Token>) -> Form {
    match tokens.as_slice() {
        [only] if only.is_atom(QUIT) => Form::Quit,
        _ => Form::Tokens(tokens),
    }
}

/// Interpreter state shared by every top-level form: the global frame
pub struct Session {
    global: Env,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session whose global frame holds the primitive operations
    pub fn new() -> Self {
        Session {
            global: Env::global(),
        }
    }

    pub fn global(&self) -> &Env {
        &self.global
    }

    /// Parse and evaluate one top-level form
    ///
    /// Errors carry the line on which the form started.
    pub fn eval_form(&self, tokens: &[Token], out: &mut dyn Write) -> Result<Value, FormError> {
        let line = tokens.first().map_or(0, |token| token.line);
        let at_line = move |error| FormError { line, error };

        let expr = parse_form(tokens).map_err(at_line)?;
        debug!(line, form = %expr, "evaluating form");
        let frame = self.global.extend();
        eval(&expr, &frame, out).map_err(at_line)
    }

    /// Evaluate every form in `src`, stopping early at `quit`
    pub fn eval_source(
        &self,
        src: &str,
        out: &mut dyn Write,
    ) -> io::Result<Vec<Result<Value, FormError>>> {
        let mut tokenizer = Tokenizer::new(PromptedReader::silent(src.as_bytes()));
        let mut results = Vec::new();
        while let Some(form) = read_form(&mut tokenizer)? {
            match form {
                Form::Quit => break,
                Form::Tokens(tokens) => results.push(self.eval_form(&tokens, out)),
            }
        }
        Ok(results)
    }
}

/// Read, evaluate and print forms until `quit` or end of input
///
/// Each result, or the error that replaced it, is written to `out` on its own line.
pub fn run<S: LineSource>(
    tokenizer: &mut Tokenizer<S>,
    session: &Session,
    out: &mut dyn Write,
) -> io::Result<Outcome> {
    loop {
        match read_form(tokenizer)? {
            None => return Ok(Outcome::EndOfInput),
            Some(Form::Quit) => return Ok(Outcome::Quit),
            Some(Form::Tokens(tokens)) => {
                match session.eval_form(&tokens, out) {
                    Ok(value) => writeln!(out, "{value}")?,
                    Err(err) => writeln!(out, "{err}")?,
                }
                out.flush()?;
            }
        }
    }
}

/// Run the interactive part of a session
///
/// Like [`run`], but the session ends on a fresh line whether input ran out or
/// `quit` was read.
pub fn run_interactive<S: LineSource>(
    tokenizer: &mut Tokenizer<S>,
    session: &Session,
    out: &mut dyn Write,
) -> io::Result<Outcome> {
    let outcome = run(tokenizer, session, out)?;
    writeln!(out)?;
    out.flush()?;
    Ok(outcome)
}
