//! Line-buffered tokenizer.
//!
//! The tokenizer pulls one physical line at a time from a [`LineSource`] and hands
//! out tokens with their 1-based line and column. Newlines are tokens of their own:
//! the session uses them to decide where a top-level form ends.

use std::fmt;
use std::io::{self, BufRead, Write};

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_till, take_till1, take_while},
    character::complete::char,
    combinator::{map, opt, value},
    sequence::preceded,
};
use tracing::trace;

use crate::{CONTINUATION_PROMPT, PRIMARY_PROMPT};

/// Something that can hand out input one line at a time
pub trait LineSource {
    /// Read one line, showing `prompt` first if the source is interactive.
    ///
    /// Returns an empty string at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// A [`LineSource`] over any buffered reader, with an optional sink for prompts
pub struct PromptedReader<R, W> {
    input: R,
    prompt_sink: Option<W>,
}

impl<R: BufRead> PromptedReader<R, io::Sink> {
    /// A reader that never writes prompts (files, strings, pipes)
    pub fn silent(input: R) -> Self {
        PromptedReader {
            input,
            prompt_sink: None,
        }
    }
}

impl<R: BufRead, W: Write> PromptedReader<R, W> {
    pub fn new(input: R, prompt_sink: W) -> Self {
        PromptedReader {
            input,
            prompt_sink: Some(prompt_sink),
        }
    }
}

impl<R: BufRead, W: Write> LineSource for PromptedReader<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        if let Some(sink) = self.prompt_sink.as_mut() {
            sink.write_all(prompt.as_bytes())?;
            sink.flush()?;
        }
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }
}

/// The lexical category of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    Newline,
    Quote,
    /// Any other maximal run of characters: a name or an integer
    Atom(String),
}

impl TokenKind {
    /// The raw source text of the token
    pub fn text(&self) -> &str {
        match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Newline => "\n",
            TokenKind::Quote => "'",
            TokenKind::Atom(text) => text,
        }
    }
}

/// A token with the position where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Token { kind, line, column }
    }

    pub fn text(&self) -> &str {
        self.kind.text()
    }

    /// Whether this is the atom token `name`
    pub fn is_atom(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Atom(text) if text == name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "newline at {}:{}", self.line, self.column),
            _ => write!(f, "'{}' at {}:{}", self.text(), self.line, self.column),
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || c == ';'
}

/// Whitespace other than the newline, which is a token
fn inline_space(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '\n' && c.is_whitespace())(input)
}

/// A `;` comment up to, but not including, the end of the line
fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char(';'), take_till(|c| c == '\n'))(input)
}

/// Everything that may precede a token on a line
fn skip(input: &str) -> IResult<&str, ()> {
    let (input, _) = inline_space(input)?;
    let (input, _) = opt(comment)(input)?;
    Ok((input, ()))
}

fn token_kind(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::Newline, char('\n')),
        value(TokenKind::Quote, char('\'')),
        map(take_till1(is_delimiter), |atom: &str| {
            TokenKind::Atom(atom.to_string())
        }),
    ))(input)
}

/// Lazily tokenizes the lines produced by a [`LineSource`]
pub struct Tokenizer<S> {
    source: S,
    line: String,
    pos: usize,
    line_number: usize,
    continuation: bool,
    exhausted: bool,
}

impl<S: LineSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Tokenizer {
            source,
            line: String::new(),
            pos: 0,
            line_number: 0,
            continuation: false,
            exhausted: false,
        }
    }

    /// Choose the prompt for the next physical line read
    pub fn set_continuation(&mut self, continuation: bool) {
        self.continuation = continuation;
    }

    /// Number of physical lines read so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Produce the next token, or `None` once the source is exhausted
    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        if self.pos >= self.line.len() && !self.refill()? {
            return Ok(None);
        }

        // Every buffered line ends in '\n' and the newline is itself a token,
        // so both parsers below always succeed on a non-empty rest.
        let rest = &self.line[self.pos..];
        let start = match skip(rest) {
            Ok((after, ())) => self.line.len() - after.len(),
            Err(_) => self.pos,
        };
        let column = self.line[..start].chars().count() + 1;

        match token_kind(&self.line[start..]) {
            Ok((after, kind)) => {
                self.pos = self.line.len() - after.len();
                Ok(Some(Token::new(kind, self.line_number, column)))
            }
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unreadable input at {}:{}", self.line_number, column),
            )),
        }
    }

    /// Read the next physical line; `false` at end of input
    fn refill(&mut self) -> io::Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let prompt = if self.continuation {
            CONTINUATION_PROMPT
        } else {
            PRIMARY_PROMPT
        };
        let mut line = self.source.read_line(prompt)?;
        self.line_number += 1;
        if line.is_empty() {
            self.exhausted = true;
            self.line.clear();
            self.pos = 0;
            return Ok(false);
        }
        if !line.ends_with('\n') {
            line.push('\n');
        }
        trace!(line_number = self.line_number, line = line.trim_end(), "read line");
        self.line = line;
        self.pos = 0;
        Ok(true)
    }
}

impl<S: LineSource> Iterator for Tokenizer<S> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Tokenize a complete string, newlines included
pub fn tokenize(src: &str) -> io::Result<Vec<Token>> {
    Tokenizer::new(PromptedReader::silent(src.as_bytes())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    fn atom(text: &str) -> TokenKind {
        TokenKind::Atom(text.to_string())
    }

    #[test]
    fn test_single_character_tokens() {
        use TokenKind::*;
        assert_eq!(kinds("()'"), vec![LParen, RParen, Quote, Newline]);
    }

    #[test]
    fn test_atoms_are_maximal() {
        use TokenKind::*;
        assert_eq!(
            kinds("(+ -12 foo?bar)"),
            vec![
                LParen,
                atom("+"),
                atom("-12"),
                atom("foo?bar"),
                RParen,
                Newline
            ]
        );
        // The quote only starts a token; inside a name it is an ordinary character
        assert_eq!(kinds("a'b 'c"), vec![atom("a'b"), Quote, atom("c"), Newline]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("(car\n   '(1 2))").unwrap();
        let positions: Vec<(&str, usize, usize)> = tokens
            .iter()
            .map(|token| (token.text(), token.line, token.column))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("(", 1, 1),
                ("car", 1, 2),
                ("\n", 1, 5),
                ("'", 2, 4),
                ("(", 2, 5),
                ("1", 2, 6),
                ("2", 2, 8),
                (")", 2, 9),
                (")", 2, 10),
                ("\n", 2, 11),
            ]
        );
    }

    #[test]
    fn test_comments_skip_to_end_of_line() {
        use TokenKind::*;
        assert_eq!(kinds("; a comment (with parens)\n1"), vec![Newline, atom("1"), Newline]);
        assert_eq!(
            kinds("(f x) ; trailing"),
            vec![LParen, atom("f"), atom("x"), RParen, Newline]
        );
        // A ';' ends a name and starts a comment
        assert_eq!(kinds("abc;def"), vec![atom("abc"), Newline]);
    }

    #[test]
    fn test_missing_final_newline_is_added() {
        let tokens = tokenize("x").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[1].column, 2);
    }

    #[test]
    fn test_whitespace_only_lines() {
        use TokenKind::*;
        assert_eq!(kinds("  \t \n\n"), vec![Newline, Newline]);
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_end_of_input_is_sticky() {
        let mut tokenizer = Tokenizer::new(PromptedReader::silent("1".as_bytes()));
        assert!(tokenizer.next_token().unwrap().is_some());
        assert!(tokenizer.next_token().unwrap().is_some());
        assert_eq!(tokenizer.next_token().unwrap(), None);
        assert_eq!(tokenizer.next_token().unwrap(), None);
        assert_eq!(tokenizer.line_number(), 2);
    }

    #[test]
    fn test_prompts_written_before_each_line() {
        let mut prompts = Vec::new();
        {
            let reader = PromptedReader::new("(a\nb)\n".as_bytes(), &mut prompts);
            let mut tokenizer = Tokenizer::new(reader);
            // "(", "a", newline
            for _ in 0..3 {
                tokenizer.next_token().unwrap();
            }
            tokenizer.set_continuation(true);
            while tokenizer.next_token().unwrap().is_some() {}
        }
        let prompts = String::from_utf8(prompts).unwrap();
        assert_eq!(
            prompts,
            format!("{PRIMARY_PROMPT}{CONTINUATION_PROMPT}{CONTINUATION_PROMPT}")
        );
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(atom("foo"), 3, 7);
        assert_eq!(token.to_string(), "'foo' at 3:7");
        assert!(token.is_atom("foo"));
        assert!(!token.is_atom("bar"));
    }
}
