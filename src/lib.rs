//! schemelet - a small Scheme-like interpreter
//!
//! The crate turns a stream of text lines into tokens, parses one top-level form at a
//! time with a backtracking recursive-descent parser, and evaluates the resulting
//! expression tree against a chain of shared, mutable environment frames.
//!
//! ```scheme
//! (set square (lambda (x) (* x x)))
//! (square 12)                  ; 144
//! (cons 1 '(2 3))              ; (1 2 3)
//! (if '() 'yes 'no)            ; no - only the empty list is false
//! (begin (print 'hi) (/ -7 2)) ; prints hi, evaluates to -4
//! ```
//!
//! ## Language summary
//!
//! - Values: integers, symbols, pairs/lists, `()` (nil, the only false value),
//!   closures and primitive operations. The symbol `T` is the canonical truth value.
//! - Special forms: `if`, `while`, `set`, `begin` and `lambda`.
//! - Unknown variables are never an error: reading one binds it to `()`,
//!   assigning one creates a global binding.
//!
//! ## Modules
//!
//! - `tokenizer`: line-buffered lexer with line/column tracking and prompts
//! - `parser`: backtracking parser from tokens to expression trees
//! - `ast`: value and expression-tree types with their printed forms
//! - `environment`: shared binding frames
//! - `evaluator`: the recursive evaluator
//! - `builtinops`: the primitive operation registry
//! - `session`: form grouping and the read-eval-print loop used by the binary

/// Prompt written before reading the first line of a new top-level form
pub const PRIMARY_PROMPT: &str = "--> ";

/// Prompt written before reading further lines of an unterminated form
pub const CONTINUATION_PROMPT: &str = "  > ";

/// Error types for the interpreter
///
/// Every error is fatal to the current top-level form only; the session keeps
/// reading input afterwards.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// No grammar production matched the form
    #[error("syntax error")]
    Syntax,
    /// The form parsed but left tokens unconsumed
    #[error("found extra token beyond end of input: {0}")]
    TrailingToken(String),
    /// A primitive was applied to the wrong number of arguments
    #[error("{callee} expects {expected} argument(s), got {got}")]
    Arity {
        callee: String,
        expected: usize,
        got: usize,
    },
    /// A closure was applied to the wrong number of arguments
    #[error("closure argument mismatch: expected {expected}, got {got}")]
    ClosureArity { expected: usize, got: usize },
    /// A primitive received an argument of the wrong kind
    #[error("type error: {0}")]
    Type(String),
    /// `cons` onto something that is neither a list nor nil
    #[error("second argument in cons not list or nil: {0}")]
    MalformedList(String),
    /// The operator of an application evaluated to a non-callable value
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
    /// Writing to the output sink failed
    #[error("output error: {0}")]
    Output(String),
    /// An expression tree the parser can never produce
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an arity error for the named primitive
    pub fn arity(callee: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Arity {
            callee: callee.into(),
            expected,
            got,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Output(err.to_string())
    }
}

/// An [`Error`] tied to the line on which the failing top-level form started
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", located(.error, .line))]
pub struct FormError {
    pub line: usize,
    #[source]
    pub error: Error,
}

fn located(error: &Error, line: &usize) -> String {
    match error {
        Error::Syntax => format!("syntax error on input that started on line {line}"),
        other => format!("{other} (on input that started on line {line})"),
    }
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod parser;
pub mod session;
pub mod tokenizer;

pub use ast::{Expr, Value};
pub use environment::Env;
pub use session::{Form, Outcome, Session};
pub use tokenizer::{LineSource, PromptedReader, Token, TokenKind, Tokenizer};
