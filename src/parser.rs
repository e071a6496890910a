//! Backtracking recursive-descent parser.
//!
//! Every production is a pure function from a start index into the token slice to
//! `Some((node, next_index))`, or `None` when it does not match. Alternatives are
//! tried in a fixed order and a failed alternative consumes nothing, so callers
//! simply try the next one from the same index.
//!
//! ```text
//! Expression  := Value | Variable
//!              | '(' 'if' Expression Expression Expression ')'
//!              | '(' 'while' Expression Expression ')'
//!              | '(' 'set' Variable Expression ')'
//!              | '(' 'begin' Expression+ ')'
//!              | '(' Expression+ ')'
//! Value       := Integer | "'" SExpression | '(' 'lambda' ArgList Expression ')'
//! ArgList     := '(' Variable* ')'
//! SExpression := Integer | Symbol | '(' SExpression* ')'
//! ```

use std::rc::Rc;

use crate::Error;
use crate::ast::{Expr, Lambda, NumberType, SpecialForm, Value};
use crate::tokenizer::{Token, TokenKind};

type Parsed<T> = Option<(T, usize)>;

/// Parse one complete top-level form
///
/// Fails with [`Error::Syntax`] when no production matches and with
/// [`Error::TrailingToken`] when the form does not use up every token.
pub fn parse_form(tokens: &[Token]) -> Result<Expr, Error> {
    let parser = Parser::new(tokens);
    match parser.expression(0) {
        None => Err(Error::Syntax),
        Some((expr, next)) if parser.finished(next) => Ok(expr),
        Some((_, next)) => Err(Error::TrailingToken(tokens[next].text().to_string())),
    }
}

/// Whether `text` is an integer literal: `-?[0-9]+`
pub fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Whether `text` may be used as a variable or symbol name
pub fn is_name(text: &str) -> bool {
    !text.is_empty() && !is_integer(text) && !text.contains(['(', ')', ';', ' '])
}

/// Parser over a pre-materialized token slice
pub struct Parser<'a> {
    tokens: &'a [Token],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens }
    }

    /// Whether `index` is one past the last token
    pub fn finished(&self, index: usize) -> bool {
        index == self.tokens.len()
    }

    pub fn expression(&self, i: usize) -> Parsed<Expr> {
        self.value(i)
            .or_else(|| {
                self.variable(i)
                    .map(|(name, j)| (Expr::Variable(name), j))
            })
            .or_else(|| self.if_form(i))
            .or_else(|| self.while_form(i))
            .or_else(|| self.set_form(i))
            .or_else(|| self.begin_form(i))
            // The catch-all application goes last so keywords in head
            // position are read as special forms first.
            .or_else(|| self.application(i))
    }

    pub fn value(&self, i: usize) -> Parsed<Expr> {
        self.integer(i)
            .or_else(|| self.quoted_const(i))
            .map(|(value, j)| (Expr::Literal(value), j))
            .or_else(|| self.lambda(i))
    }

    fn if_form(&self, i: usize) -> Parsed<Expr> {
        let j = self.keyword(i, SpecialForm::If)?;
        let (cond, j) = self.expression(j)?;
        let (then, j) = self.expression(j)?;
        let (otherwise, j) = self.expression(j)?;
        let j = self.close(j)?;
        Some((Expr::special(SpecialForm::If, vec![cond, then, otherwise]), j))
    }

    fn while_form(&self, i: usize) -> Parsed<Expr> {
        let j = self.keyword(i, SpecialForm::While)?;
        let (cond, j) = self.expression(j)?;
        let (body, j) = self.expression(j)?;
        let j = self.close(j)?;
        Some((Expr::special(SpecialForm::While, vec![cond, body]), j))
    }

    fn set_form(&self, i: usize) -> Parsed<Expr> {
        let j = self.keyword(i, SpecialForm::Set)?;
        let (name, j) = self.variable(j)?;
        let (value, j) = self.expression(j)?;
        let j = self.close(j)?;
        Some((
            Expr::special(SpecialForm::Set, vec![Expr::Variable(name), value]),
            j,
        ))
    }

    fn begin_form(&self, i: usize) -> Parsed<Expr> {
        let j = self.keyword(i, SpecialForm::Begin)?;
        let (body, j) = self.expressions(j)?;
        let j = self.close(j)?;
        Some((Expr::special(SpecialForm::Begin, body), j))
    }

    fn application(&self, i: usize) -> Parsed<Expr> {
        let j = self.open(i)?;
        let (mut exprs, j) = self.expressions(j)?;
        let j = self.close(j)?;
        let op = exprs.remove(0);
        Some((Expr::call(op, exprs), j))
    }

    /// One or more expressions
    fn expressions(&self, i: usize) -> Parsed<Vec<Expr>> {
        let (first, mut j) = self.expression(i)?;
        let mut exprs = vec![first];
        while let Some((expr, next)) = self.expression(j) {
            exprs.push(expr);
            j = next;
        }
        Some((exprs, j))
    }

    fn lambda(&self, i: usize) -> Parsed<Expr> {
        let j = self.open(i)?;
        let j = self.atom(j, "lambda")?;
        let (formals, j) = self.arg_list(j)?;
        let (body, j) = self.expression(j)?;
        let j = self.close(j)?;
        Some((Expr::Lambda(Rc::new(Lambda { formals, body })), j))
    }

    fn arg_list(&self, i: usize) -> Parsed<Vec<String>> {
        let mut j = self.open(i)?;
        let mut formals = Vec::new();
        while let Some((name, next)) = self.variable(j) {
            formals.push(name);
            j = next;
        }
        let j = self.close(j)?;
        Some((formals, j))
    }

    fn quoted_const(&self, i: usize) -> Parsed<Value> {
        let j = self.expect(i, &TokenKind::Quote)?;
        self.s_expression(j)
    }

    pub fn s_expression(&self, i: usize) -> Parsed<Value> {
        self.integer(i)
            .or_else(|| self.name(i).map(|(name, j)| (Value::Symbol(name), j)))
            .or_else(|| self.s_list(i))
    }

    fn s_list(&self, i: usize) -> Parsed<Value> {
        let mut j = self.open(i)?;
        let mut items = Vec::new();
        while let Some((item, next)) = self.s_expression(j) {
            items.push(item);
            j = next;
        }
        let j = self.close(j)?;
        Some((Value::list(items), j))
    }

    fn integer(&self, i: usize) -> Parsed<Value> {
        let text = self.atom_text(i)?;
        if !is_integer(text) {
            return None;
        }
        // Out-of-range literals are not integers (and, being numeric, not names)
        let n = text.parse::<NumberType>().ok()?;
        Some((Value::Number(n), i + 1))
    }

    fn variable(&self, i: usize) -> Parsed<String> {
        self.name(i)
    }

    /// Any non-numeric atom, or a lone quote that no quoted constant claimed
    fn name(&self, i: usize) -> Parsed<String> {
        let text = match self.tokens.get(i)?.kind {
            TokenKind::Quote => "'",
            _ => self.atom_text(i)?,
        };
        is_name(text).then(|| (text.to_string(), i + 1))
    }

    fn keyword(&self, i: usize, form: SpecialForm) -> Option<usize> {
        let j = self.open(i)?;
        self.atom(j, form.keyword())
    }

    fn open(&self, i: usize) -> Option<usize> {
        self.expect(i, &TokenKind::LParen)
    }

    fn close(&self, i: usize) -> Option<usize> {
        self.expect(i, &TokenKind::RParen)
    }

    fn atom(&self, i: usize, text: &str) -> Option<usize> {
        self.tokens.get(i).filter(|t| t.is_atom(text)).map(|_| i + 1)
    }

    fn expect(&self, i: usize, kind: &TokenKind) -> Option<usize> {
        self.tokens.get(i).filter(|t| &t.kind == kind).map(|_| i + 1)
    }

    fn atom_text(&self, i: usize) -> Option<&'a str> {
        match self.tokens.get(i) {
            Some(Token {
                kind: TokenKind::Atom(text),
                ..
            }) => Some(text.as_str()),
            _ => None,
        }
    }
}
