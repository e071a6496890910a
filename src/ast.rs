use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::builtinops::BuiltinOp;
use crate::environment::Env;

/// Type alias for number values in the interpreter
pub type NumberType = i64;

/// Name of the symbol used as the canonical truth value
pub const TRUE_SYMBOL: &str = "T";

/// Runtime values (symbolic expressions)
///
/// Pairs share their halves through `Rc`, so `car`/`cdr`/`cons` never copy list
/// structure. Closures capture their defining environment by reference.
#[derive(Clone)]
pub enum Value {
    /// The empty list; also the only false value
    Nil,
    Number(NumberType),
    Symbol(String),
    /// A cons cell (car, cdr)
    Pair(Rc<Value>, Rc<Value>),
    Closure(Rc<Closure>),
    /// A built-in operation from the registry
    PrimOp(&'static BuiltinOp),
}

/// A lambda paired with the environment that was active when it was evaluated
pub struct Closure {
    pub lambda: Rc<Lambda>,
    pub env: Env,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment may (indirectly) contain this closure.
        f.debug_struct("Closure")
            .field("lambda", &self.lambda)
            .finish_non_exhaustive()
    }
}

impl Value {
    /// Construct a symbol value
    pub fn symbol(name: impl Into<String>) -> Value {
        Value::Symbol(name.into())
    }

    /// The canonical truth value, the symbol `T`
    pub fn truth() -> Value {
        Value::Symbol(TRUE_SYMBOL.to_string())
    }

    /// Map a Rust boolean onto `T` / `()`
    pub fn from_bool(b: bool) -> Value {
        if b { Value::truth() } else { Value::Nil }
    }

    /// Construct a pair without any check on the cdr
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Pair(Rc::new(car), Rc::new(cdr))
    }

    /// Build a proper, nil-terminated list from the items in order
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Value::Nil, |tail, item| Value::cons(item, tail))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `()` counts as true
    pub fn is_truthy(&self) -> bool {
        !self.is_nil()
    }

    /// Short name of the value's kind, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Symbol(_) => "symbol",
            Value::Pair(..) => "pair",
            Value::Closure(_) => "closure",
            Value::PrimOp(_) => "primop",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "()"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Pair(car, cdr) => {
                write!(f, "({car}")?;
                let mut rest: &Value = cdr;
                loop {
                    match rest {
                        Value::Pair(car, cdr) => {
                            write!(f, " {car}")?;
                            rest = cdr.as_ref();
                        }
                        Value::Nil => break,
                        tail => {
                            write!(f, " . {tail}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Closure(_) => write!(f, "<closure>"),
            Value::PrimOp(op) => write!(f, "{}", op.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s:?})"),
            Value::Pair(car, cdr) => write!(f, "Pair({car:?}, {cdr:?})"),
            Value::Closure(closure) => write!(f, "{closure:?}"),
            Value::PrimOp(op) => write!(f, "PrimOp({})", op.name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        // Walk the cdr chain in a loop so long lists compare in constant stack
        let (mut left, mut right) = (self, other);
        loop {
            match (left, right) {
                (Value::Pair(a1, d1), Value::Pair(a2, d2)) => {
                    if a1 != a2 {
                        return false;
                    }
                    left = d1.as_ref();
                    right = d2.as_ref();
                }
                (Value::Nil, Value::Nil) => return true,
                (Value::Number(a), Value::Number(b)) => return a == b,
                (Value::Symbol(a), Value::Symbol(b)) => return a == b,
                // Closures are compared by identity, not by code or environment
                (Value::Closure(a), Value::Closure(b)) => return Rc::ptr_eq(a, b),
                (Value::PrimOp(a), Value::PrimOp(b)) => return a.name == b.name,
                _ => return false,
            }
        }
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // The default drop recurses once per cell; unlink uniquely owned tails
        // one at a time instead so a list of any length drops in constant stack.
        let Value::Pair(_, cdr) = self else {
            return;
        };
        if Rc::strong_count(cdr) > 1 || !matches!(cdr.as_ref(), Value::Pair(..)) {
            return;
        }
        let mut tail = mem::replace(cdr, Rc::new(Value::Nil));
        while let Ok(mut cell) = Rc::try_unwrap(tail) {
            match &mut cell {
                Value::Pair(_, next) if matches!(next.as_ref(), Value::Pair(..)) => {
                    tail = mem::replace(next, Rc::new(Value::Nil));
                }
                _ => break,
            }
        }
    }
}

/// The reserved operators whose arguments are not pre-evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    If,
    While,
    Set,
    Begin,
}

impl SpecialForm {
    pub fn keyword(self) -> &'static str {
        match self {
            SpecialForm::If => "if",
            SpecialForm::While => "while",
            SpecialForm::Set => "set",
            SpecialForm::Begin => "begin",
        }
    }
}

/// A lambda expression: formal parameter names and a single body expression
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub formals: Vec<String>,
    pub body: Expr,
}

/// Operator position of an application
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Special(SpecialForm),
    Expr(Box<Expr>),
}

/// Expression-tree nodes produced by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A value computed at parse time: an integer or a quoted constant
    Literal(Value),
    Lambda(Rc<Lambda>),
    /// A variable reference, resolved at evaluation time
    Variable(String),
    Apply { op: Operator, args: Vec<Expr> },
}

impl Expr {
    /// Convenience constructor for an ordinary call
    pub fn call(op: Expr, args: Vec<Expr>) -> Expr {
        Expr::Apply {
            op: Operator::Expr(Box::new(op)),
            args,
        }
    }

    /// Convenience constructor for a special form
    pub fn special(form: SpecialForm, args: Vec<Expr>) -> Expr {
        Expr::Apply {
            op: Operator::Special(form),
            args,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Lambda(lambda) => {
                write!(f, "(lambda ({}) {})", lambda.formals.join(" "), lambda.body)
            }
            Expr::Apply { op, args } => {
                match op {
                    Operator::Special(form) => write!(f, "({}", form.keyword())?,
                    Operator::Expr(expr) => write!(f, "({expr}")?,
                }
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}
