//! Built-in operations registry.
//!
//! The registry is a fixed table of primitives installed once into the global
//! environment. Every primitive takes its arguments already evaluated, left to right.
//!
//! ```scheme
//! (+ 1 2)            ; arithmetic: + - * / (integer, / is floor division)
//! (< 1 2)            ; comparison: < > =, answering T or ()
//! (cons 1 '(2 3))    ; lists: cons car cdr
//! (null? '())        ; predicates: number? symbol? list? null? primop? closure?
//! (print 'hello)     ; output: writes the value, returns it
//! ```
//!
//! ## Error Handling
//!
//! - **Arity**: every primitive has a fixed argument count; the evaluator checks it
//!   before evaluating arguments and each implementation checks it again
//! - **Types**: arithmetic and ordering reject non-numbers, `car`/`cdr` reject non-pairs
//! - **Lists**: `cons` only extends proper lists, its second argument must be a pair or `()`
//! - **Overflow**: arithmetic is checked and reports overflow instead of wrapping
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with the signature `fn(&[Value]) -> Result<Value, Error>`,
//!    or `fn(&[Value], &mut dyn Write) -> Result<Value, Error>` if it produces output
//! 2. **Add it to BUILTIN_OPS** with its name and arity
//! 3. **Add tests** covering the error cases

use std::io::Write;

use crate::Error;
use crate::ast::{NumberType, Value};

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Pure function of its arguments
    Function(fn(&[Value]) -> Result<Value, Error>),
    /// Function that writes to the session output sink
    Output(fn(&[Value], &mut dyn Write) -> Result<Value, Error>),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::Output(_) => write!(f, "Output(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The name the operation is bound to in the global environment
    pub name: &'static str,
    /// The implementation of this operation
    pub op_kind: OpKind,
    /// Exact number of arguments required
    pub arity: usize,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Names are unique within the registry
        self.name == other.name
    }
}

impl BuiltinOp {
    /// Check if the given number of arguments is valid for this operation
    pub fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        if arg_count == self.arity {
            Ok(())
        } else {
            Err(Error::arity(self.name, self.arity, arg_count))
        }
    }

    /// Invoke the operation on already evaluated arguments
    pub fn apply(&self, args: &[Value], out: &mut dyn Write) -> Result<Value, Error> {
        self.validate_arity(args.len())?;
        match self.op_kind {
            OpKind::Function(f) => f(args),
            OpKind::Output(f) => f(args, out),
        }
    }
}

//
// Builtin Function Implementations
//

/// Destructure the two numeric arguments of a binary numeric primitive
fn number_pair(name: &str, args: &[Value]) -> Result<(NumberType, NumberType), Error> {
    match args {
        [Value::Number(a), Value::Number(b)] => Ok((*a, *b)),
        [a, b] => Err(Error::Type(format!(
            "{name} requires numbers, got {} and {}",
            a.type_name(),
            b.type_name()
        ))),
        _ => Err(Error::arity(name, 2, args.len())),
    }
}

fn single<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, Error> {
    match args {
        [value] => Ok(value),
        _ => Err(Error::arity(name, 1, args.len())),
    }
}

// Macro to generate checked arithmetic functions
macro_rules! checked_arithmetic {
    ($name:ident, $method:ident, $op_str:expr, $what:expr) => {
        pub fn $name(args: &[Value]) -> Result<Value, Error> {
            let (a, b) = number_pair($op_str, args)?;
            a.$method(b)
                .map(Value::Number)
                .ok_or(Error::Overflow($what))
        }
    };
}

checked_arithmetic!(builtin_add, checked_add, "+", "addition");
checked_arithmetic!(builtin_sub, checked_sub, "-", "subtraction");
checked_arithmetic!(builtin_mul, checked_mul, "*", "multiplication");

/// Integer division rounding toward negative infinity
pub fn floor_div(a: NumberType, b: NumberType) -> Result<NumberType, Error> {
    if b == 0 {
        return Err(Error::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(Error::Overflow("division"))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

pub fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    let (a, b) = number_pair("/", args)?;
    floor_div(a, b).map(Value::Number)
}

// Macro to generate numeric ordering functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        pub fn $name(args: &[Value]) -> Result<Value, Error> {
            let (a, b) = number_pair($op_str, args)?;
            Ok(Value::from_bool(a $op b))
        }
    };
}

numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");

/// `=` never fails on types: numbers and symbols compare by value, two nils are equal,
/// anything else is unequal
pub fn builtin_eq(args: &[Value]) -> Result<Value, Error> {
    match args {
        [a, b] => Ok(Value::from_bool(match (a, b) {
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Symbol(x), Value::Symbol(y)) => x == y,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        })),
        _ => Err(Error::arity("=", 2, args.len())),
    }
}

pub fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    match args {
        [car, cdr @ (Value::Pair(..) | Value::Nil)] => Ok(Value::cons(car.clone(), cdr.clone())),
        [_, other] => Err(Error::MalformedList(other.to_string())),
        _ => Err(Error::arity("cons", 2, args.len())),
    }
}

pub fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    match single("car", args)? {
        Value::Pair(car, _) => Ok(car.as_ref().clone()),
        other => Err(Error::Type(format!(
            "car requires a pair, got {}",
            other.type_name()
        ))),
    }
}

pub fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    match single("cdr", args)? {
        Value::Pair(_, cdr) => Ok(cdr.as_ref().clone()),
        other => Err(Error::Type(format!(
            "cdr requires a pair, got {}",
            other.type_name()
        ))),
    }
}

// Macro to generate unary type predicates
macro_rules! type_predicate {
    ($name:ident, $pattern:pat, $op_str:expr) => {
        pub fn $name(args: &[Value]) -> Result<Value, Error> {
            let value = single($op_str, args)?;
            Ok(Value::from_bool(matches!(value, $pattern)))
        }
    };
}

type_predicate!(builtin_is_number, Value::Number(_), "number?");
type_predicate!(builtin_is_symbol, Value::Symbol(_), "symbol?");
// `()` is not a list here, only a pair is
type_predicate!(builtin_is_list, Value::Pair(..), "list?");
type_predicate!(builtin_is_null, Value::Nil, "null?");
type_predicate!(builtin_is_primop, Value::PrimOp(_), "primop?");
type_predicate!(builtin_is_closure, Value::Closure(_), "closure?");

pub fn builtin_print(args: &[Value], out: &mut dyn Write) -> Result<Value, Error> {
    let value = single("print", args)?;
    writeln!(out, "{value}")?;
    Ok(value.clone())
}

/// Global registry of all built-in operations as a simple array
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic operations
    BuiltinOp {
        name: "+",
        op_kind: OpKind::Function(builtin_add),
        arity: 2,
    },
    BuiltinOp {
        name: "-",
        op_kind: OpKind::Function(builtin_sub),
        arity: 2,
    },
    BuiltinOp {
        name: "*",
        op_kind: OpKind::Function(builtin_mul),
        arity: 2,
    },
    BuiltinOp {
        name: "/",
        op_kind: OpKind::Function(builtin_div),
        arity: 2,
    },
    // Comparison operations
    BuiltinOp {
        name: "<",
        op_kind: OpKind::Function(builtin_lt),
        arity: 2,
    },
    BuiltinOp {
        name: ">",
        op_kind: OpKind::Function(builtin_gt),
        arity: 2,
    },
    BuiltinOp {
        name: "=",
        op_kind: OpKind::Function(builtin_eq),
        arity: 2,
    },
    // List operations
    BuiltinOp {
        name: "cons",
        op_kind: OpKind::Function(builtin_cons),
        arity: 2,
    },
    BuiltinOp {
        name: "car",
        op_kind: OpKind::Function(builtin_car),
        arity: 1,
    },
    BuiltinOp {
        name: "cdr",
        op_kind: OpKind::Function(builtin_cdr),
        arity: 1,
    },
    // Type predicates
    BuiltinOp {
        name: "number?",
        op_kind: OpKind::Function(builtin_is_number),
        arity: 1,
    },
    BuiltinOp {
        name: "symbol?",
        op_kind: OpKind::Function(builtin_is_symbol),
        arity: 1,
    },
    BuiltinOp {
        name: "list?",
        op_kind: OpKind::Function(builtin_is_list),
        arity: 1,
    },
    BuiltinOp {
        name: "null?",
        op_kind: OpKind::Function(builtin_is_null),
        arity: 1,
    },
    BuiltinOp {
        name: "primop?",
        op_kind: OpKind::Function(builtin_is_primop),
        arity: 1,
    },
    BuiltinOp {
        name: "closure?",
        op_kind: OpKind::Function(builtin_is_closure),
        arity: 1,
    },
    // Output
    BuiltinOp {
        name: "print",
        op_kind: OpKind::Output(builtin_print),
        arity: 1,
    },
];

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}
