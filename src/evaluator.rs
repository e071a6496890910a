use std::io::Write;
use std::rc::Rc;

use tracing::trace;

use crate::Error;
use crate::ast::{Closure, Expr, Operator, SpecialForm, Value};
use crate::environment::Env;

/// Evaluate an expression tree in the given environment
///
/// `out` receives everything written by `print`. Side effects already performed
/// are kept when a later step fails.
pub fn eval(expr: &Expr, env: &Env, out: &mut dyn Write) -> Result<Value, Error> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        // Capture the current frame by reference, never by copy
        Expr::Lambda(lambda) => Ok(Value::Closure(Rc::new(Closure {
            lambda: Rc::clone(lambda),
            env: env.clone(),
        }))),

        Expr::Variable(name) => Ok(env.lookup(name)),

        Expr::Apply {
            op: Operator::Special(form),
            args,
        } => match form {
            SpecialForm::If => eval_if(args, env, out),
            SpecialForm::While => eval_while(args, env, out),
            SpecialForm::Set => eval_set(args, env, out),
            SpecialForm::Begin => eval_begin(args, env, out),
        },

        Expr::Apply {
            op: Operator::Expr(op),
            args,
        } => eval_application(op, args, env, out),
    }
}

/// Evaluate if special form; only `()` selects the else branch
fn eval_if(args: &[Expr], env: &Env, out: &mut dyn Write) -> Result<Value, Error> {
    match args {
        [condition, then_expr, else_expr] => {
            if eval(condition, env, out)?.is_nil() {
                eval(else_expr, env, out)
            } else {
                eval(then_expr, env, out)
            }
        }
        _ => Err(malformed(SpecialForm::If, args)),
    }
}

/// Evaluate while special form
///
/// Loops for as long as the condition is not `()`; a condition that never
/// becomes `()` never returns.
fn eval_while(args: &[Expr], env: &Env, out: &mut dyn Write) -> Result<Value, Error> {
    match args {
        [condition, body] => {
            while eval(condition, env, out)?.is_truthy() {
                eval(body, env, out)?;
            }
            Ok(Value::Nil)
        }
        _ => Err(malformed(SpecialForm::While, args)),
    }
}

/// Evaluate set special form, answering the assigned value
fn eval_set(args: &[Expr], env: &Env, out: &mut dyn Write) -> Result<Value, Error> {
    match args {
        [Expr::Variable(name), value_expr] => {
            let value = eval(value_expr, env, out)?;
            env.assign(name, value.clone());
            Ok(value)
        }
        _ => Err(malformed(SpecialForm::Set, args)),
    }
}

/// Evaluate begin special form, answering the value of the last expression
fn eval_begin(args: &[Expr], env: &Env, out: &mut dyn Write) -> Result<Value, Error> {
    match args {
        [init @ .., last] => {
            for expr in init {
                eval(expr, env, out)?;
            }
            eval(last, env, out)
        }
        [] => Err(malformed(SpecialForm::Begin, args)),
    }
}

fn malformed(form: SpecialForm, args: &[Expr]) -> Error {
    Error::Internal(format!(
        "malformed {} with {} argument(s)",
        form.keyword(),
        args.len()
    ))
}

/// Helper function to evaluate argument expressions left to right
fn eval_args(args: &[Expr], env: &Env, out: &mut dyn Write) -> Result<Vec<Value>, Error> {
    args.iter().map(|arg| eval(arg, env, &mut *out)).collect()
}

/// Evaluate function application
///
/// Arity is checked before any argument is evaluated.
fn eval_application(
    op_expr: &Expr,
    arg_exprs: &[Expr],
    env: &Env,
    out: &mut dyn Write,
) -> Result<Value, Error> {
    let func = eval(op_expr, env, out)?;
    match &func {
        Value::PrimOp(op) => {
            op.validate_arity(arg_exprs.len())?;
            let args = eval_args(arg_exprs, env, out)?;
            op.apply(&args, out)
        }
        Value::Closure(closure) => {
            check_closure_arity(closure, arg_exprs.len())?;
            // Arguments are evaluated in the caller's environment
            let args = eval_args(arg_exprs, env, out)?;
            apply_closure(closure, args, out)
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

fn check_closure_arity(closure: &Closure, got: usize) -> Result<(), Error> {
    let expected = closure.lambda.formals.len();
    if expected == got {
        Ok(())
    } else {
        Err(Error::ClosureArity { expected, got })
    }
}

/// Apply a closure to already evaluated arguments
///
/// The body runs in a brand-new frame enclosed by the captured environment, not the
/// caller's. Duplicate formal names keep the last argument bound to them.
fn apply_closure(
    closure: &Closure,
    args: Vec<Value>,
    out: &mut dyn Write,
) -> Result<Value, Error> {
    check_closure_arity(closure, args.len())?;
    let lambda = &closure.lambda;
    trace!(formals = ?lambda.formals, "applying closure");
    let frame = closure
        .env
        .extend_with(lambda.formals.iter().cloned().zip(args));
    eval(&lambda.body, &frame, out)
}
