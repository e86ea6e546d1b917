use std::collections::HashMap;
use std::io::Write;
use std::sync::LazyLock;

use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use crate::value::Value;

pub type PrimitiveFunc = fn(&[Value], &mut dyn Write, Span) -> EvalResult<Value>;

/// A built-in procedure: its canonical lowercase name and native behavior.
/// Primitives only see their arguments and the output sink, never a scope.
#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    func: PrimitiveFunc,
}

impl Primitive {
    pub fn run(&self, args: &[Value], out: &mut dyn Write, span: Span) -> EvalResult<Value> {
        (self.func)(args, out, span)
    }
}

const fn primitive(name: &'static str, func: PrimitiveFunc) -> Primitive {
    Primitive { name, func }
}

/// The complete primitive catalog.
static PRIMITIVES: [Primitive; 13] = [
    primitive("+", prim_add),
    primitive("-", prim_sub),
    primitive("*", prim_mul),
    primitive("/", prim_div),
    primitive("and", prim_and),
    primitive("or", prim_or),
    primitive("not", prim_not),
    primitive("eq", prim_eq),
    primitive("neq", prim_neq),
    primitive("car", prim_car),
    primitive("cdr", prim_cdr),
    primitive("cons", prim_cons),
    primitive("print", prim_print),
];

static BY_NAME: LazyLock<HashMap<&'static str, Primitive>> =
    LazyLock::new(|| PRIMITIVES.iter().map(|p| (p.name, *p)).collect());

/// Finds a primitive by its lowercase name.
pub fn lookup(name: &str) -> Option<Primitive> {
    BY_NAME.get(name).copied()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    PRIMITIVES.iter().map(|p| p.name)
}

// Checks the number of arguments
macro_rules! check_arity {
    ($args:expr, $expected:expr, $span:expr, $name:expr) => {
        if $args.len() != $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects exactly {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
    // Variant for minimum number of args
    ($args:expr, min $expected:expr, $span:expr, $name:expr) => {
        if $args.len() < $expected {
            return Err(EvalError::InvalidArguments(
                format!(
                    "Primitive '{}' expects at least {} arguments, got {}",
                    $name,
                    $expected,
                    $args.len()
                ),
                $span,
            ));
        }
    };
}

fn wrong_type(name: &str, expected: &str, position: usize, found: &Value, span: Span) -> EvalError {
    EvalError::InvalidArguments(
        format!(
            "Primitive '{}' expects {} for argument {}, got {}",
            name,
            expected,
            position,
            found.type_name()
        ),
        span,
    )
}

fn expect_number(value: &Value, name: &str, position: usize, span: Span) -> EvalResult<f32> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(wrong_type(name, "a number", position, other, span)),
    }
}

fn expect_bool(value: &Value, name: &str, position: usize, span: Span) -> EvalResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        other => Err(wrong_type(name, "a boolean", position, other, span)),
    }
}

fn expect_non_empty_list<'a>(value: &'a Value, name: &str, span: Span) -> EvalResult<&'a [Value]> {
    match value {
        Value::List(items) if !items.is_empty() => Ok(items.as_slice()),
        Value::List(_) => Err(EvalError::InvalidArguments(
            format!("Primitive '{}' expects a non-empty list", name),
            span,
        )),
        other => Err(wrong_type(name, "a list", 1, other, span)),
    }
}

/// Left fold over at least one argument, all converted by `expect`.
fn fold<T: Copy>(
    args: &[Value],
    span: Span,
    name: &str,
    expect: fn(&Value, &str, usize, Span) -> EvalResult<T>,
    func: impl Fn(T, T) -> T,
) -> EvalResult<T> {
    check_arity!(args, min 1, span, name);
    let mut acc = expect(&args[0], name, 1, span)?;
    for (i, value) in args.iter().enumerate().skip(1) {
        acc = func(acc, expect(value, name, i + 1, span)?);
    }
    Ok(acc)
}

fn prim_add(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    fold(args, span, "+", expect_number, |a, b| a + b).map(Value::Number)
}

fn prim_sub(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    // (- 5) is 5, not -5: the operation is a plain left fold.
    fold(args, span, "-", expect_number, |a, b| a - b).map(Value::Number)
}

fn prim_mul(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    fold(args, span, "*", expect_number, |a, b| a * b).map(Value::Number)
}

fn prim_div(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    // Division by zero yields inf/NaN.
    fold(args, span, "/", expect_number, |a, b| a / b).map(Value::Number)
}

fn prim_and(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    fold(args, span, "and", expect_bool, |a, b| a && b).map(Value::Boolean)
}

fn prim_or(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    fold(args, span, "or", expect_bool, |a, b| a || b).map(Value::Boolean)
}

fn prim_not(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 1, span, "not");
    Ok(Value::Boolean(!expect_bool(&args[0], "not", 1, span)?))
}

fn prim_eq(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 2, span, "eq");
    Ok(Value::Boolean(args[0] == args[1]))
}

fn prim_neq(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 2, span, "neq");
    Ok(Value::Boolean(args[0] != args[1]))
}

fn prim_car(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 1, span, "car");
    let items = expect_non_empty_list(&args[0], "car", span)?;
    Ok(items[0].clone())
}

fn prim_cdr(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 1, span, "cdr");
    let items = expect_non_empty_list(&args[0], "cdr", span)?;
    Ok(Value::List(items[1..].to_vec()))
}

/// `(cons list value)` appends `value` at the END of `list`. Unlike the
/// classic Lisp cons, it does not prepend.
fn prim_cons(args: &[Value], _out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, 2, span, "cons");
    match &args[0] {
        Value::List(items) => {
            let mut items = items.clone();
            items.push(args[1].clone());
            Ok(Value::List(items))
        }
        other => Err(wrong_type("cons", "a list", 1, other, span)),
    }
}

fn prim_print(args: &[Value], out: &mut dyn Write, span: Span) -> EvalResult<Value> {
    check_arity!(args, min 1, span, "print");
    let mut parts = Vec::with_capacity(args.len());
    for (i, value) in args.iter().enumerate() {
        match value {
            Value::String(s) => parts.push(s.as_str()),
            other => return Err(wrong_type("print", "a string", i + 1, other, span)),
        }
    }
    let joined = parts.join(" ");
    writeln!(out, "{}", joined).map_err(|e| EvalError::Output(e.to_string(), span))?;
    Ok(Value::String(joined))
}
