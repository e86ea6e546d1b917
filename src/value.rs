use crate::ast::{Node, write_spaced};
use crate::lexer::unescape::escape;
use crate::primitives::Primitive;
use crate::scope::{ScopeRef, fold_name};
use std::fmt;
use std::rc::Rc;

/// A runtime value produced by evaluation.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Number(f32),
    Boolean(bool),
    Function(Function),
    /// A realized list. Never mutated; list primitives build new ones.
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Function(_) => "function",
            Value::List(_) => "list",
        }
    }

    /// Stricter than `==`: closures must be the very same closure, not just
    /// share a name.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Function(Function::Closure(a)), Value::Function(Function::Closure(b))) => {
                Rc::ptr_eq(a, b)
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            _ => self == other,
        }
    }
}

// Literals compare by value, lists element-wise and functions by name only:
// two distinct closures called `f` are equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => fold_name(a.name()) == fold_name(b.name()),
            (Value::List(a), Value::List(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(&escape(s)),
            Value::Number(n) => write!(f, "{:?}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Function(function) => write!(f, "{}", function),
            Value::List(items) => {
                write!(f, "[")?;
                write_spaced(f, items)?;
                write!(f, "]")
            }
        }
    }
}

#[derive(Clone)]
pub enum Function {
    Primitive(Primitive),
    Closure(Rc<Closure>),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Primitive(primitive) => primitive.name,
            Function::Closure(closure) => &closure.name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Primitive(primitive) => write!(f, "Primitive({})", primitive.name),
            Function::Closure(closure) => write!(f, "Closure({}/{})", closure.name, closure.params.len()),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Primitive(primitive) => write!(f, "(fun {} <primitive>)", primitive.name),
            Function::Closure(closure) => write!(
                f,
                "(fun {} [{}] {})",
                closure.name,
                closure.params.join(" "),
                closure.body
            ),
        }
    }
}

/// A user-defined function. The body is shared with the AST it was parsed
/// from and the defining scope is held by reference.
pub struct Closure {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    /// Strong reference. `fun` also stores the closure in this scope, so the
    /// pair forms an `Rc` cycle that lives until the process exits.
    pub scope: ScopeRef,
}
