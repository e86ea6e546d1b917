use crate::ast::{Expression, FunctionDefinition, IfExpression, LetBinding, Node, Part};
use crate::parser::{ParseError, parse_str};
use crate::primitives;
use crate::scope::{Scope, ScopeError, ScopeRef, fold_name};
use crate::source::Span;
use crate::value::{Closure, Function, Value};
use std::io::{self, Write};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    Scope(#[from] ScopeError), // Errors from scope lookup
    #[error("Evaluation Error: Expected a function, but got: {found}")]
    NotAFunction { found: Value, span: Span },
    #[error("Evaluation Error: {context} must be a {expected}, but got {}", .found.type_name())]
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
        found: Value,
        span: Span,
    },
    #[error("Evaluation Error: Function '{name}' expects {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("Evaluation Error: Invalid arguments - {0}")]
    InvalidArguments(String, Span), // Primitive arity or argument type mismatch
    #[error("Evaluation Error: Could not write output - {0}")]
    Output(String, Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::Scope(ScopeError::UnboundSymbol(_, span)) => *span,
            EvalError::NotAFunction { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::Arity { span, .. } => *span,
            EvalError::InvalidArguments(_, span) | EvalError::Output(_, span) => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

/// Walks the AST. Owns nothing but the output sink `print` writes to; all
/// state lives in the scopes passed in.
pub struct Executor<'o> {
    out: &'o mut dyn Write,
}

impl<'o> Executor<'o> {
    pub fn new(out: &'o mut dyn Write) -> Self {
        Executor { out }
    }

    /// Evaluates any AST node within `scope`.
    pub fn realize(&mut self, node: &Node, scope: &ScopeRef) -> EvalResult {
        match &node.kind {
            Part::Number(n) => Ok(Value::Number(*n)),
            Part::String(s) => Ok(Value::String(s.clone())),
            Part::Boolean(b) => Ok(Value::Boolean(*b)),
            Part::Symbol(name) => Ok(scope.borrow().get(name, node.span)?),
            Part::List(items) => items
                .iter()
                .map(|item| self.realize(item, scope))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            Part::Expression(expression) => self.apply(expression, node.span, scope),
        }
    }

    /// Evaluates a parenthesized form. `span` covers the whole form.
    pub fn apply(&mut self, expression: &Expression, span: Span, scope: &ScopeRef) -> EvalResult {
        if let Some(keyword) = expression.keyword() {
            trace!(form = keyword.name(), %span, "special form");
        }
        match expression {
            Expression::Call { head, tail } => {
                // A primitive name in head position always calls the primitive,
                // whatever the scope binds under that name.
                let primitive = head.as_symbol().and_then(|name| primitives::lookup(&fold_name(name)));
                let function = match primitive {
                    Some(primitive) => Function::Primitive(primitive),
                    None => match self.realize(head, scope)? {
                        Value::Function(function) => function,
                        found => {
                            return Err(EvalError::NotAFunction {
                                found,
                                span: head.span,
                            });
                        }
                    },
                };
                let args = tail
                    .iter()
                    .map(|node| self.realize(node, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.run(&function, args, span, scope)
            }
            Expression::Let(form) => self.realize_let(form, scope),
            Expression::If(form) => self.realize_if(form, scope),
            Expression::Fun(definition) => Ok(self.define_function(definition, scope)),
        }
    }

    /// Invokes a function with already realized arguments. `call_site` is
    /// the scope the call was made from; closure bodies fall back to it for
    /// names their defining scope does not bind.
    pub fn run(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        span: Span,
        call_site: &ScopeRef,
    ) -> EvalResult {
        match function {
            Function::Primitive(primitive) => primitive.run(&args, &mut *self.out, span),
            Function::Closure(closure) => {
                if args.len() != closure.params.len() {
                    return Err(EvalError::Arity {
                        name: closure.name.clone(),
                        expected: closure.params.len(),
                        found: args.len(),
                        span,
                    });
                }
                trace!(name = %closure.name, args = args.len(), "calling closure");
                let frame = Scope::new_call_frame(closure.scope.clone(), call_site.clone());
                {
                    let mut frame = frame.borrow_mut();
                    for (param, arg) in closure.params.iter().zip(args) {
                        frame.define(param, arg);
                    }
                }
                self.realize(&closure.body, &frame)
            }
        }
    }

    // Bindings are realized in the enclosing scope, so they cannot see each other.
    fn realize_let(&mut self, form: &LetBinding, scope: &ScopeRef) -> EvalResult {
        let frame = Scope::new_enclosed(scope.clone());
        for (name, node) in &form.bindings {
            let value = self.realize(node, scope)?;
            frame.borrow_mut().define(name, value);
        }
        self.realize(&form.body, &frame)
    }

    fn realize_if(&mut self, form: &IfExpression, scope: &ScopeRef) -> EvalResult {
        match self.realize(&form.predicate, scope)? {
            Value::Boolean(true) => self.realize(&form.then, scope),
            Value::Boolean(false) => match &form.otherwise {
                Some(otherwise) => self.realize(otherwise, scope),
                None => Ok(Value::Boolean(false)),
            },
            found => Err(EvalError::TypeMismatch {
                context: "if predicate",
                expected: "boolean",
                found,
                span: form.predicate.span,
            }),
        }
    }

    /// Builds the closure and binds it in `scope` itself, which is what lets
    /// the body call the function recursively.
    fn define_function(&mut self, definition: &FunctionDefinition, scope: &ScopeRef) -> Value {
        trace!(name = %definition.name, params = definition.params.len(), "fun");
        let function = Value::Function(Function::Closure(Rc::new(Closure {
            name: definition.name.clone(),
            params: definition.params.clone(),
            body: Rc::clone(&definition.body),
            scope: Rc::clone(scope),
        })));
        scope.borrow_mut().define(&definition.name, function.clone());
        function
    }
}

/// Parses and evaluates every form of `source` in order, returning the value
/// of the last one. `print` output goes to stdout.
pub fn evaluate(source: &str, scope: &ScopeRef) -> Result<Value, crate::Error> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    evaluate_with_output(source, scope, &mut out)
}

/// Same as `evaluate`, with a fresh root scope.
pub fn evaluate_in_new_scope(source: &str) -> Result<Value, crate::Error> {
    evaluate(source, &Scope::new_global())
}

pub fn evaluate_with_output(
    source: &str,
    scope: &ScopeRef,
    out: &mut dyn Write,
) -> Result<Value, crate::Error> {
    let forms = parse_str(source)?;
    debug!(forms = forms.len(), "evaluating program");
    let mut executor = Executor::new(out);
    let mut last = None;
    for form in &forms {
        last = Some(executor.realize(form, scope)?);
    }
    last.ok_or_else(|| ParseError::UnexpectedEof("an expression".to_string()).into())
}
