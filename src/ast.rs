use crate::lexer::unescape::escape;
use crate::source::Span;
use std::fmt;
use std::rc::Rc;

/// A parsed piece of source together with the span it covers.
///
/// Equality is structural and ignores spans, so a node printed and parsed
/// again compares equal to the original.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: Part, // The actual syntax data
    pub span: Span, // The source span it covers
}

impl Node {
    pub fn new(kind: Part, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn new_number(n: f32, span: Span) -> Self {
        Node::new(Part::Number(n), span)
    }

    pub fn new_string(s: impl Into<String>, span: Span) -> Self {
        Node::new(Part::String(s.into()), span)
    }

    pub fn new_bool(b: bool, span: Span) -> Self {
        Node::new(Part::Boolean(b), span)
    }

    pub fn new_symbol(s: impl Into<String>, span: Span) -> Self {
        Node::new(Part::Symbol(s.into()), span)
    }

    pub fn new_list(items: Vec<Node>, span: Span) -> Self {
        Node::new(Part::List(items), span)
    }

    pub fn new_expression(expression: Expression, span: Span) -> Self {
        Node::new(Part::Expression(Box::new(expression)), span)
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            Part::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// The syntax tree. Keywords never appear as a standalone part: a keyword
/// head is folded into the matching `Expression` variant by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Number(f32),
    String(String),
    Boolean(bool),
    Symbol(String),
    /// Unrealized `[...]` literal list.
    List(Vec<Node>),
    /// Parenthesized form.
    Expression(Box<Expression>),
}

impl Part {
    pub fn type_name(&self) -> &'static str {
        match self {
            Part::Number(_) => "number",
            Part::String(_) => "string",
            Part::Boolean(_) => "boolean",
            Part::Symbol(_) => "symbol",
            Part::List(_) => "list",
            Part::Expression(_) => "expression",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Number(n) => write!(f, "{:?}", n),
            Part::String(s) => f.write_str(&escape(s)),
            Part::Boolean(b) => write!(f, "{}", b),
            Part::Symbol(s) => f.write_str(s),
            Part::List(items) => {
                write!(f, "[")?;
                write_spaced(f, items)?;
                write!(f, "]")
            }
            Part::Expression(expression) => write!(f, "{}", expression),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    If,
    Fun,
}

impl Keyword {
    pub const ALL: [Keyword; 3] = [Keyword::Let, Keyword::If, Keyword::Fun];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::If => "if",
            Keyword::Fun => "fun",
        }
    }
}

/// A parenthesized form, already specialized by its head.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Function application: `(head tail...)`.
    Call { head: Node, tail: Vec<Node> },
    Let(LetBinding),
    If(IfExpression),
    Fun(FunctionDefinition),
}

impl Expression {
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Expression::Call { .. } => None,
            Expression::Let(_) => Some(Keyword::Let),
            Expression::If(_) => Some(Keyword::If),
            Expression::Fun(_) => Some(Keyword::Fun),
        }
    }
}

/// `(let ((name value)...) body)`
#[derive(Debug, Clone, PartialEq)]
pub struct LetBinding {
    pub bindings: Vec<(String, Node)>,
    pub body: Node,
}

/// `(if predicate then else)`. The parser always fills `otherwise`; a missing
/// branch realizes to `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub predicate: Node,
    pub then: Node,
    pub otherwise: Option<Node>,
}

/// `(fun name [params...] body)`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Call { head, tail } => {
                write!(f, "({}", head)?;
                for node in tail {
                    write!(f, " {}", node)?;
                }
                write!(f, ")")
            }
            Expression::Let(LetBinding { bindings, body }) => {
                write!(f, "(let (")?;
                for (i, (name, value)) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} {})", name, value)?;
                }
                write!(f, ") {})", body)
            }
            Expression::If(IfExpression {
                predicate,
                then,
                otherwise,
            }) => {
                write!(f, "(if {} {}", predicate, then)?;
                if let Some(otherwise) = otherwise {
                    write!(f, " {}", otherwise)?;
                }
                write!(f, ")")
            }
            Expression::Fun(FunctionDefinition { name, params, body }) => {
                write!(f, "(fun {} [{}] {})", name, params.join(" "), body)
            }
        }
    }
}

pub(crate) fn write_spaced<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    let mut first = true;
    for item in items {
        if !first {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
        first = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Node {
        Node::new_symbol(s, Span::default())
    }

    fn num(n: f32) -> Node {
        Node::new_number(n, Span::default())
    }

    #[test]
    fn test_equality_ignores_spans() {
        assert_eq!(Node::new_number(1.0, Span::new(0, 1)), Node::new_number(1.0, Span::new(7, 8)));
        assert_ne!(num(1.0), num(2.0));
    }

    #[test]
    fn test_display_leaves() {
        assert_eq!(num(4.0).to_string(), "4.0");
        assert_eq!(num(2.5).to_string(), "2.5");
        assert_eq!(Node::new_string("a \"b\"", Span::default()).to_string(), r#""a \"b\"""#);
        assert_eq!(Node::new_bool(true, Span::default()).to_string(), "true");
        assert_eq!(Node::new_list(vec![num(1.0), sym("x")], Span::default()).to_string(), "[1.0 x]");
    }

    #[test]
    fn test_display_forms() {
        let call = Expression::Call {
            head: sym("+"),
            tail: vec![num(1.0), num(2.0)],
        };
        assert_eq!(call.to_string(), "(+ 1.0 2.0)");

        let let_form = Expression::Let(LetBinding {
            bindings: vec![("x".into(), num(1.0)), ("y".into(), num(2.0))],
            body: sym("x"),
        });
        assert_eq!(let_form.to_string(), "(let ((x 1.0) (y 2.0)) x)");

        let if_form = Expression::If(IfExpression {
            predicate: sym("p"),
            then: num(1.0),
            otherwise: None,
        });
        assert_eq!(if_form.to_string(), "(if p 1.0)");

        let fun = Expression::Fun(FunctionDefinition {
            name: "f".into(),
            params: vec!["a".into(), "b".into()],
            body: Rc::new(sym("a")),
        });
        assert_eq!(fun.to_string(), "(fun f [a b] a)");
        assert_eq!(fun.keyword(), Some(Keyword::Fun));
    }
}
