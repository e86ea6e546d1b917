use crate::ast::{Expression, FunctionDefinition, IfExpression, Keyword, LetBinding, Node, Part};
use crate::lexer::{Token, TokenKind, unescape::unescape};
use crate::source::Span;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse Error [at {}]: Unexpected token '{}', expected {expected}", .found.span, .found.text)]
    UnexpectedToken { found: Token, expected: String },
    #[error("Parse Error: Unexpected end of input. Expected {0}")]
    UnexpectedEof(String),
    #[error("Parse Error [at {}]: '{}' is never closed", .open.span, .open.text)]
    UnclosedDelimiter { open: Token },
    #[error("Parse Error [at {0}]: Empty expression '()'")]
    EmptyExpression(Span),
    #[error("Parse Error [at {span}]: Malformed '{}' form: {message}", .form.name())]
    InvalidForm {
        form: Keyword,
        message: String,
        span: Span,
    },
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::UnexpectedToken { found, .. } => Some(found.span),
            ParseError::UnexpectedEof(_) => None,
            ParseError::UnclosedDelimiter { open } => Some(open.span),
            ParseError::EmptyExpression(span) => Some(*span),
            ParseError::InvalidForm { span, .. } => Some(*span),
        }
    }
}

// Result type alias for convenience
pub type ParseResult<T> = Result<T, ParseError>;

fn unexpected<T>(found: &Token, expected: &str) -> ParseResult<T> {
    Err(ParseError::UnexpectedToken {
        found: found.clone(),
        expected: expected.to_string(),
    })
}

fn invalid_form<T>(form: Keyword, message: String, span: Span) -> ParseResult<T> {
    Err(ParseError::InvalidForm {
        form,
        message,
        span,
    })
}

fn span_of(tokens: &[Token]) -> Span {
    match tokens {
        [first, .., last] => first.span.merge(last.span),
        [only] => only.span,
        [] => Span::default(),
    }
}

/// Finds the index of the token closing the span opened by `tokens[0]`.
/// Only `open`/`close` kinds move the balance counter.
fn matching_end(tokens: &[Token], open: TokenKind, close: TokenKind) -> ParseResult<usize> {
    let mut balance = 1usize;
    for (index, token) in tokens.iter().enumerate().skip(1) {
        if token.kind == open {
            balance += 1;
        } else if token.kind == close {
            balance -= 1;
            if balance == 0 {
                return Ok(index);
            }
        }
    }
    Err(ParseError::UnclosedDelimiter {
        open: tokens[0].clone(),
    })
}

/// Parses every top-level form in `tokens`. Each balanced `(...)` span at
/// depth 0 is parsed independently; bare atoms and `[...]` lists are
/// accepted as top-level forms too.
pub fn parse(tokens: &[Token]) -> ParseResult<Vec<Node>> {
    let mut forms = Vec::new();
    let mut rest = tokens;
    while !rest.is_empty() {
        let (node, consumed) = parse_part(rest, "a top-level form")?;
        forms.push(node);
        rest = &rest[consumed..];
    }
    Ok(forms)
}

/// Parses one balanced parenthesized form spanning all of `tokens`.
pub fn parse_single(tokens: &[Token]) -> ParseResult<Node> {
    let Some(first) = tokens.first() else {
        return Err(ParseError::UnexpectedEof("'('".to_string()));
    };
    if first.kind != TokenKind::LParen {
        return unexpected(first, "'('");
    }
    let end = matching_end(tokens, TokenKind::LParen, TokenKind::RParen)?;
    if let Some(extra) = tokens.get(end + 1) {
        return unexpected(extra, "end of expression");
    }

    let span = span_of(tokens);
    let inner = &tokens[1..end];
    let Some(head_token) = inner.first() else {
        return Err(ParseError::EmptyExpression(span));
    };

    let expression = match head_token.kind {
        TokenKind::Let => parse_let(&inner[1..], span)?,
        TokenKind::If => parse_if(&inner[1..], span)?,
        TokenKind::Fun => parse_fun(&inner[1..], span)?,
        TokenKind::LParen | TokenKind::Identifier => {
            let (head, consumed) = parse_part(inner, "a head")?;
            let tail = parse_tail(&inner[consumed..])?;
            Expression::Call { head, tail }
        }
        _ => {
            return unexpected(head_token, "an identifier, keyword or '(' in head position");
        }
    };
    Ok(Node::new_expression(expression, span))
}

/// Parses the part starting at `tokens[0]`, returning it with the number of
/// tokens consumed. Keywords are rejected: they are only valid as heads.
fn parse_part(tokens: &[Token], expected: &str) -> ParseResult<(Node, usize)> {
    let Some(token) = tokens.first() else {
        return Err(ParseError::UnexpectedEof(expected.to_string()));
    };
    match token.kind {
        TokenKind::LParen => {
            let end = matching_end(tokens, TokenKind::LParen, TokenKind::RParen)?;
            Ok((parse_single(&tokens[..=end])?, end + 1))
        }
        TokenKind::LBracket => {
            let end = matching_end(tokens, TokenKind::LBracket, TokenKind::RBracket)?;
            Ok((parse_list(&tokens[..=end])?, end + 1))
        }
        TokenKind::Number | TokenKind::String | TokenKind::Boolean | TokenKind::Identifier => {
            Ok((parse_simple(token)?, 1))
        }
        TokenKind::RParen | TokenKind::RBracket | TokenKind::Let | TokenKind::If | TokenKind::Fun => {
            unexpected(token, expected)
        }
    }
}

fn parse_tail(tokens: &[Token]) -> ParseResult<Vec<Node>> {
    let mut tail = Vec::new();
    let mut rest = tokens;
    while !rest.is_empty() {
        let (node, consumed) = parse_part(rest, "an argument")?;
        tail.push(node);
        rest = &rest[consumed..];
    }
    Ok(tail)
}

/// `[...]` spanning all of `tokens`.
fn parse_list(tokens: &[Token]) -> ParseResult<Node> {
    let inner = &tokens[1..tokens.len() - 1];
    let mut items = Vec::new();
    let mut rest = inner;
    while !rest.is_empty() {
        let (node, consumed) = parse_part(rest, "a list element")?;
        items.push(node);
        rest = &rest[consumed..];
    }
    Ok(Node::new_list(items, span_of(tokens)))
}

/// Parses an atomic part (symbol, number, boolean, string).
fn parse_simple(token: &Token) -> ParseResult<Node> {
    let kind = match token.kind {
        TokenKind::Number => match token.text.parse::<f32>() {
            Ok(n) => Part::Number(n),
            Err(_) => return unexpected(token, "a number"),
        },
        TokenKind::String => Part::String(unescape(&token.text)),
        TokenKind::Boolean => Part::Boolean(token.text.eq_ignore_ascii_case("true")),
        TokenKind::Identifier => Part::Symbol(token.text.clone()),
        _ => return unexpected(token, "an atom (symbol, number, boolean, string)"),
    };
    Ok(Node::new(kind, token.span))
}

fn parse_if(tokens: &[Token], span: Span) -> ParseResult<Expression> {
    let tail = parse_tail(tokens)?;
    let count = tail.len();
    let Ok([predicate, then, otherwise]) = <[Node; 3]>::try_from(tail) else {
        return invalid_form(
            Keyword::If,
            format!("expected a predicate, a true branch and a false branch, found {count} parts"),
            span,
        );
    };
    Ok(Expression::If(IfExpression {
        predicate,
        then,
        otherwise: Some(otherwise),
    }))
}

fn parse_fun(tokens: &[Token], span: Span) -> ParseResult<Expression> {
    let mut tail = parse_tail(tokens)?;
    let (name, params, body) = match tail.len() {
        2 => {
            let body = tail.pop();
            let name = tail.pop();
            (name, None, body)
        }
        3 => {
            let body = tail.pop();
            let params = tail.pop();
            let name = tail.pop();
            (name, params, body)
        }
        count => {
            return invalid_form(
                Keyword::Fun,
                format!("expected a name, an optional parameter list and a body, found {count} parts"),
                span,
            );
        }
    };
    let (Some(name), Some(body)) = (name, body) else {
        return invalid_form(Keyword::Fun, "missing name or body".to_string(), span);
    };

    let Some(name) = name.as_symbol().map(str::to_string) else {
        return invalid_form(
            Keyword::Fun,
            format!("function name must be a symbol, found {}", name.kind.type_name()),
            name.span,
        );
    };
    let params = match params {
        Some(node) => parameter_names(&node)?,
        None => Vec::new(),
    };

    Ok(Expression::Fun(FunctionDefinition {
        name,
        params,
        body: Rc::new(body),
    }))
}

/// Accepts `[a b c]` as well as `(a b c)`.
fn parameter_names(node: &Node) -> ParseResult<Vec<String>> {
    let parts: Vec<&Node> = match &node.kind {
        Part::List(items) => items.iter().collect(),
        Part::Expression(expression) => match expression.as_ref() {
            Expression::Call { head, tail } => std::iter::once(head).chain(tail).collect(),
            other => {
                return invalid_form(
                    Keyword::Fun,
                    format!("parameter list may only contain symbols, found '{}'", other),
                    node.span,
                );
            }
        },
        other => {
            return invalid_form(
                Keyword::Fun,
                format!("expected a parameter list, found {}", other.type_name()),
                node.span,
            );
        }
    };

    parts
        .into_iter()
        .map(|part| match part.as_symbol() {
            Some(name) => Ok(name.to_string()),
            None => invalid_form(
                Keyword::Fun,
                format!("parameter list may only contain symbols, found {}", part.kind.type_name()),
                part.span,
            ),
        })
        .collect()
}

fn parse_let(tokens: &[Token], span: Span) -> ParseResult<Expression> {
    let Some(open) = tokens.first() else {
        return invalid_form(
            Keyword::Let,
            "expected a binding list and a body".to_string(),
            span,
        );
    };
    if open.kind != TokenKind::LParen {
        return unexpected(open, "'(' opening the binding list");
    }
    let end = matching_end(tokens, TokenKind::LParen, TokenKind::RParen)?;

    let mut bindings = Vec::new();
    let mut rest = &tokens[1..end];
    while let Some(first) = rest.first() {
        if first.kind != TokenKind::LParen {
            return unexpected(first, "'(' opening a binding");
        }
        let binding_end = matching_end(rest, TokenKind::LParen, TokenKind::RParen)?;
        bindings.push(parse_binding(&rest[..=binding_end])?);
        rest = &rest[binding_end + 1..];
    }

    let mut body = parse_tail(&tokens[end + 1..])?;
    if body.len() != 1 {
        return invalid_form(
            Keyword::Let,
            format!("expected exactly one body expression, found {}", body.len()),
            span,
        );
    }
    let body = body.remove(0);
    Ok(Expression::Let(LetBinding { bindings, body }))
}

/// `(name value)` spanning all of `tokens`.
fn parse_binding(tokens: &[Token]) -> ParseResult<(String, Node)> {
    let inner = &tokens[1..tokens.len() - 1];
    let Some(name) = inner.first() else {
        return Err(ParseError::EmptyExpression(span_of(tokens)));
    };
    if name.kind != TokenKind::Identifier {
        return unexpected(name, "a binding name");
    }
    let value_tokens = &inner[1..];
    if value_tokens.is_empty() {
        return invalid_form(
            Keyword::Let,
            format!("binding '{}' has no value", name.text),
            span_of(tokens),
        );
    }
    let (value, consumed) = parse_part(value_tokens, "a binding value")?;
    if let Some(extra) = value_tokens.get(consumed) {
        return unexpected(extra, "')' closing the binding");
    }
    Ok((name.text.clone(), value))
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> Result<Vec<Node>, crate::Error> {
    let tokens = crate::lexer::tokenize(input)?;
    Ok(parse(&tokens)?)
}
