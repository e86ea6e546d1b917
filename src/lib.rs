// Declare modules publicly so they are part of the library interface
pub mod ast;
pub mod config;
pub mod evaluator;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod scope;
pub mod source;
pub mod value;

pub use ast::{Expression, Node, Part};
pub use evaluator::{EvalError, EvalResult, Executor, evaluate, evaluate_in_new_scope, evaluate_with_output};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{ParseError, parse, parse_single, parse_str};
pub use scope::{Scope, ScopeError, ScopeRef};
pub use source::Span;
pub use value::{Function, Value};

use thiserror::Error;

/// Any failure of the tokenize → parse → evaluate pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Lexer Error: {0}")]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lexer(e) => Some(e.span),
            Error::Parse(e) => e.span(),
            Error::Eval(e) => Some(e.span()),
        }
    }
}
