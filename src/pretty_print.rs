use crate::{Error, EvalError, LexerError, ParseError, ScopeError, Span};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

pub type Diagnostic<'a> = Report<'a, (&'a str, Range<usize>)>;

fn labelled<'a>(id: &'a str, span: Span, message: String, label: String) -> Diagnostic<'a> {
    Report::build(ReportKind::Error, (id, span.to_range()))
        .with_message(message)
        .with_label(Label::new((id, span.to_range())).with_message(label))
        .finish()
}

impl LexerError {
    pub fn report<'a>(&self, id: &'a str) -> Diagnostic<'a> {
        labelled(
            id,
            self.span,
            "Lexer Error".to_string(),
            self.error.to_string(),
        )
    }
}

impl ParseError {
    pub fn report<'a>(&self, id: &'a str, input: &str) -> Diagnostic<'a> {
        match self {
            ParseError::UnexpectedToken { found, expected } => labelled(
                id,
                found.span,
                format!("Unexpected token: {}", found.text),
                format!("Expected {expected}"),
            ),
            ParseError::UnexpectedEof(expected) => {
                let idx = input.len();
                labelled(
                    id,
                    Span::new(idx, idx),
                    "Unexpected EOF".to_string(),
                    format!("Expected {expected}"),
                )
            }
            ParseError::UnclosedDelimiter { open } => labelled(
                id,
                open.span,
                format!("Unclosed '{}'", open.text),
                "This delimiter is never closed".to_string(),
            ),
            ParseError::EmptyExpression(span) => labelled(
                id,
                *span,
                "Empty expression".to_string(),
                "An expression needs a head".to_string(),
            ),
            ParseError::InvalidForm {
                form,
                message,
                span,
            } => labelled(
                id,
                *span,
                format!("Invalid '{}' form", form.name()),
                message.clone(),
            ),
        }
    }
}

impl EvalError {
    pub fn report<'a>(&self, id: &'a str) -> Diagnostic<'a> {
        let span = self.span();
        match self {
            EvalError::Scope(ScopeError::UnboundSymbol(symbol, _)) => labelled(
                id,
                span,
                format!("Unbound symbol `{}`", symbol),
                "This symbol is not defined in the current scope".to_string(),
            ),
            EvalError::NotAFunction { found, .. } => labelled(
                id,
                span,
                format!("Not a function: {}", found),
                format!("This evaluates to a {}, which cannot be called", found.type_name()),
            ),
            EvalError::TypeMismatch {
                context,
                expected,
                found,
                ..
            } => labelled(
                id,
                span,
                format!("Type mismatch in {}", context),
                format!("Expected {}, found {}", expected, found.type_name()),
            ),
            EvalError::Arity {
                name,
                expected,
                found,
                ..
            } => labelled(
                id,
                span,
                format!("Wrong number of arguments to `{}`", name),
                format!("Expected {} arguments, got {}", expected, found),
            ),
            EvalError::InvalidArguments(message, _) => labelled(
                id,
                span,
                "Invalid arguments:".to_string(),
                message.clone(),
            ),
            EvalError::Output(message, _) => labelled(
                id,
                span,
                "Output error".to_string(),
                message.clone(),
            ),
        }
    }
}

impl Error {
    pub fn report<'a>(&self, id: &'a str, input: &str) -> Diagnostic<'a> {
        match self {
            Error::Lexer(e) => e.report(id),
            Error::Parse(e) => e.report(id, input),
            Error::Eval(e) => e.report(id),
        }
    }

    /// Renders the error against `input` on stderr.
    pub fn pretty_print(&self, id: &str, input: &str) -> io::Result<()> {
        self.report(id, input).eprint((id, Source::from(input)))
    }
}

#[cfg(test)]
mod tests {
    use crate::scope::Scope;
    use crate::{Error, evaluate_with_output, parse_str};

    fn render(error: &Error, input: &str) -> String {
        let mut buffer = Vec::new();
        error
            .report("test", input)
            .write(("test", ariadne::Source::from(input)), &mut buffer)
            .expect("report should render");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    #[test]
    fn test_renders_every_stage() {
        let lex = parse_str("(print \"oops").unwrap_err();
        assert!(render(&lex, "(print \"oops").contains("Lexer Error"));

        let parse = parse_str("(if true 1)").unwrap_err();
        assert!(render(&parse, "(if true 1)").contains("Invalid 'if' form"));

        let eof = evaluate_with_output("", &Scope::new_global(), &mut Vec::new()).unwrap_err();
        assert!(render(&eof, "").contains("Unexpected EOF"));

        let input = "(+ 1 missing)";
        let eval = evaluate_with_output(input, &Scope::new_global(), &mut Vec::new()).unwrap_err();
        let rendered = render(&eval, input);
        assert!(rendered.contains("Unbound symbol `missing`"));
    }
}
