use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// Raw lexemes recognised by logos. Words are classified into numbers,
/// booleans, keywords and identifiers afterwards.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")] // Skip whitespace
#[logos(error = LexerErrorKind)]
enum Lexeme {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
    // Same as String minus the closing quote; only wins when there is none.
    #[regex(r#""([^"\\]|\\.)*"#)]
    UnterminatedString,
    #[regex(r#"[^ \t\n\r\f()\[\]"]+"#)]
    Word,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Number,
    String,
    Boolean,
    Identifier,
    Let,
    If,
    Fun,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(self, TokenKind::Let | TokenKind::If | TokenKind::Fun)
    }

    fn classify(word: &str) -> TokenKind {
        // Narrower than "anything `f32::from_str` accepts": that would also
        // take "inf", "infinity" and "nan", which stay identifiers here.
        if word.bytes().any(|b| b.is_ascii_digit()) && word.parse::<f32>().is_ok() {
            TokenKind::Number
        } else if word.eq_ignore_ascii_case("if") {
            TokenKind::If
        } else if word.eq_ignore_ascii_case("let") {
            TokenKind::Let
        } else if word.eq_ignore_ascii_case("fun") {
            TokenKind::Fun
        } else if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") {
            TokenKind::Boolean
        } else {
            TokenKind::Identifier
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Boolean => "boolean",
            TokenKind::Identifier => "identifier",
            TokenKind::Let => "keyword 'let'",
            TokenKind::If => "keyword 'if'",
            TokenKind::Fun => "keyword 'fun'",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Byte offset of the first character of the token.
    pub fn position(&self) -> usize {
        self.span.start
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub(crate) mod unescape {
    /// Decodes the body of a STRING token. The token text still carries its
    /// surrounding quotes. Unknown escapes are kept verbatim.
    pub fn unescape(text: &str) -> String {
        let body = text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(text);
        let mut result = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => result.push('\\'),
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    /// Inverse of `unescape`, producing a quoted literal.
    pub fn escape(value: &str) -> String {
        let mut acc = String::with_capacity(value.len() + 2);
        acc.push('"');
        for c in value.chars() {
            match c {
                '"' => acc.push_str("\\\""),
                '\\' => acc.push_str("\\\\"),
                '\n' => acc.push_str("\\n"),
                '\r' => acc.push_str("\\r"),
                '\t' => acc.push_str("\\t"),
                c => acc.push(c),
            }
        }
        acc.push('"');
        acc
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[default]
    #[error("Invalid Token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
pub type LexerResult<T> = Result<T, LexerError>;

/// Scans `input` into a flat token sequence. Fails on the first malformed
/// token; no partial token list is returned.
pub fn tokenize(input: &str) -> LexerResult<Vec<Token>> {
    Lexeme::lexer(input)
        .spanned()
        .map(|(result, range)| {
            let span = Span::new(range.start, range.end);
            let text = &input[range];
            let kind = match result {
                Ok(Lexeme::LParen) => TokenKind::LParen,
                Ok(Lexeme::RParen) => TokenKind::RParen,
                Ok(Lexeme::LBracket) => TokenKind::LBracket,
                Ok(Lexeme::RBracket) => TokenKind::RBracket,
                Ok(Lexeme::String) => TokenKind::String,
                Ok(Lexeme::Word) => TokenKind::classify(text),
                Ok(Lexeme::UnterminatedString) => {
                    return Err(LexerError {
                        error: LexerErrorKind::UnterminatedString,
                        span,
                    });
                }
                Err(error) => return Err(LexerError { error, span }),
            };
            Ok(Token {
                text: text.to_string(),
                kind,
                span,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        match tokenize(input) {
            Ok(tokens) => {
                let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
                assert_eq!(kinds, expected, "Input: '{}'", input);
            }
            Err(e) => panic!("Lexing failed for input '{}': {}", input, e.error),
        }
    }

    // Helper to simplify testing for lexer errors
    fn assert_lexer_error(input: &str, expected_error_variant: LexerErrorKind) {
        match tokenize(input) {
            Ok(tokens) => panic!(
                "Expected lexing to fail for input '{}', but got tokens: {:?}",
                input, tokens
            ),
            Err(e) => {
                assert_eq!(
                    std::mem::discriminant(&e.error),
                    std::mem::discriminant(&expected_error_variant),
                    "Input: '{}', Expected error variant like {:?}, got: {:?}",
                    input,
                    expected_error_variant,
                    e
                );
            }
        }
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .expect("Should tokenize successfully")
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        assert_tokens("  \n\t ", vec![]);
    }

    #[test]
    fn test_punctuation() {
        assert_tokens(
            "( ) [ ]",
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
            ],
        );
        assert_tokens(
            "([])",
            vec![
                TokenKind::LParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::RParen,
            ],
        );
    }

    #[test]
    fn test_numbers() {
        assert_tokens("123", vec![TokenKind::Number]);
        assert_tokens("-45", vec![TokenKind::Number]);
        assert_tokens("6.78", vec![TokenKind::Number]);
        assert_tokens(".5", vec![TokenKind::Number]);
        assert_tokens("+10", vec![TokenKind::Number]);
        assert_tokens("-1e-5", vec![TokenKind::Number]);
    }

    #[test]
    fn test_number_like_identifiers() {
        assert_tokens("1-2", vec![TokenKind::Identifier]);
        assert_tokens("1.2.3", vec![TokenKind::Identifier]);
        assert_tokens("1e", vec![TokenKind::Identifier]);
        assert_tokens("-", vec![TokenKind::Identifier]);
        assert_tokens("inf", vec![TokenKind::Identifier]);
        assert_tokens("NaN", vec![TokenKind::Identifier]);
        assert_tokens("infinity", vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_tokens(
            "if IF let Let fun FUN",
            vec![
                TokenKind::If,
                TokenKind::If,
                TokenKind::Let,
                TokenKind::Let,
                TokenKind::Fun,
                TokenKind::Fun,
            ],
        );
        assert_tokens("iffy", vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_booleans() {
        assert_tokens(
            "true false TRUE False",
            vec![
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Boolean,
            ],
        );
        assert_tokens("truthy", vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_identifiers_accept_arbitrary_text() {
        assert_tokens(
            "+ car a-b 🍕 #<x> ;",
            vec![TokenKind::Identifier; 6],
        );
    }

    #[test]
    fn test_strings_keep_quotes() {
        assert_tokens(r#""hello""#, vec![TokenKind::String]);
        assert_eq!(texts(r#""with space""#), vec![r#""with space""#]);
        assert_eq!(texts(r#""esc \" q""#), vec![r#""esc \" q""#]);
        assert_eq!(texts(r#"("a"b)"#), vec!["(", r#""a""#, "b", ")"]);
    }

    #[test]
    fn test_sequences_and_whitespace() {
        assert_tokens(
            "(+ 1 2)",
            vec![
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::RParen,
            ],
        );
        assert_eq!(
            texts("  ( fun f [a b] (+ a b) )  "),
            vec!["(", "fun", "f", "[", "a", "b", "]", "(", "+", "a", "b", ")", ")"]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_lexer_error(r#""hello"#, LexerErrorKind::UnterminatedString);
        assert_lexer_error(r#""hello\""#, LexerErrorKind::UnterminatedString);
        assert_lexer_error(r#"(print "x)"#, LexerErrorKind::UnterminatedString);
        assert_lexer_error(r#"""#, LexerErrorKind::UnterminatedString);
    }

    #[test]
    fn test_unterminated_string_span() {
        let err = tokenize(r#"(a "bc"#).unwrap_err();
        assert_eq!(err.span.start, 3);
        assert_eq!(err.error, LexerErrorKind::UnterminatedString);
    }

    #[test]
    fn test_tokenize_positions() {
        let input = "(+ 1)";
        let tokens = tokenize(input).expect("Should tokenize successfully");

        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].position(), 0);
        assert_eq!(tokens[1].span, Span { start: 1, end: 2 });
        assert_eq!(tokens[2].position(), 3);
        assert_eq!(tokens[3].span, Span { start: 4, end: 5 });
    }

    #[test]
    fn test_unescape_and_escape() {
        assert_eq!(unescape::unescape(r#""a\"b\n\\""#), "a\"b\n\\");
        assert_eq!(unescape::unescape(r#""keep \q""#), "keep \\q");
        assert_eq!(unescape::escape("a\"b\n"), r#""a\"b\n""#);
    }
}
