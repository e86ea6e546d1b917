use std::borrow::Cow;
use std::collections::HashSet;

use klisp::ast::Keyword;
use klisp::config::{EditMode, ReplConfig};
use klisp::logging::init_tracing;
use klisp::{Scope, ScopeRef, TokenKind, evaluate, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tracing::warn;

struct KlispCompleter {
    scope: ScopeRef,
}

impl KlispCompleter {
    fn new(scope: ScopeRef) -> Self {
        KlispCompleter { scope }
    }

    fn candidates(&self) -> HashSet<String> {
        let mut names = self.scope.borrow().get_identifiers();
        names.extend(Keyword::ALL.iter().map(|k| k.name().to_string()));
        names
    }
}

impl rustyline::completion::Completer for KlispCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let before = &line[..pos];
        let prefix = match tokenize(before) {
            Ok(tokens) => match tokens.last() {
                Some(token)
                    if token.span.end == pos
                        && (token.kind == TokenKind::Identifier || token.kind.is_keyword()) =>
                {
                    token.text.to_lowercase()
                }
                _ => return Ok((pos, vec![])),
            },
            Err(_) => return Ok((pos, vec![])),
        };
        let mut completions: Vec<String> = self
            .candidates()
            .into_iter()
            .filter(|id| id.starts_with(&prefix) && id.len() > prefix.len())
            .map(|id| id[prefix.len()..].to_string())
            .collect();
        completions.sort();
        Ok((pos, completions))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: KlispValidator,
    #[rustyline(Highlighter)]
    highlighter: KlispHighlighter,
    #[rustyline(Completer)]
    completer: KlispCompleter,
}

fn closes(opening: char, closing: char) -> bool {
    matches!((opening, closing), ('(', ')') | ('[', ']'))
}

struct KlispValidator;

impl Validator for KlispValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escape = false;

        for (i, c) in input.char_indices() {
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '"' => in_string = true,
                '(' | '[' => stack.push(c),
                ')' | ']' => match stack.pop() {
                    Some(opening) if closes(opening, c) => {}
                    _ => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            c, i
                        ))));
                    }
                },
                _ => {}
            }
        }

        if in_string || !stack.is_empty() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct KlispHighlighter;

impl Highlighter for KlispHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;
        let mut escape = false;
        let cursor = pos.checked_sub(1);

        for (i, c) in line.char_indices() {
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // green
                continue;
            }

            match c {
                '"' => {
                    in_string = true;
                    highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c));
                }
                '(' | '[' => {
                    stack.push((c, i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' | ']' => match stack.pop() {
                    Some((opening, source_pos, out_pos)) => {
                        let (close, open) = if !closes(opening, c) {
                            ("\x1b[31m", "\x1b[1;31m") // red
                        } else if cursor == Some(source_pos) || cursor == Some(i) {
                            ("\x1b[34m", "\x1b[1;34m") // blue
                        } else {
                            highlighted.push(c);
                            continue;
                        };
                        highlighted.push_str(&format!("{close}{c}\x1b[0m"));
                        highlighted
                            .replace_range(out_pos..out_pos + 1, &format!("{open}{opening}\x1b[0m"));
                    }
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)),
                },
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    println!("klisp REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let config = ReplConfig::from_env().unwrap_or_else(|e| {
        eprintln!("{e}");
        ReplConfig::default()
    });
    let edit_mode = match config.edit_mode {
        EditMode::Emacs => rustyline::EditMode::Emacs,
        EditMode::Vi => rustyline::EditMode::Vi,
    };

    let root = Scope::new_global();
    let helper = InputValidator {
        highlighter: KlispHighlighter,
        validator: KlispValidator,
        completer: KlispCompleter::new(root.clone()),
    };
    let editor_config = rustyline::config::Config::builder()
        .edit_mode(edit_mode)
        .build();
    let mut rl = Editor::with_config(editor_config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&config.history_file).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline(&config.prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                match evaluate(input, &root) {
                    Ok(value) => println!("{value}"),
                    Err(e) => {
                        if let Err(io_err) = e.pretty_print("repl", input) {
                            warn!(error = %io_err, "failed to render diagnostic");
                            eprintln!("Error: {e}");
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&config.history_file)
}
