use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use edible::{TokenKind, Value, evaluate_str, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = "edible_history.txt";

// The path typed so far before the cursor, e.g. `$.server.po` gives
// (["server"], "po"). Only absolute references are completed.
fn reference_before_cursor(tokens: &[TokenKind]) -> Option<(Vec<String>, String)> {
    let (prefix, end) = match tokens {
        [.., TokenKind::Dot | TokenKind::Dollar, TokenKind::Ident(prefix)] => {
            (prefix.clone(), tokens.len() - 1)
        }
        [.., TokenKind::Dot | TokenKind::Dollar] => (String::new(), tokens.len()),
        _ => return None,
    };

    // tokens[i - 1] is always the `.` or `$` in front of the next key
    let mut i = end;
    let mut keys = Vec::new();
    loop {
        match tokens.get(i.checked_sub(1)?)? {
            TokenKind::Dollar => break,
            TokenKind::Dot => {
                i -= 1;
                match tokens.get(i.checked_sub(1)?)? {
                    TokenKind::Ident(key) => {
                        keys.push(key.clone());
                        i -= 1;
                    }
                    TokenKind::Dollar => break,
                    _ => return None,
                }
            }
            _ => return None,
        }
    }
    keys.reverse();
    Some((keys, prefix))
}

struct EdibleCompleter {
    // The most recent successfully evaluated document
    last: Rc<RefCell<Option<Value>>>,
}

impl rustyline::completion::Completer for EdibleCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let Ok(tokens) = tokenize(&line[..pos]) else {
            return Ok((pos, vec![]));
        };
        let kinds: Vec<TokenKind> = tokens
            .into_iter()
            .map(|t| t.kind)
            .filter(|kind| {
                !matches!(
                    kind,
                    TokenKind::Eof
                        | TokenKind::OpenBlock
                        | TokenKind::CloseBlock
                        | TokenKind::Newline
                )
            })
            .collect();
        let Some((keys, prefix)) = reference_before_cursor(&kinds) else {
            return Ok((pos, vec![]));
        };

        let last = self.last.borrow();
        let mut table = last.as_ref();
        for key in &keys {
            table = table.and_then(|value| value.get(key));
        }
        let candidates: Vec<String> = match table {
            Some(Value::Table(entries)) => entries
                .keys()
                .filter(|key| key.starts_with(&prefix) && edible::value::is_identifier(key))
                .cloned()
                .collect(),
            _ => vec![],
        };
        Ok((pos - prefix.len(), candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: EdibleValidator,
    #[rustyline(Highlighter)]
    highlighter: EdibleHighlighter,
    #[rustyline(Completer)]
    completer: EdibleCompleter,
}

struct EdibleValidator;

impl Validator for EdibleValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let mut stack = Vec::new();
        let mut in_string = false;
        let mut escape = false;
        let mut in_comment = false;

        for (i, c) in input.char_indices() {
            if in_comment {
                in_comment = c != '\n';
                continue;
            }
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' || c == '\n' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '#' => in_comment = true,
                '"' => in_string = true,
                '(' | '[' | '{' => stack.push((c, i)),
                ')' | ']' | '}' => {
                    let matched = matches!(
                        (stack.pop(), c),
                        (Some(('(', _)), ')') | (Some(('[', _)), ']') | (Some(('{', _)), '}')
                    );
                    if !matched {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            c, i
                        ))));
                    }
                }
                _ => {}
            }
        }

        if in_string || !stack.is_empty() {
            return Ok(ValidationResult::Incomplete);
        }

        // Indented documents are finished with an empty line
        let last_line = input.rsplit('\n').next().unwrap_or("");
        let opens_block = last_line.trim_end().ends_with(':') || last_line.starts_with('-');
        let continues_block = input.contains('\n') && !last_line.trim().is_empty();
        if opens_block || continues_block {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct EdibleHighlighter;

impl Highlighter for EdibleHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;
        let mut escape = false;

        for (i, c) in line.char_indices() {
            if in_string {
                if escape {
                    escape = false;
                } else if c == '\\' {
                    escape = true;
                } else if c == '"' {
                    in_string = false;
                }
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // Green for strings
                continue;
            }

            match c {
                '"' => {
                    in_string = true;
                    highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c));
                }
                '$' => highlighted.push_str(&format!("\x1b[36m{}\x1b[0m", c)), // Cyan for references
                '(' | '[' | '{' => {
                    stack.push((c, highlighted.len(), i));
                    highlighted.push(c);
                }
                ')' | ']' | '}' => match stack.pop() {
                    Some((opening, matching_pos, opening_index)) => {
                        let matched = matches!((opening, c), ('(', ')') | ('[', ']') | ('{', '}'));
                        let color = if !matched {
                            Some("31") // Red for mismatched brackets
                        } else if pos == opening_index + 1 || pos == i + 1 {
                            Some("34") // Blue for the pair at the cursor
                        } else {
                            None
                        };
                        match color {
                            Some(color) => {
                                highlighted.push_str(&format!("\x1b[{}m{}\x1b[0m", color, c));
                                highlighted.replace_range(
                                    matching_pos..matching_pos + 1,
                                    &format!("\x1b[1;{}m{}\x1b[0m", color, opening),
                                );
                            }
                            None => highlighted.push(c),
                        }
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
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("edible REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit. Finish indented documents with an empty line.");

    let last = Rc::new(RefCell::new(None));
    let h = InputValidator {
        highlighter: EdibleHighlighter,
        validator: EdibleValidator,
        completer: EdibleCompleter { last: last.clone() },
    };
    let mut rl = Editor::new()?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("edible> ") {
            Ok(input) => {
                rl.add_history_entry(input.as_str())?;
                if input.trim().is_empty() {
                    continue;
                }
                if input.trim().eq_ignore_ascii_case("exit") {
                    break;
                }

                match evaluate_str(&input) {
                    Ok(value) => {
                        println!("{}", value);
                        *last.borrow_mut() = Some(value);
                    }
                    Err(errors) => {
                        for error in errors {
                            if error.pretty_print("REPL", &input).is_err() {
                                eprintln!("Error: {}", error);
                            }
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
