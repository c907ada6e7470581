use crate::{Error, EvalError, LexerError, MAX_NESTING, ParseError};
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

type Diagnostic<'a> = Report<'a, (&'a str, Range<usize>)>;

impl LexerError {
    pub fn report<'a>(&self, name: &'a str) -> Diagnostic<'a> {
        Report::build(ReportKind::Error, (name, self.span.to_range()))
            .with_message("Lexer Error")
            .with_label(
                Label::new((name, self.span.to_range())).with_message(self.error.to_string()),
            )
            .finish()
    }
}

impl ParseError {
    pub fn report<'a>(&self, name: &'a str) -> Diagnostic<'a> {
        match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, (name, found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new((name, found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
                    .finish()
            }
            ParseError::UnexpectedEof { expected, span } => {
                Report::build(ReportKind::Error, (name, span.to_range()))
                    .with_message("Unexpected end of input")
                    .with_label(
                        Label::new((name, span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
                    .finish()
            }
            ParseError::NestingTooDeep(span) => {
                Report::build(ReportKind::Error, (name, span.to_range()))
                    .with_message("Nesting is too deep")
                    .with_label(
                        Label::new((name, span.to_range()))
                            .with_message(format!("More than {MAX_NESTING} levels deep here")),
                    )
                    .finish()
            }
            ParseError::LexerError(lex_err) => lex_err.report(name),
        }
    }
}

impl EvalError {
    // The label explains what was wrong at the offending span.
    fn label(&self) -> String {
        match self {
            EvalError::ExpectStringKey { found, .. } => {
                format!("This key is a {found}, table keys must be strings")
            }
            EvalError::ExpectIntegerIndex { found, .. } => {
                format!("This index is a {found}, arrays are indexed by integers")
            }
            EvalError::ExpectArrayOrTable { found, .. } => {
                format!("The value before this key is a {found}")
            }
            EvalError::ExpectTableParent { found, .. } => format!("This is a {found}"),
            EvalError::ExpectTableValue { found, .. } => format!("This is a {found}"),
            EvalError::ExpectNumeric { found, .. } => {
                format!("This is a {found}, not a number")
            }
            EvalError::KeyNotFound { key, .. } => format!("No entry named '{key}'"),
            EvalError::IndexOutOfBounds { len, .. } => {
                format!("Valid indexes are 0 to {}", len.saturating_sub(1))
            }
            EvalError::DuplicateKey { .. } => "Declared again here".to_string(),
            EvalError::CyclicReference(_) => "This value depends on itself".to_string(),
            EvalError::NoEnclosingTable(_) => {
                "'.' refers to the enclosing table, but there is none".to_string()
            }
            EvalError::DivisionByZero(_) => "This divisor is zero".to_string(),
            EvalError::RecursionLimit { .. } => "Gave up resolving here".to_string(),
            EvalError::UnresolvedExpression(_) => {
                "This expression was never evaluated".to_string()
            }
        }
    }

    pub fn report<'a>(&self, name: &'a str) -> Diagnostic<'a> {
        let span = self.span();
        let mut builder = Report::build(ReportKind::Error, (name, span.to_range()))
            .with_message(self.to_string())
            .with_label(Label::new((name, span.to_range())).with_message(self.label()));

        if let EvalError::DuplicateKey { first, .. } = self {
            builder = builder.with_label(
                Label::new((name, first.to_range())).with_message("First declared here"),
            );
        }
        builder.finish()
    }
}

impl Error {
    pub fn report<'a>(&self, name: &'a str) -> Diagnostic<'a> {
        match self {
            Error::Lex(e) => e.report(name),
            Error::Parse(e) => e.report(name),
            Error::Eval(e) => e.report(name),
        }
    }

    /// Writes the error with an excerpt of `input` to `out`. `name` labels
    /// the source, usually a file path.
    pub fn write_report<W: io::Write>(&self, name: &str, input: &str, out: W) -> io::Result<()> {
        self.report(name).write((name, Source::from(input)), out)
    }

    pub fn pretty_print(&self, name: &str, input: &str) -> io::Result<()> {
        self.write_report(name, input, io::stderr())
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluate_str;

    // Renders every error of a failing document the way the CLI would
    fn render(input: &str) -> String {
        let errors = match evaluate_str(input) {
            Ok(value) => panic!("Expected input '{}' to fail, got {}", input, value),
            Err(errors) => errors,
        };
        let mut out = Vec::new();
        for error in errors {
            error
                .write_report("test.edible", input, &mut out)
                .expect("Writing to a Vec should not fail");
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_report_eval_error() {
        let output = render("a: {}\nb: $.a.missing");
        assert!(output.contains("Key 'missing' not found"), "{}", output);
        assert!(output.contains("No entry named 'missing'"), "{}", output);
        assert!(output.contains("test.edible"), "{}", output);
    }

    #[test]
    fn test_report_duplicate_key_labels_both() {
        let output = render("a: 1\na: 2");
        assert!(output.contains("Declared again here"), "{}", output);
        assert!(output.contains("First declared here"), "{}", output);
    }

    #[test]
    fn test_report_nesting_limits() {
        let output = render(&"[".repeat(500));
        assert!(output.contains("Nesting is too deep"), "{}", output);

        let chain: String = (0..500).map(|i| format!("a{i}: $.a{}\n", i + 1)).collect();
        let output = render(&format!("{chain}a500: 1"));
        assert!(output.contains("Evaluation nested more than"), "{}", output);
    }

    #[test]
    fn test_report_parse_and_lexer_errors() {
        let output = render("a: [1,");
        assert!(output.contains("Unexpected end of input"), "{}", output);

        let output = render("a: ^");
        assert!(output.contains("Invalid token"), "{}", output);
    }
}
