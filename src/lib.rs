// Declare modules publicly so they are part of the library interface
pub mod arithmetic;
pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod source;
pub mod state;
pub mod value;

use std::time::Instant;
use tracing::debug;

pub use ast::{Expr, ExprKind};
pub use error::Error;
pub use evaluator::{EvalError, Evaluator, evaluate};
pub use lexer::{LexerError, Token, TokenKind, tokenize};
pub use parser::{MAX_NESTING, ParseError, Parser, parse_str};
pub use source::Span;
pub use value::Value;

/// Lexes, parses and evaluates a document. Lexing reports every error it
/// finds; parsing and evaluation stop at the first.
pub fn evaluate_str(input: &str) -> Result<Value, Vec<Error>> {
    let start = Instant::now();
    let tokens = tokenize(input)
        .map_err(|errors| errors.into_iter().map(Error::from).collect::<Vec<_>>())?;
    debug!(tokens = tokens.len(), elapsed_ms = elapsed_ms(start), "lexed");

    let start = Instant::now();
    let document = Parser::new(tokens).parse().map_err(|e| vec![Error::from(e)])?;
    debug!(elapsed_ms = elapsed_ms(start), "parsed");

    let start = Instant::now();
    let value = evaluate(&document).map_err(|e| vec![Error::from(e)])?;
    debug!(elapsed_ms = elapsed_ms(start), "evaluated");

    Ok(value)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to check which stage of the pipeline failed
    fn assert_pipeline_error(input: &str, expected_error_variant: Error) {
        match evaluate_str(input) {
            Ok(value) => panic!("Expected input '{}' to fail, but got: {}", input, value),
            Err(errors) => {
                assert!(!errors.is_empty());
                for error in &errors {
                    assert_eq!(
                        std::mem::discriminant(error),
                        std::mem::discriminant(&expected_error_variant),
                        "Input: '{}', Expected error variant like {:?}, got: {:?}",
                        input,
                        expected_error_variant,
                        errors
                    );
                }
            }
        }
    }

    #[test]
    fn test_evaluate_str() {
        let value = evaluate_str(
            "server:\n  host: \"localhost\"\n  port: 8000 + 80\nreplicas:\n  - $.server\n  - port < $.server:\n      port: 9090",
        )
        .expect("Should evaluate");
        assert_eq!(
            value.to_string(),
            r#"{replicas: [{host: "localhost", port: 8080}, {port: {host: "localhost", port: 9090}}], server: {host: "localhost", port: 8080}}"#
        );
    }

    #[test]
    fn test_evaluate_str_stages() {
        let lex = Error::Lex(LexerError {
            error: lexer::LexerErrorKind::InvalidToken,
            span: Span::default(),
        });
        assert_pipeline_error("a: ^\nb: ~", lex);

        let parse = Error::Parse(ParseError::UnexpectedEof {
            expected: String::new(),
            span: Span::default(),
        });
        assert_pipeline_error("a: [1, 2", parse);

        let eval = Error::Eval(EvalError::CyclicReference(Span::default()));
        assert_pipeline_error("a: $.a", eval);
    }

    #[test]
    fn test_trailing_spaces_after_dash() {
        for input in ["-\n  a: 1\n  b: 2", "- \n  a: 1\n  b: 2", "-    \n  a: 1\n  b: 2"] {
            match evaluate_str(input) {
                Ok(value) => assert_eq!(value.to_string(), "[{a: 1, b: 2}]", "Input: '{}'", input),
                Err(errors) => panic!("Evaluation failed for input '{}': {:?}", input, errors),
            }
        }
    }

    #[test]
    fn test_lexer_errors_are_all_reported() {
        match evaluate_str("a: ^\nb: ~") {
            Err(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].span(), Span::new(3, 4));
                assert_eq!(errors[1].span(), Span::new(8, 9));
            }
            Ok(value) => panic!("Expected lexer errors, got {}", value),
        }
    }
}
