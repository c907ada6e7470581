use crate::ast::{BinaryOp, UnaryOp};
use crate::evaluator::{EvalError, EvalResult};
use crate::source::Span;
use crate::state::{Resolved, ResolvedKind};

#[derive(Debug, Copy, Clone, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    fn into_resolved(self, span: Span) -> Resolved {
        let kind = match self {
            Number::Int(n) => ResolvedKind::Int(n),
            Number::Float(n) => ResolvedKind::Float(n),
        };
        Resolved::new(kind, span)
    }
}

// Extracts a number or returns ExpectNumeric pointing at the operand
fn expect_numeric(value: &Resolved, span: Span) -> EvalResult<Number> {
    match value.kind {
        ResolvedKind::Int(n) => Ok(Number::Int(n)),
        ResolvedKind::Float(n) => Ok(Number::Float(n)),
        ref other => Err(EvalError::ExpectNumeric {
            found: other.type_name(),
            span,
        }),
    }
}

/// Applies a prefix operator. The result is located at the operator.
pub fn unary(op: UnaryOp, op_span: Span, operand: &Resolved, operand_span: Span) -> EvalResult {
    let number = expect_numeric(operand, operand_span)?;
    let result = match (op, number) {
        (UnaryOp::Plus, number) => number,
        (UnaryOp::Minus, Number::Int(n)) => Number::Int(n.wrapping_neg()),
        (UnaryOp::Minus, Number::Float(n)) => Number::Float(-n),
    };
    Ok(result.into_resolved(op_span))
}

/// Applies an infix operator. Two integers stay integral (wrapping on
/// overflow, truncating on division); anything involving a float is computed
/// in floating point.
pub fn binary(
    op: BinaryOp,
    (left, left_span): (&Resolved, Span),
    (right, right_span): (&Resolved, Span),
    span: Span,
) -> EvalResult {
    let lhs = expect_numeric(left, left_span)?;
    let rhs = expect_numeric(right, right_span)?;

    let result = match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => Number::Int(match op {
            BinaryOp::Plus => a.wrapping_add(b),
            BinaryOp::Minus => a.wrapping_sub(b),
            BinaryOp::Star => a.wrapping_mul(b),
            BinaryOp::Slash => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero(right_span));
                }
                a.wrapping_div(b)
            }
        }),
        (lhs, rhs) => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            Number::Float(match op {
                BinaryOp::Plus => a + b,
                BinaryOp::Minus => a - b,
                BinaryOp::Star => a * b,
                BinaryOp::Slash => a / b,
            })
        }
    };
    Ok(result.into_resolved(span))
}
