use crate::source::Span;
use std::fmt;

/// Stable identity of a syntax node, assigned by the parser. The evaluator
/// keys all of its per-node state by this id so the tree itself stays
/// immutable and can be shared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind, // The actual expression data
    pub span: Span,     // The source span it covers
}

impl Expr {
    pub fn new(id: ExprId, kind: ExprKind, span: Span) -> Self {
        Expr { id, kind, span }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefModifier {
    /// `$`, starts at the document root.
    Absolute,
    /// `.`, starts at the nearest enclosing table.
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub modifier: RefModifier,
    pub modifier_span: Span,
    /// Path segments; usually string literals, but any expression that
    /// evaluates to a string or an integer is allowed.
    pub keys: Vec<Expr>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableItem {
    pub key: Expr,
    /// `key < parent: value`: the table `value` inherits entries from.
    pub inherits: Option<Expr>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Ref(Reference),
    Unary {
        op: UnaryOp,
        op_span: Span,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        op_span: Span,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Array(Vec<Expr>),
    Table(Vec<TableItem>),
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Plus => write!(f, "+"),
            BinaryOp::Minus => write!(f, "-"),
            BinaryOp::Star => write!(f, "*"),
            BinaryOp::Slash => write!(f, "/"),
        }
    }
}

// Prints the expression back in inline syntax; blocks come out as braces and
// brackets, and binary expressions are fully parenthesized.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Str(s) => write!(f, "{}", crate::value::quote(s)),
            ExprKind::Bool(b) => write!(f, "{}", b),
            ExprKind::Int(n) => write!(f, "{}", n),
            ExprKind::Float(n) => write!(f, "{:?}", n),
            ExprKind::Ref(reference) => {
                match reference.modifier {
                    RefModifier::Absolute => write!(f, "$")?,
                    RefModifier::Relative => write!(f, ".")?,
                }
                for (index, key) in reference.keys.iter().enumerate() {
                    match &key.kind {
                        ExprKind::Str(s) if crate::value::is_identifier(s) => {
                            // `.a` already carries its dot as the modifier
                            if index > 0 || reference.modifier == RefModifier::Absolute {
                                write!(f, ".")?;
                            }
                            write!(f, "{}", s)?;
                        }
                        _ => write!(f, "[{}]", key)?,
                    }
                }
                Ok(())
            }
            ExprKind::Unary { op, operand, .. } => write!(f, "{}{}", op, operand),
            ExprKind::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ExprKind::Table(items) => {
                write!(f, "{{")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    match &item.key.kind {
                        ExprKind::Str(s) if crate::value::is_identifier(s) => write!(f, "{}", s)?,
                        ExprKind::Str(_) => write!(f, "{}", item.key)?,
                        _ => write!(f, "[{}]", item.key)?,
                    }
                    if let Some(parent) = &item.inherits {
                        write!(f, " < {}", parent)?;
                    }
                    write!(f, ": {}", item.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
