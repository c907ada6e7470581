use crate::arithmetic;
use crate::ast::{Expr, ExprKind, Reference};
use crate::source::Span;
use crate::state::{ItemId, Resolved, ResolvedKind, Slot, SlotKey, State, TableId};
use crate::value::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Expected a string key, found {found}")]
    ExpectStringKey { found: &'static str, span: Span },
    #[error("Expected an integer index, found {found}")]
    ExpectIntegerIndex { found: &'static str, span: Span },
    #[error("Expected an array or table to index into, found {found}")]
    ExpectArrayOrTable { found: &'static str, span: Span },
    #[error("Expected a table to inherit from, found {found}")]
    ExpectTableParent { found: &'static str, span: Span },
    #[error("Only a table can inherit, found {found}")]
    ExpectTableValue { found: &'static str, span: Span },
    #[error("Expected a number, found {found}")]
    ExpectNumeric { found: &'static str, span: Span },
    #[error("Key '{key}' not found")]
    KeyNotFound { key: String, span: Span },
    #[error("Index {index} is out of bounds for an array of length {len}")]
    IndexOutOfBounds { index: i64, len: usize, span: Span },
    #[error("Duplicate key '{key}'")]
    DuplicateKey {
        key: String,
        span: Span,
        first: Span, // The earlier declaration
    },
    #[error("Cyclic reference")]
    CyclicReference(Span),
    #[error("Relative reference is not inside any table")]
    NoEnclosingTable(Span),
    #[error("Integer division by zero")]
    DivisionByZero(Span),
    #[error("Evaluation nested more than {limit} levels deep")]
    RecursionLimit { limit: usize, span: Span },
    #[error("Internal error: expression was not resolved")]
    UnresolvedExpression(Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::ExpectStringKey { span, .. }
            | EvalError::ExpectIntegerIndex { span, .. }
            | EvalError::ExpectArrayOrTable { span, .. }
            | EvalError::ExpectTableParent { span, .. }
            | EvalError::ExpectTableValue { span, .. }
            | EvalError::ExpectNumeric { span, .. }
            | EvalError::KeyNotFound { span, .. }
            | EvalError::IndexOutOfBounds { span, .. }
            | EvalError::DuplicateKey { span, .. }
            | EvalError::RecursionLimit { span, .. } => *span,
            EvalError::CyclicReference(span)
            | EvalError::NoEnclosingTable(span)
            | EvalError::DivisionByZero(span)
            | EvalError::UnresolvedExpression(span) => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Resolved> = Result<T, EvalError>;

/// How many references, operators and containers may be in the middle of
/// being resolved at once before evaluation gives up.
pub const MAX_DEPTH: usize = 256;

/// Evaluates a document into plain values. Fails on the first error.
pub fn evaluate(document: &Expr) -> EvalResult<Value> {
    Evaluator::new(document).run()
}

/// Resolves one document. References are followed lazily and every result is
/// memoized, so each node is computed at most once however often it is
/// referenced.
pub struct Evaluator<'e> {
    document: &'e Expr,
    state: State<'e>,
    depth: usize,
    max_depth: usize,
}

impl<'e> Evaluator<'e> {
    pub fn new(document: &'e Expr) -> Self {
        Self::with_max_depth(document, MAX_DEPTH)
    }

    /// Like [`Evaluator::new`], with a custom bound on how deep reference
    /// chains and nested containers may go.
    pub fn with_max_depth(document: &'e Expr, max_depth: usize) -> Self {
        Evaluator {
            document,
            state: State::bind(document),
            depth: 0,
            max_depth,
        }
    }

    // Runs `compute` one level deeper, failing instead of overflowing the stack
    fn descend<T>(
        &mut self,
        span: Span,
        compute: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        if self.depth >= self.max_depth {
            return Err(EvalError::RecursionLimit {
                limit: self.max_depth,
                span,
            });
        }
        self.depth += 1;
        let result = compute(self);
        self.depth -= 1;
        result
    }

    /// Resolves every node in the document, then materializes the result.
    pub fn run(&mut self) -> EvalResult<Value> {
        self.force(self.document)?;
        let resolved = self.resolve(self.document)?;
        self.materialize(&resolved, &mut Vec::new())
    }

    /// Resolves one expression to a scalar or a container id.
    pub fn resolve(&mut self, expr: &'e Expr) -> EvalResult {
        let kind = match &expr.kind {
            ExprKind::Str(s) => ResolvedKind::Str(s.clone()),
            ExprKind::Bool(b) => ResolvedKind::Bool(*b),
            ExprKind::Int(n) => ResolvedKind::Int(*n),
            ExprKind::Float(n) => ResolvedKind::Float(*n),
            ExprKind::Array(_) => ResolvedKind::Array(
                self.state
                    .array_id(expr.id)
                    .ok_or(EvalError::UnresolvedExpression(expr.span))?,
            ),
            ExprKind::Table(_) => ResolvedKind::Table(
                self.state
                    .table_id(expr.id)
                    .ok_or(EvalError::UnresolvedExpression(expr.span))?,
            ),
            ExprKind::Ref(reference) => {
                return self.memoized(SlotKey::Ref(expr.id), expr.span, |ev| {
                    ev.walk_ref(expr, reference)
                });
            }
            ExprKind::Unary {
                op,
                op_span,
                operand,
            } => {
                return self.memoized(SlotKey::Op(expr.id), expr.span, |ev| {
                    let value = ev.resolve(operand)?;
                    arithmetic::unary(*op, *op_span, &value, operand.span)
                });
            }
            ExprKind::Binary {
                op, left, right, ..
            } => {
                return self.memoized(SlotKey::Op(expr.id), expr.span, |ev| {
                    let lhs = ev.resolve(left)?;
                    let rhs = ev.resolve(right)?;
                    arithmetic::binary(*op, (&lhs, left.span), (&rhs, right.span), expr.span)
                });
            }
        };
        Ok(Resolved::new(kind, expr.span))
    }

    // Runs `compute` at most once per slot. A slot that is re-entered while
    // its computation is still running is a cycle. A failed computation
    // leaves the slot unvisited.
    fn memoized(
        &mut self,
        key: SlotKey,
        span: Span,
        compute: impl FnOnce(&mut Self) -> EvalResult,
    ) -> EvalResult {
        let slot = self
            .state
            .slot_mut(key)
            .ok_or(EvalError::UnresolvedExpression(span))?;
        match slot {
            Slot::Done(value) => return Ok(value.clone()),
            Slot::InProgress => return Err(EvalError::CyclicReference(span)),
            Slot::Unvisited => {}
        }
        *slot = Slot::InProgress;

        let result = self.descend(span, compute);

        if let Some(slot) = self.state.slot_mut(key) {
            *slot = match &result {
                Ok(value) => Slot::Done(value.clone()),
                Err(_) => Slot::Unvisited,
            };
        }
        result
    }

    fn walk_ref(&mut self, expr: &'e Expr, reference: &'e Reference) -> EvalResult {
        let root = self
            .state
            .ref_root(expr.id)
            .ok_or(EvalError::UnresolvedExpression(expr.span))?
            .ok_or(EvalError::NoEnclosingTable(reference.modifier_span))?;

        let mut current = None;
        for key_expr in &reference.keys {
            // The key first: it may itself be a reference or arithmetic
            let key = self.resolve(key_expr)?;
            let container = match current.take() {
                Some(container) => container,
                None => self.resolve(root)?,
            };
            current = Some(self.step(container, key, key_expr)?);
        }

        let target = match current {
            Some(target) => target,
            None => self.resolve(root)?,
        };
        trace!(
            reference = %expr,
            span = %expr.span,
            found = target.kind.type_name(),
            "resolved reference"
        );
        Ok(Resolved::new(target.kind, expr.span))
    }

    // One segment of a reference path.
    fn step(&mut self, container: Resolved, key: Resolved, key_expr: &'e Expr) -> EvalResult {
        match container.kind {
            ResolvedKind::Array(array) => {
                let ResolvedKind::Int(index) = key.kind else {
                    return Err(EvalError::ExpectIntegerIndex {
                        found: key.kind.type_name(),
                        span: key_expr.span,
                    });
                };
                let items = &self.state.array(array).items;
                let item = usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i).copied())
                    .ok_or(EvalError::IndexOutOfBounds {
                        index,
                        len: items.len(),
                        span: key_expr.span,
                    })?;
                self.resolve_item(item)
            }
            ResolvedKind::Table(table) => {
                let ResolvedKind::Str(name) = key.kind else {
                    return Err(EvalError::ExpectStringKey {
                        found: key.kind.type_name(),
                        span: key_expr.span,
                    });
                };
                // An inheriting literal only has its full key set once the
                // entry declaring it has been resolved.
                if let Some(owner) = self.state.table(table).owner {
                    self.resolve_item(owner)?;
                }
                self.resolve_table_keys(table)?;
                let item = self
                    .state
                    .table(table)
                    .keys
                    .done()
                    .and_then(|keys| keys.get(&name).copied())
                    .ok_or(EvalError::KeyNotFound {
                        key: name,
                        span: key_expr.span,
                    })?;
                self.resolve_item(item)
            }
            other => Err(EvalError::ExpectArrayOrTable {
                found: other.type_name(),
                span: key_expr.span,
            }),
        }
    }

    /// Evaluates every key of a table to a string, once.
    fn resolve_table_keys(&mut self, table: TableId) -> EvalResult<()> {
        let state = self.state.table_mut(table);
        match state.keys {
            Slot::Done(_) => return Ok(()),
            Slot::InProgress => return Err(EvalError::CyclicReference(state.span)),
            Slot::Unvisited => {}
        }
        state.keys = Slot::InProgress;
        let entries = state.items.clone();

        let result = self.collect_keys(&entries);
        let state = self.state.table_mut(table);
        match result {
            Ok(keys) => {
                state.keys = Slot::Done(keys);
                Ok(())
            }
            Err(e) => {
                state.keys = Slot::Unvisited;
                Err(e)
            }
        }
    }

    fn collect_keys(
        &mut self,
        entries: &[(&'e Expr, ItemId)],
    ) -> EvalResult<BTreeMap<String, ItemId>> {
        let mut keys = BTreeMap::new();
        let mut declared: BTreeMap<String, Span> = BTreeMap::new();

        for &(key_expr, item) in entries {
            let key = self.resolve(key_expr)?;
            let ResolvedKind::Str(name) = key.kind else {
                return Err(EvalError::ExpectStringKey {
                    found: key.kind.type_name(),
                    span: key_expr.span,
                });
            };
            if let Some(&first) = declared.get(&name) {
                return Err(EvalError::DuplicateKey {
                    key: name,
                    span: key_expr.span,
                    first,
                });
            }
            declared.insert(name.clone(), key_expr.span);
            keys.insert(name, item);
        }
        Ok(keys)
    }

    /// Resolves an array item or table entry, applying `< parent` when the
    /// entry has one.
    fn resolve_item(&mut self, item: ItemId) -> EvalResult {
        let (value, inherits) = {
            let state = self.state.item(item);
            (state.value, state.inherits)
        };
        self.memoized(SlotKey::Item(item), value.span, |ev| {
            let resolved = ev.resolve(value)?;
            match inherits {
                Some(parent) => ev.inherit(resolved, value, parent),
                None => Ok(resolved),
            }
        })
    }

    // Unions the parent's entries into the child without overriding any of
    // the child's own. The parent is resolved through its own entry, so its
    // inheritance is already applied and chains compose transitively.
    fn inherit(&mut self, resolved: Resolved, value: &'e Expr, parent: &'e Expr) -> EvalResult {
        let ResolvedKind::Table(child) = resolved.kind else {
            return Err(EvalError::ExpectTableValue {
                found: resolved.kind.type_name(),
                span: value.span,
            });
        };
        let parent_value = self.resolve(parent)?;
        let ResolvedKind::Table(parent_table) = parent_value.kind else {
            return Err(EvalError::ExpectTableParent {
                found: parent_value.kind.type_name(),
                span: parent.span,
            });
        };

        self.resolve_table_keys(child)?;
        self.resolve_table_keys(parent_table)?;

        // A literal takes the inherited keys itself so relative references
        // inside it can see them; anything else gets a fresh table.
        let target = match value.kind {
            ExprKind::Table(_) => child,
            _ => self.state.compose_table(child, value.span),
        };
        let count = self.state.inherit_keys(target, parent_table);
        trace!(parent = %parent, span = %value.span, inherited = count, "composed table");

        Ok(Resolved::new(ResolvedKind::Table(target), resolved.span))
    }

    // Visits every node in source order so that errors anywhere in the
    // document surface, whether or not anything references them.
    fn force(&mut self, expr: &'e Expr) -> EvalResult<()> {
        self.descend(expr.span, |ev| ev.force_children(expr))
    }

    fn force_children(&mut self, expr: &'e Expr) -> EvalResult<()> {
        match &expr.kind {
            ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::Float(_) => {}
            ExprKind::Ref(reference) => {
                for key in &reference.keys {
                    self.force(key)?;
                }
                self.resolve(expr)?;
            }
            ExprKind::Unary { operand, .. } => {
                self.force(operand)?;
                self.resolve(expr)?;
            }
            ExprKind::Binary { left, right, .. } => {
                self.force(left)?;
                self.force(right)?;
                self.resolve(expr)?;
            }
            ExprKind::Array(values) => {
                let array = self
                    .state
                    .array_id(expr.id)
                    .ok_or(EvalError::UnresolvedExpression(expr.span))?;
                let items = self.state.array(array).items.clone();
                for (value, item) in values.iter().zip(items) {
                    self.force(value)?;
                    self.resolve_item(item)?;
                }
            }
            ExprKind::Table(entries) => {
                let table = self
                    .state
                    .table_id(expr.id)
                    .ok_or(EvalError::UnresolvedExpression(expr.span))?;
                self.resolve_table_keys(table)?;
                let items = self.state.table(table).items.clone();
                for (entry, (_, item)) in entries.iter().zip(items) {
                    self.force(&entry.key)?;
                    if let Some(parent) = &entry.inherits {
                        self.force(parent)?;
                    }
                    self.force(&entry.value)?;
                    self.resolve_item(item)?;
                }
            }
        }
        Ok(())
    }

    fn resolved_item(&self, item: ItemId) -> EvalResult<&Resolved> {
        let state = self.state.item(item);
        state
            .resolved
            .done()
            .ok_or(EvalError::UnresolvedExpression(state.value.span))
    }

    /// Copies resolved state into a plain value tree. Only reads state that
    /// is already resolved; a container reached again while it is still
    /// being copied cannot become a tree and is reported as a cycle.
    pub fn materialize(
        &self,
        resolved: &Resolved,
        visiting: &mut Vec<ResolvedKind>,
    ) -> EvalResult<Value> {
        let value = match &resolved.kind {
            ResolvedKind::Str(s) => Value::Str(s.clone()),
            ResolvedKind::Bool(b) => Value::Bool(*b),
            ResolvedKind::Int(n) => Value::Int(*n),
            ResolvedKind::Float(n) => Value::Float(*n),
            container if visiting.contains(container) => {
                return Err(EvalError::CyclicReference(resolved.span));
            }
            _ if visiting.len() >= self.max_depth => {
                return Err(EvalError::RecursionLimit {
                    limit: self.max_depth,
                    span: resolved.span,
                });
            }
            ResolvedKind::Array(array) => {
                visiting.push(resolved.kind.clone());
                let mut values = Vec::with_capacity(self.state.array(*array).items.len());
                for &item in &self.state.array(*array).items {
                    values.push(self.materialize(self.resolved_item(item)?, visiting)?);
                }
                visiting.pop();
                Value::Array(values)
            }
            ResolvedKind::Table(table) => {
                let state = self.state.table(*table);
                let keys = state
                    .keys
                    .done()
                    .ok_or(EvalError::UnresolvedExpression(state.span))?;
                visiting.push(resolved.kind.clone());
                let mut entries = BTreeMap::new();
                for (name, &item) in keys {
                    let value = self.materialize(self.resolved_item(item)?, visiting)?;
                    entries.insert(name.clone(), value);
                }
                visiting.pop();
                Value::Table(entries)
            }
        };
        Ok(value)
    }
}
