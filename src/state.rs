use crate::ast::{Expr, ExprId, ExprKind, RefModifier};
use crate::source::Span;
use std::collections::{BTreeMap, HashMap};

/// Progress of one memoized computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot<T> {
    #[default]
    Unvisited,
    /// Set before any recursive work starts; seeing it again means a cycle.
    InProgress,
    Done(T),
}

impl<T> Slot<T> {
    pub fn done(&self) -> Option<&T> {
        match self {
            Slot::Done(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ArrayId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TableId(pub usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(pub usize);

/// A value produced during resolution. Containers stay as ids into the
/// evaluator's arenas until materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(ArrayId),
    Table(TableId),
}

impl ResolvedKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ResolvedKind::Str(_) => "string",
            ResolvedKind::Bool(_) => "boolean",
            ResolvedKind::Int(_) => "integer",
            ResolvedKind::Float(_) => "float",
            ResolvedKind::Array(_) => "array",
            ResolvedKind::Table(_) => "table",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub kind: ResolvedKind,
    pub span: Span, // Where the value came from
}

impl Resolved {
    pub fn new(kind: ResolvedKind, span: Span) -> Self {
        Resolved { kind, span }
    }
}

#[derive(Debug, Clone)]
pub struct RefState<'e> {
    /// Where the walk starts; `None` for a relative reference outside any table.
    pub root: Option<&'e Expr>,
    pub value: Slot<Resolved>,
}

#[derive(Debug, Clone)]
pub struct ArrayState {
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone)]
pub struct TableState<'e> {
    /// Declared entries in source order, keys still unevaluated.
    pub items: Vec<(&'e Expr, ItemId)>,
    /// Evaluated keys, including anything inherited.
    pub keys: Slot<BTreeMap<String, ItemId>>,
    /// The entry whose `< parent` composes into this table literal.
    pub owner: Option<ItemId>,
    pub span: Span,
}

/// An array item or a table entry.
#[derive(Debug, Clone)]
pub struct ItemState<'e> {
    pub value: &'e Expr,
    pub inherits: Option<&'e Expr>,
    pub resolved: Slot<Resolved>,
}

/// Names a memo slot that holds a single resolved value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotKey {
    Ref(ExprId),
    Op(ExprId),
    Item(ItemId),
}

/// All per-node evaluation state for one document. Built once by [`State::bind`]
/// and keyed by node identity, so the syntax tree itself is never touched.
#[derive(Debug, Default)]
pub struct State<'e> {
    refs: HashMap<ExprId, RefState<'e>>,
    ops: HashMap<ExprId, Slot<Resolved>>,
    arrays: Vec<ArrayState>,
    tables: Vec<TableState<'e>>,
    items: Vec<ItemState<'e>>,
    array_ids: HashMap<ExprId, ArrayId>,
    table_ids: HashMap<ExprId, TableId>,
}

impl<'e> State<'e> {
    /// Walks the whole tree once, allocating state for every reference,
    /// operator, container and item, and fixing each reference's root.
    pub fn bind(document: &'e Expr) -> Self {
        let mut state = State::default();
        state.bind_expr(document, document, None);
        state
    }

    fn bind_expr(&mut self, expr: &'e Expr, document: &'e Expr, scope: Option<&'e Expr>) {
        match &expr.kind {
            ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::Float(_) => {}
            ExprKind::Ref(reference) => {
                let root = match reference.modifier {
                    RefModifier::Absolute => Some(document),
                    RefModifier::Relative => scope,
                };
                self.refs.insert(
                    expr.id,
                    RefState {
                        root,
                        value: Slot::Unvisited,
                    },
                );
                for key in &reference.keys {
                    self.bind_expr(key, document, scope);
                }
            }
            ExprKind::Unary { operand, .. } => {
                self.ops.insert(expr.id, Slot::Unvisited);
                self.bind_expr(operand, document, scope);
            }
            ExprKind::Binary { left, right, .. } => {
                self.ops.insert(expr.id, Slot::Unvisited);
                self.bind_expr(left, document, scope);
                self.bind_expr(right, document, scope);
            }
            // Arrays do not open a new scope for relative references
            ExprKind::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    self.bind_expr(value, document, scope);
                    items.push(self.new_item(value, None));
                }
                self.array_ids.insert(expr.id, ArrayId(self.arrays.len()));
                self.arrays.push(ArrayState { items });
            }
            ExprKind::Table(entries) => {
                let table = TableId(self.tables.len());
                self.tables.push(TableState {
                    items: Vec::with_capacity(entries.len()),
                    keys: Slot::Unvisited,
                    owner: None,
                    span: expr.span,
                });
                self.table_ids.insert(expr.id, table);

                for entry in entries {
                    self.bind_expr(&entry.key, document, Some(expr));
                    if let Some(parent) = &entry.inherits {
                        self.bind_expr(parent, document, Some(expr));
                    }
                    self.bind_expr(&entry.value, document, Some(expr));

                    let item = self.new_item(&entry.value, entry.inherits.as_ref());
                    self.tables[table.0].items.push((&entry.key, item));

                    if entry.inherits.is_some()
                        && let Some(&child) = self.table_ids.get(&entry.value.id)
                    {
                        self.tables[child.0].owner = Some(item);
                    }
                }
            }
        }
    }

    fn new_item(&mut self, value: &'e Expr, inherits: Option<&'e Expr>) -> ItemId {
        let id = ItemId(self.items.len());
        self.items.push(ItemState {
            value,
            inherits,
            resolved: Slot::Unvisited,
        });
        id
    }

    pub fn ref_root(&self, id: ExprId) -> Option<Option<&'e Expr>> {
        self.refs.get(&id).map(|state| state.root)
    }

    pub fn array_id(&self, id: ExprId) -> Option<ArrayId> {
        self.array_ids.get(&id).copied()
    }

    pub fn table_id(&self, id: ExprId) -> Option<TableId> {
        self.table_ids.get(&id).copied()
    }

    pub fn array(&self, id: ArrayId) -> &ArrayState {
        &self.arrays[id.0]
    }

    pub fn table(&self, id: TableId) -> &TableState<'e> {
        &self.tables[id.0]
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut TableState<'e> {
        &mut self.tables[id.0]
    }

    pub fn item(&self, id: ItemId) -> &ItemState<'e> {
        &self.items[id.0]
    }

    pub fn slot_mut(&mut self, key: SlotKey) -> Option<&mut Slot<Resolved>> {
        match key {
            SlotKey::Ref(id) => self.refs.get_mut(&id).map(|state| &mut state.value),
            SlotKey::Op(id) => self.ops.get_mut(&id),
            SlotKey::Item(id) => self.items.get_mut(id.0).map(|state| &mut state.resolved),
        }
    }

    /// Creates a table that starts out with the evaluated keys of `from`.
    /// Used when inheritance applies to a table reached through a reference,
    /// so the referenced table keeps its own keys.
    pub fn compose_table(&mut self, from: TableId, span: Span) -> TableId {
        let keys = self.tables[from.0].keys.clone();
        let id = TableId(self.tables.len());
        self.tables.push(TableState {
            items: Vec::new(),
            keys,
            owner: None,
            span,
        });
        id
    }

    /// Adds every key of `parent` that `child` does not already define.
    /// Both key sets must already be evaluated. Returns how many keys were
    /// inherited.
    pub fn inherit_keys(&mut self, child: TableId, parent: TableId) -> usize {
        let inherited = match &self.tables[parent.0].keys {
            Slot::Done(keys) => keys.clone(),
            _ => return 0,
        };
        let Slot::Done(keys) = &mut self.tables[child.0].keys else {
            return 0;
        };

        let mut count = 0;
        for (name, item) in inherited {
            if !keys.contains_key(&name) {
                keys.insert(name, item);
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    fn find_ref<'a>(expr: &'a Expr, found: &mut Vec<&'a Expr>) {
        match &expr.kind {
            ExprKind::Ref(_) => found.push(expr),
            ExprKind::Unary { operand, .. } => find_ref(operand, found),
            ExprKind::Binary { left, right, .. } => {
                find_ref(left, found);
                find_ref(right, found);
            }
            ExprKind::Array(items) => items.iter().for_each(|item| find_ref(item, found)),
            ExprKind::Table(items) => {
                for item in items {
                    find_ref(&item.key, found);
                    if let Some(parent) = &item.inherits {
                        find_ref(parent, found);
                    }
                    find_ref(&item.value, found);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn test_bind_ref_roots() {
        let document = parse_str("a: $.b\nb:\n  c: .d\n  e: [.f]\nd: 1").expect("Should parse");
        let state = State::bind(&document);
        let mut refs = Vec::new();
        find_ref(&document, &mut refs);
        assert_eq!(refs.len(), 3);

        // Absolute references start at the document
        let root = state.ref_root(refs[0].id).expect("bound").expect("has root");
        assert_eq!(root.id, document.id);

        // Relative references start at the innermost table, even inside arrays
        let ExprKind::Table(entries) = &document.kind else {
            panic!("Expected a table document");
        };
        let inner = &entries[1].value;
        for reference in &refs[1..] {
            let root = state.ref_root(reference.id).expect("bound").expect("has root");
            assert_eq!(root.id, inner.id);
        }
    }

    #[test]
    fn test_bind_relative_ref_without_table() {
        let document = parse_str("[.a]").expect("Should parse");
        let state = State::bind(&document);
        let mut refs = Vec::new();
        find_ref(&document, &mut refs);
        assert_eq!(state.ref_root(refs[0].id), Some(None));
    }

    #[test]
    fn test_bind_allocates_items() {
        let document = parse_str("xs: [1, 2, 3]\nchild < $.base: {y: 1}\nbase: {x: 0}")
            .expect("Should parse");
        let state = State::bind(&document);
        let root = state.table_id(document.id).expect("root table");
        assert_eq!(state.table(root).items.len(), 3);
        assert_eq!(state.table(root).keys, Slot::Unvisited);

        let ExprKind::Table(entries) = &document.kind else {
            panic!("Expected a table document");
        };
        let xs = state.array_id(entries[0].value.id).expect("array state");
        assert_eq!(state.array(xs).items.len(), 3);

        // The inheriting literal remembers the entry that composes it
        let child = state.table_id(entries[1].value.id).expect("child table");
        let owner = state.table(child).owner.expect("owner entry");
        assert_eq!(state.table(root).items[1].1, owner);
        assert!(state.item(owner).inherits.is_some());
        let base = state.table_id(entries[2].value.id).expect("base table");
        assert_eq!(state.table(base).owner, None);
    }

    #[test]
    fn test_inherit_keys_keeps_child_entries() {
        let document = parse_str("{a: {x: 1, y: 2}, b: {y: 3, z: 4}}").expect("Should parse");
        let mut state = State::bind(&document);
        let ExprKind::Table(entries) = &document.kind else {
            panic!("Expected a table document");
        };
        let parent = state.table_id(entries[0].value.id).expect("parent");
        let child = state.table_id(entries[1].value.id).expect("child");

        let parent_keys: BTreeMap<_, _> = [("x", ItemId(0)), ("y", ItemId(1))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let child_keys: BTreeMap<_, _> = [("y", ItemId(2)), ("z", ItemId(3))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        state.table_mut(parent).keys = Slot::Done(parent_keys);
        state.table_mut(child).keys = Slot::Done(child_keys);

        let composed = state.compose_table(child, Span::default());
        assert_eq!(state.inherit_keys(composed, parent), 1);

        let keys = state.table(composed).keys.done().expect("keys");
        assert_eq!(keys.get("x"), Some(&ItemId(0)));
        assert_eq!(keys.get("y"), Some(&ItemId(2)));
        assert_eq!(keys.get("z"), Some(&ItemId(3)));
        // The source of the composition is left alone
        assert_eq!(state.table(child).keys.done().map(|k| k.len()), Some(2));
    }
}
