//! The generic CST-walking engine.
//!
//! One visitor engine drives all languages: a table keyed by CST
//! node-type tag maps to a handler function `(ctx, idx) -> Outcome`
//! (§9 design notes: prototype-style visitor with per-method branching
//! replaced by a function table). Unhandled node types always recurse;
//! handled types choose whether to recurse further.

use std::collections::HashSet;

use crate::graph::{Entity, EntityKind, Relationship, Span};
use crate::parsing::language::Language;
use crate::parsing::worker::{CstNode, CstTree};
use crate::symbol_index::SymbolEntry;

/// Maximum AST recursion depth before the engine gives up on a subtree
/// rather than risk a stack overflow on pathological input.
pub const MAX_AST_DEPTH: usize = 500;

pub fn check_recursion_depth(depth: usize, kind: &str) -> bool {
    if depth > MAX_AST_DEPTH {
        tracing::warn!("recursion depth {depth} exceeded at node kind '{kind}', truncating subtree");
        false
    } else {
        true
    }
}

/// A CST node kind that a handler explicitly processed, tracked for
/// auditability (which grammar features a profile actually covers).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandledNode {
    pub kind: String,
}

#[derive(Debug, Default)]
pub struct NodeTrackingState {
    handled: HashSet<HandledNode>,
}

impl NodeTrackingState {
    pub fn register(&mut self, kind: &str) {
        self.handled.insert(HandledNode {
            kind: kind.to_string(),
        });
    }

    pub fn handled_kinds(&self) -> impl Iterator<Item = &str> {
        self.handled.iter().map(|h| h.kind.as_str())
    }

    pub fn count(&self) -> usize {
        self.handled.len()
    }
}

/// Safely truncate a string to at most `max_bytes`, never splitting a
/// UTF-8 character boundary.
pub fn safe_truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Take a UTF-8-safe window of `window_size` bytes ending at `end_byte`.
pub fn safe_substring_window(code: &str, end_byte: usize, window_size: usize) -> &str {
    let end = end_byte.min(code.len());
    let mut end = end;
    while end > 0 && !code.is_char_boundary(end) {
        end -= 1;
    }
    let start = end.saturating_sub(window_size);
    let mut start = start;
    while start < end && !code.is_char_boundary(start) {
        start += 1;
    }
    &code[start..end]
}

/// Truncate for human-facing display, appending an ellipsis when cut.
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        format!("{}…", safe_truncate_str(s, max_bytes))
    }
}

/// What a handler tells the engine to do with the node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Stop,
}

pub type HandlerFn = fn(&mut VisitCtx, usize) -> Outcome;

/// A node-type → handler table for one language (or family of
/// languages sharing grammar shape).
#[derive(Default)]
pub struct NodeTable {
    pub handlers: std::collections::HashMap<&'static str, HandlerFn>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, kind: &'static str, handler: HandlerFn) -> Self {
        self.handlers.insert(kind, handler);
        self
    }
}

/// Traversal state threaded through every handler call.
pub struct VisitCtx<'a> {
    pub tree: &'a CstTree,
    pub file_path: String,
    pub language: Language,
    pub now: u64,
    pub file_canonical_id: String,
    pub current_namespace: Option<String>,
    pub current_container: Option<String>,
    pub current_function: Option<String>,
    pub nodes: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub symbols: Vec<SymbolEntry>,
    pub tracker: NodeTrackingState,
}

impl<'a> VisitCtx<'a> {
    pub fn node(&self, idx: usize) -> &CstNode {
        self.tree.node(idx)
    }

    pub fn text(&self, idx: usize) -> &str {
        self.tree.text(self.tree.node(idx))
    }

    pub fn span_of(&self, idx: usize) -> Span {
        let n = self.tree.node(idx);
        Span::new(n.start_row + 1, n.start_col, n.end_row + 1, n.end_col)
    }

    /// Current enclosing scope for symbol registration: function, else
    /// container, else namespace, else the file itself.
    pub fn enclosing_scope(&self) -> &str {
        self.current_function
            .as_deref()
            .or(self.current_container.as_deref())
            .or(self.current_namespace.as_deref())
            .unwrap_or(&self.file_canonical_id)
    }

    /// Entity id calls/relationships from the current position should
    /// originate from: the innermost of function/container/namespace,
    /// falling back to the File entity.
    pub fn enclosing_entity_id(&self) -> String {
        self.enclosing_scope().to_string()
    }

    /// The child of `idx` whose grammar field name matches `field`.
    pub fn child_by_field(&self, idx: usize, field: &str) -> Option<usize> {
        self.tree
            .node(idx)
            .children
            .iter()
            .copied()
            .find(|&c| self.tree.node(c).field_name.as_deref() == Some(field))
    }

    /// The first child of `idx` with the given CST node kind.
    pub fn first_child_of_kind(&self, idx: usize, kind: &str) -> Option<usize> {
        self.tree
            .node(idx)
            .children
            .iter()
            .copied()
            .find(|&c| self.tree.node(c).kind == kind)
    }

    /// Best-effort declared name for a declaration node: the `name`
    /// field if the grammar tags one, else the first identifier-ish
    /// child.
    pub fn declared_name(&self, idx: usize) -> Option<String> {
        let name_idx = self
            .child_by_field(idx, "name")
            .or_else(|| self.first_child_of_kind(idx, "identifier"))
            .or_else(|| self.first_child_of_kind(idx, "type_identifier"))
            .or_else(|| self.first_child_of_kind(idx, "property_identifier"))?;
        Some(self.text(name_idx).to_string())
    }

    pub fn record_symbol(&mut self, entity_id: &str, kind: EntityKind, simple_name: &str, declared_line: u32) {
        self.symbols.push(SymbolEntry {
            entity_id: entity_id.to_string(),
            kind,
            file: self.file_path.clone(),
            scope_id: self.enclosing_scope().to_string(),
            simple_name: simple_name.to_string(),
            declared_line,
        });
    }
}

/// Walk the tree from its root, dispatching through `table`. Returns the
/// populated nodes, relationships, symbols, and the node-kind tracker.
pub fn visit_tree<'a>(
    tree: &'a CstTree,
    table: &NodeTable,
    file_path: &str,
    language: Language,
    now: u64,
) -> VisitCtx<'a> {
    let file_entity = Entity::new(
        file_path,
        EntityKind::File,
        file_path,
        None,
        None,
        language.tag(),
        Span::new(1, 0, 1, 0),
        now,
    );
    let file_canonical_id = file_entity.canonical_id.clone();

    let mut ctx = VisitCtx {
        tree,
        file_path: file_path.to_string(),
        language,
        now,
        file_canonical_id,
        current_namespace: None,
        current_container: None,
        current_function: None,
        nodes: vec![file_entity],
        relationships: Vec::new(),
        symbols: Vec::new(),
        tracker: NodeTrackingState::default(),
    };

    visit_node(&mut ctx, table, tree.root, 0);

    if let Some(file_node) = ctx.nodes.first_mut() {
        let root = tree.node(tree.root);
        file_node.span = Span::new(1, 0, root.end_row + 1, root.end_col);
    }

    ctx
}

fn visit_node(ctx: &mut VisitCtx, table: &NodeTable, idx: usize, depth: usize) {
    let kind = ctx.tree.node(idx).kind.clone();
    if !check_recursion_depth(depth, &kind) {
        return;
    }

    let handler = table.handlers.get(kind.as_str()).copied();
    let outcome = match handler {
        Some(handler) => {
            ctx.tracker.register(&kind);
            let saved_namespace = ctx.current_namespace.clone();
            let saved_container = ctx.current_container.clone();
            let saved_function = ctx.current_function.clone();
            let outcome = handler(ctx, idx);
            if outcome == Outcome::Continue {
                for child in ctx.tree.node(idx).children.clone() {
                    visit_node(ctx, table, child, depth + 1);
                }
            }
            ctx.current_namespace = saved_namespace;
            ctx.current_container = saved_container;
            ctx.current_function = saved_function;
            outcome
        }
        None => {
            for child in ctx.tree.node(idx).children.clone() {
                visit_node(ctx, table, child, depth + 1);
            }
            Outcome::Continue
        }
    };
    let _ = outcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_truncate_never_splits_a_multibyte_char() {
        let s = "abc😀def";
        for n in 0..s.len() {
            let t = safe_truncate_str(s, n);
            assert!(std::str::from_utf8(t.as_bytes()).is_ok());
        }
    }

    #[test]
    fn safe_substring_window_handles_emoji_boundary() {
        let s = "hello 😀 world";
        let window = safe_substring_window(s, s.len(), 5);
        assert!(std::str::from_utf8(window.as_bytes()).is_ok());
    }

    #[test]
    fn truncate_for_display_appends_ellipsis_when_cut() {
        let s = "a".repeat(20);
        let out = truncate_for_display(&s, 5);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn recursion_guard_rejects_past_max_depth() {
        assert!(!check_recursion_depth(MAX_AST_DEPTH + 1, "block"));
        assert!(check_recursion_depth(MAX_AST_DEPTH, "block"));
    }

    #[test]
    fn node_tracker_dedupes_kinds() {
        let mut tracker = NodeTrackingState::default();
        tracker.register("class_declaration");
        tracker.register("class_declaration");
        tracker.register("method_declaration");
        assert_eq!(tracker.count(), 2);
    }
}
