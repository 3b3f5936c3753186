//! The in-memory symbol index populated while visitors run (§4.6).
//!
//! Keys are `(scope_id, simple_name)`. Lookup walks `::`-prefix parent
//! scopes before falling back to the designated global scope. The index
//! is built fully before the resolver runs; writes after that point are
//! a programming error in this crate's pipeline, not a runtime one, so
//! no locking is needed — the index is handed to the resolver by value
//! or shared reference, never mutated concurrently with reads.

use std::collections::HashMap;

use crate::graph::EntityKind;
use crate::identity::GLOBAL_SCOPE;

/// One declaration recorded in the symbol index.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub entity_id: String,
    pub kind: EntityKind,
    pub file: String,
    pub scope_id: String,
    pub simple_name: String,
    pub declared_line: u32,
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    table: HashMap<(String, String), SymbolEntry>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration. A duplicate `(scope, name)` is not fatal:
    /// the later entry wins and a warning is logged.
    pub fn insert(&mut self, entry: SymbolEntry) {
        let key = (entry.scope_id.clone(), entry.simple_name.clone());
        if let Some(existing) = self.table.get(&key) {
            tracing::warn!(
                "duplicate declaration of '{}' in scope '{}': {} shadowed by {}",
                entry.simple_name,
                entry.scope_id,
                existing.entity_id,
                entry.entity_id
            );
        }
        self.table.insert(key, entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = SymbolEntry>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Drop every declaration previously recorded for `file`, ahead of
    /// re-inserting its freshly extracted declarations.
    pub fn remove_file(&mut self, file: &str) {
        self.table.retain(|_, entry| entry.file != file);
    }

    /// All declarations of `name` visible across the scope chain starting
    /// at `scope`, ordered innermost-first, used by the resolver for
    /// declaration-order shadowing tie-breaks.
    pub fn find_all(&self, name: &str, scope: &str) -> Vec<&SymbolEntry> {
        let mut found = Vec::new();
        for candidate_scope in scope_chain(scope) {
            if let Some(entry) = self.table.get(&(candidate_scope.clone(), name.to_string())) {
                found.push(entry);
            }
        }
        found
    }

    /// The first match walking the scope chain: `scope`, its `::`-prefix
    /// parents, then [`GLOBAL_SCOPE`].
    pub fn find(&self, name: &str, scope: &str) -> Option<&SymbolEntry> {
        self.find_all(name, scope).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Scopes to probe, innermost first: `scope` itself, each `::`-prefix
/// ancestor, then the global scope.
fn scope_chain(scope: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let segments: Vec<&str> = scope.split("::").collect();
    for end in (1..=segments.len()).rev() {
        chain.push(segments[..end].join("::"));
    }
    if chain.last().map(|s| s.as_str()) != Some(GLOBAL_SCOPE) {
        chain.push(GLOBAL_SCOPE.to_string());
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(entity_id: &str, scope_id: &str, name: &str, line: u32) -> SymbolEntry {
        SymbolEntry {
            entity_id: entity_id.to_string(),
            kind: EntityKind::Function,
            file: "a.ts".to_string(),
            scope_id: scope_id.to_string(),
            simple_name: name.to_string(),
            declared_line: line,
        }
    }

    #[test]
    fn finds_in_exact_scope() {
        let mut idx = SymbolIndex::new();
        idx.insert(entry("id1", "a.ts::Class::A", "foo", 1));
        let found = idx.find("foo", "a.ts::Class::A").unwrap();
        assert_eq!(found.entity_id, "id1");
    }

    #[test]
    fn walks_up_prefix_parents() {
        let mut idx = SymbolIndex::new();
        idx.insert(entry("id1", "a.ts", "foo", 1));
        let found = idx.find("foo", "a.ts::Class::A::Method::bar").unwrap();
        assert_eq!(found.entity_id, "id1");
    }

    #[test]
    fn falls_back_to_global_scope() {
        let mut idx = SymbolIndex::new();
        idx.insert(entry("id1", GLOBAL_SCOPE, "foo", 1));
        let found = idx.find("foo", "a.ts::Class::A").unwrap();
        assert_eq!(found.entity_id, "id1");
    }

    #[test]
    fn duplicate_declaration_lets_later_entry_win() {
        let mut idx = SymbolIndex::new();
        idx.insert(entry("id1", "a.ts", "foo", 1));
        idx.insert(entry("id2", "a.ts", "foo", 5));
        let found = idx.find("foo", "a.ts").unwrap();
        assert_eq!(found.entity_id, "id2");
    }

    #[test]
    fn missing_symbol_returns_none() {
        let idx = SymbolIndex::new();
        assert!(idx.find("nope", "a.ts").is_none());
    }
}
