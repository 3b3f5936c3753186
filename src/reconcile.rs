//! The reconciler (§4.8): diffs a file's freshly extracted subgraph
//! against what the store already holds for that path and applies the
//! minimal upsert/delete set, in the order that preserves referential
//! integrity for concurrent readers.

use std::collections::HashSet;

use crate::error::StoreResult;
use crate::graph::{Entity, Relationship};
use crate::store::GraphStore;
use crate::{debug_event, log_event};

#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileStats {
    pub nodes_upserted: usize,
    pub rels_upserted: usize,
    pub nodes_deleted: usize,
    pub rels_deleted: usize,
}

/// Reconcile one file's subgraph. Pass empty `nodes_new`/`rels_new` for
/// a file-deletion event (§4.9): every prior node and relationship for
/// that path is deleted, nothing is upserted.
pub fn reconcile_file(
    store: &dyn GraphStore,
    file: &str,
    nodes_new: Vec<Entity>,
    rels_new: Vec<Relationship>,
) -> StoreResult<ReconcileStats> {
    let (nodes_old, rels_old) = store.list_by_file(file)?;

    let new_node_ids: HashSet<&str> = nodes_new.iter().map(|n| n.canonical_id.as_str()).collect();
    let new_rel_ids: HashSet<&str> = rels_new.iter().map(|r| r.id.as_str()).collect();

    let stale_node_ids: Vec<String> = nodes_old
        .iter()
        .filter(|n| !new_node_ids.contains(n.canonical_id.as_str()))
        .map(|n| n.canonical_id.clone())
        .collect();
    let stale_rel_ids: Vec<String> = rels_old
        .iter()
        .filter(|r| !new_rel_ids.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();

    let stats = ReconcileStats {
        nodes_upserted: nodes_new.len(),
        rels_upserted: rels_new.len(),
        nodes_deleted: stale_node_ids.len(),
        rels_deleted: stale_rel_ids.len(),
    };

    store.upsert_nodes(file, nodes_new)?;
    store.upsert_relationships(file, rels_new)?;
    store.delete_relationships_by_id(&stale_rel_ids)?;
    store.delete_nodes_by_id(&stale_node_ids)?;

    debug_event!(
        "reconciler",
        "reconciled file",
        "{file}: +{} nodes, +{} rels, -{} nodes, -{} rels",
        stats.nodes_upserted,
        stats.rels_upserted,
        stats.nodes_deleted,
        stats.rels_deleted
    );
    if stats.nodes_deleted > 0 || stats.rels_deleted > 0 {
        log_event!("reconciler", "removed stale entities", "file={file}");
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EntityKind, RelationKind, Span};
    use crate::store::memory::InMemoryStore;

    fn node(name: &str, file: &str) -> Entity {
        Entity::new(file, EntityKind::Function, name, None, None, "python", Span::new(1, 0, 1, 0), 0)
    }

    #[test]
    fn first_reconcile_is_pure_upsert() {
        let store = InMemoryStore::new();
        let stats = reconcile_file(&store, "a.py", vec![node("a", "a.py"), node("b", "a.py")], vec![]).unwrap();
        assert_eq!(stats.nodes_upserted, 2);
        assert_eq!(stats.nodes_deleted, 0);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn repeated_reconcile_of_unchanged_input_is_a_no_op_delta() {
        let store = InMemoryStore::new();
        let nodes = vec![node("a", "a.py")];
        reconcile_file(&store, "a.py", nodes.clone(), vec![]).unwrap();
        let stats = reconcile_file(&store, "a.py", nodes, vec![]).unwrap();
        assert_eq!(stats.nodes_deleted, 0);
    }

    #[test]
    fn removed_function_is_deleted_on_reconcile() {
        let store = InMemoryStore::new();
        reconcile_file(&store, "a.py", vec![node("a", "a.py"), node("b", "a.py")], vec![]).unwrap();
        let stats = reconcile_file(&store, "a.py", vec![node("a", "a.py")], vec![]).unwrap();
        assert_eq!(stats.nodes_deleted, 1);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn file_deletion_clears_everything_for_that_path() {
        let store = InMemoryStore::new();
        reconcile_file(&store, "a.py", vec![node("a", "a.py"), node("b", "a.py")], vec![]).unwrap();
        let stats = reconcile_file(&store, "a.py", vec![], vec![]).unwrap();
        assert_eq!(stats.nodes_deleted, 2);
        let (nodes, rels) = store.list_by_file("a.py").unwrap();
        assert!(nodes.is_empty() && rels.is_empty());
    }

    #[test]
    fn nodes_after_store_equals_nodes_new_exactly() {
        let store = InMemoryStore::new();
        reconcile_file(&store, "a.py", vec![node("a", "a.py"), node("b", "a.py"), node("c", "a.py")], vec![]).unwrap();
        reconcile_file(&store, "a.py", vec![node("b", "a.py")], vec![]).unwrap();
        let (nodes, _) = store.list_by_file("a.py").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "b");
    }
}
