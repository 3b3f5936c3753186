//! An in-memory `GraphStore`, used by the reconciler's unit tests and
//! the end-to-end scenarios (§10.5). Not a production backend.

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::StoreResult;
use crate::graph::{Entity, Relationship};

#[derive(Default)]
pub struct InMemoryStore {
    nodes: DashMap<String, Entity>,
    relationships: DashMap<String, Relationship>,
    /// file path -> canonical ids of nodes declared by that file.
    nodes_by_file: RwLock<std::collections::HashMap<String, std::collections::HashSet<String>>>,
    rels_by_file: RwLock<std::collections::HashMap<String, std::collections::HashSet<String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}

impl super::GraphStore for InMemoryStore {
    fn upsert_nodes(&self, file: &str, nodes: Vec<Entity>) -> StoreResult<()> {
        let mut by_file = self.nodes_by_file.write();
        let entry = by_file.entry(file.to_string()).or_default();
        for node in nodes {
            entry.insert(node.canonical_id.clone());
            self.nodes.insert(node.canonical_id.clone(), node);
        }
        Ok(())
    }

    fn upsert_relationships(&self, file: &str, rels: Vec<Relationship>) -> StoreResult<()> {
        let mut by_file = self.rels_by_file.write();
        let entry = by_file.entry(file.to_string()).or_default();
        for rel in rels {
            entry.insert(rel.id.clone());
            self.relationships.insert(rel.id.clone(), rel);
        }
        Ok(())
    }

    fn delete_relationships_by_id(&self, ids: &[String]) -> StoreResult<()> {
        for id in ids {
            self.relationships.remove(id);
        }
        let mut by_file = self.rels_by_file.write();
        for set in by_file.values_mut() {
            for id in ids {
                set.remove(id);
            }
        }
        Ok(())
    }

    fn delete_nodes_by_id(&self, ids: &[String]) -> StoreResult<()> {
        for id in ids {
            self.nodes.remove(id);
        }
        let mut by_file = self.nodes_by_file.write();
        for set in by_file.values_mut() {
            for id in ids {
                set.remove(id);
            }
        }
        Ok(())
    }

    fn list_by_file(&self, file: &str) -> StoreResult<(Vec<Entity>, Vec<Relationship>)> {
        let node_ids = self
            .nodes_by_file
            .read()
            .get(file)
            .cloned()
            .unwrap_or_default();
        let rel_ids = self.rels_by_file.read().get(file).cloned().unwrap_or_default();

        let nodes = node_ids
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| n.clone()))
            .collect();
        let rels = rel_ids
            .iter()
            .filter_map(|id| self.relationships.get(id).map(|r| r.clone()))
            .collect();
        Ok((nodes, rels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Entity, EntityKind, RelationKind, Relationship, Span};
    use crate::store::GraphStore;

    fn node(id: &str, file: &str) -> Entity {
        Entity::new(file, EntityKind::Function, id, None, None, "python", Span::new(1, 0, 1, 0), 0)
    }

    #[test]
    fn upsert_then_list_round_trips() {
        let store = InMemoryStore::new();
        let n = node("f", "a.py");
        let canonical = n.canonical_id.clone();
        store.upsert_nodes("a.py", vec![n]).unwrap();
        let (nodes, _) = store.list_by_file("a.py").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].canonical_id, canonical);
    }

    #[test]
    fn delete_removes_from_file_scope() {
        let store = InMemoryStore::new();
        let n = node("f", "a.py");
        let id = n.canonical_id.clone();
        store.upsert_nodes("a.py", vec![n]).unwrap();
        store.delete_nodes_by_id(&[id]).unwrap();
        let (nodes, _) = store.list_by_file("a.py").unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn relationship_round_trips() {
        let store = InMemoryStore::new();
        let rel = Relationship::new(RelationKind::Calls, "a", "b");
        let id = rel.id.clone();
        store.upsert_relationships("a.py", vec![rel]).unwrap();
        let (_, rels) = store.list_by_file("a.py").unwrap();
        assert_eq!(rels[0].id, id);
    }

    #[test]
    fn unknown_file_returns_empty() {
        let store = InMemoryStore::new();
        let (nodes, rels) = store.list_by_file("nope.py").unwrap();
        assert!(nodes.is_empty() && rels.is_empty());
    }
}
