//! The store contract (§6): four write operations plus a per-file read,
//! each atomic, with `file` scoping enforcing I4 (a file's entity set is
//! the exclusive authority for that file path).
//!
//! The store's own internals are out of scope (§1); this module pins
//! only the trait a production backend must satisfy. [`memory`] ships a
//! minimal reference implementation so the core is testable without a
//! real database.

pub mod memory;

use crate::error::StoreResult;
use crate::graph::{Entity, Relationship};

/// The persistent graph store collaborator.
pub trait GraphStore: Send + Sync {
    fn upsert_nodes(&self, file: &str, nodes: Vec<Entity>) -> StoreResult<()>;
    fn upsert_relationships(&self, file: &str, rels: Vec<Relationship>) -> StoreResult<()>;
    fn delete_relationships_by_id(&self, ids: &[String]) -> StoreResult<()>;
    fn delete_nodes_by_id(&self, ids: &[String]) -> StoreResult<()>;
    fn list_by_file(&self, file: &str) -> StoreResult<(Vec<Entity>, Vec<Relationship>)>;
}
