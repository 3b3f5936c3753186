//! The graph data model: entities, relationships, and their closed
//! kind vocabularies.

pub mod entity;
pub mod relationship;

pub use entity::{Entity, EntityKind, Span};
pub use relationship::{make_relationship_id, placeholder, RelationKind, Relationship};

/// The set of nodes and edges extracted from, or stored for, one file.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub nodes: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}
