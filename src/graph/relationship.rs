//! Relationship (edge) type and its closed kind vocabulary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Prefix for the form of a relationship's target before cross-file
/// resolution has run.
pub const PLACEHOLDER_PREFIX: &str = "placeholder:";

/// Build a placeholder target string for a not-yet-resolved name.
pub fn placeholder(name: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{name}")
}

/// Closed vocabulary of relationship kinds the graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    DeclaresNamespace,
    UsesNamespace,
    DefinesClass,
    DefinesInterface,
    DefinesStruct,
    Extends,
    Implements,
    HasMethod,
    HasProperty,
    HasField,
    Imports,
    Calls,
    References,
    DefinesTable,
    HasColumn,
    DefinesView,
    Contains,
    HasAttribute,
    Includes,
    Styles,
    Defines,
    UsesType,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Derive the deterministic relationship id from (source, target, kind).
pub fn make_relationship_id(source_id: &str, target_id: &str, kind: RelationKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(target_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(kind.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("rel_{hex}")
}

/// A directed, typed edge between two entity identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub kind: RelationKind,
    pub source_id: String,
    pub target_id: String,
    pub weight: u8,
    pub properties: HashMap<String, Value>,
}

impl Relationship {
    pub fn new(kind: RelationKind, source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let id = make_relationship_id(&source_id, &target_id, kind);
        Self {
            id,
            kind,
            source_id,
            target_id,
            weight: 5,
            properties: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight.clamp(1, 10);
        self
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn is_unresolved_placeholder(&self) -> bool {
        self.target_id.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Rebind this relationship's target, recomputing its derived id.
    pub fn rebind_target(&mut self, new_target: impl Into<String>) {
        self.target_id = new_target.into();
        self.id = make_relationship_id(&self.source_id, &self.target_id, self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_id_is_deterministic() {
        let r1 = Relationship::new(RelationKind::Calls, "a", "b");
        let r2 = Relationship::new(RelationKind::Calls, "a", "b");
        assert_eq!(r1.id, r2.id);
    }

    #[test]
    fn relationship_id_changes_with_kind() {
        let r1 = Relationship::new(RelationKind::Calls, "a", "b");
        let r2 = Relationship::new(RelationKind::References, "a", "b");
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn placeholder_targets_are_detected() {
        let r = Relationship::new(RelationKind::Calls, "a", placeholder("foo"));
        assert!(r.is_unresolved_placeholder());
    }

    #[test]
    fn rebind_target_updates_id() {
        let mut r = Relationship::new(RelationKind::Calls, "a", placeholder("foo"));
        let before = r.id.clone();
        r.rebind_target("a::Function::foo");
        assert_ne!(r.id, before);
        assert!(!r.is_unresolved_placeholder());
    }

    #[test]
    fn weight_is_clamped() {
        let r = Relationship::new(RelationKind::Calls, "a", "b").with_weight(50);
        assert_eq!(r.weight, 10);
    }
}
