//! Entity (node) type and its closed kind vocabulary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{make_canonical, make_gid};

/// Closed vocabulary of entity kinds the graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    File,
    NamespaceDeclaration,
    UsingDirective,
    Class,
    Interface,
    Struct,
    Method,
    Property,
    Field,
    Function,
    Variable,
    Parameter,
    Enum,
    EnumMember,
    Import,
    SQLTable,
    SQLColumn,
    SQLView,
    SQLSelectStatement,
    SQLInsertStatement,
    SQLUpdateStatement,
    SQLDeleteStatement,
    HTMLElement,
    HTMLAttribute,
    CSSRule,
    CSSSelector,
    CSSProperty,
    Module,
    Unknown,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A 1-based line / 0-based column source span, end-inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
    pub start_column: u32,
    pub end_column: u32,
}

impl Span {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            end_line,
            start_column,
            end_column,
        }
    }
}

/// A graph node: a single code, SQL, HTML, or CSS entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub canonical_id: String,
    pub gid: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub language: String,
    pub span: Span,
    pub created_at: u64,
    pub parent_id: Option<String>,
    pub attributes: HashMap<String, Value>,
}

impl Entity {
    /// Build an entity, deriving its canonical id and gid from the
    /// identity grammar.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: &str,
        kind: EntityKind,
        name: &str,
        parent_canonical: Option<&str>,
        param_types: Option<&[String]>,
        language: &str,
        span: Span,
        created_at: u64,
    ) -> Self {
        let canonical_id = make_canonical(
            file_path,
            &kind.to_string(),
            name,
            parent_canonical,
            param_types,
        );
        let gid = make_gid(&canonical_id, Some(language));
        Self {
            canonical_id,
            gid,
            kind,
            name: name.to_string(),
            file_path: crate::identity::normalize_path(file_path),
            language: language.to_string(),
            span,
            created_at,
            parent_id: parent_canonical.map(|s| s.to_string()),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_canonical_and_gid_are_consistent() {
        let e = Entity::new(
            "a.ts",
            EntityKind::Function,
            "f",
            None,
            None,
            "typescript",
            Span::new(1, 0, 1, 10),
            0,
        );
        assert_eq!(e.canonical_id, "a.ts::Function::f");
        assert!(e.gid.starts_with("typescript_"));
    }

    #[test]
    fn entity_file_path_is_normalized() {
        let e = Entity::new(
            "a\\b.ts",
            EntityKind::File,
            "b.ts",
            None,
            None,
            "typescript",
            Span::new(1, 0, 1, 0),
            0,
        );
        assert_eq!(e.file_path, "a/b.ts");
    }
}
