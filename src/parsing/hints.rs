//! Hint-comment extraction.
//!
//! A single-line comment matching `bmcp:(call-target|imports|uses-type)
//! <target>` emits exactly one placeholder edge, attributed to the
//! enclosing entity when `attribute_hints_to_nearest_entity` is set, or
//! to the File entity otherwise (Open Question 1; default `false`,
//! matching source behavior).

use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

use crate::graph::{placeholder, RelationKind, Relationship};

fn hint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"bmcp:(call-target|imports|uses-type)\s+(\S+)").expect("static hint regex is valid")
    })
}

/// One hint comment found in source text, with its 0-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub line: u32,
    pub kind: HintKind,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    CallTarget,
    Imports,
    UsesType,
}

impl HintKind {
    fn relation_kind(self) -> RelationKind {
        match self {
            HintKind::CallTarget => RelationKind::Calls,
            HintKind::Imports => RelationKind::Imports,
            HintKind::UsesType => RelationKind::UsesType,
        }
    }
}

/// Scan `source` line by line for `bmcp:` hint comments.
pub fn scan_hints(source: &str) -> Vec<Hint> {
    let pattern = hint_pattern();
    let mut hints = Vec::new();
    for (line_idx, line) in source.lines().enumerate() {
        if let Some(captures) = pattern.captures(line) {
            let kind = match &captures[1] {
                "call-target" => HintKind::CallTarget,
                "imports" => HintKind::Imports,
                "uses-type" => HintKind::UsesType,
                _ => continue,
            };
            hints.push(Hint {
                line: line_idx as u32,
                kind,
                target: captures[2].to_string(),
            });
        }
    }
    hints
}

/// Build the placeholder relationships for every hint found, attributing
/// each to `nearest_entity_id` when `attribute_to_nearest` is set, else
/// to `file_entity_id`.
pub fn hints_to_relationships(
    hints: &[Hint],
    file_entity_id: &str,
    nearest_entity_id: Option<&str>,
    attribute_to_nearest: bool,
) -> Vec<Relationship> {
    let source_id = if attribute_to_nearest {
        nearest_entity_id.unwrap_or(file_entity_id)
    } else {
        file_entity_id
    };

    hints
        .iter()
        .map(|hint| {
            let target = match hint.kind {
                HintKind::CallTarget => format!("manual::call-target::{}", hint.target),
                HintKind::Imports => format!("manual::imports::{}", hint.target),
                HintKind::UsesType => format!("manual::uses-type::{}", hint.target),
            };
            Relationship::new(hint.kind.relation_kind(), source_id, placeholder(&target))
                .with_property("manual_hint", json!(true))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_a_call_target_hint() {
        let source = "// bmcp:call-target my.module.Helper.doSomething\nfunction foo(){}";
        let hints = scan_hints(source);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].kind, HintKind::CallTarget);
        assert_eq!(hints[0].target, "my.module.Helper.doSomething");
    }

    #[test]
    fn relationship_attributes_to_file_by_default() {
        let hints = scan_hints("// bmcp:imports some/module\n");
        let rels = hints_to_relationships(&hints, "file.ts::File::file.ts", Some("foo_entity"), false);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source_id, "file.ts::File::file.ts");
        assert!(rels[0].is_unresolved_placeholder());
        assert_eq!(rels[0].properties.get("manual_hint").unwrap(), &serde_json::json!(true));
    }

    #[test]
    fn relationship_attributes_to_nearest_when_configured() {
        let hints = scan_hints("// bmcp:uses-type Foo\n");
        let rels = hints_to_relationships(&hints, "file.ts::File::file.ts", Some("foo_entity"), true);
        assert_eq!(rels[0].source_id, "foo_entity");
    }

    #[test]
    fn no_hints_yields_no_relationships() {
        let hints = scan_hints("function foo(){}\n");
        assert!(hints.is_empty());
    }
}
