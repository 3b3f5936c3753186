//! Pass-two resolution: rewriting placeholder relationship targets into
//! concrete entity identities using the symbol index built during
//! extraction (§4.7).

use std::collections::HashMap;

use serde_json::json;

use crate::graph::{Entity, EntityKind, RelationKind, Relationship};
use crate::symbol_index::{SymbolEntry, SymbolIndex};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveStats {
    pub total_processed: usize,
    pub resolved: usize,
    pub unresolved_no_candidates: usize,
    pub unresolved_ambiguous: usize,
}

/// Everything the resolver needs about entities in the current batch:
/// looked up by canonical id to check a bound candidate's kind, and by
/// simple name (for SQL reference scanning).
pub struct ResolverContext<'a> {
    pub index: &'a SymbolIndex,
    pub entities_by_id: HashMap<&'a str, &'a Entity>,
}

impl<'a> ResolverContext<'a> {
    pub fn new(index: &'a SymbolIndex, entities: &'a [Entity]) -> Self {
        let entities_by_id = entities.iter().map(|e| (e.canonical_id.as_str(), e)).collect();
        Self { index, entities_by_id }
    }
}

/// Resolve every placeholder-targeted relationship in `rels` in place.
pub fn resolve_relationships(rels: &mut [Relationship], ctx: &ResolverContext) -> ResolveStats {
    let mut stats = ResolveStats::default();

    for rel in rels.iter_mut() {
        if !rel.is_unresolved_placeholder() {
            continue;
        }
        stats.total_processed += 1;

        let name = rel
            .target_id
            .strip_prefix(crate::graph::relationship::PLACEHOLDER_PREFIX)
            .unwrap_or(&rel.target_id)
            .to_string();

        let bound = match rel.kind {
            RelationKind::Extends | RelationKind::Implements => resolve_base(&name, rel, ctx, &mut stats),
            RelationKind::Calls => resolve_call(&name, rel, ctx, &mut stats),
            RelationKind::Imports => resolve_import(&name, rel, ctx, &mut stats),
            _ => resolve_generic(&name, rel, ctx, &mut stats),
        };

        if bound {
            stats.resolved += 1;
        } else {
            rel.properties.insert("unresolved".to_string(), json!(true));
        }
    }

    stats
}

fn ref_line(rel: &Relationship) -> Option<u32> {
    rel.properties.get("ref_line").and_then(|v| v.as_u64()).map(|v| v as u32)
}

/// Pick the declaration-order winner among candidates in the same scope:
/// the one declared closest to, but not after, the referencing line.
fn disambiguate<'a>(candidates: Vec<&'a SymbolEntry>, ref_line: Option<u32>) -> Option<&'a SymbolEntry> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0]);
    }
    let Some(call_line) = ref_line else {
        return candidates.into_iter().next();
    };
    let eligible: Vec<&SymbolEntry> = candidates
        .iter()
        .filter(|c| c.declared_line <= call_line)
        .copied()
        .collect();
    let pool = if eligible.is_empty() { candidates } else { eligible };
    pool.into_iter().max_by_key(|c| c.declared_line)
}

fn resolve_base(name: &str, rel: &mut Relationship, ctx: &ResolverContext, stats: &mut ResolveStats) -> bool {
    let candidates = ctx.index.find_all(name, &rel.source_id);
    let same_scope: Vec<&SymbolEntry> = match candidates.first() {
        Some(first) => candidates.iter().filter(|c| c.scope_id == first.scope_id).copied().collect(),
        None => Vec::new(),
    };
    let Some(winner) = disambiguate(same_scope, ref_line(rel)) else {
        if candidates.is_empty() {
            stats.unresolved_no_candidates += 1;
        } else {
            stats.unresolved_ambiguous += 1;
        }
        return false;
    };

    if let Some(entity) = ctx.entities_by_id.get(winner.entity_id.as_str()) {
        rel.kind = match entity.kind {
            EntityKind::Class => RelationKind::Extends,
            EntityKind::Interface => RelationKind::Implements,
            _ => RelationKind::Implements,
        };
    }
    rel.rebind_target(winner.entity_id.clone());
    true
}

fn resolve_call(name: &str, rel: &mut Relationship, ctx: &ResolverContext, stats: &mut ResolveStats) -> bool {
    if let Some((object, method)) = name.split_once('.') {
        if let Some(object_decl) = ctx.index.find(object, &rel.source_id) {
            let candidates = ctx.index.find_all(method, &object_decl.entity_id);
            if let Some(winner) = disambiguate(candidates, ref_line(rel)) {
                rel.rebind_target(winner.entity_id.clone());
                return true;
            }
        }
    }

    let candidates = ctx.index.find_all(name, &rel.source_id);
    match disambiguate(candidates.clone(), ref_line(rel)) {
        Some(winner) => {
            rel.rebind_target(winner.entity_id.clone());
            true
        }
        None => {
            if candidates.is_empty() {
                stats.unresolved_no_candidates += 1;
            } else {
                stats.unresolved_ambiguous += 1;
            }
            false
        }
    }
}

fn resolve_import(name: &str, rel: &mut Relationship, ctx: &ResolverContext, stats: &mut ResolveStats) -> bool {
    let file_scope = rel.source_id.split("::").next().unwrap_or(&rel.source_id);
    match ctx.index.find(name, file_scope) {
        Some(entry) if entry.file == file_scope => {
            rel.rebind_target(entry.entity_id.clone());
            true
        }
        _ => {
            stats.unresolved_no_candidates += 1;
            false
        }
    }
}

fn resolve_generic(name: &str, rel: &mut Relationship, ctx: &ResolverContext, stats: &mut ResolveStats) -> bool {
    let candidates = ctx.index.find_all(name, &rel.source_id);
    match disambiguate(candidates.clone(), ref_line(rel)) {
        Some(winner) => {
            rel.rebind_target(winner.entity_id.clone());
            true
        }
        None => {
            if candidates.is_empty() {
                stats.unresolved_no_candidates += 1;
            } else {
                stats.unresolved_ambiguous += 1;
            }
            false
        }
    }
}

/// Scan every SQLView/SQL statement's `queryText` attribute for bare
/// identifiers matching a known SQLTable/SQLView name, emitting
/// REFERENCES edges for successful matches (§4.7).
pub fn resolve_sql_references(entities: &[Entity]) -> Vec<Relationship> {
    let tables: HashMap<&str, &str> = entities
        .iter()
        .filter(|e| matches!(e.kind, EntityKind::SQLTable | EntityKind::SQLView))
        .map(|e| (e.name.as_str(), e.canonical_id.as_str()))
        .collect();

    let mut rels = Vec::new();
    for entity in entities {
        if !matches!(
            entity.kind,
            EntityKind::SQLView
                | EntityKind::SQLSelectStatement
                | EntityKind::SQLInsertStatement
                | EntityKind::SQLUpdateStatement
                | EntityKind::SQLDeleteStatement
        ) {
            continue;
        }
        let Some(query_text) = entity.attributes.get("queryText").and_then(|v| v.as_str()) else {
            continue;
        };
        for word in tokenize_identifiers(query_text) {
            if word == entity.name {
                continue;
            }
            if let Some(target) = tables.get(word.as_str()) {
                rels.push(Relationship::new(RelationKind::References, entity.canonical_id.clone(), (*target).to_string()));
            }
        }
    }
    rels
}

fn tokenize_identifiers(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_matches('.').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{placeholder, Span};
    use crate::symbol_index::SymbolEntry;

    fn entity(id: &str, kind: EntityKind, name: &str) -> Entity {
        Entity {
            canonical_id: id.to_string(),
            gid: format!("gid_{id}"),
            kind,
            name: name.to_string(),
            file_path: "a.cs".to_string(),
            language: "csharp".to_string(),
            span: Span::new(1, 0, 1, 0),
            created_at: 0,
            parent_id: None,
            attributes: Default::default(),
        }
    }

    fn sym(entity_id: &str, kind: EntityKind, scope_id: &str, name: &str, line: u32) -> SymbolEntry {
        SymbolEntry {
            entity_id: entity_id.to_string(),
            kind,
            file: scope_id.split("::").next().unwrap().to_string(),
            scope_id: scope_id.to_string(),
            simple_name: name.to_string(),
            declared_line: line,
        }
    }

    #[test]
    fn extends_binds_to_class_and_rewrites_kind() {
        let mut index = SymbolIndex::new();
        index.insert(sym("a.cs::Class::B", EntityKind::Class, "a.cs", "B", 1));
        let entities = vec![entity("a.cs::Class::B", EntityKind::Class, "B")];
        let ctx = ResolverContext::new(&index, &entities);

        let mut rel = Relationship::new(RelationKind::Implements, "a.cs::Class::A", placeholder("B"));
        let mut rels = [rel.clone()];
        resolve_relationships(&mut rels, &ctx);
        rel = rels[0].clone();
        assert_eq!(rel.kind, RelationKind::Extends);
        assert_eq!(rel.target_id, "a.cs::Class::B");
    }

    #[test]
    fn unresolved_relationship_is_retained_with_flag() {
        let index = SymbolIndex::new();
        let entities = Vec::new();
        let ctx = ResolverContext::new(&index, &entities);
        let mut rels = [Relationship::new(RelationKind::Calls, "a.ts::File::a.ts", placeholder("missing"))];
        resolve_relationships(&mut rels, &ctx);
        assert!(rels[0].is_unresolved_placeholder());
        assert_eq!(rels[0].properties.get("unresolved").unwrap(), &json!(true));
    }

    #[test]
    fn shadowing_picks_closest_prior_declaration() {
        let mut index = SymbolIndex::new();
        index.insert(sym("f1", EntityKind::Function, "a.ts", "helper", 5));
        index.insert(sym("f2", EntityKind::Function, "a.ts", "helper", 15));
        let entities = Vec::new();
        let ctx = ResolverContext::new(&index, &entities);

        let mut rel = Relationship::new(RelationKind::Calls, "a.ts", placeholder("helper"));
        rel.properties.insert("ref_line".to_string(), json!(12u32));
        let mut rels = [rel];
        resolve_relationships(&mut rels, &ctx);
        assert_eq!(rels[0].target_id, "f1");

        let mut rel2 = Relationship::new(RelationKind::Calls, "a.ts", placeholder("helper"));
        rel2.properties.insert("ref_line".to_string(), json!(25u32));
        let mut rels2 = [rel2];
        resolve_relationships(&mut rels2, &ctx);
        assert_eq!(rels2[0].target_id, "f2");
    }

    #[test]
    fn sql_view_query_text_produces_references_edge() {
        let mut table = entity("s.t", EntityKind::SQLTable, "s.t");
        table.attributes.insert("queryText".to_string(), json!(""));
        let mut view = entity("s.v", EntityKind::SQLView, "s.v");
        view.attributes.insert("queryText".to_string(), json!("SELECT c FROM s.t"));
        let entities = vec![table, view];
        let rels = resolve_sql_references(&entities);
        assert!(rels.iter().any(|r| r.source_id == "s.v" && r.target_id == "s.t"));
    }
}
