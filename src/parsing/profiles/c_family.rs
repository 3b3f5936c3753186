//! C and C++ share `tree-sitter-c`/`tree-sitter-cpp`'s declarator
//! shapes closely enough to reuse the same table; C++'s `class_specifier`
//! is the only addition C lacks.

use crate::graph::{Entity, EntityKind, RelationKind, Relationship};
use crate::parsing::profiles::common;
use crate::parsing::visitor::{NodeTable, Outcome, VisitCtx};

pub fn table() -> NodeTable {
    NodeTable::new()
        .on("struct_specifier", common::handle_container)
        .on("class_specifier", common::handle_container)
        .on("function_definition", common::handle_function_like)
        .on("field_declaration", common::handle_property_like)
        .on("preproc_include", handle_include)
        .on("call_expression", common::handle_call_like)
}

/// `preproc_include` carries its header path verbatim in source text
/// rather than in a field tree-sitter-c tags consistently across
/// versions, so this reads the raw text directly instead of going
/// through `declared_name`.
fn handle_include(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let text = ctx.text(idx).trim().to_string();
    let path = text
        .trim_start_matches('#')
        .trim_start_matches("include")
        .trim()
        .trim_matches('"')
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();
    if path.is_empty() {
        return Outcome::Continue;
    }

    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::Import,
        &path,
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships.push(Relationship::new(
        RelationKind::Includes,
        ctx.file_canonical_id.clone(),
        entity_id,
    ));
    Outcome::Continue
}
