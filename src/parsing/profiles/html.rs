//! HTML handlers (§4.5). `current_container` is reused as "the
//! innermost enclosing element id" since HTML nesting is structurally
//! identical to the class/namespace nesting the field was named for.

use crate::graph::{placeholder, Entity, EntityKind, RelationKind, Relationship};
use crate::parsing::visitor::{NodeTable, Outcome, VisitCtx};

pub fn table() -> NodeTable {
    NodeTable::new()
        .on("element", handle_element)
        .on("script_element", handle_element)
        .on("style_element", handle_element)
}

fn handle_element(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let tag_name = start_tag_name(ctx, idx).unwrap_or_else(|| ctx.node(idx).kind.clone());
    let parent_id = ctx.current_container.clone().unwrap_or_else(|| ctx.file_canonical_id.clone());

    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::HTMLElement,
        &tag_name,
        Some(&parent_id),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(RelationKind::Contains, parent_id, entity_id.clone()));

    for (attr_name, attr_idx) in start_tag_attributes(ctx, idx) {
        let attr_entity = Entity::new(
            &ctx.file_path,
            EntityKind::HTMLAttribute,
            &attr_name,
            Some(&entity_id),
            None,
            ctx.language.tag(),
            ctx.span_of(attr_idx),
            ctx.now,
        );
        let attr_id = attr_entity.canonical_id.clone();
        ctx.nodes.push(attr_entity);
        ctx.relationships
            .push(Relationship::new(RelationKind::HasAttribute, entity_id.clone(), attr_id));

        let Some(value) = attribute_value(ctx, attr_idx) else {
            continue;
        };
        if tag_name.eq_ignore_ascii_case("script") && attr_name.eq_ignore_ascii_case("src") {
            ctx.relationships
                .push(Relationship::new(RelationKind::Includes, entity_id.clone(), placeholder(&value)));
        } else if tag_name.eq_ignore_ascii_case("link") && attr_name.eq_ignore_ascii_case("href") {
            ctx.relationships
                .push(Relationship::new(RelationKind::References, entity_id.clone(), placeholder(&value)));
        } else if attr_name.len() > 2 && attr_name[..2].eq_ignore_ascii_case("on") {
            ctx.relationships
                .push(Relationship::new(RelationKind::Calls, entity_id.clone(), placeholder(&value)));
        }
    }

    ctx.current_container = Some(entity_id);
    Outcome::Continue
}

fn start_tag_name(ctx: &VisitCtx, idx: usize) -> Option<String> {
    let start_tag = ctx.first_child_of_kind(idx, "start_tag").or_else(|| ctx.first_child_of_kind(idx, "self_closing_tag"))?;
    let name_idx = ctx.first_child_of_kind(start_tag, "tag_name")?;
    Some(ctx.text(name_idx).to_string())
}

/// An attribute's value text, unwrapping `quoted_attribute_value` down
/// to the bare `attribute_value` inside it where the grammar nests one.
fn attribute_value(ctx: &VisitCtx, attr_idx: usize) -> Option<String> {
    if let Some(quoted) = ctx.first_child_of_kind(attr_idx, "quoted_attribute_value") {
        return Some(
            ctx.first_child_of_kind(quoted, "attribute_value")
                .map(|v| ctx.text(v).to_string())
                .unwrap_or_else(|| ctx.text(quoted).trim_matches('"').trim_matches('\'').to_string()),
        );
    }
    ctx.first_child_of_kind(attr_idx, "attribute_value").map(|v| ctx.text(v).to_string())
}

fn start_tag_attributes(ctx: &VisitCtx, idx: usize) -> Vec<(String, usize)> {
    let Some(start_tag) = ctx.first_child_of_kind(idx, "start_tag").or_else(|| ctx.first_child_of_kind(idx, "self_closing_tag")) else {
        return Vec::new();
    };
    ctx.node(start_tag)
        .children
        .iter()
        .filter(|&&c| ctx.node(c).kind == "attribute")
        .filter_map(|&c| ctx.first_child_of_kind(c, "attribute_name").map(|n| (ctx.text(n).to_string(), c)))
        .collect()
}
