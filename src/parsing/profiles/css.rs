//! CSS handlers (§4.5). A `rule_set` becomes a CSSRule, each selector
//! within its `selectors` node a CSSSelector, and each `declaration` in
//! its body a CSSProperty.

use crate::graph::{Entity, EntityKind, RelationKind, Relationship};
use crate::parsing::visitor::{NodeTable, Outcome, VisitCtx};

pub fn table() -> NodeTable {
    NodeTable::new().on("rule_set", handle_rule).on("declaration", handle_declaration)
}

fn handle_rule(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let selector_text = ctx
        .first_child_of_kind(idx, "selectors")
        .map(|s| ctx.text(s).to_string())
        .unwrap_or_else(|| format!("rule@{}", ctx.node(idx).start_row + 1));

    let rule_entity = Entity::new(
        &ctx.file_path,
        EntityKind::CSSRule,
        &selector_text,
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let rule_id = rule_entity.canonical_id.clone();
    ctx.nodes.push(rule_entity);
    ctx.relationships
        .push(Relationship::new(RelationKind::Contains, ctx.file_canonical_id.clone(), rule_id.clone()));

    if let Some(selectors_idx) = ctx.first_child_of_kind(idx, "selectors") {
        for &selector_idx in &ctx.node(selectors_idx).children.clone() {
            if !ctx.node(selector_idx).is_named {
                continue;
            }
            let sel_entity = Entity::new(
                &ctx.file_path,
                EntityKind::CSSSelector,
                ctx.text(selector_idx),
                Some(&rule_id),
                None,
                ctx.language.tag(),
                ctx.span_of(selector_idx),
                ctx.now,
            );
            let sel_id = sel_entity.canonical_id.clone();
            ctx.nodes.push(sel_entity);
            ctx.relationships
                .push(Relationship::new(RelationKind::Styles, sel_id, rule_id.clone()));
        }
    }

    ctx.current_container = Some(rule_id);
    Outcome::Continue
}

fn handle_declaration(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(property_idx) = ctx.first_child_of_kind(idx, "property_name") else {
        return Outcome::Continue;
    };
    let property_name = ctx.text(property_idx).to_string();
    let parent_id = ctx.current_container.clone().unwrap_or_else(|| ctx.file_canonical_id.clone());

    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::CSSProperty,
        &property_name,
        Some(&parent_id),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(RelationKind::Defines, parent_id, entity_id));
    Outcome::Continue
}
