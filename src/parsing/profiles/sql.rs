//! SQL DDL/DML handlers (§4.5 scenario 2, Open Question 3). Column
//! definitions are pulled directly out of the `create_table` subtree
//! rather than registered as their own top-level handler, since
//! `tree-sitter-sequel` nests them without a stable outer marker.

use serde_json::json;

use crate::graph::{Entity, EntityKind, RelationKind, Relationship};
use crate::parsing::visitor::{NodeTable, Outcome, VisitCtx};

pub fn table() -> NodeTable {
    NodeTable::new()
        .on("create_table", handle_create_table)
        .on("create_view", handle_create_view)
        .on("select_statement", |ctx, idx| handle_statement(ctx, idx, EntityKind::SQLSelectStatement))
        .on("insert_statement", |ctx, idx| handle_statement(ctx, idx, EntityKind::SQLInsertStatement))
        .on("update_statement", |ctx, idx| handle_statement(ctx, idx, EntityKind::SQLUpdateStatement))
        .on("delete_statement", |ctx, idx| handle_statement(ctx, idx, EntityKind::SQLDeleteStatement))
}

fn handle_create_table(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let table_entity = Entity::new(
        &ctx.file_path,
        EntityKind::SQLTable,
        &name,
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let table_id = table_entity.canonical_id.clone();
    ctx.nodes.push(table_entity);
    ctx.relationships.push(Relationship::new(
        RelationKind::DefinesTable,
        ctx.file_canonical_id.clone(),
        table_id.clone(),
    ));
    ctx.record_symbol(&table_id, EntityKind::SQLTable, &name, ctx.node(idx).start_row + 1);

    for column_idx in find_column_definitions(ctx, idx) {
        let Some(column_name) = ctx.declared_name(column_idx) else {
            continue;
        };
        let column_entity = Entity::new(
            &ctx.file_path,
            EntityKind::SQLColumn,
            &column_name,
            Some(&table_id),
            None,
            ctx.language.tag(),
            ctx.span_of(column_idx),
            ctx.now,
        );
        let column_id = column_entity.canonical_id.clone();
        ctx.nodes.push(column_entity);
        ctx.relationships.push(Relationship::new(RelationKind::HasColumn, table_id.clone(), column_id));
    }

    Outcome::Stop
}

fn find_column_definitions(ctx: &VisitCtx, idx: usize) -> Vec<usize> {
    fn walk(ctx: &VisitCtx, idx: usize, out: &mut Vec<usize>) {
        for &child in &ctx.node(idx).children {
            if ctx.node(child).kind == "column_definition" {
                out.push(child);
            } else {
                walk(ctx, child, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(ctx, idx, &mut out);
    out
}

fn handle_create_view(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let query_text = ctx.text(idx).to_string();
    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::SQLView,
        &name,
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    )
    .with_attribute("queryText", json!(query_text));
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships.push(Relationship::new(
        RelationKind::DefinesView,
        ctx.file_canonical_id.clone(),
        entity_id.clone(),
    ));
    ctx.record_symbol(&entity_id, EntityKind::SQLView, &name, ctx.node(idx).start_row + 1);
    Outcome::Stop
}

fn handle_statement(ctx: &mut VisitCtx, idx: usize, kind: EntityKind) -> Outcome {
    let query_text = ctx.text(idx).to_string();
    let line = ctx.node(idx).start_row + 1;
    let entity = Entity::new(
        &ctx.file_path,
        kind,
        &format!("{}_{line}", statement_kind_word(kind)),
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    )
    .with_attribute("queryText", json!(query_text));
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships.push(Relationship::new(RelationKind::Contains, ctx.file_canonical_id.clone(), entity_id));
    Outcome::Stop
}

fn statement_kind_word(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::SQLSelectStatement => "select",
        EntityKind::SQLInsertStatement => "insert",
        EntityKind::SQLUpdateStatement => "update",
        EntityKind::SQLDeleteStatement => "delete",
        _ => "stmt",
    }
}
