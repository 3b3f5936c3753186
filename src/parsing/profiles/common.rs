//! Handler functions shared across language profiles.
//!
//! Each handler dispatches on the CST node's own `kind` string to decide
//! the entity/relationship kind to emit, so the *same* function can be
//! registered under several grammar-specific node-type tags across
//! different language tables (§9: a table keyed by node-type tag mapping
//! to a handler function).

use serde_json::json;

use crate::graph::{placeholder, Entity, EntityKind, RelationKind, Relationship};
use crate::parsing::visitor::{Outcome, VisitCtx};

fn container_kind_for(node_kind: &str) -> EntityKind {
    if node_kind.contains("interface") {
        EntityKind::Interface
    } else if node_kind.contains("struct") {
        EntityKind::Struct
    } else {
        EntityKind::Class
    }
}

/// `namespace_declaration` / `package_clause`-shaped nodes: emits the
/// entity and a DECLARES_NAMESPACE edge from File, sets current
/// namespace for the subtree.
pub fn handle_namespace(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let file_id = ctx.file_canonical_id.clone();
    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::NamespaceDeclaration,
        &name,
        None,
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(RelationKind::DeclaresNamespace, file_id, entity_id.clone()));
    ctx.record_symbol(&entity_id, EntityKind::NamespaceDeclaration, &name, ctx.node(idx).start_row + 1);
    ctx.current_namespace = Some(entity_id);
    Outcome::Continue
}

/// `class_declaration` / `interface_declaration` / `struct_specifier`
/// -shaped nodes: emits the container under the current namespace (or
/// File), records EXTENDS/IMPLEMENTS to each base-list member as a
/// placeholder, sets current container.
pub fn handle_container(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let kind = container_kind_for(&ctx.node(idx).kind.clone());
    let parent = ctx.current_namespace.clone();
    let parent_id = parent.clone().unwrap_or_else(|| ctx.file_canonical_id.clone());
    let declares_kind = match kind {
        EntityKind::Interface => RelationKind::DefinesInterface,
        EntityKind::Struct => RelationKind::DefinesStruct,
        _ => RelationKind::DefinesClass,
    };

    let entity = Entity::new(
        &ctx.file_path,
        kind,
        &name,
        Some(&parent_id),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(declares_kind, parent_id, entity_id.clone()));
    ctx.record_symbol(&entity_id, kind, &name, ctx.node(idx).start_row + 1);

    for base_name in base_list_names(ctx, idx) {
        // Open Question 2: emit IMPLEMENTS for every base at extraction
        // time; the resolver promotes the first Class-kind match to
        // EXTENDS.
        ctx.relationships.push(Relationship::new(
            RelationKind::Implements,
            entity_id.clone(),
            placeholder(&base_name),
        ));
    }

    ctx.current_container = Some(entity_id);
    Outcome::Continue
}

fn base_list_names(ctx: &VisitCtx, idx: usize) -> Vec<String> {
    let Some(base_list_idx) = ctx
        .child_by_field(idx, "bases")
        .or_else(|| ctx.first_child_of_kind(idx, "base_list"))
        .or_else(|| ctx.first_child_of_kind(idx, "superclasses"))
        .or_else(|| ctx.first_child_of_kind(idx, "class_heritage"))
    else {
        return Vec::new();
    };

    ctx.node(base_list_idx)
        .children
        .iter()
        .filter(|&&c| ctx.node(c).is_named)
        .map(|&c| ctx.text(c).trim_start_matches(':').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `method_definition` / `method_declaration` / `function_declaration`
/// / `function_definition`-shaped nodes. Emits Method under the current
/// container with HAS_METHOD, or Function under the current namespace
/// (or File) otherwise.
pub fn handle_function_like(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let params = extract_param_types(ctx, idx);

    let (kind, parent_id, declare_rel) = match ctx.current_container.clone() {
        Some(container) => (EntityKind::Method, container, RelationKind::HasMethod),
        None => {
            let parent = ctx.current_namespace.clone().unwrap_or_else(|| ctx.file_canonical_id.clone());
            (EntityKind::Function, parent, RelationKind::Defines)
        }
    };

    let entity = Entity::new(
        &ctx.file_path,
        kind,
        &name,
        Some(&parent_id),
        Some(&params),
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(declare_rel, parent_id, entity_id.clone()));
    ctx.record_symbol(&entity_id, kind, &name, ctx.node(idx).start_row + 1);

    ctx.current_function = Some(entity_id);
    Outcome::Continue
}

fn extract_param_types(ctx: &VisitCtx, idx: usize) -> Vec<String> {
    let Some(params_idx) = ctx
        .child_by_field(idx, "parameters")
        .or_else(|| ctx.first_child_of_kind(idx, "parameters"))
        .or_else(|| ctx.first_child_of_kind(idx, "parameter_list"))
    else {
        return Vec::new();
    };
    ctx.node(params_idx)
        .children
        .iter()
        .filter(|&&c| ctx.node(c).is_named)
        .map(|&c| ctx.text(c).to_string())
        .collect()
}

/// `field_declaration` / `property_declaration`-shaped nodes.
pub fn handle_property_like(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(name) = ctx.declared_name(idx) else {
        return Outcome::Continue;
    };
    let kind = if ctx.node(idx).kind.contains("field") {
        EntityKind::Field
    } else {
        EntityKind::Property
    };
    let declare_rel = if kind == EntityKind::Field {
        RelationKind::HasField
    } else {
        RelationKind::HasProperty
    };
    let parent_id = ctx
        .current_container
        .clone()
        .unwrap_or_else(|| ctx.file_canonical_id.clone());

    let entity = Entity::new(
        &ctx.file_path,
        kind,
        &name,
        Some(&parent_id),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    );
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);
    ctx.relationships
        .push(Relationship::new(declare_rel, parent_id, entity_id.clone()));
    ctx.record_symbol(&entity_id, kind, &name, ctx.node(idx).start_row + 1);
    Outcome::Continue
}

/// `import_statement` / `import_from_statement` / `using_directive` /
/// `import_declaration`-shaped nodes.
pub fn handle_import_like(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let source_text = ctx.text(idx).trim().to_string();
    let module_name = extract_imported_module(&source_text);
    let is_static = ctx.node(idx).kind.contains("using") && source_text.contains("static");

    let entity = Entity::new(
        &ctx.file_path,
        EntityKind::Import,
        &module_name,
        Some(&ctx.file_canonical_id.clone()),
        None,
        ctx.language.tag(),
        ctx.span_of(idx),
        ctx.now,
    )
    .with_attribute("alias", serde_json::Value::Null)
    .with_attribute("isStatic", json!(is_static))
    .with_attribute("sourceModule", json!(module_name.clone()));
    let entity_id = entity.canonical_id.clone();
    ctx.nodes.push(entity);

    ctx.relationships.push(Relationship::new(
        RelationKind::Imports,
        ctx.file_canonical_id.clone(),
        entity_id,
    ));
    Outcome::Stop
}

fn extract_imported_module(text: &str) -> String {
    text.trim_matches(|c: char| c == ';' || c.is_whitespace())
        .trim_start_matches("import")
        .trim_start_matches("using")
        .trim_start_matches("from")
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

/// `call_expression` / `call`-shaped nodes: emits CALLS from the
/// enclosing function/method to a placeholder callee, preserving the
/// object segment for member calls. Special-cases a bare `require(...)`
/// call into an IMPORTS edge against a synthesized external-module id.
pub fn handle_call_like(ctx: &mut VisitCtx, idx: usize) -> Outcome {
    let Some(callee_idx) = ctx
        .child_by_field(idx, "function")
        .or_else(|| ctx.first_child_of_kind(idx, "identifier"))
    else {
        return Outcome::Continue;
    };
    let callee = ctx.text(callee_idx).to_string();
    let line = ctx.node(idx).start_row + 1;
    let source_id = ctx.enclosing_entity_id();

    if callee == "require" {
        if let Some(module) = extract_first_string_arg(ctx, idx) {
            let target = format!("{}::Module::{}", "javascript", module);
            ctx.relationships.push(
                Relationship::new(RelationKind::Imports, source_id, target).with_property("method", json!("require")),
            );
            return Outcome::Continue;
        }
    }

    ctx.relationships.push(
        Relationship::new(RelationKind::Calls, source_id, placeholder(&callee)).with_property("ref_line", json!(line)),
    );
    Outcome::Continue
}

fn extract_first_string_arg(ctx: &VisitCtx, idx: usize) -> Option<String> {
    let args_idx = ctx
        .child_by_field(idx, "arguments")
        .or_else(|| ctx.first_child_of_kind(idx, "arguments"))?;
    let string_idx = ctx
        .node(args_idx)
        .children
        .iter()
        .copied()
        .find(|&c| ctx.node(c).kind.contains("string"))?;
    Some(ctx.text(string_idx).trim_matches('"').trim_matches('\'').to_string())
}
