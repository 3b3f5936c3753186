//! Per-language node-table wiring (§4.5, §9). Each profile registers
//! the subset of a grammar's node-type tags the extractor understands
//! against shared handler functions where two grammars agree on shape,
//! or a dedicated handler where they don't.

mod c_family;
mod common;
mod css;
mod ecma;
mod html;
mod sql;

use crate::parsing::language::Language;
use crate::parsing::visitor::NodeTable;

pub fn build_table_for(language: Language) -> NodeTable {
    match language {
        Language::TypeScript | Language::Tsx | Language::JavaScript => ecma::table(),
        Language::Python => python_table(),
        Language::Go => go_table(),
        Language::Java => java_table(),
        Language::CSharp => csharp_table(),
        Language::C | Language::Cpp => c_family::table(),
        Language::Sql => sql::table(),
        Language::Html => html::table(),
        Language::Css => css::table(),
    }
}

fn python_table() -> NodeTable {
    NodeTable::new()
        .on("class_definition", common::handle_container)
        .on("function_definition", common::handle_function_like)
        .on("import_statement", common::handle_import_like)
        .on("import_from_statement", common::handle_import_like)
        .on("call", common::handle_call_like)
}

fn go_table() -> NodeTable {
    NodeTable::new()
        .on("type_declaration", common::handle_container)
        .on("function_declaration", common::handle_function_like)
        .on("method_declaration", common::handle_function_like)
        .on("import_declaration", common::handle_import_like)
        .on("call_expression", common::handle_call_like)
}

fn java_table() -> NodeTable {
    NodeTable::new()
        .on("package_declaration", common::handle_namespace)
        .on("class_declaration", common::handle_container)
        .on("interface_declaration", common::handle_container)
        .on("method_declaration", common::handle_function_like)
        .on("field_declaration", common::handle_property_like)
        .on("import_declaration", common::handle_import_like)
        .on("method_invocation", common::handle_call_like)
}

fn csharp_table() -> NodeTable {
    NodeTable::new()
        .on("namespace_declaration", common::handle_namespace)
        .on("class_declaration", common::handle_container)
        .on("interface_declaration", common::handle_container)
        .on("struct_declaration", common::handle_container)
        .on("method_declaration", common::handle_function_like)
        .on("property_declaration", common::handle_property_like)
        .on("field_declaration", common::handle_property_like)
        .on("using_directive", common::handle_import_like)
        .on("invocation_expression", common::handle_call_like)
}
