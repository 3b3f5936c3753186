//! JavaScript / TypeScript / TSX share a grammar lineage closely enough
//! that one table covers all three (§4.5 scenario 3: function + bare
//! `require()` call).

use crate::parsing::profiles::common;
use crate::parsing::visitor::NodeTable;

pub fn table() -> NodeTable {
    NodeTable::new()
        .on("class_declaration", common::handle_container)
        .on("interface_declaration", common::handle_container)
        .on("function_declaration", common::handle_function_like)
        .on("method_definition", common::handle_function_like)
        .on("public_field_definition", common::handle_property_like)
        .on("import_statement", common::handle_import_like)
        .on("call_expression", common::handle_call_like)
}
