//! Parsing subsystem (§4.2-4.5): grammar registry, the out-of-process
//! worker and its dispatcher, the generic CST visitor engine, the
//! per-language node-type profiles built on it, and hint-comment
//! scanning.

pub mod dispatcher;
pub mod grammar;
pub mod hints;
pub mod language;
pub mod profiles;
pub mod visitor;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use grammar::GrammarRegistry;
pub use language::Language;
