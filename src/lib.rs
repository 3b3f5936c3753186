//! A polyglot code-graph extractor: parses TypeScript, JavaScript, TSX,
//! Python, SQL, Go, Java, C#, C, C++, HTML, and CSS into a shared entity
//! and relationship graph, keeping it in sync with the filesystem
//! through batch analysis and incremental watch-driven reconciliation.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod identity;
pub mod logging;
pub mod parsing;
pub mod reconcile;
pub mod resolver;
pub mod scan;
pub mod store;
pub mod symbol_index;
pub mod utils;
pub mod watch;

pub use config::Settings;
pub use coordinator::Coordinator;
pub use error::{GraphError, GraphResult};
pub use graph::{Entity, EntityKind, RelationKind, Relationship, Span, Subgraph};
pub use parsing::{Dispatcher, GrammarRegistry, Language};
pub use store::GraphStore;
