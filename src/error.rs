//! Layered error taxonomy, one enum per subsystem boundary.
//!
//! Every disposition named in the error-handling design is represented
//! here with the appropriate variant; logging the chosen level for each
//! disposition is the caller's job (see [`crate::log_event`] /
//! [`crate::debug_event`] call sites in dispatcher, resolver, and
//! reconciler).

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the grammar registry, parser worker, and dispatcher.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no loadable grammar for language '{language}'")]
    GrammarUnavailable { language: String },

    #[error("parse of {path} failed: {reason}")]
    ParseFailure { path: PathBuf, reason: String },

    #[error("parse request {request_id} timed out")]
    ParseTimeout { request_id: String },

    #[error("parser worker exited or its channel broke")]
    WorkerGone,

    #[error("dispatcher pending-request map is full")]
    DispatcherBusy,
}

/// Errors from pass-two symbol resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("symbol index unavailable for resolution: {0}")]
    IndexUnavailable(String),

    #[error("resolution failed: {0}")]
    Failed(String),
}

/// Errors surfaced by a `GraphStore` implementation (§6 store contract).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write to store: {0}")]
    WriteFailed(String),

    #[error("failed to read from store: {0}")]
    ReadFailed(String),

    #[error("store entry not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from filesystem-watch initialization and handler dispatch.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("filesystem event error: {details}")]
    EventError { details: String },

    #[error("handler '{handler}' failed for {path}: {reason}")]
    HandlerFailed {
        handler: String,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to load config: {reason}")]
    ConfigError { reason: String },

    #[error("watch event channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Top-level error returned by the coordinator and CLI.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A canonical-id or gid collision across different spans. Fatal to
    /// the current batch; never logged-and-continued.
    #[error("invariant violated: {message} (entity_a={entity_a}, entity_b={entity_b:?})")]
    Invariant {
        message: String,
        entity_a: String,
        entity_b: Option<String>,
    },

    #[error("{0}")]
    General(String),
}

impl GraphError {
    /// Actionable next steps for this error, surfaced to CLI users.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            GraphError::Parse(ParseError::GrammarUnavailable { .. }) => vec![
                "check that the language is in the supported set",
                "confirm the corresponding tree-sitter grammar crate is compiled in",
            ],
            GraphError::Parse(ParseError::ParseFailure { .. }) => {
                vec!["the file is skipped; prior graph data for it is left untouched"]
            }
            GraphError::Parse(ParseError::ParseTimeout { .. }) => {
                vec!["increase the dispatcher request timeout in settings"]
            }
            GraphError::Parse(ParseError::WorkerGone) => {
                vec!["the dispatcher will respawn the worker automatically"]
            }
            GraphError::Parse(ParseError::DispatcherBusy) => {
                vec!["retry with backoff; raise the pending-map capacity in settings"]
            }
            GraphError::Resolve(_) => vec!["unresolved relationships are retained with a placeholder target"],
            GraphError::Store(_) => vec!["re-run `analyze` with `--reset-db` if the store is corrupted"],
            GraphError::Watch(_) => vec!["check filesystem permissions on the watched directory"],
            GraphError::Invariant { .. } => {
                vec!["inspect both entities named in the error for a canonical-id or gid collision"]
            }
            GraphError::General(_) => vec![],
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
pub type ParseResult<T> = Result<T, ParseError>;
pub type ResolveResult<T> = Result<T, ResolveError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_recovery_suggestions_reference_both_entities() {
        let err = GraphError::Invariant {
            message: "gid collision".into(),
            entity_a: "a".into(),
            entity_b: Some("b".into()),
        };
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn parse_error_converts_into_graph_error() {
        let err: GraphError = ParseError::WorkerGone.into();
        assert!(matches!(err, GraphError::Parse(ParseError::WorkerGone)));
    }
}
