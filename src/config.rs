//! Layered configuration for the extractor.
//!
//! Precedence, lowest to highest: compiled-in defaults, an optional TOML
//! file, environment variables.
//!
//! # Environment variables
//!
//! Prefixed with `PGX_` and using double underscores to separate nested
//! levels:
//! - `PGX_DISPATCHER__WORKER_COUNT=4` sets `dispatcher.worker_count`
//! - `PGX_WATCH__DEBOUNCE_MS=500` sets `watch.debounce_ms`
//! - `PGX_LANGUAGES__PYTHON__ENABLED=false` disables the Python visitor

use std::collections::HashMap;
use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directories scanned by a full `analyze` run.
    #[serde(default = "default_scan_roots")]
    pub scan_roots: Vec<PathBuf>,

    /// File extensions admitted into extraction; empty means "all
    /// extensions the grammar registry recognizes".
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns excluded from scanning, in addition to `.gitignore`.
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    /// Opaque connection parameters for the store; the core never
    /// interprets these, only passes them through.
    #[serde(default)]
    pub store: HashMap<String, String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatcherConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_respawn_backoff_secs")]
    pub respawn_backoff_secs: u64,

    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, used unless `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module filter overrides, appended as `module=level`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_scan_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}
fn default_ignore_globs() -> Vec<String> {
    vec![
        "target/**".to_string(),
        "node_modules/**".to_string(),
        ".git/**".to_string(),
        "dist/**".to_string(),
    ]
}
fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_respawn_backoff_secs() -> u64 {
    5
}
fn default_pending_capacity() -> usize {
    256
}
fn default_shutdown_grace_secs() -> u64 {
    2
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            scan_roots: default_scan_roots(),
            extensions: Vec::new(),
            ignore_globs: default_ignore_globs(),
            dispatcher: DispatcherConfig::default(),
            watch: WatchConfig::default(),
            languages: HashMap::new(),
            store: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            request_timeout_secs: default_request_timeout_secs(),
            respawn_backoff_secs: default_respawn_backoff_secs(),
            pending_capacity: default_pending_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from compiled-in defaults, an optional TOML file,
    /// and `PGX_`-prefixed environment variables, in that precedence
    /// order.
    pub fn load(config_path: Option<&std::path::Path>) -> GraphResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment = figment.merge(Env::prefixed("PGX_").split("__"));
        figment
            .extract()
            .map_err(|e| GraphError::General(format!("failed to load configuration: {e}")))
    }
}
