use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use polyglot_graph::config::Settings;
use polyglot_graph::coordinator::Coordinator;
use polyglot_graph::parsing::worker::run_worker;
use polyglot_graph::parsing::Dispatcher;
use polyglot_graph::store::memory::InMemoryStore;
use polyglot_graph::{log_event, logging};

/// Internal flag the binary passes to itself when re-invoked as a
/// parser worker process (§10.4). Not part of the public CLI surface.
const WORKER_FLAG: &str = "--__parser-worker";

#[derive(Parser)]
#[command(name = "polyglot-graph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extracts a polyglot code graph from a source tree")]
struct Cli {
    /// Path to a TOML config file, merged over compiled-in defaults and
    /// under `PGX_`-prefixed environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full extraction over a directory tree.
    Analyze {
        path: PathBuf,

        /// Drop all existing entities under the store's scan roots first.
        #[arg(long)]
        reset_db: bool,

        /// Re-apply the store's schema/constraints before writing.
        #[arg(long)]
        update_schema: bool,

        /// Override a store connection parameter, e.g. `--store url=...`.
        #[arg(long = "store", value_parser = parse_key_val)]
        store_overrides: Vec<(String, String)>,
    },

    /// Watch a directory tree, reconciling the graph as files change.
    Watch {
        path: PathBuf,

        /// Override a store connection parameter, e.g. `--store url=...`.
        #[arg(long = "store", value_parser = parse_key_val)]
        store_overrides: Vec<(String, String)>,
    },

    /// Write a default configuration file.
    Init {
        #[arg(short, long, default_value = "pgx.toml")]
        output: PathBuf,

        #[arg(short, long)]
        force: bool,
    },

    /// Print the fully resolved configuration (defaults + file + env).
    Config,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected `key=value`, got `{s}`"))?;
    Ok((k.to_string(), v.to_string()))
}

fn main() {
    let raw_args: Vec<String> = std::env::args().collect();
    if raw_args.get(1).map(String::as_str) == Some(WORKER_FLAG) {
        if let Err(e) = run_worker() {
            eprintln!("worker exited: {e}");
            std::process::exit(1);
        }
        return;
    }

    let code = match run() {
        Ok(()) => 0,
        Err(ExitError::Config(msg)) => {
            eprintln!("configuration error: {msg}");
            2
        }
        Err(ExitError::Runtime(msg)) => {
            eprintln!("error: {msg}");
            1
        }
    };
    std::process::exit(code);
}

enum ExitError {
    Config(String),
    Runtime(String),
}

fn run() -> Result<(), ExitError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).map_err(|e| ExitError::Config(e.to_string()))?;
    logging::init_with_config(&settings.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ExitError::Runtime(e.to_string()))?;

    match cli.command {
        Commands::Init { output, force } => cmd_init(&output, force),
        Commands::Config => cmd_config(&settings),
        Commands::Analyze {
            path,
            reset_db,
            update_schema,
            store_overrides,
        } => runtime.block_on(cmd_analyze(apply_store_overrides(settings, store_overrides), &path, reset_db, update_schema)),
        Commands::Watch { path, store_overrides } => runtime.block_on(cmd_watch(apply_store_overrides(settings, store_overrides), &path)),
    }
}

fn cmd_init(output: &std::path::Path, force: bool) -> Result<(), ExitError> {
    if output.exists() && !force {
        return Err(ExitError::Runtime(format!("{} already exists; pass --force to overwrite", output.display())));
    }
    let toml = toml::to_string_pretty(&Settings::default()).map_err(|e| ExitError::Runtime(e.to_string()))?;
    std::fs::write(output, toml).map_err(|e| ExitError::Runtime(e.to_string()))?;
    println!("wrote {}", output.display());
    Ok(())
}

fn cmd_config(settings: &Settings) -> Result<(), ExitError> {
    let toml = toml::to_string_pretty(settings).map_err(|e| ExitError::Runtime(e.to_string()))?;
    println!("{toml}");
    Ok(())
}

fn apply_store_overrides(mut settings: Settings, overrides: Vec<(String, String)>) -> Settings {
    for (key, value) in overrides {
        settings.store.insert(key, value);
    }
    settings
}

fn build_coordinator(settings: Settings) -> Result<Coordinator, ExitError> {
    let worker_exe = std::env::current_exe().map_err(|e| ExitError::Runtime(e.to_string()))?;
    let dispatcher = Dispatcher::spawn(settings.dispatcher.clone(), worker_exe, vec![WORKER_FLAG.to_string()]);
    let store = Arc::new(InMemoryStore::new());
    Ok(Coordinator::new(dispatcher, store, settings))
}

async fn cmd_analyze(settings: Settings, path: &std::path::Path, reset_db: bool, update_schema: bool) -> Result<(), ExitError> {
    if reset_db {
        log_event!("cli", "reset-db requested", "store is in-memory and starts empty each run");
    }
    if update_schema {
        log_event!("cli", "update-schema requested", "store is in-memory and has no persistent schema to migrate");
    }
    let coordinator = build_coordinator(settings)?;
    let stats = coordinator.analyze(path).await.map_err(|e| ExitError::Runtime(e.to_string()))?;
    println!(
        "analyzed {}: +{} nodes, +{} rels, -{} nodes, -{} rels",
        path.display(),
        stats.nodes_upserted,
        stats.rels_upserted,
        stats.nodes_deleted,
        stats.rels_deleted
    );
    Ok(())
}

async fn cmd_watch(settings: Settings, path: &std::path::Path) -> Result<(), ExitError> {
    let debounce_ms = settings.watch.debounce_ms;
    let coordinator = build_coordinator(settings)?;
    log_event!("cli", "watching", "{} (debounce {debounce_ms}ms)", path.display());

    let watch_loop = polyglot_graph::watch::WatchLoopBuilder::new(path.to_path_buf())
        .debounce_ms(debounce_ms)
        .build()
        .map_err(|e| ExitError::Runtime(e.to_string()))?;

    watch_loop
        .run(|changed, class| {
            let coordinator = &coordinator;
            async move {
                let deleted = matches!(class, polyglot_graph::watch::FileEventClass::Deleted);
                match coordinator.reconcile_one(&changed, deleted).await {
                    Ok(stats) => log_event!(
                        "cli",
                        "reconciled",
                        "{}: +{} nodes, -{} nodes",
                        changed.display(),
                        stats.nodes_upserted,
                        stats.nodes_deleted
                    ),
                    Err(e) => log_event!("cli", "reconciliation failed", "{}: {e}", changed.display()),
                }
            }
        })
        .await
        .map_err(|e| ExitError::Runtime(e.to_string()))
}
