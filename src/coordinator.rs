//! Glues scan → dispatch → visit → hints → resolve → reconcile into the
//! two entry points the CLI drives: a one-shot `analyze` over a
//! directory tree, and a long-running `watch` loop that reconciles one
//! file at a time.
//!
//! The symbol index is accumulated in memory across the whole run
//! rather than rebuilt from the store on every file, since this corpus
//! treats the store as a write-mostly sink (§6) rather than a queryable
//! source of truth the core reads back from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::config::Settings;
use crate::error::{GraphError, GraphResult, ParseError};
use crate::graph::{Entity, Relationship};
use crate::parsing::hints::{hints_to_relationships, scan_hints};
use crate::parsing::language::Language;
use crate::parsing::profiles::build_table_for;
use crate::parsing::visitor::visit_tree;
use crate::parsing::Dispatcher;
use crate::reconcile::{reconcile_file, ReconcileStats};
use crate::resolver::{resolve_relationships, resolve_sql_references, ResolverContext};
use crate::scan::{DefaultScanner, Scanner};
use crate::store::GraphStore;
use crate::symbol_index::SymbolIndex;
use crate::{debug_event, log_event};

/// One file's freshly extracted, not-yet-resolved subgraph.
struct Extraction {
    file: String,
    nodes: Vec<Entity>,
    relationships: Vec<Relationship>,
}

pub struct Coordinator {
    dispatcher: Dispatcher,
    store: Arc<dyn GraphStore>,
    settings: Settings,
    symbols: Mutex<SymbolIndex>,
}

impl Coordinator {
    pub fn new(dispatcher: Dispatcher, store: Arc<dyn GraphStore>, settings: Settings) -> Self {
        Self {
            dispatcher,
            store,
            settings,
            symbols: Mutex::new(SymbolIndex::new()),
        }
    }

    /// Parse one file and run its visitor profile, producing an
    /// unresolved subgraph plus the symbol declarations it contributes.
    /// Registers those declarations into the shared index immediately so
    /// later files in the same batch can see earlier ones.
    async fn extract(&self, path: &Path) -> GraphResult<Extraction> {
        let language = Language::from_path(path).ok_or_else(|| {
            GraphError::Parse(ParseError::GrammarUnavailable {
                language: path.extension().and_then(|e| e.to_str()).unwrap_or("?").to_string(),
            })
        })?;

        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GraphError::General(format!("reading {}: {e}", path.display())))?;

        let file_str = crate::identity::normalize_path(&path.to_string_lossy());
        let tree = self.dispatcher.parse(language.tag(), Some(&file_str), &source).await?;

        let table = build_table_for(language);
        let now = crate::utils::get_utc_timestamp();
        let mut ctx = visit_tree(&tree, &table, &file_str, language, now);

        let attribute_to_nearest = false; // Open Question 1 default.
        let nearest = ctx
            .current_function
            .clone()
            .or_else(|| ctx.nodes.last().map(|e| e.canonical_id.clone()));
        let hints = scan_hints(&source);
        ctx.relationships.extend(hints_to_relationships(
            &hints,
            &ctx.file_canonical_id,
            nearest.as_deref(),
            attribute_to_nearest,
        ));

        debug_event!(
            "coordinator",
            "extracted file",
            "{file_str}: {} nodes, {} rels, {} declarations ({} cst node kinds handled)",
            ctx.nodes.len(),
            ctx.relationships.len(),
            ctx.symbols.len(),
            ctx.tracker.count()
        );

        {
            let mut symbols = self.symbols.lock();
            symbols.remove_file(&file_str);
            symbols.extend(ctx.symbols);
        }

        Ok(Extraction {
            file: file_str,
            nodes: ctx.nodes,
            relationships: ctx.relationships,
        })
    }

    /// Resolve and reconcile every extraction in `batch` against the
    /// store. Resolution reads a single shared symbol index built from
    /// the whole batch; reconciliation then fans out across files with
    /// rayon, since each file's upsert/delete set touches only its own
    /// rows and the store tolerates concurrent writers (§5).
    fn resolve_and_reconcile(&self, batch: Vec<Extraction>) -> GraphResult<ReconcileStats> {
        let all_nodes: Vec<Entity> = batch.iter().flat_map(|e| e.nodes.clone()).collect();
        let symbols = self.symbols.lock();
        let resolver_ctx = ResolverContext::new(&symbols, &all_nodes);

        let resolved: Vec<(String, Vec<Entity>, Vec<Relationship>)> = batch
            .into_iter()
            .map(|extraction| {
                let mut rels = extraction.relationships;
                resolve_relationships(&mut rels, &resolver_ctx);
                rels.extend(resolve_sql_references(&extraction.nodes));
                (extraction.file, extraction.nodes, rels)
            })
            .collect();
        drop(symbols);

        resolved
            .into_par_iter()
            .map(|(file, nodes, rels)| reconcile_file(self.store.as_ref(), &file, nodes, rels))
            .try_reduce(ReconcileStats::default, |mut totals, stats| {
                totals.nodes_upserted += stats.nodes_upserted;
                totals.rels_upserted += stats.rels_upserted;
                totals.nodes_deleted += stats.nodes_deleted;
                totals.rels_deleted += stats.rels_deleted;
                Ok(totals)
            })
            .map_err(GraphError::from)
    }

    /// Scan `root`, extract every recognized file, then resolve and
    /// reconcile the whole batch at once so cross-file references (an
    /// import naming a symbol declared in a sibling file) see every
    /// declaration before resolution runs.
    pub async fn analyze(&self, root: &Path) -> GraphResult<ReconcileStats> {
        let scanner = DefaultScanner::new(self.settings.extensions.clone(), self.settings.ignore_globs.clone());
        let files = scanner.scan(root);
        log_event!("coordinator", "scan complete", "{} files under {}", files.len(), root.display());

        let mut batch = Vec::with_capacity(files.len());
        for file in &files {
            match self.extract(file).await {
                Ok(extraction) => batch.push(extraction),
                Err(e) => log_event!("coordinator", "skipping file after extraction error", "{}: {e}", file.display()),
            }
        }

        self.resolve_and_reconcile(batch)
    }

    /// Reconcile a single changed or deleted file. A deleted file
    /// resolves against no new relationships and reconciles to an empty
    /// subgraph (§4.9).
    pub async fn reconcile_one(&self, path: &Path, deleted: bool) -> GraphResult<ReconcileStats> {
        let file_str = crate::identity::normalize_path(&path.to_string_lossy());
        if deleted {
            self.symbols.lock().remove_file(&file_str);
            return Ok(reconcile_file(self.store.as_ref(), &file_str, Vec::new(), Vec::new())?);
        }

        let extraction = self.extract(path).await?;
        self.resolve_and_reconcile(vec![extraction])
    }

    pub fn debounce_ms(&self) -> u64 {
        self.settings.watch.debounce_ms
    }
}

pub fn normalize_path_for_display(path: &Path) -> PathBuf {
    PathBuf::from(crate::identity::normalize_path(&path.to_string_lossy()))
}
