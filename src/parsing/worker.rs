//! The sandboxed parser worker and its wire protocol.
//!
//! The worker is not a separate binary: the main binary re-invokes
//! itself with a hidden flag (§10.4), the same self-exec pattern this
//! corpus uses elsewhere to spawn an auxiliary role without shipping a
//! second executable. Whatever process runs [`run_worker`] never
//! recovers from a grammar panic — it exits, and the dispatcher owns
//! respawn.

use std::collections::HashSet;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use tree_sitter::{Parser, TreeCursor};

use crate::parsing::grammar::GrammarRegistry;
use crate::parsing::language::Language;

/// A single CST node in the flattened, serializable arena.
///
/// Tree-sitter's `Node` borrows from its `Tree` and cannot cross a
/// process boundary; this is the owned, tagged-sum replacement the
/// design notes call for (§9: dynamic message shapes → tagged variants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CstNode {
    pub kind: String,
    pub is_named: bool,
    pub field_name: Option<String>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
    pub children: Vec<usize>,
}

/// A flattened CST: an arena of nodes plus the source text they index
/// into. Visitors hold indices into this arena; none of it escapes the
/// coordinator process's visit scope for that file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CstTree {
    pub root: usize,
    pub nodes: Vec<CstNode>,
    pub source: String,
    /// Node-kind names this grammar's registry probe found, threaded
    /// through so the visitor can check `has_node_kind` without its own
    /// grammar handle.
    pub node_kinds: HashSet<String>,
}

impl CstTree {
    pub fn node(&self, idx: usize) -> &CstNode {
        &self.nodes[idx]
    }

    pub fn text(&self, node: &CstNode) -> &str {
        &self.source[node.start_byte..node.end_byte]
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub request_id: String,
    pub language: String,
    pub file_path: Option<String>,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub request_id: String,
    pub ok: bool,
    pub root: Option<CstTree>,
    pub error: Option<String>,
}

/// Write one length-delimited JSON frame: a 4-byte big-endian length
/// prefix followed by the payload.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    let payload = serde_json::to_vec(value)?;
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()
}

/// Read one length-delimited JSON frame, or `Ok(None)` on clean EOF.
pub fn read_frame<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> io::Result<Option<T>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    let value = serde_json::from_slice(&payload)?;
    Ok(Some(value))
}

fn flatten_tree(cursor: &mut TreeCursor, source: &str) -> (usize, Vec<CstNode>) {
    let mut nodes = Vec::new();
    let root = flatten_node(cursor, &mut nodes, source);
    (root, nodes)
}

fn flatten_node(cursor: &mut TreeCursor, nodes: &mut Vec<CstNode>, source: &str) -> usize {
    let node = cursor.node();
    let idx = nodes.len();
    nodes.push(CstNode {
        kind: node.kind().to_string(),
        is_named: node.is_named(),
        field_name: cursor.field_name().map(|s| s.to_string()),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
        start_row: node.start_position().row as u32,
        start_col: node.start_position().column as u32,
        end_row: node.end_position().row as u32,
        end_col: node.end_position().column as u32,
        children: Vec::new(),
    });

    let mut child_indices = Vec::new();
    if cursor.goto_first_child() {
        loop {
            child_indices.push(flatten_node(cursor, nodes, source));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
    nodes[idx].children = child_indices;
    idx
}

/// Parse one request to completion, producing a response. Never panics
/// across a grammar boundary on purpose: tree-sitter grammar crashes are
/// native panics/aborts the worker process cannot catch from within
/// itself, which is exactly why isolation happens at the process level
/// rather than with `catch_unwind` here.
pub fn handle_request(registry: &GrammarRegistry, request: WorkerRequest) -> WorkerResponse {
    let language = match Language::from_tag(&request.language) {
        Some(l) => l,
        None => {
            return WorkerResponse {
                request_id: request.request_id,
                ok: false,
                root: None,
                error: Some(format!("unknown language tag '{}'", request.language)),
            }
        }
    };

    let handle = match registry.get(language) {
        Ok(h) => h,
        Err(e) => {
            return WorkerResponse {
                request_id: request.request_id,
                ok: false,
                root: None,
                error: Some(e.to_string()),
            }
        }
    };

    let mut parser = Parser::new();
    if parser.set_language(&handle.ts_language).is_err() {
        return WorkerResponse {
            request_id: request.request_id,
            ok: false,
            root: None,
            error: Some("failed to set parser language".to_string()),
        };
    }

    match parser.parse(&request.source, None) {
        Some(tree) => {
            let mut cursor = tree.walk();
            let (root, nodes) = flatten_tree(&mut cursor, &request.source);
            WorkerResponse {
                request_id: request.request_id,
                ok: true,
                root: Some(CstTree {
                    root,
                    nodes,
                    source: request.source,
                    node_kinds: handle.node_kinds.clone(),
                }),
                error: None,
            }
        }
        None => WorkerResponse {
            request_id: request.request_id,
            ok: false,
            root: None,
            error: Some("parser produced no tree".to_string()),
        },
    }
}

/// Entry point for a process invoked as a parser worker. Reads frames
/// from stdin, parses, writes exactly one response frame per request to
/// stdout, never reorders. Runs until stdin closes.
pub fn run_worker() -> io::Result<()> {
    let registry = GrammarRegistry::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = stdin.lock();
    let mut writer = stdout.lock();

    loop {
        let request: Option<WorkerRequest> = read_frame(&mut reader)?;
        let request = match request {
            Some(r) => r,
            None => break,
        };
        let response = handle_request(&registry, request);
        write_frame(&mut writer, &response)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_through_a_buffer() {
        let request = WorkerRequest {
            request_id: "1".to_string(),
            language: "python".to_string(),
            file_path: Some("a.py".to_string()),
            source: "x = 1".to_string(),
        };
        let mut buf = Vec::new();
        write_frame(&mut buf, &request).unwrap();
        let mut cursor = io::Cursor::new(buf);
        let read_back: WorkerRequest = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(read_back.request_id, "1");
        assert_eq!(read_back.source, "x = 1");
    }

    #[test]
    fn empty_stream_yields_no_frame() {
        let mut cursor = io::Cursor::new(Vec::<u8>::new());
        let result: Option<WorkerRequest> = read_frame(&mut cursor).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn handle_request_parses_valid_python_source() {
        let registry = GrammarRegistry::new();
        let request = WorkerRequest {
            request_id: "42".to_string(),
            language: "python".to_string(),
            file_path: None,
            source: "def f():\n    pass\n".to_string(),
        };
        let response = handle_request(&registry, request);
        assert!(response.ok);
        assert_eq!(response.request_id, "42");
        assert!(response.root.is_some());
    }

    #[test]
    fn handle_request_reports_unknown_language() {
        let registry = GrammarRegistry::new();
        let request = WorkerRequest {
            request_id: "1".to_string(),
            language: "cobol".to_string(),
            file_path: None,
            source: String::new(),
        };
        let response = handle_request(&registry, request);
        assert!(!response.ok);
        assert!(response.error.is_some());
    }
}
