//! Deterministic identity derivation for graph entities.
//!
//! Two pure, side-effect free operations underpin the whole graph: a
//! canonical identity string that is stable across runs and machines, and a
//! short global identity (gid) derived from it for indexing. Neither
//! operation touches global state, so both are safe to call concurrently
//! from any number of visitor threads.

use sha2::{Digest, Sha256};

/// Separator joining canonical-id segments.
pub const SEGMENT_SEP: &str = "::";

/// Default language prefix used when a gid's language cannot be resolved
/// from an explicit tag or file extension.
pub const DEFAULT_LANG_PREFIX: &str = "unk";

/// Normalize a file path for identity purposes: forward slashes, no
/// trailing slash, case preserved.
pub fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let trimmed = replaced.trim_end_matches('/');
    trimmed.to_string()
}

/// Replace any character outside `[A-Za-z0-9_$]` with `_`.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the canonical identity for an entity.
///
/// Form: `[<parent>::]<Kind>::<name>[(t1,t2,...)]`, rooted at a normalized
/// file path. `parent` is an already-built canonical id (or scope id) to
/// prefix; `param_types` are raw, comma-joined, and omitted entirely when
/// empty.
pub fn make_canonical(
    file: &str,
    kind: &str,
    name: &str,
    parent: Option<&str>,
    param_types: Option<&[String]>,
) -> String {
    let file_norm = normalize_path(file);
    let name_san = sanitize_name(name);

    let mut out = String::new();
    if let Some(p) = parent {
        if !p.is_empty() {
            out.push_str(p);
            out.push_str(SEGMENT_SEP);
        }
    } else {
        out.push_str(&file_norm);
        out.push_str(SEGMENT_SEP);
    }
    out.push_str(kind);
    out.push_str(SEGMENT_SEP);
    out.push_str(&name_san);

    if let Some(params) = param_types {
        if !params.is_empty() {
            out.push('(');
            out.push_str(&params.join(","));
            out.push(')');
        }
    }
    out
}

/// Join free-form parts into a scope identity using the same `::` grammar
/// as canonical ids, without kind tagging or sanitization.
pub fn make_scope_id(parts: &[&str]) -> String {
    parts.join(SEGMENT_SEP)
}

/// The designated root scope that every `::`-prefix walk bottoms out at.
pub const GLOBAL_SCOPE: &str = "::global::";

/// Derive the global identity (gid) for a canonical id.
///
/// `<lang>_<16 lowercase hex chars>`, the hex being the first 64 bits of
/// SHA-256 of the canonical id's UTF-8 bytes. `language` is the explicit
/// language tag when known; callers fall back to a file-extension-derived
/// prefix or [`DEFAULT_LANG_PREFIX`] themselves before calling this.
pub fn make_gid(canonical: &str, language: Option<&str>) -> String {
    let prefix = language.unwrap_or(DEFAULT_LANG_PREFIX).to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in &digest[..8] {
        hex.push_str(&format!("{byte:02x}"));
    }
    format!("{prefix}_{hex}")
}
