//! The file-scanner collaborator: an absolute directory path plus an
//! extension allow-list and glob ignore-patterns, pinned by interface
//! only. The default implementation here walks the tree with `ignore`'s
//! gitignore-aware builder.

use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use crate::parsing::language::Language;

/// Scans a directory for files the extractor should parse.
pub trait Scanner: Send + Sync {
    fn scan(&self, root: &Path) -> Vec<PathBuf>;
}

/// Default `ignore`-based scanner honoring `.gitignore` plus
/// caller-supplied ignore globs and an extension allow-list.
pub struct DefaultScanner {
    pub extensions: Vec<String>,
    pub ignore_globs: Vec<String>,
}

impl DefaultScanner {
    pub fn new(extensions: Vec<String>, ignore_globs: Vec<String>) -> Self {
        Self {
            extensions,
            ignore_globs,
        }
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return Language::from_path(path).is_some();
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.trim_start_matches('.') == e))
            .unwrap_or(false)
    }
}

impl Scanner for DefaultScanner {
    fn scan(&self, root: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .require_git(false);

        if !self.ignore_globs.is_empty() {
            let mut overrides = OverrideBuilder::new(root);
            for glob in &self.ignore_globs {
                let _ = overrides.add(&format!("!{glob}"));
            }
            if let Ok(overrides) = overrides.build() {
                builder.overrides(overrides);
            }
        }

        builder
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| self.extension_allowed(path))
            .map(|path| normalize_scanned_path(&path))
            .collect()
    }
}

fn normalize_scanned_path(path: &Path) -> PathBuf {
    PathBuf::from(crate::identity::normalize_path(&path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scans_recognized_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.txt"), "not code").unwrap();

        let scanner = DefaultScanner::new(vec![], vec![]);
        let found = scanner.scan(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string_lossy().ends_with("a.py"));
    }

    #[test]
    fn honors_explicit_ignore_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.py"), "x = 1").unwrap();

        let scanner = DefaultScanner::new(vec![], vec!["vendor/**".to_string()]);
        let found = scanner.scan(dir.path());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn explicit_extension_allow_list_restricts_scan() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        fs::write(dir.path().join("b.go"), "package main").unwrap();

        let scanner = DefaultScanner::new(vec!["go".to_string()], vec![]);
        let found = scanner.scan(dir.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string_lossy().ends_with("b.go"));
    }
}
