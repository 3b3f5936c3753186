//! The closed set of languages the extractor understands, and extension
//! / path based detection.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One of the twelve languages (including SQL, HTML, CSS) the grammar
/// registry can load a grammar for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    JavaScript,
    Tsx,
    Python,
    Sql,
    Go,
    Java,
    CSharp,
    C,
    Cpp,
    Html,
    Css,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::TypeScript,
        Language::JavaScript,
        Language::Tsx,
        Language::Python,
        Language::Sql,
        Language::Go,
        Language::Java,
        Language::CSharp,
        Language::C,
        Language::Cpp,
        Language::Html,
        Language::Css,
    ];

    /// File extensions recognized for this language, without the dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::Tsx => &["tsx"],
            Language::Python => &["py", "pyi"],
            Language::Sql => &["sql"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::CSharp => &["cs"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh"],
            Language::Html => &["html", "htm"],
            Language::Css => &["css"],
        }
    }

    /// Lookup by a bare extension (no leading dot), case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let lower = ext.to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&lower.as_str()))
    }

    /// Lookup by file path, using its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
    }

    /// The language tag as it appears in canonical ids / gids (lowercase).
    pub fn tag(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Tsx => "tsx",
            Language::Python => "python",
            Language::Sql => "sql",
            Language::Go => "go",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Html => "html",
            Language::Css => "css",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Language::ALL.into_iter().find(|l| l.tag() == tag)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(Language::from_extension("TS"), Some(Language::TypeScript));
    }

    #[test]
    fn tsx_is_distinct_from_typescript() {
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert_ne!(Language::TypeScript, Language::Tsx);
    }

    #[test]
    fn from_path_uses_extension() {
        let p = Path::new("src/main.go");
        assert_eq!(Language::from_path(p), Some(Language::Go));
    }

    #[test]
    fn unknown_extension_returns_none() {
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn tag_round_trips() {
        for lang in Language::ALL {
            assert_eq!(Language::from_tag(lang.tag()), Some(lang));
        }
    }
}
