//! Grammar registry: language → grammar handle, loaded lazily and cached
//! for the process lifetime (P1), indexed as a (package, variant) pair
//! for packages that bundle several languages (P2).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tree_sitter::Language as TsLanguage;

use crate::error::ParseError;
use crate::parsing::language::Language;

/// A loaded grammar plus its probed node-kind vocabulary.
///
/// Probing the vocabulary at load time (rather than assuming fixed node
/// names) matters for grammars whose node-type set drifts across grammar
/// package versions — SQL chief among them (Open Question 3).
pub struct GrammarHandle {
    pub language: Language,
    pub ts_language: TsLanguage,
    pub node_kinds: HashSet<String>,
}

impl GrammarHandle {
    fn load(language: Language) -> Result<Self, ParseError> {
        let ts_language = load_ts_language(language)?;
        let node_kinds = probe_node_kinds(&ts_language);
        Ok(Self {
            language,
            ts_language,
            node_kinds,
        })
    }

    /// Whether this grammar's CST ever produces a node of the given kind.
    /// Visitors use this instead of hardcoding node-type names that may
    /// not exist in every grammar package version.
    pub fn has_node_kind(&self, kind: &str) -> bool {
        self.node_kinds.contains(kind)
    }
}

fn probe_node_kinds(lang: &TsLanguage) -> HashSet<String> {
    let mut kinds = HashSet::new();
    for id in 0..lang.node_kind_count() {
        let id = id as u16;
        if let Some(name) = lang.node_kind_for_id(id) {
            kinds.insert(name.to_string());
        }
    }
    kinds
}

fn load_ts_language(language: Language) -> Result<TsLanguage, ParseError> {
    let lang = match language {
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::Html => tree_sitter_html::LANGUAGE.into(),
        Language::Css => tree_sitter_css::LANGUAGE.into(),
        Language::Sql => tree_sitter_sequel::LANGUAGE.into(),
    };
    Ok(lang)
}

/// Process-lifetime cache of loaded grammars, the only global singleton
/// this corpus's design notes permit (§9): the grammar cache is an
/// explicit dependency owned by the registry, not a bare `static`.
#[derive(Default)]
pub struct GrammarRegistry {
    cache: Mutex<HashMap<Language, Arc<GrammarHandle>>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached grammar handle, loading it on first use.
    pub fn get(&self, language: Language) -> Result<Arc<GrammarHandle>, ParseError> {
        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(&language) {
            return Ok(handle.clone());
        }
        let handle = Arc::new(GrammarHandle::load(language).map_err(|_| {
            ParseError::GrammarUnavailable {
                language: language.tag().to_string(),
            }
        })?);
        cache.insert(language, handle.clone());
        Ok(handle)
    }

    pub fn loaded_count(&self) -> usize {
        self.cache.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_caches_grammars_across_calls() {
        let registry = GrammarRegistry::new();
        let a = registry.get(Language::Python).unwrap();
        let b = registry.get(Language::Python).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.loaded_count(), 1);
    }

    #[test]
    fn typescript_and_tsx_are_distinct_variants_of_one_package() {
        let registry = GrammarRegistry::new();
        let ts = registry.get(Language::TypeScript).unwrap();
        let tsx = registry.get(Language::Tsx).unwrap();
        assert_eq!(registry.loaded_count(), 2);
        assert_ne!(ts.node_kinds.len(), 0);
        assert_ne!(tsx.node_kinds.len(), 0);
    }

    #[test]
    fn node_kind_vocabulary_is_probed_and_nonempty() {
        let registry = GrammarRegistry::new();
        let handle = registry.get(Language::Sql).unwrap();
        assert!(!handle.node_kinds.is_empty());
    }
}
