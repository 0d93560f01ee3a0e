//! The memory engine: a node backend plus the in-process keyword and strata
//! indexes kept consistent with it.
//!
//! [`MemoryEngine::create_memory`] is the single mutation entry point for
//! node content. Indexes are updated only after the backend accepted the
//! write, so a failed write never leaks into a posting list.

use super::backend::{NodeBackend, WriteOutcome};
use super::error::{StoreError, StoreResult};
use super::index::{KeywordIndex, StrataIndex};
use super::path;
use super::types::{LinkDirection, MemoryNode, Strata};

pub struct MemoryEngine {
    backend: Box<dyn NodeBackend>,
    keywords: KeywordIndex,
    strata: StrataIndex,
}

impl MemoryEngine {
    /// Wrap a backend and rebuild the indexes from whatever it already holds.
    pub fn open(backend: Box<dyn NodeBackend>) -> StoreResult<Self> {
        let mut engine = Self {
            backend,
            keywords: KeywordIndex::new(),
            strata: StrataIndex::new(),
        };
        engine.rebuild_indexes()?;
        Ok(engine)
    }

    /// Discard and rebuild both indexes from the backend.
    pub fn rebuild_indexes(&mut self) -> StoreResult<()> {
        self.keywords.clear();
        self.strata.clear();
        let nodes = self.backend.load_all()?;
        for node in &nodes {
            self.index_node(node);
        }
        tracing::debug!(
            backend = self.backend.name(),
            nodes = nodes.len(),
            keywords = self.keywords.keyword_count(),
            "indexes rebuilt"
        );
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Store or overwrite the node at `node.path` (last write wins).
    pub fn create_memory(&mut self, node: MemoryNode) -> StoreResult<WriteOutcome> {
        path::validate(&node.path)?;

        let outcome = match self.backend.put(&node) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(path = %node.path, error = %e, "node write failed");
                return Err(e);
            }
        };

        self.index_node(&node);
        tracing::debug!(path = %node.path, ?outcome, strata = %node.strata, "node stored");
        Ok(outcome)
    }

    /// The node at `path`, without touching its children.
    pub fn get_memory_node(&self, path: &str) -> StoreResult<Option<MemoryNode>> {
        self.backend.get(path)
    }

    /// Paths whose keyword list contains exactly `keyword`.
    pub fn find_memories_by_keyword(&self, keyword: &str) -> Vec<String> {
        self.keywords.lookup(keyword)
    }

    /// Keyword lookup restricted to the namespace under `prefix`.
    pub fn find_memories_by_keyword_in(&self, keyword: &str, prefix: &str) -> Vec<String> {
        self.keywords.lookup_under(keyword, prefix)
    }

    /// All nodes tagged with `strata`.
    pub fn find_by_strata(&self, strata: &Strata) -> StoreResult<Vec<MemoryNode>> {
        let mut nodes = Vec::new();
        for node_path in self.strata.lookup(strata) {
            match self.backend.get(&node_path)? {
                Some(node) => nodes.push(node),
                None => tracing::warn!(path = %node_path, "strata index points at missing node"),
            }
        }
        Ok(nodes)
    }

    /// Delete the node at `path`. Returns `false` if there was none.
    pub fn forget_memory(&mut self, path: &str) -> StoreResult<bool> {
        let removed = self.backend.delete(path)?;
        self.keywords.remove(path);
        self.strata.remove(path);
        if removed {
            tracing::info!(path, "node forgotten");
        }
        Ok(removed)
    }

    /// Paths exactly one segment below `parent_path`.
    pub fn list_children(&self, parent_path: &str) -> Vec<String> {
        let parent_path = parent_path.trim_end_matches(path::SEPARATOR);
        self.strata
            .paths()
            .into_iter()
            .filter(|p| path::parent(p).unwrap_or("") == parent_path)
            .collect()
    }

    /// Every stored path, sorted.
    pub fn all_paths(&self) -> Vec<String> {
        self.strata.paths()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.strata.contains_path(path)
    }

    pub fn len(&self) -> usize {
        self.strata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }

    /// Append `target` to the node's transcendence links and overwrite it.
    pub fn add_transcendence_link(&mut self, path: &str, target: &str) -> StoreResult<bool> {
        self.add_link(path, target, LinkDirection::Transcendence)
    }

    /// Append `target` to the node's immanence links and overwrite it.
    pub fn add_immanence_link(&mut self, path: &str, target: &str) -> StoreResult<bool> {
        self.add_link(path, target, LinkDirection::Immanence)
    }

    /// Returns `false` when the link was already present (no write happens).
    fn add_link(&mut self, path: &str, target: &str, direction: LinkDirection) -> StoreResult<bool> {
        let mut node = self
            .backend
            .get(path)?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        let links = match direction {
            LinkDirection::Transcendence => &mut node.transcendence_links,
            LinkDirection::Immanence => &mut node.immanence_links,
        };
        if links.iter().any(|l| l == target) {
            return Ok(false);
        }
        links.push(target.to_string());

        self.create_memory(node)?;
        Ok(true)
    }

    pub(crate) fn keyword_index(&self) -> &KeywordIndex {
        &self.keywords
    }

    pub(crate) fn strata_index(&self) -> &StrataIndex {
        &self.strata
    }

    fn index_node(&mut self, node: &MemoryNode) {
        self.keywords.insert(&node.path, &node.keywords);
        self.strata.insert(&node.path, &node.strata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::sqlite::SqliteBackend;

    fn engine() -> MemoryEngine {
        MemoryEngine::open(Box::new(SqliteBackend::in_memory().unwrap())).unwrap()
    }

    fn node(path: &str, keywords: &[&str], strata: Strata) -> MemoryNode {
        MemoryNode::new(
            path,
            "content",
            "summary",
            keywords.iter().map(|k| k.to_string()).collect(),
            strata,
        )
    }

    #[test]
    fn create_then_get() {
        let mut e = engine();
        let n = node("/notes/a", &["x"], Strata::Cognitive);
        assert_eq!(e.create_memory(n.clone()).unwrap(), WriteOutcome::Created);
        assert_eq!(e.get_memory_node("/notes/a").unwrap(), Some(n));
        assert_eq!(e.get_memory_node("/notes/missing").unwrap(), None);
    }

    #[test]
    fn invalid_path_is_rejected_before_write() {
        let mut e = engine();
        let err = e
            .create_memory(node("no-slash", &["x"], Strata::Cognitive))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert!(e.find_memories_by_keyword("x").is_empty());
    }

    #[test]
    fn overwrite_moves_keywords_and_strata() {
        let mut e = engine();
        e.create_memory(node("/a", &["old"], Strata::Somatic)).unwrap();
        e.create_memory(node("/a", &["new"], Strata::Metaphysical))
            .unwrap();

        assert!(e.find_memories_by_keyword("old").is_empty());
        assert_eq!(e.find_memories_by_keyword("new"), vec!["/a"]);
        assert!(e.find_by_strata(&Strata::Somatic).unwrap().is_empty());
        assert_eq!(e.find_by_strata(&Strata::Metaphysical).unwrap().len(), 1);
    }

    #[test]
    fn forget_removes_from_indexes() {
        let mut e = engine();
        e.create_memory(node("/a", &["k"], Strata::Cognitive)).unwrap();
        assert!(e.forget_memory("/a").unwrap());
        assert!(!e.forget_memory("/a").unwrap());
        assert!(e.find_memories_by_keyword("k").is_empty());
        assert!(e.is_empty());
    }

    #[test]
    fn list_children_is_one_level_deep() {
        let mut e = engine();
        for p in ["/tools/a", "/tools/b", "/tools/b/deep", "/other/c"] {
            e.create_memory(node(p, &[], Strata::Cognitive)).unwrap();
        }
        assert_eq!(e.list_children("/tools"), vec!["/tools/a", "/tools/b"]);
        assert_eq!(e.list_children("/tools/"), vec!["/tools/a", "/tools/b"]);
    }

    #[test]
    fn add_link_is_idempotent_and_not_symmetric() {
        let mut e = engine();
        e.create_memory(node("/a", &[], Strata::Cognitive)).unwrap();
        e.create_memory(node("/b", &[], Strata::Metaphysical)).unwrap();

        assert!(e.add_transcendence_link("/a", "/b").unwrap());
        assert!(!e.add_transcendence_link("/a", "/b").unwrap());

        let a = e.get_memory_node("/a").unwrap().unwrap();
        let b = e.get_memory_node("/b").unwrap().unwrap();
        assert_eq!(a.transcendence_links, vec!["/b"]);
        assert!(b.immanence_links.is_empty());
    }

    #[test]
    fn add_link_to_missing_node_fails() {
        let mut e = engine();
        let err = e.add_immanence_link("/missing", "/x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
