//! In-process inverted indexes over stored nodes.
//!
//! [`KeywordIndex`] maps keyword → paths and [`StrataIndex`] maps strata →
//! paths. Both are owned by the engine and only touched after the backend
//! accepted a write, so they never mention a node that failed to persist.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::path;
use super::types::Strata;

/// Inverted index from exact keyword string to the set of node paths.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    postings: BTreeMap<String, BTreeSet<String>>,
    by_path: HashMap<String, Vec<String>>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` under every keyword, replacing whatever keywords the
    /// path had before.
    pub fn insert(&mut self, node_path: &str, keywords: &[String]) {
        self.remove(node_path);
        for keyword in keywords {
            self.postings
                .entry(keyword.clone())
                .or_default()
                .insert(node_path.to_string());
        }
        self.by_path
            .insert(node_path.to_string(), keywords.to_vec());
    }

    /// Drop `path` from every posting list. Empty lists are pruned.
    pub fn remove(&mut self, node_path: &str) {
        let Some(previous) = self.by_path.remove(node_path) else {
            return;
        };
        for keyword in previous {
            if let Some(paths) = self.postings.get_mut(&keyword) {
                paths.remove(node_path);
                if paths.is_empty() {
                    self.postings.remove(&keyword);
                }
            }
        }
    }

    /// Paths whose keyword list contains exactly `keyword` (case-sensitive).
    pub fn lookup(&self, keyword: &str) -> Vec<String> {
        self.postings
            .get(keyword)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Like [`lookup`](Self::lookup), restricted to paths under `prefix`.
    pub fn lookup_under(&self, keyword: &str, prefix: &str) -> Vec<String> {
        self.postings
            .get(keyword)
            .map(|paths| {
                paths
                    .iter()
                    .filter(|p| path::is_under(p, prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, keyword: &str, node_path: &str) -> bool {
        self.postings
            .get(keyword)
            .is_some_and(|paths| paths.contains(node_path))
    }

    pub fn keyword_count(&self) -> usize {
        self.postings.len()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.by_path.clear();
    }
}

/// Index from strata value to node paths.
#[derive(Debug, Default)]
pub struct StrataIndex {
    by_strata: BTreeMap<Strata, BTreeSet<String>>,
    by_path: HashMap<String, Strata>,
}

impl StrataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_path: &str, strata: &Strata) {
        self.remove(node_path);
        self.by_strata
            .entry(strata.clone())
            .or_default()
            .insert(node_path.to_string());
        self.by_path.insert(node_path.to_string(), strata.clone());
    }

    pub fn remove(&mut self, node_path: &str) {
        if let Some(previous) = self.by_path.remove(node_path) {
            if let Some(paths) = self.by_strata.get_mut(&previous) {
                paths.remove(node_path);
                if paths.is_empty() {
                    self.by_strata.remove(&previous);
                }
            }
        }
    }

    pub fn lookup(&self, strata: &Strata) -> Vec<String> {
        self.by_strata
            .get(strata)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Node count per strata.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.by_strata
            .iter()
            .map(|(strata, paths)| (strata.to_string(), paths.len()))
            .collect()
    }

    /// Every indexed path, in sorted order.
    pub fn paths(&self) -> Vec<String> {
        let mut all: Vec<String> = self.by_path.keys().cloned().collect();
        all.sort();
        all
    }

    pub fn contains_path(&self, node_path: &str) -> bool {
        self.by_path.contains_key(node_path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_strata.clear();
        self.by_path.clear();
    }
}
