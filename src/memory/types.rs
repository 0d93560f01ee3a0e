//! Core node type definitions.
//!
//! Defines [`Strata`] (the semantic tier of a node), [`MemoryNode`] (a full
//! path-addressed record) and [`LinkDirection`] (which lattice a traversal
//! follows).

use serde::{Deserialize, Serialize};

/// Coarse semantic tier of a memory node.
///
/// The three named tiers are the ones the store knows how to classify; any
/// other value is carried through as [`Strata::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Strata {
    /// Concrete, bodily: files, I/O, raw observations.
    Somatic,
    /// Working knowledge: tools, procedures, reasoning.
    Cognitive,
    /// Abstract principles and archetypes.
    Metaphysical,
    Other(String),
}

impl Strata {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Somatic => "somatic",
            Self::Cognitive => "cognitive",
            Self::Metaphysical => "metaphysical",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Strata {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "somatic" => Self::Somatic,
            "cognitive" => Self::Cognitive,
            "metaphysical" => Self::Metaphysical,
            _ => Self::Other(s),
        }
    }
}

impl From<Strata> for String {
    fn from(s: Strata) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for Strata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strata {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("strata must not be empty".into());
        }
        Ok(Self::from(s.to_string()))
    }
}

/// A node in the fractal memory store, addressed by `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Unique hierarchical key, e.g. `/tools/divination/regex_search_file`.
    pub path: String,
    /// Arbitrary payload, often JSON-serialized metadata.
    pub content: String,
    /// Short human-readable preview.
    pub summary: String,
    /// Ordered, duplicate-free keyword list used by the keyword index.
    pub keywords: Vec<String>,
    pub strata: Strata,
    /// Soft references to more general nodes.
    #[serde(default)]
    pub transcendence_links: Vec<String>,
    /// Soft references to more specific nodes.
    #[serde(default)]
    pub immanence_links: Vec<String>,
}

impl MemoryNode {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        summary: impl Into<String>,
        keywords: Vec<String>,
        strata: Strata,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            summary: summary.into(),
            keywords: dedup_preserving_order(keywords),
            strata,
            transcendence_links: Vec::new(),
            immanence_links: Vec::new(),
        }
    }

    pub fn with_transcendence_links(mut self, links: Vec<String>) -> Self {
        self.transcendence_links = dedup_preserving_order(links);
        self
    }

    pub fn with_immanence_links(mut self, links: Vec<String>) -> Self {
        self.immanence_links = dedup_preserving_order(links);
        self
    }

    /// Links followed in the given direction.
    pub fn links(&self, direction: LinkDirection) -> &[String] {
        match direction {
            LinkDirection::Transcendence => &self.transcendence_links,
            LinkDirection::Immanence => &self.immanence_links,
        }
    }
}

/// Which of the two cross-link lattices to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    /// Toward more abstract nodes.
    Transcendence,
    /// Toward more concrete nodes.
    Immanence,
}

impl std::str::FromStr for LinkDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transcendence" | "up" => Ok(Self::Transcendence),
            "immanence" | "down" => Ok(Self::Immanence),
            _ => Err(format!("unknown link direction: {s}")),
        }
    }
}

impl std::fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Transcendence => "transcendence",
            Self::Immanence => "immanence",
        })
    }
}

pub(crate) fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
