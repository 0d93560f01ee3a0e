//! Two-strategy extraction pipeline for tool description documents.
//!
//! Strategies run in order; the first one that yields a record carrying a
//! `tool_id` wins. [`StructuredStrategy`] walks the parsed tag tree;
//! [`RegexStrategy`] pattern-matches the raw text and so survives documents
//! the markup parser rejects.

use regex::Regex;

use super::markup::{self, Element};
use super::types::RawToolRecord;

const ID_SUFFIX: &str = "_luciform";

/// One way of turning a document into a [`RawToolRecord`].
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Err` means the strategy could not read the document at all.
    fn extract(&self, document: &str) -> Result<RawToolRecord, String>;
}

/// Ordered list of strategies.
pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

/// A record plus the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: RawToolRecord,
    pub strategy: &'static str,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Structured parse, then regex fallback.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(StructuredStrategy),
            Box::new(RegexStrategy::new()),
        ])
    }

    /// Run strategies in order. Returns the first record with a `tool_id`,
    /// else the last partial record (so validation can report what is
    /// missing), else `None` when every strategy failed outright.
    pub fn extract(&self, document: &str) -> Option<Extraction> {
        let mut partial: Option<Extraction> = None;
        for strategy in &self.strategies {
            match strategy.extract(document) {
                Ok(record) if record.tool_id.is_some() => {
                    return Some(Extraction {
                        record,
                        strategy: strategy.name(),
                    });
                }
                Ok(record) => {
                    tracing::debug!(strategy = strategy.name(), "no tool_id, trying next strategy");
                    partial = Some(Extraction {
                        record,
                        strategy: strategy.name(),
                    });
                }
                Err(e) => {
                    tracing::debug!(strategy = strategy.name(), error = %e, "strategy failed");
                }
            }
        }
        partial
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// Strip the conventional `_luciform` suffix from a document id.
fn normalize_id(id: &str) -> Option<String> {
    let id = id.trim();
    let id = id.strip_suffix(ID_SUFFIX).unwrap_or(id);
    Some(id.to_string()).filter(|s| !s.is_empty())
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim().to_string();
    Some(s).filter(|s| !s.is_empty())
}

// ── Structured ─────────────────────────────────────────────────────────────

/// Walk the `pacte` / `invocation` / `essence` sections of the tag tree.
pub struct StructuredStrategy;

const PACT: &[&str] = &["pacte", "pact"];
const INVOCATION: &[&str] = &["invocation", "signature_block"];
const ESSENCE: &[&str] = &["essence"];

impl StructuredStrategy {
    /// Text of the first `field` inside `section`, else anywhere in the tree.
    fn field(root: &Element, section: &[&str], field: &[&str]) -> Option<String> {
        root.find(section)
            .and_then(|s| s.find(field))
            .or_else(|| root.find(field))
            .and_then(Element::text_opt)
    }

    /// `param` children of the named block, by text or `name` attribute.
    fn params(root: &Element, block: &[&str]) -> Vec<String> {
        let Some(block) = root.find(block) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        block.find_all(&["param", "parameter"], &mut found);
        found
            .into_iter()
            .filter_map(|p| p.attr("name").map(str::to_string).or_else(|| p.text_opt()))
            .filter_map(non_empty)
            .collect()
    }
}

impl ExtractionStrategy for StructuredStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, document: &str) -> Result<RawToolRecord, String> {
        let root = markup::parse(document).map_err(|e| e.to_string())?;

        let mut keyword_elements = Vec::new();
        match root.find(ESSENCE).and_then(|e| e.find(&["keywords"])) {
            Some(block) => block.find_all(&["keyword"], &mut keyword_elements),
            None => root.find_all(&["keyword"], &mut keyword_elements),
        }

        Ok(RawToolRecord {
            tool_id: root
                .attr("id")
                .or_else(|| root.attr("tool_id"))
                .and_then(normalize_id),
            tool_type: Self::field(&root, PACT, &["type"]),
            intent: Self::field(&root, PACT, &["intent"]),
            level: Self::field(&root, PACT, &["level", "niveau"]),
            keywords: keyword_elements
                .into_iter()
                .filter_map(Element::text_opt)
                .collect(),
            signature: Self::field(&root, INVOCATION, &["signature"]),
            required_params: Self::params(&root, &["requires", "required"]),
            optional_params: Self::params(&root, &["optional"]),
            returns: Self::field(&root, INVOCATION, &["returns"]),
            symbolic_layer: Self::field(&root, ESSENCE, &["symbolic_layer"]),
            usage_context: Self::field(&root, ESSENCE, &["usage_context"]),
        })
    }
}

// ── Regex fallback ─────────────────────────────────────────────────────────

/// Field-by-field regex extraction over the raw text.
pub struct RegexStrategy {
    id: Regex,
    tool_type: Regex,
    intent: Regex,
    level: Regex,
    signature: Regex,
    returns: Regex,
    symbolic_layer: Regex,
    usage_context: Regex,
    keyword: Regex,
    requires: Regex,
    optional: Regex,
    param: Regex,
}

/// Regex for `<glyphs?tag ...>body</glyphs?tag>`, body captured lazily.
fn element_regex(tag: &str) -> Regex {
    let pattern = format!(r"(?s)<[^\w\s<>/]*{tag}(?:\s[^>]*)?>(.*?)</[^\w\s<>/]*{tag}\s*>");
    Regex::new(&pattern).expect("valid element regex")
}

impl RegexStrategy {
    pub fn new() -> Self {
        Self {
            id: Regex::new(r#"\bid\s*=\s*["']([^"']+)["']"#).expect("valid id regex"),
            tool_type: element_regex("type"),
            intent: element_regex("intent"),
            level: element_regex("level"),
            signature: element_regex("signature"),
            returns: element_regex("returns"),
            symbolic_layer: element_regex("symbolic_layer"),
            usage_context: element_regex("usage_context"),
            keyword: element_regex("keyword"),
            requires: element_regex("requires"),
            optional: element_regex("optional"),
            param: element_regex("param"),
        }
    }

    fn first(re: &Regex, text: &str) -> Option<String> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .and_then(non_empty)
    }

    fn all(re: &Regex, text: &str) -> Vec<String> {
        re.captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| clean_text(m.as_str()))
            .filter_map(non_empty)
            .collect()
    }

    fn params(&self, block: &Regex, text: &str) -> Vec<String> {
        block
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| Self::all(&self.param, m.as_str()))
            .unwrap_or_default()
    }
}

impl Default for RegexStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop nested tags and entities, collapse whitespace.
fn clean_text(raw: &str) -> String {
    let without_cdata = raw.replace("<![CDATA[", "").replace("]]>", "");
    let mut stripped = String::with_capacity(without_cdata.len());
    let mut in_tag = false;
    for c in without_cdata.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                stripped.push(' ');
            }
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }
    markup::unescape(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl ExtractionStrategy for RegexStrategy {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, document: &str) -> Result<RawToolRecord, String> {
        Ok(RawToolRecord {
            tool_id: self
                .id
                .captures(document)
                .and_then(|c| c.get(1))
                .and_then(|m| normalize_id(m.as_str())),
            tool_type: Self::first(&self.tool_type, document),
            intent: Self::first(&self.intent, document),
            level: Self::first(&self.level, document),
            keywords: Self::all(&self.keyword, document),
            signature: Self::first(&self.signature, document),
            required_params: self.params(&self.requires, document),
            optional_params: self.params(&self.optional, document),
            returns: Self::first(&self.returns, document),
            symbolic_layer: Self::first(&self.symbolic_layer, document),
            usage_context: Self::first(&self.usage_context, document),
        })
    }
}
