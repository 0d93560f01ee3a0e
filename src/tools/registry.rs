//! Tool registry: indexes tool metadata into the memory store under
//! `/tools/<type>/<tool_id>` and answers type / keyword / level / intent
//! queries.
//!
//! Keyword-index hits are always re-validated against the stored record, so
//! a posting-list match that does not actually satisfy the criterion never
//! reaches the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::ToolsConfig;
use crate::memory::{path as node_path, MemoryEngine, MemoryNode, StoreResult, Strata, WriteOutcome};

use super::extract::ExtractionPipeline;
use super::types::{ToolLevel, ToolMetadata, ToolType};

/// Reserved namespace for tool nodes.
pub const TOOLS_NAMESPACE: &str = "/tools";

/// Store path for a tool: `/tools/<type>/<tool_id>`.
pub fn tool_path(tool_type: ToolType, tool_id: &str) -> String {
    node_path::join(&node_path::join(TOOLS_NAMESPACE, tool_type.as_str()), tool_id)
}

/// A document that was skipped during indexing, and why.
#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of [`ToolRegistry::index_all_tools`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub scanned_files: usize,
    pub indexed: usize,
    /// Documents whose record failed validation.
    pub invalid: Vec<IndexFailure>,
    /// Documents that could not be read, extracted or stored.
    pub failed: Vec<IndexFailure>,
    /// True when this call was a no-op because indexing already ran.
    pub already_indexed: bool,
    pub total_tools: usize,
}

/// Criteria for [`ToolRegistry::search_tools`]. Every supplied criterion must
/// hold (AND semantics).
#[derive(Debug, Clone, Default)]
pub struct ToolQuery {
    pub tool_type: Option<ToolType>,
    pub keyword: Option<String>,
    pub level: Option<ToolLevel>,
    pub intent: Option<String>,
    pub limit: usize,
}

impl ToolQuery {
    pub fn new() -> Self {
        Self {
            limit: 10,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.tool_type.is_none()
            && self.keyword.is_none()
            && self.level.is_none()
            && self.intent.is_none()
    }
}

/// A tool with its intent relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTool {
    pub tool: ToolMetadata,
    pub score: u32,
}

#[derive(Debug, Serialize)]
pub struct ToolStats {
    pub total_tools: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_level: BTreeMap<String, usize>,
}

pub struct ToolRegistry {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
    summary_max_chars: usize,
    pipeline: ExtractionPipeline,
    /// tool_id → record. Iteration order (sorted by id) is the tie-break
    /// order for intent ranking.
    cache: BTreeMap<String, ToolMetadata>,
    last_report: Option<IndexReport>,
}

impl ToolRegistry {
    pub fn new(config: &ToolsConfig, dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            summary_max_chars: config.summary_max_chars.max(1),
            pipeline: ExtractionPipeline::standard(),
            cache: BTreeMap::new(),
            last_report: None,
        }
    }

    /// Swap the extraction pipeline (e.g. regex-only for legacy corpora).
    pub fn with_pipeline(mut self, pipeline: ExtractionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Load every tool node already in the store into the cache. Nodes whose
    /// content no longer decodes as valid metadata are skipped.
    pub fn hydrate(&mut self, engine: &MemoryEngine) -> StoreResult<usize> {
        let mut loaded = 0;
        for stored in engine.all_paths() {
            if !node_path::is_under(&stored, TOOLS_NAMESPACE) {
                continue;
            }
            if let Some(meta) = load_tool(engine, &stored)? {
                self.cache.insert(meta.tool_id.clone(), meta);
                loaded += 1;
            }
        }
        tracing::debug!(loaded, "tool cache hydrated from store");
        Ok(loaded)
    }

    // ── Indexing ──────────────────────────────────────────────────────────

    /// Scan the configured directories and register every valid document.
    ///
    /// A second call without `force_reindex` is a no-op returning the prior
    /// report with `already_indexed` set. Only the absence of every
    /// configured directory is a hard error; per-document problems are
    /// logged and collected in the report.
    pub fn index_all_tools(
        &mut self,
        engine: &mut MemoryEngine,
        force_reindex: bool,
    ) -> Result<IndexReport> {
        if let (Some(report), false) = (&self.last_report, force_reindex) {
            tracing::info!(tools = report.total_tools, "tools already indexed");
            let mut report = report.clone();
            report.already_indexed = true;
            return Ok(report);
        }

        let documents = self.discover_documents()?;
        let mut report = IndexReport {
            scanned_files: documents.len(),
            ..Default::default()
        };

        for document in &documents {
            self.index_document(engine, document, &mut report);
        }

        report.total_tools = self.cache.len();
        tracing::info!(
            scanned = report.scanned_files,
            indexed = report.indexed,
            invalid = report.invalid.len(),
            failed = report.failed.len(),
            "tool indexing complete"
        );
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Every document under the configured directories with a matching
    /// extension, sorted.
    pub fn discover_documents(&self) -> Result<Vec<PathBuf>> {
        let mut documents = Vec::new();
        let mut any_dir = false;
        for dir in &self.dirs {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "tool directory does not exist");
                continue;
            }
            any_dir = true;
            collect_documents(dir, &self.extensions, &mut documents);
        }
        if !any_dir {
            bail!(
                "no tool directory exists (looked in: {})",
                self.dirs
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        documents.sort();
        Ok(documents)
    }

    fn index_document(&mut self, engine: &mut MemoryEngine, document: &Path, report: &mut IndexReport) {
        let doc_path = document.display().to_string();
        let failure = |reason: String| IndexFailure {
            path: doc_path.clone(),
            reason,
        };

        let text = match std::fs::read_to_string(document) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %doc_path, error = %e, "failed to read tool document");
                report.failed.push(failure(e.to_string()));
                return;
            }
        };

        let Some(extraction) = self.pipeline.extract(&text) else {
            tracing::warn!(path = %doc_path, "no extraction strategy could read tool document");
            report.failed.push(failure("unreadable document".into()));
            return;
        };

        let mut meta = match ToolMetadata::validate(extraction.record) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %doc_path, error = %e, "discarding invalid tool record");
                report.invalid.push(failure(e.to_string()));
                return;
            }
        };
        meta.source_path = Some(doc_path.clone());

        match self.register_tool(engine, meta) {
            Ok(_) => {
                tracing::debug!(path = %doc_path, strategy = extraction.strategy, "tool indexed");
                report.indexed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %doc_path, error = %e, "failed to store tool");
                report.failed.push(failure(e.to_string()));
            }
        }
    }

    /// Store `meta` at `/tools/<type>/<tool_id>` and cache it.
    ///
    /// Re-registering an id under a different type moves the node.
    pub fn register_tool(&mut self, engine: &mut MemoryEngine, meta: ToolMetadata) -> StoreResult<String> {
        let path = tool_path(meta.tool_type, &meta.tool_id);
        let node = MemoryNode::new(
            path.clone(),
            serde_json::to_string(&meta)?,
            truncate_summary(&meta.intent, self.summary_max_chars),
            meta.index_keywords(),
            Strata::Cognitive,
        );
        let outcome = engine.create_memory(node)?;

        for stale in stored_tool_paths(engine, &meta.tool_id) {
            if stale != path {
                engine.forget_memory(&stale)?;
            }
        }

        if outcome == WriteOutcome::Updated {
            tracing::debug!(tool_id = %meta.tool_id, "tool re-registered");
        }
        self.cache.insert(meta.tool_id.clone(), meta);
        Ok(path)
    }

    /// Remove a tool from the store and the cache. Returns `false` if no
    /// node for `tool_id` exists.
    pub fn unregister_tool(&mut self, engine: &mut MemoryEngine, tool_id: &str) -> StoreResult<bool> {
        let mut removed = false;
        for candidate in stored_tool_paths(engine, tool_id) {
            removed |= engine.forget_memory(&candidate)?;
        }
        self.cache.remove(tool_id);

        if removed {
            tracing::info!(tool_id, "tool unregistered");
        } else {
            tracing::debug!(tool_id, "unregister: no such tool");
        }
        Ok(removed)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn get_tool(&self, tool_id: &str) -> Option<&ToolMetadata> {
        self.cache.get(tool_id)
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.cache.values().cloned().collect()
    }

    pub fn find_tools_by_type(&self, engine: &MemoryEngine, tool_type: ToolType) -> Vec<ToolMetadata> {
        self.verified_lookup(engine, tool_type.as_str(), |meta| meta.tool_type == tool_type)
    }

    pub fn find_tools_by_keyword(&self, engine: &MemoryEngine, keyword: &str) -> Vec<ToolMetadata> {
        let keyword = keyword.trim().to_lowercase();
        self.verified_lookup(engine, &keyword, |meta| meta.matches_keyword(&keyword))
    }

    pub fn find_tools_by_level(&self, engine: &MemoryEngine, level: ToolLevel) -> Vec<ToolMetadata> {
        self.verified_lookup(engine, level.as_str(), |meta| meta.level == Some(level))
    }

    /// Keyword-index lookup under the tools namespace, then a check of
    /// every hit against its full stored record.
    fn verified_lookup(
        &self,
        engine: &MemoryEngine,
        keyword: &str,
        accept: impl Fn(&ToolMetadata) -> bool,
    ) -> Vec<ToolMetadata> {
        let mut results = Vec::new();
        for hit in engine.find_memories_by_keyword_in(keyword, TOOLS_NAMESPACE) {
            match load_tool(engine, &hit) {
                Ok(Some(meta)) if accept(&meta) => results.push(meta),
                Ok(Some(meta)) => {
                    tracing::trace!(tool_id = %meta.tool_id, keyword, "index hit rejected on re-validation");
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %hit, error = %e, "failed to load tool node"),
            }
        }
        results.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        results
    }

    /// Bag-of-words relevance: +2 per query token in the intent, +1 per
    /// token in the usage context, +1 per token equal to a declared keyword.
    ///
    /// A tool must cover every query token somewhere in those fields to
    /// score at all. Results are sorted by descending score; ties keep
    /// cache order.
    pub fn find_tools_by_intent(&self, query: &str) -> Vec<ScoredTool> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredTool> = self
            .cache
            .values()
            .filter_map(|tool| {
                let score = intent_score(tool, &tokens);
                (score > 0).then(|| ScoredTool {
                    tool: tool.clone(),
                    score,
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Intersect every supplied criterion and return up to `limit` records.
    /// With no criteria, returns all indexed tools.
    pub fn search_tools(&self, engine: &MemoryEngine, query: &ToolQuery) -> Vec<ToolMetadata> {
        let limit = if query.limit == 0 { usize::MAX } else { query.limit };

        if query.is_empty() {
            return self.cache.values().take(limit).cloned().collect();
        }

        let mut allowed: Option<BTreeSet<String>> = None;
        let mut narrow = |ids: BTreeSet<String>| {
            allowed = Some(match allowed.take() {
                Some(current) => current.intersection(&ids).cloned().collect(),
                None => ids,
            });
        };

        if let Some(t) = query.tool_type {
            narrow(ids_of(&self.find_tools_by_type(engine, t)));
        }
        if let Some(k) = &query.keyword {
            narrow(ids_of(&self.find_tools_by_keyword(engine, k)));
        }
        if let Some(l) = query.level {
            narrow(ids_of(&self.find_tools_by_level(engine, l)));
        }

        // Intent results carry the ranking; otherwise order by id.
        let ordered: Vec<ToolMetadata> = match &query.intent {
            Some(intent) => {
                let ranked: Vec<ToolMetadata> = self
                    .find_tools_by_intent(intent)
                    .into_iter()
                    .map(|s| s.tool)
                    .collect();
                let ranked_ids: BTreeSet<String> = ranked.iter().map(|t| t.tool_id.clone()).collect();
                narrow(ranked_ids);
                ranked
            }
            None => self.cache.values().cloned().collect(),
        };

        let allowed = allowed.unwrap_or_default();
        ordered
            .into_iter()
            .filter(|t| allowed.contains(&t.tool_id))
            .take(limit)
            .collect()
    }

    pub fn tool_stats(&self) -> ToolStats {
        let mut by_type = BTreeMap::new();
        let mut by_level = BTreeMap::new();
        for tool in self.cache.values() {
            *by_type.entry(tool.tool_type.to_string()).or_insert(0) += 1;
            let level = tool
                .level
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unspecified".into());
            *by_level.entry(level).or_insert(0) += 1;
        }
        ToolStats {
            total_tools: self.cache.len(),
            by_type,
            by_level,
        }
    }
}

fn load_tool(engine: &MemoryEngine, path: &str) -> StoreResult<Option<ToolMetadata>> {
    let Some(node) = engine.get_memory_node(path)? else {
        return Ok(None);
    };
    match serde_json::from_str::<ToolMetadata>(&node.content) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) => {
            tracing::warn!(path, error = %e, "tool node content is not valid metadata");
            Ok(None)
        }
    }
}

fn collect_documents(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "failed to read tool directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_documents(&path, extensions, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        {
            out.push(path);
        }
    }
}

fn ids_of(tools: &[ToolMetadata]) -> BTreeSet<String> {
    tools.iter().map(|t| t.tool_id.clone()).collect()
}

/// Store paths of every node holding `tool_id`, whatever its type segment.
fn stored_tool_paths(engine: &MemoryEngine, tool_id: &str) -> Vec<String> {
    let suffix = format!("/{tool_id}");
    engine
        .find_memories_by_keyword_in(&tool_id.to_lowercase(), TOOLS_NAMESPACE)
        .into_iter()
        .filter(|p| p.ends_with(&suffix))
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    let tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    crate::memory::types::dedup_preserving_order(tokens)
}

fn intent_score(tool: &ToolMetadata, tokens: &[String]) -> u32 {
    let intent = tool.intent.to_lowercase();
    let usage = tool.usage_context.as_deref().unwrap_or("").to_lowercase();
    let keywords: Vec<String> = tool.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut score = 0;
    for token in tokens {
        let in_intent = intent.contains(token.as_str());
        let in_usage = usage.contains(token.as_str());
        let in_keywords = keywords.iter().any(|k| k == token);
        if !(in_intent || in_usage || in_keywords) {
            return 0;
        }
        score += 2 * u32::from(in_intent) + u32::from(in_usage) + u32::from(in_keywords);
    }
    score
}

fn truncate_summary(intent: &str, max_chars: usize) -> String {
    if intent.chars().count() <= max_chars {
        return intent.to_string();
    }
    let truncated: String = intent.chars().take(max_chars).collect();
    format!("{}...", truncated.trim_end())
}
