//! Process-wide application context, built once in `main` and passed to
//! whatever needs the store, the tool registry or analysis settings.

use anyhow::{Context as _, Result};

use crate::config::MnemosConfig;
use crate::deps::DependencyAnalyzer;
use crate::imports::ImportResolver;
use crate::memory::strata::StrataClassifier;
use crate::memory::{open_backend, MemoryEngine, MemoryNode, NodeBackend, StoreResult, Strata, WriteOutcome};
use crate::tools::{IndexReport, ToolRegistry};

pub struct AppContext {
    pub config: MnemosConfig,
    pub engine: MemoryEngine,
    pub registry: ToolRegistry,
    pub classifier: StrataClassifier,
}

impl AppContext {
    /// Open the configured backend and hydrate the tool cache from it.
    pub fn open(config: MnemosConfig) -> Result<Self> {
        let backend = open_backend(&config)?;
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: MnemosConfig, backend: Box<dyn NodeBackend>) -> Result<Self> {
        let engine = MemoryEngine::open(backend).context("failed to load memory store")?;
        let mut registry = ToolRegistry::new(&config.tools, config.resolved_tool_dirs());
        registry
            .hydrate(&engine)
            .context("failed to load tools from memory store")?;
        let classifier = StrataClassifier::new(&config.strata);

        tracing::debug!(
            backend = engine.backend_name(),
            nodes = engine.len(),
            tools = registry.list_tools().len(),
            "context ready"
        );
        Ok(Self {
            config,
            engine,
            registry,
            classifier,
        })
    }

    /// Store a node, classifying its strata when none is given.
    pub fn remember(&mut self, mut node: MemoryNode, strata: Option<Strata>) -> StoreResult<WriteOutcome> {
        node.strata = strata.unwrap_or_else(|| self.classifier.classify(&node.path, &node.keywords));
        self.engine.create_memory(node)
    }

    pub fn index_tools(&mut self, force_reindex: bool) -> Result<IndexReport> {
        self.registry.index_all_tools(&mut self.engine, force_reindex)
    }

    /// A fresh resolver; its caches live as long as the returned value.
    pub fn resolver(&self) -> ImportResolver {
        ImportResolver::from_config(&self.config)
    }

    pub fn analyzer(&self) -> DependencyAnalyzer {
        DependencyAnalyzer::new(self.resolver()).with_exclude_dirs(self.config.analysis.exclude_dirs.clone())
    }
}
