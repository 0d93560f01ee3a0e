use serde::Serialize;
use std::collections::BTreeMap;

use super::engine::MemoryEngine;
use super::error::StoreResult;

/// Response from memory_stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub backend: String,
    pub total_nodes: u64,
    pub by_strata: BTreeMap<String, usize>,
    pub distinct_keywords: u64,
    pub transcendence_links: u64,
    pub immanence_links: u64,
    /// Links whose target path holds no node.
    pub dangling_links: u64,
    /// Top-level namespaces (first path segment) with node counts.
    pub namespaces: BTreeMap<String, u64>,
}

/// Compute node store statistics.
pub fn memory_stats(engine: &MemoryEngine) -> StoreResult<StatsResponse> {
    let mut transcendence = 0u64;
    let mut immanence = 0u64;
    let mut dangling = 0u64;
    let mut namespaces: BTreeMap<String, u64> = BTreeMap::new();

    for node_path in engine.all_paths() {
        if let Some(first) = super::path::segments(&node_path).next() {
            *namespaces.entry(format!("/{first}")).or_insert(0) += 1;
        }

        let Some(node) = engine.get_memory_node(&node_path)? else {
            continue;
        };
        transcendence += node.transcendence_links.len() as u64;
        immanence += node.immanence_links.len() as u64;
        dangling += node
            .transcendence_links
            .iter()
            .chain(node.immanence_links.iter())
            .filter(|target| !engine.contains(target))
            .count() as u64;
    }

    Ok(StatsResponse {
        backend: engine.backend_name().to_string(),
        total_nodes: engine.len() as u64,
        by_strata: engine.strata_index().counts(),
        distinct_keywords: engine.keyword_index().keyword_count() as u64,
        transcendence_links: transcendence,
        immanence_links: immanence,
        dangling_links: dangling,
        namespaces,
    })
}
