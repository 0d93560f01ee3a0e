//! Breadth-first walks over the transcendence / immanence lattice.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use super::engine::MemoryEngine;
use super::error::StoreResult;
use super::types::LinkDirection;

/// One node reached during a lattice walk.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalStep {
    pub path: String,
    pub depth: usize,
    /// Node this one was reached from; `None` for the start node.
    pub via: Option<String>,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct TraversalResult {
    pub direction: LinkDirection,
    pub steps: Vec<TraversalStep>,
    /// Soft references that point at paths with no stored node.
    pub dangling: Vec<String>,
}

/// Follow `direction` links from `start` up to `max_depth` hops.
///
/// Each path is visited at most once, so cycles terminate. Links to
/// nonexistent nodes are reported in `dangling` rather than failing.
pub fn traverse(
    engine: &MemoryEngine,
    start: &str,
    direction: LinkDirection,
    max_depth: usize,
) -> StoreResult<TraversalResult> {
    let mut steps = Vec::new();
    let mut dangling = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize, Option<String>)> = VecDeque::new();

    queue.push_back((start.to_string(), 0, None));
    visited.insert(start.to_string());

    while let Some((current, depth, via)) = queue.pop_front() {
        let Some(node) = engine.get_memory_node(&current)? else {
            dangling.push(current);
            continue;
        };

        if depth < max_depth {
            for link in node.links(direction) {
                if visited.insert(link.clone()) {
                    queue.push_back((link.clone(), depth + 1, Some(current.clone())));
                }
            }
        }

        steps.push(TraversalStep {
            path: node.path,
            depth,
            via,
            summary: node.summary,
        });
    }

    Ok(TraversalResult {
        direction,
        steps,
        dangling,
    })
}
