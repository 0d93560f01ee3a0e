//! Project dependency graph built by following resolved imports.

pub mod analyzer;
pub mod graph;

pub use analyzer::DependencyAnalyzer;
pub use graph::{
    ArchitecturalPattern, DependencyGraph, DependencyNode, DependencyReport, GraphStats, SkippedFile,
    UnresolvedEntry,
};
