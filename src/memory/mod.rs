//! Path-addressed fractal memory store.

pub mod backend;
pub mod engine;
pub mod error;
pub mod fs;
pub mod index;
pub mod path;
pub mod sqlite;
pub mod stats;
pub mod strata;
pub mod traversal;
pub mod types;

pub use backend::{open_backend, NodeBackend, WriteOutcome};
pub use engine::MemoryEngine;
pub use error::{StoreError, StoreResult};
pub use types::{LinkDirection, MemoryNode, Strata};
