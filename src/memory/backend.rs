//! Storage capability interface for the node store.
//!
//! Every backend implements the full [`NodeBackend`] surface; the engine
//! picks one at construction time via [`open_backend`].

use anyhow::{bail, Result};

use crate::config::MnemosConfig;

use super::error::StoreResult;
use super::fs::FsBackend;
use super::sqlite::SqliteBackend;
use super::types::MemoryNode;

/// Whether a write created a new node or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// Durable path-addressed node storage.
///
/// Writes are whole-node overwrites; there is no partial patching. A write
/// that returns `Err` must leave the previously stored node (if any) intact.
pub trait NodeBackend: Send {
    /// Short identifier used in logs and stats.
    fn name(&self) -> &'static str;

    /// Store or overwrite the node at `node.path`.
    fn put(&mut self, node: &MemoryNode) -> StoreResult<WriteOutcome>;

    fn get(&self, path: &str) -> StoreResult<Option<MemoryNode>>;

    /// Remove the node at `path`. Returns `false` if nothing was stored there.
    fn delete(&mut self, path: &str) -> StoreResult<bool>;

    /// Every stored node, used to rebuild indexes on open.
    fn load_all(&self) -> StoreResult<Vec<MemoryNode>>;
}

/// Create the backend named by `storage.backend`.
pub fn open_backend(config: &MnemosConfig) -> Result<Box<dyn NodeBackend>> {
    match config.storage.backend.as_str() {
        "sqlite" => {
            let conn = crate::db::open_database(config.resolved_db_path())?;
            Ok(Box::new(SqliteBackend::new(conn)))
        }
        "fs" => Ok(Box::new(FsBackend::open(config.resolved_fs_root())?)),
        other => bail!("unknown storage backend: {other}. Supported: sqlite, fs"),
    }
}
