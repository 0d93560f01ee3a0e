#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mnemos::config::ToolsConfig;
use mnemos::db;
use mnemos::imports::{RealFs, SourceFs};
use mnemos::memory::fs::FsBackend;
use mnemos::memory::sqlite::SqliteBackend;
use mnemos::memory::{MemoryEngine, MemoryNode, NodeBackend, StoreError, StoreResult, Strata, WriteOutcome};
use mnemos::tools::ToolRegistry;
use rusqlite::Connection;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Engine over an in-memory SQLite backend.
pub fn sqlite_engine() -> MemoryEngine {
    MemoryEngine::open(Box::new(SqliteBackend::new(test_db()))).unwrap()
}

/// Engine over a filesystem backend rooted at `root`.
pub fn fs_engine(root: &Path) -> MemoryEngine {
    MemoryEngine::open(Box::new(FsBackend::open(root).unwrap())).unwrap()
}

pub fn node(path: &str, keywords: &[&str], strata: Strata) -> MemoryNode {
    MemoryNode::new(
        path,
        format!("content of {path}"),
        format!("summary of {path}"),
        keywords.iter().map(|k| k.to_string()).collect(),
        strata,
    )
}

/// SQLite backend that rejects writes whose path or content contains
/// `fail_marker`.
pub struct FailingBackend {
    inner: SqliteBackend,
    fail_marker: String,
}

impl FailingBackend {
    pub fn new(fail_marker: &str) -> Self {
        Self {
            inner: SqliteBackend::new(test_db()),
            fail_marker: fail_marker.to_string(),
        }
    }
}

impl NodeBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn put(&mut self, node: &MemoryNode) -> StoreResult<WriteOutcome> {
        if node.path.contains(&self.fail_marker) || node.content.contains(&self.fail_marker) {
            return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.put(node)
    }

    fn get(&self, path: &str) -> StoreResult<Option<MemoryNode>> {
        self.inner.get(path)
    }

    fn delete(&mut self, path: &str) -> StoreResult<bool> {
        self.inner.delete(path)
    }

    fn load_all(&self) -> StoreResult<Vec<MemoryNode>> {
        self.inner.load_all()
    }
}

/// Real filesystem that counts existence probes.
#[derive(Clone, Default)]
pub struct CountingFs {
    pub probes: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl CountingFs {
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceFs for CountingFs {
    fn is_file(&self, path: &Path) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        RealFs.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        RealFs.is_dir(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        RealFs.read_to_string(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        RealFs.read_dir(dir)
    }
}

/// Write `body` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, body: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}

/// A well-formed tool description document.
pub fn tool_document(id: &str, tool_type: &str, intent: &str, keywords: &[&str], level: &str) -> String {
    let keywords: String = keywords
        .iter()
        .map(|k| format!("      <keyword>{k}</keyword>\n"))
        .collect();
    format!(
        r#"<luciform id="{id}_luciform">
  <🜄pacte>
    <type>{tool_type}</type>
    <intent>{intent}</intent>
    <level>{level}</level>
  </🜄pacte>
  <🜂invocation>
    <signature>{id}(path)</signature>
    <requires><param>path</param></requires>
    <returns>str</returns>
  </🜂invocation>
  <🜁essence>
    <keywords>
{keywords}    </keywords>
    <usage_context>general use</usage_context>
  </🜁essence>
</luciform>
"#
    )
}

/// Registry scanning `dirs` for `.luciform` documents.
pub fn registry_for(dirs: &[&Path]) -> ToolRegistry {
    ToolRegistry::new(
        &ToolsConfig::default(),
        dirs.iter().map(|d| d.to_path_buf()).collect(),
    )
}
