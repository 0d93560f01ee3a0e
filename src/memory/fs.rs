//! Filesystem node backend.
//!
//! Each path segment maps to a directory; the node lives in
//! `<last_segment>.node.json` and carries its exact path string, so reloads
//! never depend on decoding directory names.

use std::path::{Path, PathBuf};

use super::backend::{NodeBackend, WriteOutcome};
use super::error::{StoreError, StoreResult};
use super::path as node_path;
use super::types::MemoryNode;

const NODE_SUFFIX: &str = ".node.json";

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    /// Open (creating if needed) a node tree rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::info!(root = %root.display(), "filesystem node store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, path: &str) -> StoreResult<PathBuf> {
        node_path::validate(path)?;
        let mut file = self.root.clone();
        let segments: Vec<&str> = node_path::segments(path).collect();
        let (last, dirs) = segments
            .split_last()
            .ok_or_else(|| StoreError::Backend(format!("empty path: {path}")))?;
        for dir in dirs {
            file.push(dir);
        }
        file.push(format!("{last}{NODE_SUFFIX}"));
        Ok(file)
    }

    fn collect_nodes(dir: &Path, out: &mut Vec<MemoryNode>) -> StoreResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::collect_nodes(&path, out)?;
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(NODE_SUFFIX))
            {
                let contents = std::fs::read_to_string(&path)?;
                match serde_json::from_str::<MemoryNode>(&contents) {
                    Ok(node) => out.push(node),
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "skipping corrupt node file");
                    }
                }
            }
        }
        Ok(())
    }
}

impl NodeBackend for FsBackend {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn put(&mut self, node: &MemoryNode) -> StoreResult<WriteOutcome> {
        let file = self.file_for(&node.path)?;
        let existed = file.exists();

        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(node)?;
        // Atomic replace: a failed write leaves the previous node untouched.
        let tmp = file.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, &file) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        Ok(if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    fn get(&self, path: &str) -> StoreResult<Option<MemoryNode>> {
        // Malformed paths can never be stored, so they read as absent.
        if node_path::validate(path).is_err() {
            return Ok(None);
        }
        let file = self.file_for(path)?;
        if !file.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&file)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn delete(&mut self, path: &str) -> StoreResult<bool> {
        if node_path::validate(path).is_err() {
            return Ok(false);
        }
        let file = self.file_for(path)?;
        match std::fs::remove_file(&file) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn load_all(&self) -> StoreResult<Vec<MemoryNode>> {
        let mut nodes = Vec::new();
        if self.root.exists() {
            Self::collect_nodes(&self.root, &mut nodes)?;
        }
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::Strata;
    use tempfile::TempDir;

    fn node(path: &str) -> MemoryNode {
        MemoryNode::new(path, "{}", "s", vec!["k".into()], Strata::Somatic)
    }

    #[test]
    fn segments_map_to_directories() {
        let tmp = TempDir::new().unwrap();
        let mut b = FsBackend::open(tmp.path()).unwrap();
        b.put(&node("/tools/divination/regex")).unwrap();

        assert!(tmp
            .path()
            .join("tools")
            .join("divination")
            .join("regex.node.json")
            .exists());
    }

    #[test]
    fn node_and_child_can_coexist() {
        let tmp = TempDir::new().unwrap();
        let mut b = FsBackend::open(tmp.path()).unwrap();
        b.put(&node("/tools")).unwrap();
        b.put(&node("/tools/x")).unwrap();

        assert!(b.get("/tools").unwrap().is_some());
        assert!(b.get("/tools/x").unwrap().is_some());
        assert_eq!(b.load_all().unwrap().len(), 2);
    }

    #[test]
    fn reload_round_trips_paths_exactly() {
        let tmp = TempDir::new().unwrap();
        {
            let mut b = FsBackend::open(tmp.path()).unwrap();
            b.put(&node("/a/b c/d-e")).unwrap();
        }
        let b = FsBackend::open(tmp.path()).unwrap();
        let all = b.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, "/a/b c/d-e");
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut b = FsBackend::open(tmp.path()).unwrap();
        let err = b.put(&node("/a/../escape")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
    }

    #[test]
    fn delete_missing_is_false() {
        let tmp = TempDir::new().unwrap();
        let mut b = FsBackend::open(tmp.path()).unwrap();
        assert!(!b.delete("/nothing").unwrap());
    }
}
