//! Filesystem capability used by the resolver and the dependency walk.
//!
//! Every probe goes through [`SourceFs`] so tests can count or fake them.

use std::io;
use std::path::{Path, PathBuf};

pub trait SourceFs {
    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Immediate entries of `dir`, unsorted.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl SourceFs for RealFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

impl<T: SourceFs + ?Sized> SourceFs for &T {
    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).read_dir(dir)
    }
}

/// Recursively list `.py` files under `root`, skipping directories whose
/// name is in `exclude_dirs`. Unreadable directories are logged and skipped.
pub fn walk_python_files(fs: &dyn SourceFs, root: &Path, exclude_dirs: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries {
            let name = entry.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if fs.is_dir(&entry) {
                if !exclude_dirs.iter().any(|x| x == name) {
                    pending.push(entry);
                }
            } else if entry.extension().is_some_and(|e| e == "py") {
                files.push(entry);
            }
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::create_dir_all(root.join("__pycache__")).unwrap();
        std::fs::write(root.join("main.py"), "").unwrap();
        std::fs::write(root.join("pkg/mod.py"), "").unwrap();
        std::fs::write(root.join("pkg/notes.txt"), "").unwrap();
        std::fs::write(root.join("__pycache__/main.py"), "").unwrap();

        let files = walk_python_files(&RealFs, root, &["__pycache__".to_string()]);
        assert_eq!(files, vec![root.join("main.py"), root.join("pkg/mod.py")]);
    }
}
