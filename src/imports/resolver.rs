//! Resolve Python import names to files without executing anything.
//!
//! Rules, in order:
//! 1. Relative (`.x`, `..pkg.y`): ascend one directory per extra dot, then
//!    probe `<dir>/<m>.py`, `<dir>/<m>/__init__.py`, `<dir>/<m>/<last>.py`.
//! 2. Dotted absolute (`pkg.sub.Name`): standard-library check on the first
//!    segment, then every search root (importing file's directory, project
//!    root, roots the file adds to `sys.path`) for the full module path and
//!    for the path without its last segment, then the project file index
//!    with a directory-suffix check.
//! 3. Simple absolute (`os`, `helpers`): standard-library check, search
//!    roots, project file index.
//!
//! Anything still unresolved is checked against site-packages before it is
//! logged as unresolved. Every answer is memoized per `(name, file)`; the
//! file index is built once. A new resolver must be constructed to observe
//! filesystem changes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::config::{AnalysisConfig, MnemosConfig};

use super::classify::ImportErrorClassifier;
use super::fs::{walk_python_files, RealFs, SourceFs};
use super::interpreter::InterpreterInfo;
use super::record::{ImportDiagnosis, Resolution, UnresolvedImport};
use super::search_path::{default_strategies, normalize, SearchPathDiscovery};

/// Project files by name, built by one directory walk.
#[derive(Debug, Default)]
pub struct FileIndex {
    /// `"b.py"` → every file with that name.
    by_name: HashMap<String, Vec<PathBuf>>,
    /// Package directory name → directories carrying an `__init__.py`.
    packages: HashMap<String, Vec<PathBuf>>,
    /// Lower-cased stems of every file.
    stems: BTreeSet<String>,
    /// Names of every directory holding Python files.
    dirs: BTreeSet<String>,
    file_count: usize,
}

impl FileIndex {
    fn build(fs: &dyn SourceFs, root: &Path, exclude_dirs: &[String]) -> Self {
        let mut index = Self::default();
        for file in walk_python_files(fs, root, exclude_dirs) {
            index.file_count += 1;
            let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(stem) = file.file_stem().and_then(|s| s.to_str()) {
                index.stems.insert(stem.to_lowercase());
            }
            if let Some(parent) = file.parent() {
                if let Ok(rel) = parent.strip_prefix(root) {
                    index.dirs.extend(
                        rel.components()
                            .filter_map(|c| c.as_os_str().to_str())
                            .map(str::to_string),
                    );
                }
                if name == "__init__.py" {
                    if let Some(dir_name) = parent.file_name().and_then(|n| n.to_str()) {
                        index
                            .packages
                            .entry(dir_name.to_string())
                            .or_default()
                            .push(parent.to_path_buf());
                    }
                }
            }
            index.by_name.entry(name.to_string()).or_default().push(file);
        }
        tracing::debug!(root = %root.display(), files = index.file_count, "file index built");
        index
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    pub fn has_stem(&self, stem: &str) -> bool {
        self.stems.contains(&stem.to_lowercase())
    }

    pub fn has_dir(&self, name: &str) -> bool {
        self.dirs.contains(name)
    }

    /// A file or package whose trailing path components spell `segments`.
    fn find_module(&self, segments: &[&str]) -> Option<PathBuf> {
        let (last, _) = segments.split_last()?;
        let module_hit = self
            .by_name
            .get(&format!("{last}.py"))
            .into_iter()
            .flatten()
            .filter(|p| ends_with_segments(&p.with_extension(""), segments));
        let package_hit = self
            .packages
            .get(*last)
            .into_iter()
            .flatten()
            .filter(|p| ends_with_segments(p, segments))
            .map(|p| p.join("__init__.py"));
        closest(module_hit.cloned().chain(package_hit))
    }
}

/// Prefer the shallowest candidate, then lexical order.
fn closest(candidates: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.min_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    })
}

fn ends_with_segments(path: &Path, segments: &[&str]) -> bool {
    let components: Vec<&str> = path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    components.len() >= segments.len() && components[components.len() - segments.len()..] == *segments
}

pub struct ImportResolver {
    fs: Box<dyn SourceFs>,
    project_root: PathBuf,
    cwd: PathBuf,
    exclude_dirs: Vec<String>,
    interpreter: InterpreterInfo,
    discovery: Vec<Box<dyn SearchPathDiscovery>>,
    file_index: Option<FileIndex>,
    memo: HashMap<(String, PathBuf), Resolution>,
    roots: HashMap<PathBuf, Vec<PathBuf>>,
    unresolved: Vec<UnresolvedImport>,
    logged: HashSet<(String, PathBuf)>,
}

impl ImportResolver {
    /// Resolver over the real filesystem with default exclusions.
    pub fn new(project_root: impl Into<PathBuf>, interpreter: InterpreterInfo) -> Self {
        let project_root = project_root.into();
        Self {
            fs: Box::new(RealFs),
            cwd: project_root.clone(),
            project_root,
            exclude_dirs: AnalysisConfig::default().exclude_dirs,
            interpreter,
            discovery: default_strategies(),
            file_index: None,
            memo: HashMap::new(),
            roots: HashMap::new(),
            unresolved: Vec::new(),
            logged: HashSet::new(),
        }
    }

    /// Resolver for `analysis.project_root`, introspecting the configured
    /// interpreter when enabled.
    pub fn from_config(config: &MnemosConfig) -> Self {
        let root = config.resolved_project_root();
        let root = std::fs::canonicalize(&root).unwrap_or_else(|e| {
            tracing::warn!(root = %root.display(), error = %e, "cannot canonicalize project root");
            root
        });
        let mut resolver = Self::new(root, InterpreterInfo::from_config(&config.analysis));
        resolver.exclude_dirs = config.analysis.exclude_dirs.clone();
        if let Ok(cwd) = std::env::current_dir() {
            resolver.cwd = cwd;
        }
        resolver
    }

    pub fn with_fs(mut self, fs: Box<dyn SourceFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_exclude_dirs(mut self, exclude_dirs: Vec<String>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    /// Working directory assumed for `os.getcwd()`-style search paths.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_discovery(mut self, discovery: Vec<Box<dyn SearchPathDiscovery>>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn fs(&self) -> &dyn SourceFs {
        self.fs.as_ref()
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn interpreter(&self) -> &InterpreterInfo {
        &self.interpreter
    }

    /// Every import no rule could resolve, in discovery order.
    pub fn unresolved_imports(&self) -> &[UnresolvedImport] {
        &self.unresolved
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Resolve `import_name` as written in `current_file`. A miss is added
    /// to [`unresolved_imports`](Self::unresolved_imports) once per key.
    pub fn resolve_import(&mut self, import_name: &str, current_file: &Path) -> Resolution {
        let resolution = self.try_resolve(import_name, current_file);
        if resolution == Resolution::Unresolved
            && self
                .logged
                .insert((import_name.to_string(), current_file.to_path_buf()))
        {
            tracing::debug!(import_name, file = %current_file.display(), "import unresolved");
            self.unresolved.push(UnresolvedImport {
                import_name: import_name.to_string(),
                from_file: current_file.to_path_buf(),
            });
        }
        resolution
    }

    /// Resolve without recording a miss, for speculative lookups such as
    /// the submodule reading of `from pkg import name`.
    pub fn try_resolve(&mut self, import_name: &str, current_file: &Path) -> Resolution {
        let key = (import_name.to_string(), current_file.to_path_buf());
        if let Some(hit) = self.memo.get(&key) {
            tracing::trace!(import_name, file = %current_file.display(), "resolution memo hit");
            return hit.clone();
        }

        let resolution = if import_name.starts_with('.') {
            self.resolve_relative(import_name, current_file)
        } else if import_name.contains('.') {
            self.resolve_dotted(import_name, current_file)
        } else {
            self.resolve_simple(import_name, current_file)
        };

        let resolution = match resolution {
            Resolution::Unresolved if !import_name.starts_with('.') => self.resolve_installed(import_name),
            other => other,
        };

        if resolution != Resolution::Unresolved {
            tracing::trace!(import_name, ?resolution, "import resolved");
        }
        self.memo.insert(key, resolution.clone());
        resolution
    }

    /// Classify `import_name` for reporting. Standard-library and installed
    /// names come back as non-error kinds.
    pub fn diagnose(&mut self, import_name: &str) -> ImportDiagnosis {
        self.ensure_index();
        let empty = FileIndex::default();
        let index = self.file_index.as_ref().unwrap_or(&empty);
        ImportErrorClassifier::new(&self.interpreter, self.fs.as_ref(), &self.project_root, index)
            .classify(import_name)
    }

    fn resolve_relative(&self, import_name: &str, current_file: &Path) -> Resolution {
        let level = import_name.chars().take_while(|c| *c == '.').count();
        let module = &import_name[level..];

        let mut dir = match current_file.parent() {
            Some(d) => d.to_path_buf(),
            None => return Resolution::Unresolved,
        };
        for _ in 1..level {
            match dir.parent() {
                Some(up) => dir = up.to_path_buf(),
                None => return Resolution::Unresolved,
            }
        }

        if module.is_empty() {
            let init = dir.join("__init__.py");
            return if self.fs.is_file(&init) {
                Resolution::Local(init)
            } else {
                Resolution::Unresolved
            };
        }

        let module_path: PathBuf = module.split('.').collect();
        let last = module.rsplit('.').next().unwrap_or(module);
        let candidates = [
            dir.join(&module_path).with_extension("py"),
            dir.join(&module_path).join("__init__.py"),
            dir.join(&module_path).join(format!("{last}.py")),
        ];
        self.first_existing(&candidates)
    }

    fn resolve_dotted(&mut self, import_name: &str, current_file: &Path) -> Resolution {
        let segments: Vec<&str> = import_name.split('.').collect();
        if self.interpreter.is_stdlib(self.fs.as_ref(), segments[0]) {
            return Resolution::StandardLibrary;
        }

        // Full module path first, then treat the last segment as a symbol.
        let prefixes: Vec<&[&str]> = (1..=segments.len()).rev().take(2).map(|n| &segments[..n]).collect();

        for root in self.search_roots(current_file) {
            for prefix in &prefixes {
                if let Some(found) = self.probe_module(&root, prefix) {
                    return Resolution::Local(found);
                }
            }
        }

        self.ensure_index();
        if let Some(index) = &self.file_index {
            for prefix in &prefixes {
                if let Some(found) = index.find_module(prefix) {
                    return Resolution::Local(found);
                }
            }
        }
        Resolution::Unresolved
    }

    fn resolve_simple(&mut self, import_name: &str, current_file: &Path) -> Resolution {
        if self.interpreter.is_stdlib(self.fs.as_ref(), import_name) {
            return Resolution::StandardLibrary;
        }

        for root in self.search_roots(current_file) {
            if let Some(found) = self.probe_module(&root, &[import_name]) {
                return Resolution::Local(found);
            }
        }

        self.ensure_index();
        self.file_index
            .as_ref()
            .and_then(|index| index.find_module(&[import_name]))
            .map_or(Resolution::Unresolved, Resolution::Local)
    }

    fn resolve_installed(&self, import_name: &str) -> Resolution {
        let top = import_name.split('.').next().unwrap_or(import_name);
        self.interpreter
            .find_installed(self.fs.as_ref(), top)
            .map_or(Resolution::Unresolved, Resolution::ThirdParty)
    }

    /// `<root>/<a>/<b>.py`, then `<root>/<a>/<b>/__init__.py`.
    fn probe_module(&self, root: &Path, segments: &[&str]) -> Option<PathBuf> {
        let module_path: PathBuf = root.join(segments.iter().collect::<PathBuf>());
        let candidates = [
            module_path.with_extension("py"),
            module_path.join("__init__.py"),
        ];
        candidates.into_iter().find(|c| self.fs.is_file(c))
    }

    fn first_existing(&self, candidates: &[PathBuf]) -> Resolution {
        candidates
            .iter()
            .find(|c| self.fs.is_file(c))
            .map_or(Resolution::Unresolved, |p| Resolution::Local(p.clone()))
    }

    /// Importing file's directory, project root, then whatever the file adds
    /// to `sys.path`. Computed once per file.
    fn search_roots(&mut self, current_file: &Path) -> Vec<PathBuf> {
        if let Some(roots) = self.roots.get(current_file) {
            return roots.clone();
        }

        let mut roots = Vec::new();
        if let Some(dir) = current_file.parent() {
            roots.push(dir.to_path_buf());
        }
        roots.push(self.project_root.clone());

        match self.fs.read_to_string(current_file) {
            Ok(source) => {
                for strategy in &self.discovery {
                    for root in strategy.discover(&source, current_file, &self.cwd) {
                        tracing::trace!(strategy = strategy.name(), root = %root.display(), "search root discovered");
                        roots.push(root);
                    }
                }
            }
            Err(e) => {
                tracing::debug!(file = %current_file.display(), error = %e, "cannot scan file for sys.path changes");
            }
        }

        let mut seen = BTreeSet::new();
        roots.retain(|r| seen.insert(normalize(r)));
        self.roots.insert(current_file.to_path_buf(), roots.clone());
        roots
    }

    fn ensure_index(&mut self) {
        if self.file_index.is_none() {
            self.file_index = Some(FileIndex::build(
                self.fs.as_ref(),
                &self.project_root,
                &self.exclude_dirs,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, body: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    fn resolver(root: &Path) -> ImportResolver {
        ImportResolver::new(root, InterpreterInfo::builtin())
    }

    #[test]
    fn relative_probe_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let current = write(root, "pkg/sub/mod.py", "");
        let nested = write(root, "pkg/other/other.py", "");

        let mut r = resolver(root);
        assert_eq!(r.resolve_import("..other", &current), Resolution::Local(nested));

        let init = write(root, "pkg/other/__init__.py", "");
        let mut r = resolver(root);
        assert_eq!(r.resolve_import("..other", &current), Resolution::Local(init));

        let module = write(root, "pkg/other.py", "");
        let mut r = resolver(root);
        assert_eq!(r.resolve_import("..other", &current), Resolution::Local(module));
    }

    #[test]
    fn relative_beyond_root_is_unresolved() {
        let mut r = resolver(Path::new("/"));
        assert_eq!(r.resolve_import("....x", Path::new("/a.py")), Resolution::Unresolved);
        assert_eq!(r.unresolved_imports().len(), 1);
    }

    #[test]
    fn bare_dot_resolves_package_init() {
        let dir = tempfile::tempdir().unwrap();
        let current = write(dir.path(), "pkg/a.py", "");
        let init = write(dir.path(), "pkg/__init__.py", "");
        let mut r = resolver(dir.path());
        assert_eq!(r.resolve_import(".", &current), Resolution::Local(init));
    }

    #[test]
    fn stdlib_is_resolved_without_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let current = write(dir.path(), "main.py", "import os");
        let mut r = resolver(dir.path());
        assert_eq!(r.resolve_import("os", &current), Resolution::StandardLibrary);
        assert_eq!(r.resolve_import("os.path", &current), Resolution::StandardLibrary);
        assert!(r.unresolved_imports().is_empty());
    }

    #[test]
    fn dotted_import_with_symbol_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let current = write(root, "main.py", "");
        let module = write(root, "core/engine.py", "");

        let mut r = resolver(root);
        assert_eq!(r.resolve_import("core.engine", &current), Resolution::Local(module.clone()));
        assert_eq!(r.resolve_import("core.engine.Engine", &current), Resolution::Local(module));
    }

    #[test]
    fn dotted_import_falls_back_to_index_with_suffix_check() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let current = write(root, "scripts/run.py", "");
        let nested = write(root, "src/lib/core/engine.py", "");
        write(root, "other/engine.py", "");

        let mut r = resolver(root);
        assert_eq!(r.resolve_import("core.engine", &current), Resolution::Local(nested));
    }

    #[test]
    fn discovered_search_root_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let current = write(
            root,
            "scripts/tool.py",
            "import os, sys\nsys.path.insert(0, os.path.join(os.path.dirname(__file__), '..', 'vendor'))\n",
        );
        let helper = write(root, "vendor/helpers.py", "");

        let mut r = resolver(root).with_exclude_dirs(vec!["vendor".into()]);
        assert_eq!(r.resolve_import("helpers", &current), Resolution::Local(helper));
    }

    #[test]
    fn simple_import_uses_file_index() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let current = write(root, "app/main.py", "");
        let util = write(root, "lib/util.py", "");
        write(root, "lib/deep/more/util.py", "");

        let mut r = resolver(root);
        assert_eq!(r.resolve_import("util", &current), Resolution::Local(util));
    }

    #[test]
    fn installed_package_is_third_party() {
        let dir = tempfile::tempdir().unwrap();
        let site = tempfile::tempdir().unwrap();
        std::fs::create_dir(site.path().join("requests")).unwrap();
        let current = write(dir.path(), "main.py", "");

        let info = InterpreterInfo::builtin().with_site_packages(vec![site.path().to_path_buf()]);
        let mut r = ImportResolver::new(dir.path(), info);
        assert_eq!(
            r.resolve_import("requests.adapters", &current),
            Resolution::ThirdParty(site.path().join("requests"))
        );
        assert!(r.unresolved_imports().is_empty());
    }

    #[test]
    fn unresolved_is_logged_once_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let current = write(dir.path(), "main.py", "");
        let mut r = resolver(dir.path());
        assert_eq!(r.resolve_import("numpy", &current), Resolution::Unresolved);
        assert_eq!(r.resolve_import("numpy", &current), Resolution::Unresolved);
        assert_eq!(r.unresolved_imports().len(), 1);
        assert_eq!(r.memo_len(), 1);
    }

    #[test]
    fn speculative_misses_are_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let current = write(dir.path(), "main.py", "");
        let mut r = resolver(dir.path());
        assert_eq!(r.try_resolve("numpy", &current), Resolution::Unresolved);
        assert!(r.unresolved_imports().is_empty());

        // A later real lookup of the same key still reports the miss.
        assert_eq!(r.resolve_import("numpy", &current), Resolution::Unresolved);
        assert_eq!(r.unresolved_imports().len(), 1);
        assert_eq!(r.memo_len(), 1);
    }

    #[test]
    fn suffix_matching() {
        assert!(ends_with_segments(Path::new("/a/core/engine"), &["core", "engine"]));
        assert!(!ends_with_segments(Path::new("/a/other/engine"), &["core", "engine"]));
        assert!(!ends_with_segments(Path::new("engine"), &["core", "engine"]));
    }
}
