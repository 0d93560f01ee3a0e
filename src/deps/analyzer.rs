//! Recursive dependency walk over Python sources.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::imports::fs::walk_python_files;
use crate::imports::{parse_module, ImportRecord, ImportResolver, ModuleOutline, Resolution};

use super::graph::{ArchitecturalPattern, DependencyGraph, DependencyNode, SkippedFile};

pub struct DependencyAnalyzer {
    resolver: ImportResolver,
    exclude_dirs: Vec<String>,
}

impl DependencyAnalyzer {
    pub fn new(resolver: ImportResolver) -> Self {
        Self {
            resolver,
            exclude_dirs: Vec::new(),
        }
    }

    /// Directories skipped when a seed is a directory.
    pub fn with_exclude_dirs(mut self, exclude_dirs: Vec<String>) -> Self {
        self.exclude_dirs = exclude_dirs;
        self
    }

    pub fn resolver(&self) -> &ImportResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut ImportResolver {
        &mut self.resolver
    }

    /// Turn user-supplied seeds into files: relative paths are taken from
    /// the project root and directories expand to every `.py` under them.
    pub fn expand_seeds(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let fs = self.resolver.fs();
        let mut seeds = Vec::new();
        for input in inputs {
            let path = if input.is_absolute() {
                input.clone()
            } else {
                self.resolver.project_root().join(input)
            };
            if fs.is_dir(&path) {
                seeds.extend(walk_python_files(fs, &path, &self.exclude_dirs));
            } else {
                seeds.push(path);
            }
        }
        seeds
    }

    /// Walk from `seeds`, following resolved local imports up to
    /// `max_depth` edges away. Each file is analysed at most once, so
    /// import cycles terminate. Unreadable or unparsable files are recorded
    /// as skipped and the walk continues.
    pub fn analyze_recursive_dependencies(&mut self, seeds: &[PathBuf], max_depth: usize) -> DependencyGraph {
        let mut graph = DependencyGraph {
            max_depth,
            ..Default::default()
        };
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<(PathBuf, usize)> = seeds.iter().map(|s| (s.clone(), 0)).collect();

        while let Some((file, depth)) = queue.pop_front() {
            if !visited.insert(file.clone()) {
                continue;
            }

            let node = match self.analyze_file(&file, depth) {
                Ok(node) => node,
                Err(reason) => {
                    tracing::warn!(file = %file.display(), %reason, "skipping file");
                    graph.skipped.push(SkippedFile {
                        file_path: file.clone(),
                        reason,
                    });
                    continue;
                }
            };

            if depth < max_depth {
                for dep in &node.dependencies {
                    if !visited.contains(dep) {
                        queue.push_back((dep.clone(), depth + 1));
                    }
                }
            }
            graph.visit_order.push(file.clone());
            graph.nodes.insert(file, node);
        }

        tracing::info!(
            files = graph.nodes.len(),
            skipped = graph.skipped.len(),
            max_depth,
            "dependency analysis complete"
        );
        graph
    }

    /// Analyse one file without recursing.
    pub fn analyze_file(&mut self, file: &Path, depth: usize) -> Result<DependencyNode, String> {
        let source = self
            .resolver
            .fs()
            .read_to_string(file)
            .map_err(|e| format!("cannot read: {e}"))?;
        let outline = parse_module(&source).map_err(|e| format!("cannot parse: {e}"))?;

        let mut node = DependencyNode {
            file_path: file.to_path_buf(),
            depth,
            imports: Vec::new(),
            dependencies: BTreeSet::new(),
            complexity: outline.line_count + outline.imports.len(),
            architectural_patterns: detect_patterns(&outline),
            unresolved: Vec::new(),
            errors: Vec::new(),
        };

        for stmt in &outline.imports {
            let import_name = stmt.import_name();

            // `from . import a, b`: each name is a sibling module.
            if stmt.module.is_empty() {
                for name in &stmt.names {
                    let sibling = format!("{import_name}{name}");
                    let resolution = match self.resolver.try_resolve(&sibling, file) {
                        Resolution::Unresolved => self.resolver.resolve_import(&import_name, file),
                        hit => hit,
                    };
                    self.record(&mut node, stmt.line, &import_name, Some(name), stmt.level, resolution, file);
                }
                continue;
            }

            let resolution = self.resolver.resolve_import(&import_name, file);
            if stmt.names.is_empty() {
                self.record(&mut node, stmt.line, &import_name, None, stmt.level, resolution, file);
                continue;
            }

            // `from pkg import sub` may name a submodule of a package.
            let is_package = resolution
                .local_path()
                .is_some_and(|p| p.file_name().is_some_and(|n| n == "__init__.py"));
            for name in &stmt.names {
                let mut resolution = resolution.clone();
                if is_package && name != "*" {
                    if let Resolution::Local(sub) = self.resolver.try_resolve(&format!("{import_name}.{name}"), file) {
                        resolution = Resolution::Local(sub);
                    }
                }
                self.record(&mut node, stmt.line, &import_name, Some(name), stmt.level, resolution, file);
            }
        }

        Ok(node)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        node: &mut DependencyNode,
        line: usize,
        module_name: &str,
        class_name: Option<&String>,
        level: usize,
        resolution: Resolution,
        file: &Path,
    ) {
        let error_type = match &resolution {
            Resolution::Unresolved => {
                let diagnosis = self.resolver.diagnose(module_name);
                let kind = diagnosis.kind;
                if kind.is_error() && !node.unresolved.iter().any(|u| u == module_name) {
                    tracing::debug!(
                        file = %file.display(),
                        import_name = module_name,
                        kind = %kind,
                        "unresolved import"
                    );
                    node.unresolved.push(module_name.to_string());
                    node.errors.push(diagnosis);
                }
                Some(kind)
            }
            other => other.external_kind(),
        };

        if let Some(dep) = resolution.local_path() {
            node.dependencies.insert(dep.to_path_buf());
        }

        node.imports.push(ImportRecord {
            module_name: module_name.to_string(),
            class_name: class_name.cloned(),
            is_relative: level > 0,
            level,
            line,
            file_path: resolution.local_path().map(Path::to_path_buf),
            resolved: resolution.is_resolved(),
            error_type,
        });
    }
}

fn detect_patterns(outline: &ModuleOutline) -> Vec<ArchitecturalPattern> {
    let mut patterns = Vec::new();
    if outline.classes.len() == 1 {
        patterns.push(ArchitecturalPattern::Singleton);
    }
    if outline
        .functions
        .iter()
        .any(|f| f.to_lowercase().contains("factory"))
    {
        patterns.push(ArchitecturalPattern::Factory);
    }
    if outline.decorators > 0 {
        patterns.push(ArchitecturalPattern::Decorator);
    }
    patterns
}
