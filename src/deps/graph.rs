//! The dependency graph produced by a recursive walk, plus the aggregate
//! views over it.

use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::imports::{ImportDiagnosis, ImportRecord};

/// Coarse structural tags. Heuristics, not guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ArchitecturalPattern {
    /// Exactly one class in the file.
    Singleton,
    /// A function whose name contains "factory".
    Factory,
    /// At least one decorator.
    Decorator,
}

impl ArchitecturalPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singleton => "Singleton",
            Self::Factory => "Factory",
            Self::Decorator => "Decorator",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyNode {
    pub file_path: PathBuf,
    /// Distance from the nearest seed when first visited.
    pub depth: usize,
    pub imports: Vec<ImportRecord>,
    pub dependencies: BTreeSet<PathBuf>,
    /// Line count plus import count.
    pub complexity: usize,
    pub architectural_patterns: Vec<ArchitecturalPattern>,
    pub unresolved: Vec<String>,
    pub errors: Vec<ImportDiagnosis>,
}

/// A file the walk could not analyse.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub file_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedEntry {
    pub file_path: PathBuf,
    pub import_name: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_files: usize,
    pub total_imports: usize,
    pub resolved_imports: usize,
    /// `resolved_imports / total_imports`; 1.0 when there are no imports.
    pub resolution_ratio: f64,
    pub average_complexity: f64,
    pub pattern_counts: BTreeMap<String, usize>,
    pub error_counts: BTreeMap<String, usize>,
    pub unresolved: Vec<UnresolvedEntry>,
    pub skipped_files: usize,
}

/// Serializable summary of a whole analysis.
#[derive(Debug, Serialize)]
pub struct DependencyReport<'g> {
    pub max_depth: usize,
    pub stats: GraphStats,
    pub cycles: Vec<Vec<PathBuf>>,
    pub files: Vec<&'g DependencyNode>,
    pub skipped: &'g [SkippedFile],
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) nodes: BTreeMap<PathBuf, DependencyNode>,
    pub(crate) visit_order: Vec<PathBuf>,
    pub(crate) skipped: Vec<SkippedFile>,
    pub(crate) max_depth: usize,
}

impl DependencyGraph {
    pub fn node(&self, path: &Path) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Files in the order the walk analysed them.
    pub fn visit_order(&self) -> &[PathBuf] {
        &self.visit_order
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Every `(file, dependency)` edge.
    pub fn edges(&self) -> Vec<(&Path, &Path)> {
        self.nodes
            .values()
            .flat_map(|n| {
                n.dependencies
                    .iter()
                    .map(move |d| (n.file_path.as_path(), d.as_path()))
            })
            .collect()
    }

    /// Files that import `path`.
    pub fn dependents(&self, path: &Path) -> Vec<&Path> {
        self.nodes
            .values()
            .filter(|n| n.dependencies.contains(path))
            .map(|n| n.file_path.as_path())
            .collect()
    }

    /// Import cycles: strongly connected components with more than one file,
    /// plus files that import themselves. Each cycle and the list are sorted.
    pub fn find_cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut tarjan = Tarjan::new(self);
        for path in self.nodes.keys() {
            if !tarjan.index.contains_key(path.as_path()) {
                tarjan.visit(path);
            }
        }

        let mut cycles: Vec<Vec<PathBuf>> = tarjan
            .components
            .into_iter()
            .filter(|c| {
                c.len() > 1
                    || self
                        .nodes
                        .get(&c[0])
                        .is_some_and(|n| n.dependencies.contains(&c[0]))
            })
            .map(|mut c| {
                c.sort();
                c
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn stats(&self) -> GraphStats {
        let mut total_imports = 0;
        let mut resolved_imports = 0;
        let mut complexity = 0;
        let mut pattern_counts = BTreeMap::new();
        let mut error_counts = BTreeMap::new();
        let mut unresolved = Vec::new();

        for node in self.nodes.values() {
            total_imports += node.imports.len();
            resolved_imports += node.imports.iter().filter(|i| i.resolved).count();
            complexity += node.complexity;
            for pattern in &node.architectural_patterns {
                *pattern_counts.entry(pattern.as_str().to_string()).or_insert(0) += 1;
            }
            for error in &node.errors {
                *error_counts.entry(error.kind.to_string()).or_insert(0) += 1;
                unresolved.push(UnresolvedEntry {
                    file_path: node.file_path.clone(),
                    import_name: error.import_name.clone(),
                    error_type: error.kind.to_string(),
                    suggestion: error.suggestion.clone(),
                });
            }
        }

        let total_files = self.nodes.len();
        GraphStats {
            total_files,
            total_imports,
            resolved_imports,
            resolution_ratio: if total_imports == 0 {
                1.0
            } else {
                resolved_imports as f64 / total_imports as f64
            },
            average_complexity: if total_files == 0 {
                0.0
            } else {
                complexity as f64 / total_files as f64
            },
            pattern_counts,
            error_counts,
            unresolved,
            skipped_files: self.skipped.len(),
        }
    }

    pub fn report(&self) -> DependencyReport<'_> {
        DependencyReport {
            max_depth: self.max_depth,
            stats: self.stats(),
            cycles: self.find_cycles(),
            files: self.nodes.values().collect(),
            skipped: &self.skipped,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.report())
    }
}

/// Tarjan's strongly connected components over the graph's edges.
struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    next: usize,
    index: HashMap<&'g Path, usize>,
    lowlink: HashMap<&'g Path, usize>,
    stack: Vec<&'g Path>,
    on_stack: BTreeSet<&'g Path>,
    components: Vec<Vec<PathBuf>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            next: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        }
    }

    /// Depth-first walk from `root` with an explicit frame stack, so long
    /// import chains cannot exhaust the thread stack.
    fn visit(&mut self, root: &'g Path) {
        let graph = self.graph;
        let deps_of = |v: &Path| -> Option<btree_set::Iter<'g, PathBuf>> {
            graph.nodes.get(v).map(|n| n.dependencies.iter())
        };

        self.open(root);
        let mut frames: Vec<(&'g Path, Option<btree_set::Iter<'g, PathBuf>>)> = vec![(root, deps_of(root))];

        while let Some((v, deps)) = frames.last_mut() {
            let v = *v;
            match deps.as_mut().and_then(Iterator::next) {
                Some(w) => {
                    let w = w.as_path();
                    if !self.index.contains_key(w) {
                        self.open(w);
                        frames.push((w, deps_of(w)));
                    } else if self.on_stack.contains(w) {
                        let low = self.lowlink[v].min(self.index[w]);
                        self.lowlink.insert(v, low);
                    }
                }
                None => {
                    frames.pop();
                    if let Some(&(parent, _)) = frames.last() {
                        let low = self.lowlink[parent].min(self.lowlink[v]);
                        self.lowlink.insert(parent, low);
                    }
                    self.close(v);
                }
            }
        }
    }

    fn open(&mut self, v: &'g Path) {
        self.index.insert(v, self.next);
        self.lowlink.insert(v, self.next);
        self.next += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
    }

    /// Pop the component rooted at `v`, if `v` is a root.
    fn close(&mut self, v: &'g Path) {
        if self.lowlink[v] != self.index[v] {
            return;
        }
        let mut component = Vec::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack.remove(w);
            component.push(w.to_path_buf());
            if w == v {
                break;
            }
        }
        self.components.push(component);
    }
}
