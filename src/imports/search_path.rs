//! Search-path discovery: which extra roots a script adds to `sys.path`
//! before importing.
//!
//! Scripts commonly do `sys.path.insert(0, <expr>)` near the top. Each
//! [`SearchPathDiscovery`] strategy recognises one family of `<expr>` by
//! pattern matching; nothing is executed. New idioms are new strategies.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static SYS_PATH_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sys\.path\.(insert|append)\s*\(").expect("valid sys.path regex")
});

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([A-Za-z_]\w*)[ \t]*=[ \t]*([^=\n].*)$").expect("valid assignment regex")
});

pub trait SearchPathDiscovery: Send + Sync {
    fn name(&self) -> &'static str;

    /// Roots that `source`, living at `file`, adds to its search path when
    /// run from `cwd`.
    fn discover(&self, source: &str, file: &Path, cwd: &Path) -> Vec<PathBuf>;
}

/// All built-in strategies, in probe order.
pub fn default_strategies() -> Vec<Box<dyn SearchPathDiscovery>> {
    vec![
        Box::new(LiteralPaths),
        Box::new(FileRelativePaths),
        Box::new(WorkingDirectoryPaths),
    ]
}

/// `sys.path.insert(0, "/abs/lib")`, `sys.path.append('vendor')`.
/// Relative literals resolve against the working directory.
pub struct LiteralPaths;

impl SearchPathDiscovery for LiteralPaths {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn discover(&self, source: &str, _file: &Path, cwd: &Path) -> Vec<PathBuf> {
        sys_path_arguments(source)
            .iter()
            .filter_map(|arg| string_literal(arg))
            .map(|lit| {
                let p = PathBuf::from(&lit);
                if p.is_absolute() {
                    normalize(&p)
                } else {
                    normalize(&cwd.join(p))
                }
            })
            .collect()
    }
}

/// Paths derived from `__file__`: nested `os.path.dirname`, `os.path.join`,
/// `pathlib.Path(__file__).parent`, and variables bound to those
/// (`_current_dir`, `project_root`, …).
pub struct FileRelativePaths;

impl SearchPathDiscovery for FileRelativePaths {
    fn name(&self) -> &'static str {
        "file_relative"
    }

    fn discover(&self, source: &str, file: &Path, _cwd: &Path) -> Vec<PathBuf> {
        let env = PathEval::scan(source, Some(file), None);
        evaluate_non_literal(&env, source)
    }
}

/// `os.getcwd()`, `os.path.abspath('.')` and variables bound to them.
pub struct WorkingDirectoryPaths;

impl SearchPathDiscovery for WorkingDirectoryPaths {
    fn name(&self) -> &'static str {
        "working_directory"
    }

    fn discover(&self, source: &str, _file: &Path, cwd: &Path) -> Vec<PathBuf> {
        let env = PathEval::scan(source, None, Some(cwd));
        evaluate_non_literal(&env, source)
    }
}

fn evaluate_non_literal(env: &PathEval<'_>, source: &str) -> Vec<PathBuf> {
    sys_path_arguments(source)
        .iter()
        .filter(|arg| string_literal(arg).is_none())
        .filter_map(|arg| env.eval(arg))
        .collect()
}

/// Evaluates the small path-expression language scripts use for
/// `sys.path` entries. `file` or `cwd` being `None` makes expressions that
/// depend on them unresolvable, which is how strategies stay disjoint.
struct PathEval<'a> {
    file: Option<&'a Path>,
    cwd: Option<&'a Path>,
    vars: HashMap<String, PathBuf>,
}

impl<'a> PathEval<'a> {
    /// Bind every top-of-file assignment whose right-hand side evaluates.
    fn scan(source: &str, file: Option<&'a Path>, cwd: Option<&'a Path>) -> Self {
        let mut env = Self {
            file,
            cwd,
            vars: HashMap::new(),
        };
        for caps in ASSIGNMENT.captures_iter(source) {
            let rhs = strip_comment(&caps[2]);
            if let Some(value) = env.eval(rhs) {
                env.vars.insert(caps[1].to_string(), value);
            }
        }
        env
    }

    fn eval(&self, expr: &str) -> Option<PathBuf> {
        let expr = expr.trim();

        if let Some(inner) = call_argument(expr, "str") {
            return self.eval(inner);
        }
        for wrapper in ["os.path.abspath", "os.path.realpath", "os.path.normpath"] {
            if let Some(inner) = call_argument(expr, wrapper) {
                return self.eval(inner).map(|p| normalize(&p));
            }
        }
        if let Some(inner) = call_argument(expr, "os.path.dirname") {
            return self.eval(inner)?.parent().map(Path::to_path_buf);
        }
        if let Some(inner) = call_argument(expr, "os.path.join") {
            let args = split_top_level(inner, ',');
            let (first, rest) = args.split_first()?;
            let mut base = self.eval(first)?;
            for segment in rest {
                base.push(string_literal(segment)?);
            }
            return Some(normalize(&base));
        }
        if expr == "os.getcwd()" || expr == "os.path.curdir" {
            return self.cwd.map(Path::to_path_buf);
        }
        if expr == "__file__" {
            return self.file.map(Path::to_path_buf);
        }
        if let Some(lit) = string_literal(expr) {
            let p = PathBuf::from(lit);
            return if p.is_absolute() {
                Some(normalize(&p))
            } else {
                self.cwd.map(|cwd| normalize(&cwd.join(p)))
            };
        }
        if let Some(path) = self.eval_pathlib(expr) {
            return Some(path);
        }
        if super::source::is_identifier(expr) {
            return self.vars.get(expr).cloned();
        }
        None
    }

    /// `Path(<expr>)` followed by `.parent`, `.resolve()`, `.absolute()` or
    /// `/ "segment"`.
    fn eval_pathlib(&self, expr: &str) -> Option<PathBuf> {
        let after_name = expr
            .strip_prefix("pathlib.Path")
            .or_else(|| expr.strip_prefix("Path"))?
            .trim_start();
        let close = matching_paren(after_name)?;
        let mut path = self.eval(&after_name[1..close])?;

        let mut rest = after_name[close + 1..].trim_start();
        while !rest.is_empty() {
            if let Some(r) = rest.strip_prefix(".parent") {
                path = path.parent()?.to_path_buf();
                rest = r;
            } else if let Some(r) = rest
                .strip_prefix(".resolve()")
                .or_else(|| rest.strip_prefix(".absolute()"))
            {
                path = normalize(&path);
                rest = r;
            } else if let Some(r) = rest.strip_prefix('/') {
                let r = r.trim_start();
                let quote = r.chars().next()?;
                if quote != '"' && quote != '\'' {
                    return None;
                }
                let end = r[1..].find(quote)? + 1;
                path.push(&r[1..end]);
                rest = &r[end + 1..];
            } else {
                return None;
            }
            rest = rest.trim_start();
        }
        Some(path)
    }
}

/// Argument expressions of every `sys.path.insert(i, X)` / `append(X)`.
fn sys_path_arguments(source: &str) -> Vec<String> {
    let mut args = Vec::new();
    for caps in SYS_PATH_CALL.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        let open = whole.end() - 1;
        let Some(close) = matching_paren(&source[open..]) else {
            continue;
        };
        let inner = &source[open + 1..open + close];
        let parts = split_top_level(inner, ',');
        let arg = match &caps[1] {
            "insert" => parts.get(1),
            _ => parts.first(),
        };
        if let Some(arg) = arg {
            args.push(arg.trim().to_string());
        }
    }
    args
}

/// If `expr` is exactly `name(<inner>)`, return `<inner>`.
fn call_argument<'e>(expr: &'e str, name: &str) -> Option<&'e str> {
    let rest = expr.strip_prefix(name)?.trim_start();
    let close = matching_paren(rest)?;
    (close == rest.len() - 1).then(|| &rest[1..close])
}

/// Byte index of the `)` matching the `(` that `text` starts with.
fn matching_paren(text: &str) -> Option<usize> {
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, c) if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// `'x'`, `"x"`, `r'x'` → `x`.
fn string_literal(expr: &str) -> Option<String> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('r').unwrap_or(expr);
    let quote = expr.chars().next()?;
    if (quote != '"' && quote != '\'') || expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    (!inner.contains(quote)).then(|| inner.to_string())
}

fn strip_comment(rhs: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in rhs.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return rhs[..i].trim(),
            _ => {}
        }
    }
    rhs.trim()
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "/proj/scripts/tools/run.py";
    const CWD: &str = "/work";

    fn all(source: &str) -> Vec<PathBuf> {
        default_strategies()
            .iter()
            .flat_map(|s| s.discover(source, Path::new(FILE), Path::new(CWD)))
            .collect()
    }

    #[test]
    fn literal_paths() {
        let src = "import sys\nsys.path.insert(0, '/opt/lib')\nsys.path.append(\"vendor\")\n";
        let found = LiteralPaths.discover(src, Path::new(FILE), Path::new(CWD));
        assert_eq!(found, vec![PathBuf::from("/opt/lib"), PathBuf::from("/work/vendor")]);
    }

    #[test]
    fn nested_dirname_variable() {
        let src = r#"
import os, sys
_current_dir = os.path.dirname(os.path.abspath(__file__))
project_root = os.path.dirname(os.path.dirname(_current_dir))  # two up
sys.path.insert(0, project_root)
sys.path.insert(0, _current_dir)
"#;
        let found = FileRelativePaths.discover(src, Path::new(FILE), Path::new(CWD));
        assert_eq!(
            found,
            vec![PathBuf::from("/proj"), PathBuf::from("/proj/scripts/tools")]
        );
    }

    #[test]
    fn join_and_pathlib_forms() {
        let src = r#"
sys.path.append(os.path.join(os.path.dirname(__file__), '..', 'lib'))
sys.path.insert(0, str(Path(__file__).resolve().parent.parent / "shared"))
"#;
        let found = FileRelativePaths.discover(src, Path::new(FILE), Path::new(CWD));
        assert_eq!(
            found,
            vec![PathBuf::from("/proj/scripts/lib"), PathBuf::from("/proj/scripts/shared")]
        );
    }

    #[test]
    fn working_directory_idioms() {
        let src = "sys.path.insert(0, os.path.abspath('.'))\nsys.path.append(os.getcwd())\n";
        let found = WorkingDirectoryPaths.discover(src, Path::new(FILE), Path::new(CWD));
        assert_eq!(found, vec![PathBuf::from("/work"), PathBuf::from("/work")]);
    }

    #[test]
    fn strategies_are_disjoint() {
        let src = "sys.path.insert(0, os.path.dirname(__file__))\nsys.path.insert(0, os.getcwd())\n";
        assert_eq!(
            all(src),
            vec![PathBuf::from("/proj/scripts/tools"), PathBuf::from("/work")]
        );
    }

    #[test]
    fn unknown_expressions_are_ignored() {
        assert!(all("sys.path.insert(0, compute_root())\n").is_empty());
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }
}
