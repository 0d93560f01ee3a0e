//! What the Python interpreter knows about module origins.
//!
//! [`InterpreterInfo::discover`] asks the configured interpreter once for its
//! standard-library module names, stdlib directory and site-packages
//! directories. When no interpreter is available (or introspection is
//! disabled) a built-in stdlib name list stands in.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use super::fs::SourceFs;
use crate::config::AnalysisConfig;

const INTROSPECT_SCRIPT: &str = r#"
import json, site, sys, sysconfig
names = set(getattr(sys, "stdlib_module_names", ())) | set(sys.builtin_module_names)
paths = []
try:
    paths.extend(site.getsitepackages())
except Exception:
    pass
try:
    paths.append(site.getusersitepackages())
except Exception:
    pass
print(json.dumps({"stdlib": sorted(names), "stdlib_dir": sysconfig.get_paths().get("stdlib"), "site_packages": paths}))
"#;

/// Top-level standard-library modules of CPython 3.12.
const BUILTIN_STDLIB: &[&str] = &[
    "__future__", "_thread", "abc", "aifc", "argparse", "array", "ast", "asynchat", "asyncio",
    "asyncore", "atexit", "audioop", "base64", "bdb", "binascii", "bisect", "builtins", "bz2",
    "calendar", "cgi", "cgitb", "chunk", "cmath", "cmd", "code", "codecs", "codeop",
    "collections", "colorsys", "compileall", "concurrent", "configparser", "contextlib",
    "contextvars", "copy", "copyreg", "cProfile", "crypt", "csv", "ctypes", "curses",
    "dataclasses", "datetime", "dbm", "decimal", "difflib", "dis", "doctest", "email",
    "encodings", "ensurepip", "enum", "errno", "faulthandler", "fcntl", "filecmp",
    "fileinput", "fnmatch", "fractions", "ftplib", "functools", "gc", "getopt", "getpass",
    "gettext", "glob", "graphlib", "grp", "gzip", "hashlib", "heapq", "hmac", "html", "http",
    "idlelib", "imaplib", "imghdr", "importlib", "inspect", "io", "ipaddress", "itertools",
    "json", "keyword", "lib2to3", "linecache", "locale", "logging", "lzma", "mailbox",
    "mailcap", "marshal", "math", "mimetypes", "mmap", "modulefinder", "msvcrt",
    "multiprocessing", "netrc", "nis", "nntplib", "numbers", "operator", "optparse", "os",
    "ossaudiodev", "pathlib", "pdb", "pickle", "pickletools", "pipes", "pkgutil", "platform",
    "plistlib", "poplib", "posix", "posixpath", "pprint", "profile", "pstats", "pty", "pwd",
    "py_compile", "pyclbr", "pydoc", "queue", "quopri", "random", "re", "readline", "reprlib",
    "resource", "rlcompleter", "runpy", "sched", "secrets", "select", "selectors", "shelve",
    "shlex", "shutil", "signal", "site", "smtplib", "sndhdr", "socket", "socketserver",
    "spwd", "sqlite3", "ssl", "stat", "statistics", "string", "stringprep", "struct",
    "subprocess", "sunau", "symtable", "sys", "sysconfig", "syslog", "tabnanny", "tarfile",
    "telnetlib", "tempfile", "termios", "textwrap", "threading", "time", "timeit", "tkinter",
    "token", "tokenize", "tomllib", "trace", "traceback", "tracemalloc", "tty", "turtle",
    "types", "typing", "unicodedata", "unittest", "urllib", "uu", "uuid", "venv", "warnings",
    "wave", "weakref", "webbrowser", "winreg", "winsound", "wsgiref", "xdrlib", "xml",
    "xmlrpc", "zipapp", "zipfile", "zipimport", "zlib", "zoneinfo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSource {
    Introspected,
    Builtin,
}

#[derive(Debug, Deserialize)]
struct IntrospectionOutput {
    stdlib: Vec<String>,
    stdlib_dir: Option<PathBuf>,
    #[serde(default)]
    site_packages: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InterpreterInfo {
    stdlib: BTreeSet<String>,
    stdlib_dir: Option<PathBuf>,
    site_packages: Vec<PathBuf>,
    source: InfoSource,
}

impl InterpreterInfo {
    /// Built-in stdlib names, no directories.
    pub fn builtin() -> Self {
        Self {
            stdlib: BUILTIN_STDLIB.iter().map(|s| s.to_string()).collect(),
            stdlib_dir: None,
            site_packages: Vec::new(),
            source: InfoSource::Builtin,
        }
    }

    /// Honour `analysis.introspect` and `analysis.python`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        if config.introspect {
            Self::discover(&config.python)
        } else {
            Self::builtin()
        }
    }

    /// Run `python -c` once; fall back to [`builtin`](Self::builtin) on any
    /// failure.
    pub fn discover(python: &str) -> Self {
        match Self::introspect(python) {
            Ok(info) => {
                tracing::debug!(
                    python,
                    stdlib = info.stdlib.len(),
                    site_packages = info.site_packages.len(),
                    "interpreter introspected"
                );
                info
            }
            Err(e) => {
                tracing::warn!(python, error = %e, "interpreter introspection failed, using built-in stdlib list");
                Self::builtin()
            }
        }
    }

    fn introspect(python: &str) -> anyhow::Result<Self> {
        let output = Command::new(python).arg("-c").arg(INTROSPECT_SCRIPT).output()?;
        if !output.status.success() {
            anyhow::bail!(
                "interpreter exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let parsed: IntrospectionOutput = serde_json::from_slice(&output.stdout)?;

        let mut stdlib: BTreeSet<String> = BUILTIN_STDLIB.iter().map(|s| s.to_string()).collect();
        stdlib.extend(parsed.stdlib);
        Ok(Self {
            stdlib,
            stdlib_dir: parsed.stdlib_dir,
            site_packages: parsed.site_packages,
            source: InfoSource::Introspected,
        })
    }

    pub fn with_site_packages(mut self, dirs: Vec<PathBuf>) -> Self {
        self.site_packages = dirs;
        self
    }

    pub fn source(&self) -> InfoSource {
        self.source
    }

    pub fn site_packages(&self) -> &[PathBuf] {
        &self.site_packages
    }

    /// True if `top` (a top-level module name) is part of the standard
    /// library, by name or by presence in the stdlib directory.
    pub fn is_stdlib(&self, fs: &dyn SourceFs, top: &str) -> bool {
        if self.stdlib.contains(top) {
            return true;
        }
        self.stdlib_dir
            .as_deref()
            .is_some_and(|dir| module_exists_in(fs, dir, top).is_some())
    }

    /// Location of an installed third-party module named `top`, if any
    /// site-packages directory carries it.
    pub fn find_installed(&self, fs: &dyn SourceFs, top: &str) -> Option<PathBuf> {
        self.site_packages
            .iter()
            .find_map(|dir| module_exists_in(fs, dir, top))
    }
}

/// `<dir>/<name>/`, `<dir>/<name>.py`, or a compiled `<dir>/<name>.*.so`.
fn module_exists_in(fs: &dyn SourceFs, dir: &Path, name: &str) -> Option<PathBuf> {
    let package = dir.join(name);
    if fs.is_dir(&package) {
        return Some(package);
    }
    let module = dir.join(format!("{name}.py"));
    if fs.is_file(&module) {
        return Some(module);
    }
    let prefix = format!("{name}.");
    fs.read_dir(dir).ok()?.into_iter().find(|entry| {
        entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix) && (n.ends_with(".so") || n.ends_with(".pyd")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::fs::RealFs;

    #[test]
    fn builtin_knows_common_modules() {
        let info = InterpreterInfo::builtin();
        assert!(info.is_stdlib(&RealFs, "os"));
        assert!(info.is_stdlib(&RealFs, "collections"));
        assert!(!info.is_stdlib(&RealFs, "numpy"));
        assert_eq!(info.source(), InfoSource::Builtin);
    }

    #[test]
    fn finds_installed_packages_in_site_packages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("requests")).unwrap();
        std::fs::write(dir.path().join("six.py"), "").unwrap();
        std::fs::write(dir.path().join("_cffi.cpython-312-x86_64-linux-gnu.so"), "").unwrap();

        let info = InterpreterInfo::builtin().with_site_packages(vec![dir.path().to_path_buf()]);
        assert!(info.find_installed(&RealFs, "requests").is_some());
        assert!(info.find_installed(&RealFs, "six").is_some());
        assert!(info.find_installed(&RealFs, "_cffi").is_some());
        assert!(info.find_installed(&RealFs, "numpy").is_none());
    }

    #[test]
    fn missing_interpreter_falls_back() {
        let info = InterpreterInfo::discover("/nonexistent/python-for-tests");
        assert_eq!(info.source(), InfoSource::Builtin);
        assert!(info.is_stdlib(&RealFs, "json"));
    }
}
