use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemosConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub analysis: AnalysisConfig,
    pub strata: StrataConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `"sqlite"` or `"fs"`.
    pub backend: String,
    pub db_path: String,
    pub fs_root: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub dirs: Vec<String>,
    pub extensions: Vec<String>,
    pub summary_max_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub project_root: String,
    pub max_depth: usize,
    pub exclude_dirs: Vec<String>,
    pub python: String,
    pub introspect: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StrataConfig {
    pub default: String,
    pub prefixes: BTreeMap<String, String>,
}

impl Default for MnemosConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            tools: ToolsConfig::default(),
            analysis: AnalysisConfig::default(),
            strata: StrataConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_mnemos_dir();
        Self {
            backend: "sqlite".into(),
            db_path: dir.join("memory.db").to_string_lossy().into_owned(),
            fs_root: dir.join("nodes").to_string_lossy().into_owned(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            dirs: vec![default_mnemos_dir()
                .join("luciforms")
                .to_string_lossy()
                .into_owned()],
            extensions: vec!["luciform".into()],
            summary_max_chars: 100,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            project_root: ".".into(),
            max_depth: 10,
            exclude_dirs: [
                ".git",
                "__pycache__",
                ".venv",
                "venv",
                "node_modules",
                ".mypy_cache",
                ".pytest_cache",
                ".tox",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            python: "python3".into(),
            introspect: true,
        }
    }
}

impl Default for StrataConfig {
    fn default() -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("/tools".to_string(), "cognitive".to_string());
        prefixes.insert("/principles".to_string(), "metaphysical".to_string());
        prefixes.insert("/sensations".to_string(), "somatic".to_string());
        Self {
            default: "cognitive".into(),
            prefixes,
        }
    }
}

/// Returns `~/.mnemos/`, or `./.mnemos` when no home directory is known.
pub fn default_mnemos_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemos")
}

/// Returns the default config file path: `~/.mnemos/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mnemos_dir().join("config.toml")
}

impl MnemosConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemosConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MNEMOS_DB, MNEMOS_BACKEND, MNEMOS_LOG_LEVEL, MNEMOS_TOOL_DIRS).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMOS_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MNEMOS_BACKEND") {
            self.storage.backend = val;
        }
        if let Ok(val) = std::env::var("MNEMOS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("MNEMOS_TOOL_DIRS") {
            self.tools.dirs = val
                .split(':')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_fs_root(&self) -> PathBuf {
        expand_tilde(&self.storage.fs_root)
    }

    pub fn resolved_tool_dirs(&self) -> Vec<PathBuf> {
        self.tools.dirs.iter().map(|d| expand_tilde(d)).collect()
    }

    pub fn resolved_project_root(&self) -> PathBuf {
        expand_tilde(&self.analysis.project_root)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MnemosConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.tools.extensions, vec!["luciform".to_string()]);
        assert_eq!(config.analysis.max_depth, 10);
        assert!(config.analysis.exclude_dirs.contains(&".git".to_string()));
        assert!(config.storage.db_path.ends_with("memory.db"));
        assert_eq!(config.strata.default, "cognitive");
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[logging]
level = "debug"

[storage]
backend = "fs"
fs_root = "/tmp/nodes"

[tools]
dirs = ["/srv/luciforms", "/opt/more"]

[analysis]
max_depth = 3
introspect = false

[strata.prefixes]
"/dreams" = "metaphysical"
"#;
        let config: MnemosConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.storage.backend, "fs");
        assert_eq!(config.storage.fs_root, "/tmp/nodes");
        assert_eq!(config.tools.dirs.len(), 2);
        assert_eq!(config.analysis.max_depth, 3);
        assert!(!config.analysis.introspect);
        assert_eq!(
            config.strata.prefixes.get("/dreams").map(String::as_str),
            Some("metaphysical")
        );
        // defaults still apply for unset fields
        assert_eq!(config.tools.summary_max_chars, 100);
        assert_eq!(config.analysis.python, "python3");
        assert_eq!(config.strata.default, "cognitive");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MnemosConfig::default();
        std::env::set_var("MNEMOS_DB", "/tmp/override.db");
        std::env::set_var("MNEMOS_BACKEND", "fs");
        std::env::set_var("MNEMOS_LOG_LEVEL", "trace");
        std::env::set_var("MNEMOS_TOOL_DIRS", "/a:/b");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.storage.backend, "fs");
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.tools.dirs, vec!["/a".to_string(), "/b".to_string()]);

        // Clean up
        std::env::remove_var("MNEMOS_DB");
        std::env::remove_var("MNEMOS_BACKEND");
        std::env::remove_var("MNEMOS_LOG_LEVEL");
        std::env::remove_var("MNEMOS_TOOL_DIRS");
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/var/lib/x"), PathBuf::from("/var/lib/x"));
        assert!(expand_tilde("~/x").ends_with("x"));
    }
}
