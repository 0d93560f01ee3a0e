//! Fractal memory for tools and code.
//!
//! Mnemos stores path-addressed memory nodes (`/tools/divination/regex_search`)
//! with keywords, a semantic strata, and two independent lattices of soft
//! cross-links: transcendence (towards the more abstract) and immanence
//! (towards the more concrete).
//!
//! On top of the store sit a tool registry that indexes hand-written tool
//! description documents, and a Python import analyser that resolves imports
//! the way the interpreter would and builds project dependency graphs.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`memory`]: Node store, keyword and strata indexes, backends, traversal
//! - [`tools`]: Tool document extraction, validation, registry and search
//! - [`imports`]: Python import resolution and error classification
//! - [`deps`]: Recursive dependency graph analysis
//! - [`context`]: The application context shared by the CLI commands

pub mod config;
pub mod context;
pub mod db;
pub mod deps;
pub mod imports;
pub mod memory;
pub mod tools;
