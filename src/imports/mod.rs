//! Python import analysis: source outlines, import resolution and
//! diagnosis of imports that do not resolve.

pub mod classify;
pub mod fs;
pub mod interpreter;
pub mod record;
pub mod resolver;
pub mod search_path;
pub mod source;

pub use classify::ImportErrorClassifier;
pub use fs::{RealFs, SourceFs};
pub use interpreter::InterpreterInfo;
pub use record::{ImportDiagnosis, ImportErrorKind, ImportRecord, Resolution, UnresolvedImport};
pub use resolver::ImportResolver;
pub use search_path::SearchPathDiscovery;
pub use source::{parse_module, ImportStatement, ModuleOutline, ParseError};
