//! Import analysis records.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Classification of an import that has no local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorKind {
    /// Part of the standard library. Not an error.
    StandardLibrary,
    /// Installed in site-packages. Not an error.
    ThirdParty,
    /// Looks external but is not installed.
    ThirdPartyMissing,
    LocalFileMissing,
    LocalPackageMissing,
    RelativeImportError,
    Unknown,
}

impl ImportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardLibrary => "standard_library",
            Self::ThirdParty => "third_party",
            Self::ThirdPartyMissing => "third_party_missing",
            Self::LocalFileMissing => "local_file_missing",
            Self::LocalPackageMissing => "local_package_missing",
            Self::RelativeImportError => "relative_import_error",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Self::StandardLibrary | Self::ThirdParty)
    }
}

impl std::fmt::Display for ImportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an import name leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A source file inside the analysed tree (or a discovered root).
    Local(PathBuf),
    /// Standard-library module: resolved, but there is no local file.
    StandardLibrary,
    /// Installed package outside the project.
    ThirdParty(PathBuf),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// The local file, if the import resolved to one.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(p) => Some(p),
            _ => None,
        }
    }

    /// Non-error classification for resolutions that have no local file.
    pub fn external_kind(&self) -> Option<ImportErrorKind> {
        match self {
            Self::StandardLibrary => Some(ImportErrorKind::StandardLibrary),
            Self::ThirdParty(_) => Some(ImportErrorKind::ThirdParty),
            _ => None,
        }
    }
}

/// An import that no rule could resolve, as logged by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedImport {
    pub import_name: String,
    pub from_file: PathBuf,
}

/// Human-readable classification of an unresolved import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDiagnosis {
    pub import_name: String,
    pub kind: ImportErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// One import of one analysed file, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRecord {
    pub module_name: String,
    /// Symbol for `from X import Y` forms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub is_relative: bool,
    pub level: usize,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ImportErrorKind>,
}
