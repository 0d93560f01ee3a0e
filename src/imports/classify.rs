//! Diagnose imports the resolver could not place.
//!
//! Runtime facts come first (is the name a stdlib module, is it installed in
//! site-packages), then structural heuristics over the project tree and the
//! shape of the name.

use std::path::Path;

use super::fs::SourceFs;
use super::interpreter::InterpreterInfo;
use super::record::{ImportDiagnosis, ImportErrorKind};
use super::resolver::FileIndex;
use super::source::is_dotted_identifier;

/// Import names whose pip distribution is named differently.
const DISTRIBUTION_ALIASES: &[(&str, &str)] = &[
    ("cv2", "opencv-python"),
    ("PIL", "Pillow"),
    ("yaml", "PyYAML"),
    ("sklearn", "scikit-learn"),
    ("bs4", "beautifulsoup4"),
    ("dotenv", "python-dotenv"),
    ("dateutil", "python-dateutil"),
    ("serial", "pyserial"),
    ("Crypto", "pycryptodome"),
    ("jwt", "PyJWT"),
];

pub struct ImportErrorClassifier<'a> {
    interpreter: &'a InterpreterInfo,
    fs: &'a dyn SourceFs,
    project_root: &'a Path,
    index: &'a FileIndex,
}

impl<'a> ImportErrorClassifier<'a> {
    pub fn new(
        interpreter: &'a InterpreterInfo,
        fs: &'a dyn SourceFs,
        project_root: &'a Path,
        index: &'a FileIndex,
    ) -> Self {
        Self {
            interpreter,
            fs,
            project_root,
            index,
        }
    }

    pub fn classify(&self, import_name: &str) -> ImportDiagnosis {
        let diagnosis = |kind, message: String, suggestion: Option<String>| ImportDiagnosis {
            import_name: import_name.to_string(),
            kind,
            message,
            suggestion,
        };

        if import_name.starts_with('.') {
            let module = import_name.trim_start_matches('.');
            return diagnosis(
                ImportErrorKind::RelativeImportError,
                format!("relative import '{import_name}' does not resolve from the importing package"),
                Some(format!(
                    "check that '{}' exists next to the importing file, or use an absolute import",
                    if module.is_empty() { "__init__.py" } else { module }
                )),
            );
        }

        if !is_dotted_identifier(import_name) {
            return diagnosis(
                ImportErrorKind::Unknown,
                format!("'{import_name}' is not a valid module name"),
                None,
            );
        }

        let segments: Vec<&str> = import_name.split('.').collect();
        let top = segments[0];
        let last = segments[segments.len() - 1];

        if self.interpreter.is_stdlib(self.fs, top) {
            return diagnosis(
                ImportErrorKind::StandardLibrary,
                format!("'{import_name}' is part of the standard library"),
                None,
            );
        }

        if let Some(location) = self.interpreter.find_installed(self.fs, top) {
            return diagnosis(
                ImportErrorKind::ThirdParty,
                format!("'{top}' is installed at {}", location.display()),
                None,
            );
        }

        let top_is_local_dir = self.index.has_dir(top) || self.fs.is_dir(&self.project_root.join(top));
        if segments.len() > 1 && top_is_local_dir {
            let expected: Vec<&str> = segments[1..].to_vec();
            return diagnosis(
                ImportErrorKind::LocalPackageMissing,
                format!("local package '{top}' has no module '{}'", expected.join(".")),
                Some(format!("check that {top}/{}.py exists", expected.join("/"))),
            );
        }

        if self.index.has_stem(last) || self.index.has_stem(top) || top_is_local_dir {
            return diagnosis(
                ImportErrorKind::LocalFileMissing,
                format!("'{import_name}' looks like a project module but no matching file is on the search path"),
                Some(format!(
                    "check the spelling and location of '{last}.py', or add its directory to sys.path"
                )),
            );
        }

        let distribution = DISTRIBUTION_ALIASES
            .iter()
            .find(|(name, _)| *name == top)
            .map_or(top, |(_, dist)| *dist);
        diagnosis(
            ImportErrorKind::ThirdPartyMissing,
            format!("'{top}' is not in the project and not installed"),
            Some(format!("pip install {distribution}")),
        )
    }
}
