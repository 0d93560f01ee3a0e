use std::path::Path;

use anyhow::{Context, Result};

use mnemos::config::MnemosConfig;
use mnemos::imports::{ImportResolver, Resolution};

/// Resolve one import name as seen from `from`.
pub fn resolve(config: &MnemosConfig, import_name: &str, from: &Path) -> Result<()> {
    let file = std::fs::canonicalize(from).with_context(|| format!("cannot open {}", from.display()))?;
    let mut resolver = ImportResolver::from_config(config);

    match resolver.resolve_import(import_name, &file) {
        Resolution::Local(path) => println!("{import_name} -> {}", path.display()),
        Resolution::StandardLibrary => println!("{import_name}: standard library"),
        Resolution::ThirdParty(path) => println!("{import_name}: third party ({})", path.display()),
        Resolution::Unresolved => {
            let diagnosis = resolver.diagnose(import_name);
            println!("{import_name}: unresolved ({})", diagnosis.kind);
            println!("  {}", diagnosis.message);
            if let Some(fix) = diagnosis.suggestion {
                println!("  Suggestion: {fix}");
            }
        }
    }
    Ok(())
}
