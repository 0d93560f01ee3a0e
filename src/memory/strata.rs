//! Strata classification for nodes whose caller has no explicit tier.
//!
//! Longest configured path prefix wins; otherwise keyword hints decide;
//! otherwise the configured default applies.

use crate::config::StrataConfig;

use super::path;
use super::types::Strata;

const SOMATIC_HINTS: &[&str] = &["body", "file", "io", "sensation", "disk", "process"];
const METAPHYSICAL_HINTS: &[&str] = &["principle", "essence", "archetype", "ontology", "law"];

#[derive(Debug, Clone)]
pub struct StrataClassifier {
    prefixes: Vec<(String, Strata)>,
    default: Strata,
}

impl StrataClassifier {
    pub fn new(config: &StrataConfig) -> Self {
        let mut prefixes: Vec<(String, Strata)> = config
            .prefixes
            .iter()
            .map(|(prefix, strata)| (prefix.clone(), Strata::from(strata.clone())))
            .collect();
        // Longest prefix first so nested namespaces override their parents.
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            prefixes,
            default: Strata::from(config.default.clone()),
        }
    }

    pub fn classify(&self, node_path: &str, keywords: &[String]) -> Strata {
        if let Some((_, strata)) = self
            .prefixes
            .iter()
            .find(|(prefix, _)| path::is_under(node_path, prefix))
        {
            return strata.clone();
        }

        let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        let has_hint = |hints: &[&str]| {
            lowered
                .iter()
                .any(|k| hints.iter().any(|h| k == h || k.starts_with(h)))
        };

        if has_hint(METAPHYSICAL_HINTS) {
            Strata::Metaphysical
        } else if has_hint(SOMATIC_HINTS) {
            Strata::Somatic
        } else {
            self.default.clone()
        }
    }
}

impl Default for StrataClassifier {
    fn default() -> Self {
        Self::new(&StrataConfig::default())
    }
}
