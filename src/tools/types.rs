//! Tool metadata records.
//!
//! Extraction produces a loose [`RawToolRecord`]; [`ToolMetadata::validate`]
//! turns it into a typed record or explains why it was rejected. Only
//! validated records ever reach the store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed vocabulary of tool categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    /// Searching: regex search, grep-like lookups.
    Divination,
    /// Reading and inspecting files.
    Scrying,
    /// Writing and creating files.
    Inscription,
    /// Transforming or editing content in place.
    Transmutation,
    /// Listing and displaying structure.
    Revelation,
    /// Analysis and diagnostics.
    Augury,
    /// Cleanup and deletion.
    Purification,
    /// Running commands and external programs.
    Invocation,
    /// Backups and safeguards.
    Protection,
    Memory,
    Orchestration,
}

impl ToolType {
    pub const ALL: [ToolType; 11] = [
        Self::Divination,
        Self::Scrying,
        Self::Inscription,
        Self::Transmutation,
        Self::Revelation,
        Self::Augury,
        Self::Purification,
        Self::Invocation,
        Self::Protection,
        Self::Memory,
        Self::Orchestration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Divination => "divination",
            Self::Scrying => "scrying",
            Self::Inscription => "inscription",
            Self::Transmutation => "transmutation",
            Self::Revelation => "revelation",
            Self::Augury => "augury",
            Self::Purification => "purification",
            Self::Invocation => "invocation",
            Self::Protection => "protection",
            Self::Memory => "memory",
            Self::Orchestration => "orchestration",
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown tool type: {s}"))
    }
}

/// Ordered complexity tier of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLevel {
    Fondamental,
    Intermediaire,
    Avance,
}

impl ToolLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fondamental => "fondamental",
            Self::Intermediaire => "intermediaire",
            Self::Avance => "avance",
        }
    }
}

impl std::fmt::Display for ToolLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ToolLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fondamental" | "fondamentale" | "basic" | "basique" | "fundamental" | "beginner" => {
                Ok(Self::Fondamental)
            }
            "intermediaire" | "intermédiaire" | "intermediate" => Ok(Self::Intermediaire),
            "avance" | "avancé" | "avancée" | "advanced" | "expert" => Ok(Self::Avance),
            _ => Err(format!("unknown tool level: {s}")),
        }
    }
}

/// Fields as they come out of a tool description document, before any
/// validation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawToolRecord {
    pub tool_id: Option<String>,
    pub tool_type: Option<String>,
    pub intent: Option<String>,
    pub level: Option<String>,
    pub keywords: Vec<String>,
    pub signature: Option<String>,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    pub returns: Option<String>,
    pub symbolic_layer: Option<String>,
    pub usage_context: Option<String>,
}

/// Why a raw record was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing tool_id")]
    MissingToolId,
    #[error("tool {0}: missing type")]
    MissingType(String),
    #[error("tool {tool_id}: unrecognized type {tool_type:?}")]
    UnknownType { tool_id: String, tool_type: String },
}

/// A validated tool description, stored as JSON in the node content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub tool_id: String,
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    #[serde(default)]
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ToolLevel>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub optional_params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_context: Option<String>,
    /// Document the record was extracted from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

impl ToolMetadata {
    /// Minimal valid record; the remaining fields can be set directly.
    pub fn new(tool_id: impl Into<String>, tool_type: ToolType, intent: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            tool_type,
            intent: intent.into(),
            level: None,
            keywords: Vec::new(),
            signature: None,
            required_params: Vec::new(),
            optional_params: Vec::new(),
            returns: None,
            symbolic_layer: None,
            usage_context: None,
            source_path: None,
        }
    }

    /// A record is valid iff it has a non-empty `tool_id` and a `type` from
    /// the closed [`ToolType`] vocabulary. An unparseable level is dropped,
    /// not fatal.
    pub fn validate(raw: RawToolRecord) -> Result<Self, ValidationError> {
        let tool_id = raw
            .tool_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::MissingToolId)?;

        let type_str = raw
            .tool_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ValidationError::MissingType(tool_id.clone()))?;
        let tool_type: ToolType =
            type_str
                .parse()
                .map_err(|_| ValidationError::UnknownType {
                    tool_id: tool_id.clone(),
                    tool_type: type_str.clone(),
                })?;

        let level = raw.level.as_deref().and_then(|l| match l.parse::<ToolLevel>() {
            Ok(level) => Some(level),
            Err(e) => {
                tracing::debug!(tool_id = %tool_id, error = %e, "ignoring level");
                None
            }
        });

        Ok(Self {
            tool_id,
            tool_type,
            intent: raw.intent.unwrap_or_default(),
            level,
            keywords: crate::memory::types::dedup_preserving_order(raw.keywords),
            signature: raw.signature,
            required_params: raw.required_params,
            optional_params: raw.optional_params,
            returns: raw.returns,
            symbolic_layer: raw.symbolic_layer,
            usage_context: raw.usage_context,
            source_path: None,
        })
    }

    /// Case-insensitive membership test against declared keywords, type,
    /// id and level: the same set the keyword index is built from.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        self.index_keywords().iter().any(|k| *k == keyword)
    }

    /// Lower-cased keywords under which this tool is indexed:
    /// type, id, declared keywords, level.
    pub fn index_keywords(&self) -> Vec<String> {
        let mut keywords = vec![
            self.tool_type.as_str().to_string(),
            self.tool_id.to_lowercase(),
        ];
        keywords.extend(self.keywords.iter().map(|k| k.trim().to_lowercase()));
        if let Some(level) = self.level {
            keywords.push(level.as_str().to_string());
        }
        crate::memory::types::dedup_preserving_order(keywords)
    }
}
