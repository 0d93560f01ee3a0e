//! Tool description documents: extraction, validation and the registry that
//! indexes them into the memory store.

pub mod extract;
pub mod markup;
pub mod registry;
pub mod types;

pub use extract::{Extraction, ExtractionPipeline, ExtractionStrategy, RegexStrategy, StructuredStrategy};
pub use registry::{IndexReport, ScoredTool, ToolQuery, ToolRegistry, ToolStats, TOOLS_NAMESPACE};
pub use types::{RawToolRecord, ToolLevel, ToolMetadata, ToolType, ValidationError};
