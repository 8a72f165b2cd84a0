use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies which pipeline produced a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Grammar-based pipeline that degrades to a line-break render on failure.
    Deferred,
    /// Line-scanning pipeline used by live previews; failures reach the caller.
    Immediate,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Deferred => "deferred",
            PipelineKind::Immediate => "immediate",
        }
    }
}

/// Result of a render through the deferred pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutcome {
    /// Markup ready for direct display.
    pub html: String,
    /// Set when the transformer failed and the line-break fallback was used instead.
    pub degraded: bool,
}

/// Structured errors surfaced by the rendering stages.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown formatting failed: {message}")]
    Markdown { message: String },
    #[error("{transformer} transform failed: {message}")]
    Transform {
        transformer: &'static str,
        message: String,
    },
}

impl RenderError {
    pub fn transform(transformer: &'static str, message: impl Into<String>) -> Self {
        Self::Transform {
            transformer,
            message: message.into(),
        }
    }
}

/// Block/inline stage of the pipeline. Implementations receive text whose literal
/// spans are already replaced by placeholder tokens and whose callouts are already
/// rewritten, and must return block-level markup with every token left intact.
///
/// Implementations must be pure: the same input yields the same output or error.
pub trait BlockTransformer: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn transform(&self, text: &str) -> Result<String, RenderError>;
}
