//! Markdown rendering pipelines.
//!
//! The pipelines are pure: they accept markdown input, produce deterministic HTML and
//! never touch shared mutable state. The deferred pipeline absorbs transformer failures
//! with a line-break fallback; the immediate pipeline returns them to the caller.

mod service;
mod types;

pub use service::{
    CalloutKind, ComrakTransformer, DeferredRenderer, ImmediateRenderer, LiteralKind,
    LiteralSpan, LiteralTable, ScanningTransformer, deferred_renderer, escape_html,
    extract_literals, fallback_render, immediate_renderer,
};
pub use types::{BlockTransformer, PipelineKind, RenderError, RenderOutcome};
