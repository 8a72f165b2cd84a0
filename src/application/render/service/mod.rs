mod callouts;
mod config;
mod lists;
mod literals;
mod paragraphs;
mod scanner;
mod transform;

use std::sync::Arc;

use metrics::counter;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::application::render::types::{
    BlockTransformer, PipelineKind, RenderError, RenderOutcome,
};

pub use callouts::CalloutKind;
pub use literals::{LiteralKind, LiteralSpan, LiteralTable, escape_html, extract_literals};
pub use scanner::ScanningTransformer;
pub use transform::ComrakTransformer;

use callouts::rewrite_callouts;
use scanner::LINE_BREAK;

pub(crate) const METRIC_RENDER_TOTAL: &str = "scrivo_render_total";
pub(crate) const METRIC_RENDER_FALLBACK_TOTAL: &str = "scrivo_render_fallback_total";

/// Grammar-based pipeline: literals out, callouts rewritten, comrak, literals back.
///
/// The transformer runs on the blocking pool; if it returns an error or panics the
/// document is rendered with the line-break fallback instead, so `render` never fails.
#[derive(Clone)]
pub struct DeferredRenderer {
    transformer: Arc<dyn BlockTransformer>,
}

impl DeferredRenderer {
    pub fn new() -> Self {
        Self::with_transformer(Arc::new(ComrakTransformer::new()))
    }

    pub fn with_transformer(transformer: Arc<dyn BlockTransformer>) -> Self {
        Self { transformer }
    }

    pub async fn render(&self, markdown: &str) -> String {
        self.render_outcome(markdown).await.html
    }

    pub async fn render_outcome(&self, markdown: &str) -> RenderOutcome {
        counter!(METRIC_RENDER_TOTAL, "pipeline" => PipelineKind::Deferred.as_str()).increment(1);

        let PreparedDocument { text, literals } = prepare(markdown);
        let transformer = Arc::clone(&self.transformer);
        let name = transformer.name();
        let input = text.clone();

        let transformed =
            tokio::task::spawn_blocking(move || transformer.transform(&input)).await;

        let failure = match transformed {
            Ok(Ok(html)) => {
                debug!(
                    target = "application::render::deferred",
                    transformer = name,
                    literal_spans = literals.spans.len(),
                    "markdown rendered"
                );
                return RenderOutcome {
                    html: literals.restore(&html),
                    degraded: false,
                };
            }
            Ok(Err(err)) => err,
            Err(join_err) => RenderError::transform(name, join_err.to_string()),
        };

        warn!(
            target = "application::render::deferred",
            transformer = name,
            error = %failure,
            "markdown transform failed; using line-break fallback"
        );
        counter!(METRIC_RENDER_FALLBACK_TOTAL).increment(1);

        RenderOutcome {
            html: literals.restore(&fallback_render(&text)),
            degraded: true,
        }
    }
}

impl Default for DeferredRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Line-scanning pipeline for contexts that cannot suspend, such as live previews.
/// Errors are returned to the caller untouched.
#[derive(Clone)]
pub struct ImmediateRenderer {
    transformer: Arc<dyn BlockTransformer>,
}

impl ImmediateRenderer {
    pub fn new() -> Self {
        Self::with_transformer(Arc::new(ScanningTransformer::new()))
    }

    pub fn with_transformer(transformer: Arc<dyn BlockTransformer>) -> Self {
        Self { transformer }
    }

    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        counter!(METRIC_RENDER_TOTAL, "pipeline" => PipelineKind::Immediate.as_str()).increment(1);

        let PreparedDocument { text, literals } = prepare(markdown);
        let html = self.transformer.transform(&text)?;

        debug!(
            target = "application::render::immediate",
            transformer = self.transformer.name(),
            literal_spans = literals.spans.len(),
            "markdown rendered"
        );
        Ok(literals.restore(&html))
    }
}

impl Default for ImmediateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

static DEFERRED_RENDERER: Lazy<Arc<DeferredRenderer>> =
    Lazy::new(|| Arc::new(DeferredRenderer::new()));

static IMMEDIATE_RENDERER: Lazy<Arc<ImmediateRenderer>> =
    Lazy::new(|| Arc::new(ImmediateRenderer::new()));

/// Shared deferred renderer, built on first use.
pub fn deferred_renderer() -> Arc<DeferredRenderer> {
    Arc::clone(&DEFERRED_RENDERER)
}

/// Shared immediate renderer, built on first use.
pub fn immediate_renderer() -> Arc<ImmediateRenderer> {
    Arc::clone(&IMMEDIATE_RENDERER)
}

/// Degraded render used when the transformer fails: newlines become hard breaks and
/// nothing else changes. Cannot fail.
pub fn fallback_render(text: &str) -> String {
    text.replace('\n', LINE_BREAK)
}

/// Pre-transform text: literal spans swapped for tokens and callouts rewritten.
struct PreparedDocument {
    text: String,
    literals: LiteralTable,
}

fn prepare(markdown: &str) -> PreparedDocument {
    let literals = extract_literals(markdown);
    let text = rewrite_callouts(&literals.text);
    PreparedDocument { text, literals }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingTransformer;

    impl BlockTransformer for FailingTransformer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn transform(&self, _text: &str) -> Result<String, RenderError> {
            Err(RenderError::transform("failing", "refused"))
        }
    }

    struct PanickingTransformer;

    impl BlockTransformer for PanickingTransformer {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn transform(&self, _text: &str) -> Result<String, RenderError> {
            panic!("grammar invariant violated")
        }
    }

    #[tokio::test]
    async fn deferred_failure_degrades_to_line_breaks() {
        let renderer = DeferredRenderer::with_transformer(Arc::new(FailingTransformer));
        let outcome = renderer.render_outcome("one\ntwo\n\nthree").await;

        assert!(outcome.degraded);
        assert_eq!(outcome.html, "one<br />two<br /><br />three");
    }

    #[tokio::test]
    async fn deferred_panic_degrades_to_line_breaks() {
        let renderer = DeferredRenderer::with_transformer(Arc::new(PanickingTransformer));
        let outcome = renderer.render_outcome("a\nb").await;

        assert!(outcome.degraded);
        assert_eq!(outcome.html, "a<br />b");
    }

    #[tokio::test]
    async fn deferred_fallback_still_restores_literals() {
        let renderer = DeferredRenderer::with_transformer(Arc::new(FailingTransformer));
        let html = renderer.render("use `<b>`\n!> careful").await;

        assert!(html.starts_with("use <code>&lt;b&gt;</code><br />"));
        assert!(html.contains("callout-warning"));
    }

    #[tokio::test]
    async fn deferred_success_is_not_degraded() {
        let outcome = DeferredRenderer::new().render_outcome("# Hi").await;

        assert!(!outcome.degraded);
        assert_eq!(outcome.html, "<h1>Hi</h1>\n");
    }

    #[test]
    fn immediate_failure_propagates() {
        let renderer = ImmediateRenderer::with_transformer(Arc::new(FailingTransformer));
        let err = renderer.render("anything").expect_err("error must reach caller");

        assert!(matches!(err, RenderError::Transform { transformer: "failing", .. }));
    }

    #[test]
    fn immediate_renders_inline_code_in_heading() {
        let html = ImmediateRenderer::new()
            .render("## Using `Vec<T>`")
            .expect("render");

        assert_eq!(html, "<h2>Using <code>Vec&lt;T&gt;</code></h2>");
    }

    #[test]
    fn fallback_only_touches_newlines() {
        assert_eq!(fallback_render("**x**\n<i>y</i>"), "**x**<br /><i>y</i>");
        assert_eq!(fallback_render(""), "");
    }
}
