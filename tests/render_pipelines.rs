use std::sync::Arc;

use scrivo::application::render::{
    BlockTransformer, CalloutKind, DeferredRenderer, PipelineKind, RenderError,
    deferred_renderer, extract_literals, immediate_renderer,
};

const SCENARIO: &str = "# Title\n\nSome **bold** and `code` text.\n\n!> watch out\n\n- a\n  - b\n- c";

async fn render_both(markdown: &str) -> Vec<(PipelineKind, String)> {
    let deferred = deferred_renderer().render(markdown).await;
    let immediate = immediate_renderer()
        .render(markdown)
        .expect("immediate render succeeds");
    vec![
        (PipelineKind::Deferred, deferred),
        (PipelineKind::Immediate, immediate),
    ]
}

fn count(html: &str, needle: &str) -> usize {
    html.matches(needle).count()
}

/// Deepest list nesting in `html`, asserting every opened list is closed.
fn list_depth(html: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    for (position, _) in html.match_indices('<') {
        let rest = &html[position..];
        if rest.starts_with("<ul") || rest.starts_with("<ol") {
            depth += 1;
            deepest = deepest.max(depth);
        } else if rest.starts_with("</ul>") || rest.starts_with("</ol>") {
            depth = depth.checked_sub(1).expect("list closed before it was opened");
        }
    }
    assert_eq!(depth, 0, "unbalanced lists in {html}");
    deepest
}

#[derive(Clone, Copy)]
enum Marker {
    Bullet,
    Numbered,
}

fn list_document(items: &[(usize, Marker)]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(position, (level, marker))| {
            let marker = match marker {
                Marker::Bullet => "-",
                Marker::Numbered => "1.",
            };
            format!("{}{marker} item{position}", "  ".repeat(*level))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn prose_output_contains_no_literal_spans() {
    let markdown = "Plain words here.\nAnother line, still plain.\n\nA second paragraph.";

    for (pipeline, html) in render_both(markdown).await {
        let table = extract_literals(&html);
        assert!(table.spans.is_empty(), "{pipeline:?}: {html}");
        assert!(!html.contains('\u{E000}'), "{pipeline:?}: {html}");
    }
}

#[tokio::test]
async fn restored_code_leaves_no_tokens_behind() {
    let markdown = "Call `run()` then:\n\n```rust\nlet x = 1;\n```\n\nDone with `x`.";

    for (pipeline, html) in render_both(markdown).await {
        assert!(!html.contains('\u{E000}'), "{pipeline:?}: {html}");
        assert!(!html.contains('\u{E001}'), "{pipeline:?}: {html}");
        assert!(html.contains("<code>run()</code>"), "{pipeline:?}: {html}");
        assert!(
            html.contains("<pre><code class=\"language-rust\">let x = 1;\n</code></pre>"),
            "{pipeline:?}: {html}"
        );
        assert!(extract_literals(&html).spans.is_empty(), "{pipeline:?}: {html}");
    }
}

#[tokio::test]
async fn fenced_code_is_never_formatted() {
    let markdown = "```\n**not bold**\n# not a heading\n!> not a callout\n```";
    let expected =
        "<pre><code>**not bold**\n# not a heading\n!&gt; not a callout\n</code></pre>";

    for (pipeline, html) in render_both(markdown).await {
        assert!(html.contains(expected), "{pipeline:?}: {html}");
        assert!(!html.contains("<strong>"), "{pipeline:?}: {html}");
        assert!(!html.contains("<h1>"), "{pipeline:?}: {html}");
        assert!(!html.contains("<div class=\"callout"), "{pipeline:?}: {html}");
        assert!(!html.contains("<p><pre>"), "{pipeline:?}: {html}");
    }
}

#[tokio::test]
async fn fence_between_paragraph_lines_splits_the_paragraph() {
    let markdown = "Here is code:\n```rust\nfn x() {}\n```\nAfter.";
    let code = "<pre><code class=\"language-rust\">fn x() {}\n</code></pre>";

    for (pipeline, html) in render_both(markdown).await {
        assert!(html.contains("<p>Here is code:</p>"), "{pipeline:?}: {html}");
        assert!(html.contains(code), "{pipeline:?}: {html}");
        assert!(html.contains("<p>After.</p>"), "{pipeline:?}: {html}");
        assert!(!html.contains("<br />"), "{pipeline:?}: {html}");
        assert!(!html.contains("<p><pre>"), "{pipeline:?}: {html}");
    }
}

#[tokio::test]
async fn crlf_input_renders_like_lf_input() {
    let lf = "Intro\n\n```rust\nfn x() {}\n```\n\n!> careful\n";
    let crlf = lf.replace('\n', "\r\n");

    let lf_html = render_both(lf).await;
    let crlf_html = render_both(&crlf).await;

    for ((pipeline, expected), (_, html)) in lf_html.iter().zip(&crlf_html) {
        assert_eq!(html, expected, "{pipeline:?}");
        assert!(html.contains("class=\"language-rust\""), "{pipeline:?}: {html}");
        assert!(
            html.contains("<span class=\"callout-body\">careful</span>"),
            "{pipeline:?}: {html}"
        );
    }
}

#[tokio::test]
async fn forged_tokens_never_become_code() {
    let markdown = "before \u{E000}B0\u{E001} after";

    for (pipeline, html) in render_both(markdown).await {
        assert!(!html.contains("<pre>"), "{pipeline:?}: {html}");
        assert!(html.contains("before"), "{pipeline:?}: {html}");
        assert!(html.contains("after"), "{pipeline:?}: {html}");
    }
}

#[tokio::test]
async fn list_nesting_balances_in_both_pipelines() {
    use Marker::{Bullet, Numbered};

    let cases: [(&[(usize, Marker)], usize, usize, usize); 4] = [
        (&[(0, Bullet), (0, Bullet)], 1, 0, 1),
        (&[(0, Bullet), (1, Bullet), (1, Bullet), (0, Bullet)], 2, 0, 2),
        (&[(0, Bullet), (2, Bullet), (0, Bullet)], 2, 0, 2),
        (
            &[(0, Bullet), (1, Numbered), (0, Bullet), (1, Numbered)],
            1,
            2,
            2,
        ),
    ];

    for (items, bullet_lists, numbered_lists, depth) in cases {
        let markdown = list_document(items);
        for (pipeline, html) in render_both(&markdown).await {
            assert_eq!(count(&html, "<ul>"), bullet_lists, "{pipeline:?}: {html}");
            assert_eq!(count(&html, "</ul>"), bullet_lists, "{pipeline:?}: {html}");
            assert_eq!(count(&html, "<ol"), numbered_lists, "{pipeline:?}: {html}");
            assert_eq!(count(&html, "</ol>"), numbered_lists, "{pipeline:?}: {html}");
            assert_eq!(count(&html, "<li>"), items.len(), "{pipeline:?}: {html}");
            assert_eq!(count(&html, "</li>"), items.len(), "{pipeline:?}: {html}");
            assert_eq!(list_depth(&html), depth, "{pipeline:?}: {html}");
        }
    }
}

#[tokio::test]
async fn table_separator_row_is_elided() {
    let markdown = "| Name | Qty |\n| --- | --- |\n| pen | 2 |";

    for (pipeline, html) in render_both(markdown).await {
        assert_eq!(count(&html, "<tr>"), 2, "{pipeline:?}: {html}");
        assert_eq!(count(&html, "</th>"), 2, "{pipeline:?}: {html}");
        assert_eq!(count(&html, "</td>"), 2, "{pipeline:?}: {html}");
        assert!(html.contains("<td>pen</td>"), "{pipeline:?}: {html}");
        assert!(!html.contains("---"), "{pipeline:?}: {html}");
    }
}

fn relabel(html: &str, from: CalloutKind, to: CalloutKind) -> String {
    html.replace(
        &format!("callout-{}", from.class_name()),
        &format!("callout-{}", to.class_name()),
    )
    .replace(
        &format!("aria-label=\"{}\"", from.label()),
        &format!("aria-label=\"{}\"", to.label()),
    )
    .replace(from.icon(), to.icon())
}

#[tokio::test]
async fn callout_prefix_only_changes_kind() {
    let warning = render_both("!> mind the gap\n\nafter").await;
    let info = render_both("?> mind the gap\n\nafter").await;
    let success = render_both(":> mind the gap\n\nafter").await;

    for (((pipeline, warning), (_, info)), (_, success)) in
        warning.iter().zip(&info).zip(&success)
    {
        assert!(warning.contains("callout-warning"), "{pipeline:?}: {warning}");
        assert_eq!(
            &relabel(warning, CalloutKind::Warning, CalloutKind::Info),
            info,
            "{pipeline:?}"
        );
        assert_eq!(
            &relabel(warning, CalloutKind::Warning, CalloutKind::Success),
            success,
            "{pipeline:?}"
        );
    }
}

#[tokio::test]
async fn deferred_pipeline_renders_scenario() {
    let outcome = deferred_renderer().render_outcome(SCENARIO).await;

    assert!(!outcome.degraded);
    let html = outcome.html;
    assert!(html.contains("<h1>Title</h1>"), "{html}");
    assert!(
        html.contains("<p>Some <strong>bold</strong> and <code>code</code> text.</p>"),
        "{html}"
    );
    assert!(
        html.contains(
            "<div class=\"callout callout-warning\" role=\"note\">\
             <span class=\"callout-icon\" aria-label=\"Warning\">\u{26A0}\u{FE0F}</span>\
             <span class=\"callout-body\">watch out</span></div>"
        ),
        "{html}"
    );
    assert_eq!(count(&html, "<ul>"), 2, "{html}");
    assert_eq!(list_depth(&html), 2, "{html}");
}

#[tokio::test]
async fn deferred_pipeline_renders_inline_code_in_heading() {
    let html = deferred_renderer().render("## Using `Vec<T>`").await;

    assert_eq!(html.trim_end(), "<h2>Using <code>Vec&lt;T&gt;</code></h2>");
}

struct BrokenGrammar;

impl BlockTransformer for BrokenGrammar {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn transform(&self, _text: &str) -> Result<String, RenderError> {
        Err(RenderError::transform("broken", "unexpected token"))
    }
}

#[tokio::test]
async fn failing_transformer_yields_line_break_fallback() {
    let renderer = DeferredRenderer::with_transformer(Arc::new(BrokenGrammar));
    let outcome = renderer.render_outcome(SCENARIO).await;

    assert!(outcome.degraded);
    assert!(!outcome.html.contains('\n'), "{}", outcome.html);
    assert!(outcome.html.starts_with(
        "# Title<br /><br />Some **bold** and <code>code</code> text.<br /><br />\
         <div class=\"callout callout-warning\""
    ));
    assert!(outcome.html.ends_with("- a<br />  - b<br />- c"));
}
