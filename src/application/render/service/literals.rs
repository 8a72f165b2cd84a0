use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

pub(crate) const TOKEN_OPEN: char = '\u{E000}';
pub(crate) const TOKEN_CLOSE: char = '\u{E001}';
/// Every code-block token starts with this prefix.
pub(crate) const BLOCK_TOKEN_PREFIX: &str = "\u{E000}B";

const NEUTRALIZED_SENTINEL: &str = "\u{FFFD}";

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:([^\s`]*)[ \t]*\n)?(.*?)```").expect("fenced block pattern must compile")
});

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([^`\n\x{E000}\x{E001}]+)`").expect("inline code pattern must compile")
});

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{E000}([BI])(\d+)\x{E001}").expect("token pattern must compile"));

static WRAPPED_BLOCK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<p>\x{E000}B(\d+)\x{E001}</p>").expect("wrapped token pattern must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralKind {
    CodeBlock,
    InlineCode,
}

impl LiteralKind {
    fn tag(self) -> char {
        match self {
            LiteralKind::CodeBlock => 'B',
            LiteralKind::InlineCode => 'I',
        }
    }

    fn from_tag(tag: &str) -> Self {
        if tag == "B" {
            LiteralKind::CodeBlock
        } else {
            LiteralKind::InlineCode
        }
    }
}

/// Source text lifted out of the document before any markdown rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiteralSpan {
    pub index: usize,
    pub kind: LiteralKind,
    pub content: String,
    /// Info word of a fenced block, if one was given.
    pub language: Option<String>,
}

impl LiteralSpan {
    pub fn placeholder(&self) -> String {
        format!(
            "{TOKEN_OPEN}{}{}{TOKEN_CLOSE}",
            self.kind.tag(),
            self.index
        )
    }

    pub fn to_html(&self) -> String {
        let escaped = escape_html(&self.content);
        match (self.kind, self.language.as_deref()) {
            (LiteralKind::CodeBlock, Some(language)) => format!(
                "<pre><code class=\"language-{}\">{escaped}</code></pre>",
                escape_html(language)
            ),
            (LiteralKind::CodeBlock, None) => format!("<pre><code>{escaped}</code></pre>"),
            (LiteralKind::InlineCode, _) => format!("<code>{escaped}</code>"),
        }
    }
}

/// Document text with literal spans swapped for placeholder tokens, plus the side
/// table needed to swap them back. `spans[i].index == i` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiteralTable {
    pub text: String,
    pub spans: Vec<LiteralSpan>,
}

/// Replace fenced code blocks, then inline code spans, with placeholder tokens.
///
/// Line endings are normalized to `\n` and delimiter code points already present in the
/// input are neutralized first, so the only tokens in the returned text are the ones
/// created here. A fence that opens its line is replaced by a token standing on its own
/// line between blank lines, which keeps it out of any neighbouring paragraph.
pub fn extract_literals(markdown: &str) -> LiteralTable {
    let source = normalize_input(markdown);
    let mut spans = Vec::new();

    let without_blocks = FENCED_BLOCK.replace_all(&source, |caps: &Captures<'_>| {
        let fence_start = caps.get(0).map_or(0, |m| m.start());
        let indent = line_indent_before(&source, fence_start);
        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|info| !info.is_empty())
            .map(str::to_owned);
        let content = caps.get(2).map_or("", |m| m.as_str());
        let content = match indent {
            Some(indent) if !indent.is_empty() => strip_fence_indent(content, indent.len()),
            _ => content.to_owned(),
        };
        let placeholder = push_span(&mut spans, LiteralKind::CodeBlock, content, language);
        match indent {
            Some(indent) => format!("\n{indent}{placeholder}\n"),
            None => placeholder,
        }
    });

    let text = INLINE_CODE
        .replace_all(&without_blocks, |caps: &Captures<'_>| {
            push_span(&mut spans, LiteralKind::InlineCode, caps[1].to_owned(), None)
        })
        .into_owned();

    LiteralTable { text, spans }
}

impl LiteralTable {
    /// Swap every placeholder in `html` for the escaped literal it stands for.
    pub fn restore(&self, html: &str) -> String {
        if self.spans.is_empty() {
            return html.to_owned();
        }

        let unwrapped = WRAPPED_BLOCK_TOKEN.replace_all(html, |caps: &Captures<'_>| {
            self.render_token(LiteralKind::CodeBlock, &caps[1])
        });

        TOKEN
            .replace_all(&unwrapped, |caps: &Captures<'_>| {
                self.render_token(LiteralKind::from_tag(&caps[1]), &caps[2])
            })
            .into_owned()
    }

    fn render_token(&self, kind: LiteralKind, index: &str) -> String {
        index
            .parse::<usize>()
            .ok()
            .and_then(|index| self.spans.get(index))
            .filter(|span| span.kind == kind)
            .map(LiteralSpan::to_html)
            .unwrap_or_default()
    }
}

/// Escape the five HTML-significant characters. `&` goes first so the entities
/// introduced for the others are not escaped again.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn push_span(
    spans: &mut Vec<LiteralSpan>,
    kind: LiteralKind,
    content: String,
    language: Option<String>,
) -> String {
    let span = LiteralSpan {
        index: spans.len(),
        kind,
        content,
        language,
    };
    let placeholder = span.placeholder();
    spans.push(span);
    placeholder
}

fn normalize_input(markdown: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(markdown);
    if text.contains("\r\n") {
        text = Cow::Owned(text.replace("\r\n", "\n"));
    }
    if text.contains([TOKEN_OPEN, TOKEN_CLOSE]) {
        text = Cow::Owned(text.replace([TOKEN_OPEN, TOKEN_CLOSE], NEUTRALIZED_SENTINEL));
    }
    text
}

/// Whitespace between the start of the line and `position`, or `None` when other
/// text precedes `position` on that line.
fn line_indent_before(text: &str, position: usize) -> Option<&str> {
    let line_start = text[..position].rfind('\n').map_or(0, |newline| newline + 1);
    let lead = &text[line_start..position];
    lead.chars()
        .all(|ch| ch == ' ' || ch == '\t')
        .then_some(lead)
}

/// Remove up to `width` columns of the fence's own indentation from every content
/// line. The whitespace that precedes an indented closing fence is dropped.
fn strip_fence_indent(content: &str, width: usize) -> String {
    let mut lines: Vec<&str> = content.split('\n').collect();
    if let Some(last) = lines.last_mut() {
        if last.trim().is_empty() {
            *last = "";
        }
    }
    lines
        .iter()
        .map(|line| {
            let cut = line
                .chars()
                .take(width)
                .take_while(|ch| *ch == ' ' || *ch == '\t')
                .count();
            &line[cut..]
        })
        .collect::<Vec<_>>()
        .join("\n")
}
