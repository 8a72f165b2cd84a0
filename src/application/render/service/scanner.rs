use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::application::render::types::{BlockTransformer, RenderError};

use super::{
    callouts::CALLOUT_PREFIX,
    lists::{parse_list_item, reconstruct_lists},
    paragraphs::wrap_paragraphs,
};

/// Hard line break markup, matching what comrak emits.
pub(crate) const LINE_BREAK: &str = "<br />";

/// A pipe-bearing run shorter than this is prose, not a table.
const MIN_TABLE_LINES: usize = 2;
const MAX_HEADING_LEVEL: usize = 6;

static HORIZONTAL_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
        .expect("rule pattern must compile")
});

static IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*([^)\s]*)(?:\s+"([^"]*)")?\s*\)"#)
        .expect("image pattern must compile")
});

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]+)\]\(\s*([^)\s]*)(?:\s+"([^"]*)")?\s*\)"#)
        .expect("link pattern must compile")
});

static STRONG_EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*\*([^*\s](?:[^*]*[^*\s])?)\*\*\*").expect("strong emphasis pattern must compile")
});

static STRONG_STAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*([^*\s](?:[^*]*[^*\s])?)\*\*").expect("strong pattern must compile")
});

static STRONG_UNDERSCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b__([^_\s](?:[^_]*[^_\s])?)__\b").expect("strong pattern must compile")
});

static EMPHASIS_STAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("emphasis pattern must compile")
});

static EMPHASIS_UNDERSCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b_([^_\s](?:[^_]*[^_\s])?)_\b").expect("emphasis pattern must compile")
});

static STRIKETHROUGH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"~~([^~\s](?:[^~]*[^~\s])?)~~").expect("strikethrough pattern must compile")
});

/// Hand-written line scanner covering headings, emphasis, links, images, block
/// quotes, rules, tables and nested lists. Output follows the shape comrak produces
/// for the same constructs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanningTransformer;

impl ScanningTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl BlockTransformer for ScanningTransformer {
    fn name(&self) -> &'static str {
        "scanner"
    }

    fn transform(&self, text: &str) -> Result<String, RenderError> {
        let blocks = scan_blocks(text);
        let with_lists = reconstruct_lists(&blocks);
        Ok(wrap_paragraphs(&with_lists))
    }
}

fn scan_blocks(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut output = Vec::with_capacity(lines.len());
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index];

        if is_table_line(line) {
            let end = run_end(&lines, index, is_table_line);
            if end - index >= MIN_TABLE_LINES {
                if let Some(table) = TableModel::parse(&lines[index..end]) {
                    output.extend(table.to_html_lines());
                    index = end;
                    continue;
                }
            }
        }

        if is_quote_line(line) {
            let end = run_end(&lines, index, is_quote_line);
            output.push(render_blockquote(&lines[index..end]));
            index = end;
            continue;
        }

        output.push(render_line(line));
        index += 1;
    }

    output
}

fn run_end(lines: &[&str], start: usize, belongs: fn(&str) -> bool) -> usize {
    lines[start..]
        .iter()
        .position(|line| !belongs(line))
        .map_or(lines.len(), |offset| start + offset)
}

fn render_line(line: &str) -> String {
    if HORIZONTAL_RULE.is_match(line) {
        return "<hr />".to_string();
    }

    if let Some((level, content)) = parse_heading(line) {
        return format!("<h{level}>{}</h{level}>", render_inline(content));
    }

    if let Some(item) = parse_list_item(line) {
        let marker_len = line.len() - item.body.len();
        return format!("{}{}", &line[..marker_len], render_inline(item.body));
    }

    render_inline(line)
}

/// Most specific prefix first so `######` is never read as a shorter heading.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    (1..=MAX_HEADING_LEVEL).rev().find_map(|level| {
        let rest = line.strip_prefix("#".repeat(level).as_str())?;
        if rest.is_empty() || rest.starts_with([' ', '\t']) {
            Some((level, rest.trim()))
        } else {
            None
        }
    })
}

fn is_quote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn render_blockquote(lines: &[&str]) -> String {
    let body = lines
        .iter()
        .map(|line| {
            let content = line.trim_start().trim_start_matches('>');
            let content = content.strip_prefix(' ').unwrap_or(content);
            render_inline(content.trim_end())
        })
        .collect::<Vec<_>>()
        .join(&format!("{LINE_BREAK}\n"));
    format!("<blockquote>\n<p>{body}</p>\n</blockquote>")
}

/// Inline pass. Images run before links so the `!` of an image is never stranded,
/// and combined strong emphasis runs before its single forms.
pub(crate) fn render_inline(text: &str) -> String {
    let text = IMAGE.replace_all(text, |caps: &Captures<'_>| {
        let mut html = format!(
            "<img src=\"{}\" alt=\"{}\"",
            escape_attribute(&caps[2]),
            escape_attribute(&caps[1])
        );
        if let Some(title) = caps.get(3) {
            html.push_str(&format!(" title=\"{}\"", escape_attribute(title.as_str())));
        }
        html.push_str(" />");
        html
    });

    let text = LINK.replace_all(&text, |caps: &Captures<'_>| {
        let title = caps
            .get(3)
            .map(|title| format!(" title=\"{}\"", escape_attribute(title.as_str())))
            .unwrap_or_default();
        format!(
            "<a href=\"{}\"{title}>{}</a>",
            escape_attribute(&caps[2]),
            &caps[1]
        )
    });

    let text = STRONG_EMPHASIS.replace_all(&text, "<em><strong>${1}</strong></em>");
    let text = STRONG_STAR.replace_all(&text, "<strong>${1}</strong>");
    let text = STRONG_UNDERSCORE.replace_all(&text, "<strong>${1}</strong>");
    let text = EMPHASIS_STAR.replace_all(&text, "<em>${1}</em>");
    let text = EMPHASIS_UNDERSCORE.replace_all(&text, "<em>${1}</em>");
    let text = STRIKETHROUGH.replace_all(&text, "<del>${1}</del>");

    text.into_owned()
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn is_table_line(line: &str) -> bool {
    line.contains('|') && !line.starts_with(CALLOUT_PREFIX)
}

fn is_separator_row(line: &str) -> bool {
    line.contains('-')
        && line
            .chars()
            .all(|ch| matches!(ch, '-' | ':' | '|' | ' ' | '\t'))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn from_separator_cell(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.len() > 1 && cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        }
    }

    fn attribute(self) -> &'static str {
        match self {
            Alignment::None => "",
            Alignment::Left => " align=\"left\"",
            Alignment::Center => " align=\"center\"",
            Alignment::Right => " align=\"right\"",
        }
    }
}

/// Permissive table model: separator rows are dropped wherever they appear and the
/// first remaining row is the header. Data rows are padded or cut to header width.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableModel {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl TableModel {
    fn parse(lines: &[&str]) -> Option<Self> {
        let mut alignments: Option<Vec<Alignment>> = None;
        let mut rows = Vec::with_capacity(lines.len());

        for line in lines {
            if is_separator_row(line) {
                if alignments.is_none() {
                    alignments = Some(
                        split_cells(line)
                            .iter()
                            .map(|cell| Alignment::from_separator_cell(cell))
                            .collect(),
                    );
                }
                continue;
            }
            rows.push(split_cells(line));
        }

        let mut rows = rows.into_iter();
        let header = rows.next()?;
        let width = header.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        let mut alignments = alignments.unwrap_or_default();
        alignments.resize(width, Alignment::None);

        Some(Self {
            header,
            rows,
            alignments,
        })
    }

    fn to_html_lines(&self) -> Vec<String> {
        let mut lines = vec!["<table>".to_string(), "<thead>".to_string()];
        lines.extend(self.row_lines("th", &self.header));
        lines.push("</thead>".to_string());

        if !self.rows.is_empty() {
            lines.push("<tbody>".to_string());
            for row in &self.rows {
                lines.extend(self.row_lines("td", row));
            }
            lines.push("</tbody>".to_string());
        }

        lines.push("</table>".to_string());
        lines
    }

    fn row_lines(&self, tag: &str, cells: &[String]) -> Vec<String> {
        let mut lines = Vec::with_capacity(cells.len() + 2);
        lines.push("<tr>".to_string());
        for (cell, alignment) in cells.iter().zip(&self.alignments) {
            lines.push(format!(
                "<{tag}{}>{}</{tag}>",
                alignment.attribute(),
                render_inline(cell)
            ));
        }
        lines.push("</tr>".to_string());
        lines
    }
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}
