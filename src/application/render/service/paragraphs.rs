use super::{callouts::CALLOUT_PREFIX, literals::BLOCK_TOKEN_PREFIX, scanner::LINE_BREAK};

/// Prefixes of lines that an earlier stage already turned into block markup. Any new
/// block type emitted by the scanner must be listed here or it will be wrapped.
const BLOCK_PREFIXES: &[&str] = &[
    "<h1",
    "<h2",
    "<h3",
    "<h4",
    "<h5",
    "<h6",
    "<ul",
    "<ol",
    "<li",
    "<blockquote",
    "<table",
    "<thead",
    "<tbody",
    "<tr",
    "<th",
    "<td",
    "<hr",
    "<pre",
    "</",
    CALLOUT_PREFIX,
    BLOCK_TOKEN_PREFIX,
];

pub(crate) fn is_block_line(line: &str) -> bool {
    BLOCK_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Wrap runs of bare text lines in `<p>`; lines inside a run are joined with a hard
/// break and blank lines end the run.
pub(crate) fn wrap_paragraphs(lines: &[String]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_block_line(line.trim_start()) {
            flush_paragraph(&mut paragraph, &mut blocks);
            if !trimmed.is_empty() {
                blocks.push(line.clone());
            }
        } else {
            paragraph.push(trimmed);
        }
    }
    flush_paragraph(&mut paragraph, &mut blocks);

    blocks.join("\n")
}

fn flush_paragraph(paragraph: &mut Vec<&str>, blocks: &mut Vec<String>) {
    if paragraph.is_empty() {
        return;
    }
    let separator = format!("{LINE_BREAK}\n");
    blocks.push(format!("<p>{}</p>", paragraph.join(&separator)));
    paragraph.clear();
}
