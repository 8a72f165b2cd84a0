use once_cell::sync::Lazy;
use regex::Regex;

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)(?:([-*+])|(\d{1,9})[.)])[ \t]+(.*)$")
        .expect("list item pattern must compile")
});

const TAB_WIDTH: usize = 4;
const COLUMNS_PER_LEVEL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn closing_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "</ul>",
            ListKind::Numbered => "</ol>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListItem<'a> {
    pub(crate) level: usize,
    pub(crate) kind: ListKind,
    pub(crate) body: &'a str,
    /// Ordinal written in front of a numbered item.
    pub(crate) start: Option<u64>,
}

/// Split a raw line into its list item parts, if it is one.
pub(crate) fn parse_list_item(line: &str) -> Option<ListItem<'_>> {
    let caps = LIST_ITEM.captures(line)?;
    let (kind, start) = match caps.get(3) {
        Some(number) => (ListKind::Numbered, number.as_str().parse().ok()),
        None => (ListKind::Bullet, None),
    };
    Some(ListItem {
        level: indent_level(line),
        kind,
        body: caps.get(4).map_or("", |m| m.as_str()),
        start,
    })
}

/// Nesting level of a raw line: leading whitespace width over two, rounded down.
pub(crate) fn indent_level(line: &str) -> usize {
    let width: usize = line
        .chars()
        .take_while(|ch| *ch == ' ' || *ch == '\t')
        .map(|ch| if ch == '\t' { TAB_WIDTH } else { 1 })
        .sum();
    width / COLUMNS_PER_LEVEL
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: ListKind,
    level: usize,
}

/// Turn runs of indented list item lines into nested `<ul>`/`<ol>` markup. Every
/// other line passes through unchanged and closes any open lists first.
pub(crate) fn reconstruct_lists(lines: &[String]) -> Vec<String> {
    let mut builder = ListBuilder::default();
    let mut output = Vec::with_capacity(lines.len());

    for (position, line) in lines.iter().enumerate() {
        if let Some(item) = parse_list_item(line) {
            builder.push_item(&item, &mut output);
            continue;
        }

        if line.trim().is_empty()
            && builder.is_open()
            && next_content_is_item(&lines[position + 1..])
        {
            continue;
        }

        builder.close_all(&mut output);
        output.push(line.clone());
    }

    builder.close_all(&mut output);
    output
}

fn next_content_is_item(rest: &[String]) -> bool {
    rest.iter()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| parse_list_item(line).is_some())
}

#[derive(Default)]
struct ListBuilder {
    frames: Vec<Frame>,
}

impl ListBuilder {
    fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    fn push_item(&mut self, item: &ListItem<'_>, output: &mut Vec<String>) {
        while self
            .frames
            .last()
            .is_some_and(|frame| frame.level > item.level)
        {
            self.close_top(output);
        }

        match self.frames.last().copied() {
            Some(top) if top.level == item.level && top.kind == item.kind => {
                close_item(output);
            }
            Some(top) if top.level == item.level => {
                // A different marker at the same depth ends the list and starts a new one.
                self.close_top(output);
                self.open(item, output);
            }
            _ => self.open(item, output),
        }

        output.push(format!("<li>{}", item.body));
    }

    fn open(&mut self, item: &ListItem<'_>, output: &mut Vec<String>) {
        self.frames.push(Frame {
            kind: item.kind,
            level: item.level,
        });
        let tag = match (item.kind, item.start) {
            (ListKind::Bullet, _) => "<ul>".to_string(),
            (ListKind::Numbered, Some(start)) if start != 1 => format!("<ol start=\"{start}\">"),
            (ListKind::Numbered, _) => "<ol>".to_string(),
        };
        output.push(tag);
    }

    fn close_top(&mut self, output: &mut Vec<String>) {
        if let Some(frame) = self.frames.pop() {
            close_item(output);
            output.push(frame.kind.closing_tag().to_string());
        }
    }

    fn close_all(&mut self, output: &mut Vec<String>) {
        while self.is_open() {
            self.close_top(output);
        }
    }
}

fn close_item(output: &mut Vec<String>) {
    match output.last_mut() {
        Some(last) if last.starts_with("<li>") => last.push_str("</li>"),
        _ => output.push("</li>".to_string()),
    }
}
