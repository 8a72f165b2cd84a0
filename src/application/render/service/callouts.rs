use once_cell::sync::Lazy;
use regex::Regex;

/// Opening markup shared by every callout wrapper.
pub(crate) const CALLOUT_PREFIX: &str = "<div class=\"callout ";

static CALLOUT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([!?:])>\s+(.*?)\r?$").expect("callout pattern must compile"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutKind {
    Warning,
    Info,
    Success,
}

impl CalloutKind {
    fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "!" => Some(CalloutKind::Warning),
            "?" => Some(CalloutKind::Info),
            ":" => Some(CalloutKind::Success),
            _ => None,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            CalloutKind::Warning => "warning",
            CalloutKind::Info => "info",
            CalloutKind::Success => "success",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalloutKind::Warning => "Warning",
            CalloutKind::Info => "Info",
            CalloutKind::Success => "Success",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            CalloutKind::Warning => "\u{26A0}\u{FE0F}",
            CalloutKind::Info => "\u{2139}\u{FE0F}",
            CalloutKind::Success => "\u{2705}",
        }
    }
}

/// Rewrite every `!> `, `?> ` and `:> ` line into a callout wrapper. The marker must
/// sit at column 0 and a callout never spans more than its own line.
pub(crate) fn rewrite_callouts(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for (position, line) in text.split('\n').enumerate() {
        if position > 0 {
            output.push('\n');
        }
        match parse_callout(line) {
            Some((kind, body)) => output.push_str(&render_callout(kind, body)),
            None => output.push_str(line),
        }
    }
    output
}

fn parse_callout(line: &str) -> Option<(CalloutKind, &str)> {
    let caps = CALLOUT_LINE.captures(line)?;
    let kind = CalloutKind::from_marker(caps.get(1)?.as_str())?;
    let body = caps.get(2).map_or("", |m| m.as_str());
    Some((kind, body))
}

fn render_callout(kind: CalloutKind, body: &str) -> String {
    format!(
        "{CALLOUT_PREFIX}callout-{}\" role=\"note\"><span class=\"callout-icon\" aria-label=\"{}\">{}</span><span class=\"callout-body\">{body}</span></div>",
        kind.class_name(),
        kind.label(),
        kind.icon(),
    )
}
