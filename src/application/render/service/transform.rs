use comrak::{Arena, format_html, parse_document};

use crate::application::render::types::{BlockTransformer, RenderError};

use super::config::default_options;

/// Grammar-based transformer: comrak with GFM tables, strikethrough, autolinks and
/// hard line breaks. Raw markup in the source is emitted unchanged.
pub struct ComrakTransformer {
    options: comrak::Options<'static>,
}

impl ComrakTransformer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
        }
    }
}

impl Default for ComrakTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTransformer for ComrakTransformer {
    fn name(&self) -> &'static str {
        "comrak"
    }

    fn transform(&self, text: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, text, &self.options);

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;
        Ok(html)
    }
}
