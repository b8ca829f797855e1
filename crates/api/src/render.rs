//! Content rendering seam
//!
//! Post bodies are stored raw and rendered into displayable documents at
//! read time, inside `get_post` only. The renderer is an opaque
//! collaborator; the resolver never caches a page whose render failed.

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rendered post body, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer rejected input: {0}")]
    Rejected(String),
}

/// Opaque transformation from raw content to a displayable document.
#[async_trait]
pub trait ContentRenderer: Send + Sync {
    async fn render(&self, raw: &str) -> Result<RenderedDocument, RenderError>;
}

/// Markdown renderer used in production.
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRenderer for MarkdownRenderer {
    async fn render(&self, raw: &str) -> Result<RenderedDocument, RenderError> {
        let parser = Parser::new_ext(raw, self.options);
        let mut out = String::with_capacity(raw.len() * 2);
        html::push_html(&mut out, parser);
        Ok(RenderedDocument { html: out })
    }
}
