//! Article output type with content, metadata, and format conversion.
//!
//! This module defines the [`Article`] struct which represents the complete
//! result of a successful extraction: the cleaned content tree, its Markdown
//! rendering, and the resolved metadata.

use crate::Result;
use crate::dom::Dom;
use crate::formatters::text::{TextConfig, convert_to_text, normalized_text};
use crate::metadata::Metadata;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\w'-]+\b").unwrap());

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Cleaned content as HTML.
    Html,
    /// Serialized Markdown.
    Markdown,
    /// Normalized visible text.
    PlainText,
    /// JSON document with metadata and content.
    Json,
}

/// The complete result of reading an HTML document.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: Option<String>,
    pub byline: Option<String>,
    /// Text direction, `ltr` or `rtl` when declared
    pub direction: Option<String>,
    pub site_name: Option<String>,
    pub excerpt: Option<String>,
    pub lang: Option<String>,

    /// Cleaned content tree; its root is the extracted element.
    ///
    /// Serialized as HTML.
    #[serde(serialize_with = "content_as_html")]
    pub content: Dom,

    /// Markdown rendering of `content`, truncated when a ceiling is set.
    pub markdown: String,

    /// Length of the visible text of `content`, in characters.
    pub text_length: usize,
}

fn content_as_html<S: Serializer>(content: &Dom, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&content.outer_html(content.root()))
}

impl Article {
    /// Creates an Article from its parts, measuring the visible text of `content`.
    pub fn new(content: Dom, markdown: String, metadata: Metadata) -> Self {
        let text_length = normalized_text(&content, content.root()).chars().count();
        Self {
            title: metadata.title,
            byline: metadata.byline,
            direction: metadata.direction,
            site_name: metadata.site_name,
            excerpt: metadata.excerpt,
            lang: metadata.lang,
            content,
            markdown,
            text_length,
        }
    }

    /// The metadata fields as a [`Metadata`] value.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            title: self.title.clone(),
            byline: self.byline.clone(),
            site_name: self.site_name.clone(),
            direction: self.direction.clone(),
            excerpt: self.excerpt.clone(),
            lang: self.lang.clone(),
        }
    }

    /// Cleaned content as HTML.
    pub fn content_html(&self) -> String {
        self.content.outer_html(self.content.root())
    }

    /// Converts content to the specified format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content_html()),
            OutputFormat::Markdown => Ok(self.markdown.clone()),
            OutputFormat::PlainText => Ok(self.to_plain_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.to_json()?)?),
        }
    }

    /// Gets the article as structured JSON, with `content` rendered as HTML.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Gets content as normalized plain text.
    pub fn to_text(&self) -> String {
        normalized_text(&self.content, self.content.root())
    }

    /// Plain text under a title header, one paragraph per block.
    pub fn to_plain_text(&self) -> String {
        let config = TextConfig { preserve_paragraphs: true, include_header: true, ..Default::default() };
        convert_to_text(&self.content, self.content.root(), &self.metadata(), &config)
    }

    /// Word count of the visible text.
    pub fn word_count(&self) -> usize {
        WORD_RE.find_iter(&self.to_text()).count()
    }
}
