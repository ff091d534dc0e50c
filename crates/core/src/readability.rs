//! Main content extraction API.
//!
//! This module provides the primary API for turning a parsed HTML page into a
//! readable [`Article`]. The main entry point is the [`Readability`] struct,
//! along with the convenience functions [`parse`] and [`parse_with_url`].
//!
//! A run moves through the stages of [`Stage`] in order, once:
//! scoring, extracting, cleaning, then serializing. Extraction failures are
//! reported as recoverable errors; [`Readability::capture`] turns them into a
//! plain-text fallback.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::readability::parse;
//!
//! let html = r#"<html><body><article><h1>T</h1>
//!     <p>Hello world this is the article body with enough length to score well.</p>
//!     </article></body></html>"#;
//! let article = parse(html).unwrap();
//! assert!(article.markdown.starts_with("# T"));
//! ```

use std::fmt;

use crate::article::Article;
use crate::dom::Dom;
use crate::extract::{ExtractConfig, extract_content};
use crate::formatters::markdown::{MarkdownOptions, MarkdownSerializer};
use crate::formatters::text::normalized_text;
use crate::metadata::extract_metadata;
use crate::parse::Document;
use crate::postprocess::PostProcessConfig;
use crate::scoring::ScoreConfig;
use crate::{ReadmarkError, Result};
use url::Url;

/// Returned by [`Capture::text`] when a page has no visible text at all.
pub const NO_CONTENT: &str = "No readable content found.";

/// Elements whose text is used when extraction fails, in preference order
const FALLBACK_TAGS: &[&str] = &["article", "main", "body"];

/// Pipeline stage, logged at debug level as a run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Scoring,
    Extracting,
    Cleaning,
    Serializing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Scoring => "scoring",
            Stage::Extracting => "extracting",
            Stage::Cleaning => "cleaning",
            Stage::Serializing => "serializing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Configuration for the Readability builder.
///
/// # Example
///
/// ```rust
/// use readmark_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .max_elements(5000)
///     .max_chars(20_000)
///     .keep_classes(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Maximum elements in a document (0 = unlimited, default: 0).
    pub max_elements: usize,

    /// Maximum characters of Markdown output (0 = unlimited, default: 0).
    pub max_chars: usize,

    /// Appended to output cut at `max_chars`.
    pub truncation_marker: String,

    /// Whether to remove unlikely candidates (default: true).
    pub remove_unlikely: bool,

    /// Whether to preserve class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Class names that survive unlikely removal and attribute stripping.
    pub preserved_classes: Vec<String>,

    /// Scoring constants.
    pub score: ScoreConfig,

    /// Markdown serialization options.
    pub markdown: MarkdownOptions,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            max_elements: 0,
            max_chars: 0,
            truncation_marker: "\n\n[truncated]".to_string(),
            remove_unlikely: true,
            keep_classes: false,
            preserved_classes: Vec::new(),
            score: ScoreConfig::default(),
            markdown: MarkdownOptions::default(),
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            remove_unlikely: self.remove_unlikely,
            preserved_classes: self.preserved_classes.clone(),
            score: self.score.clone(),
            postprocess: PostProcessConfig {
                keep_classes: self.keep_classes,
                preserved_classes: self.preserved_classes.clone(),
            },
        }
    }
}

/// Builder for ReadabilityConfig.
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the element ceiling.
    pub fn max_elements(mut self, value: usize) -> Self {
        self.config.max_elements = value;
        self
    }

    /// Sets the output character ceiling.
    pub fn max_chars(mut self, value: usize) -> Self {
        self.config.max_chars = value;
        self
    }

    pub fn truncation_marker(mut self, value: impl Into<String>) -> Self {
        self.config.truncation_marker = value.into();
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    /// Adds a class name that is always preserved.
    pub fn preserve_class(mut self, value: impl Into<String>) -> Self {
        self.config.preserved_classes.push(value.into());
        self
    }

    pub fn score(mut self, value: ScoreConfig) -> Self {
        self.config.score = value;
        self
    }

    pub fn markdown(mut self, value: MarkdownOptions) -> Self {
        self.config.markdown = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

impl Default for ReadabilityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`Readability::capture`].
#[derive(Debug, Clone)]
pub enum Capture {
    /// Extraction succeeded
    Article(Box<Article>),
    /// Extraction failed; normalized text of the best landmark element
    PlainText(String),
    /// Extraction failed and the page has no visible text
    NoContent,
}

impl Capture {
    /// Text to hand on: the Markdown, the fallback text, or [`NO_CONTENT`].
    pub fn text(&self) -> &str {
        match self {
            Capture::Article(article) => &article.markdown,
            Capture::PlainText(text) => text,
            Capture::NoContent => NO_CONTENT,
        }
    }

    pub fn article(&self) -> Option<&Article> {
        match self {
            Capture::Article(article) => Some(article),
            _ => None,
        }
    }
}

/// Main entry point for content extraction.
///
/// # Example
///
/// ```rust
/// use readmark_core::Readability;
///
/// let reader = Readability::new();
/// let html = "<html><body><article><p>Content here that is long enough to count as a paragraph.</p></article></body></html>";
/// let article = reader.parse(html).unwrap();
/// println!("Extracted: {}", article.markdown);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Creates a new Readability instance with default settings.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Creates a new Readability instance with a custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use readmark_core::{Readability, ReadabilityConfig};
    ///
    /// let config = ReadabilityConfig::builder().max_elements(10_000).build();
    /// let reader = Readability::with_config(config);
    /// ```
    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Parses an HTML string with preprocessing and extracts readable content.
    ///
    /// # Errors
    ///
    /// See [`Readability::extract`].
    pub fn parse(&self, html: &str) -> Result<Article> {
        let doc = Document::parse_with_preprocessing(html, None)?;
        self.extract(&doc)
    }

    /// Parses HTML with a known base URL (for relative link resolution).
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::InvalidUrl`] if the URL is invalid.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let base_url = Url::parse(url).map_err(|e| ReadmarkError::InvalidUrl(e.to_string()))?;
        let doc = Document::parse_with_preprocessing(html, Some(base_url))?;
        self.extract(&doc)
    }

    /// Extract an article from a parsed document.
    ///
    /// # Errors
    ///
    /// - [`ReadmarkError::ElementBudgetExceeded`] when the document has more
    ///   elements than `max_elements`; checked before any other work.
    /// - [`ReadmarkError::NoCandidateFound`] when neither scoring nor the
    ///   landmark fallback yields a content root.
    pub fn extract(&self, doc: &Document) -> Result<Article> {
        tracing::debug!(stage = %Stage::Idle, "pipeline stage");
        self.run(doc).inspect_err(|err| tracing::debug!(stage = %Stage::Failed, error = %err, "pipeline stage"))
    }

    fn run(&self, doc: &Document) -> Result<Article> {
        let count = doc.element_count();
        if self.config.max_elements > 0 && count > self.config.max_elements {
            return Err(ReadmarkError::ElementBudgetExceeded { count, max: self.config.max_elements });
        }

        let dom = doc.to_dom();
        let mut metadata = extract_metadata(&dom);
        let extracted = extract_content(&dom, &self.config.extract_config())?;

        tracing::debug!(stage = %Stage::Serializing, "pipeline stage");
        let content = extracted.content;
        let markdown = MarkdownSerializer::new(self.config.markdown.clone()).serialize(&content, content.root())?;
        let markdown = self.truncate(markdown);

        if metadata.excerpt.is_none() {
            metadata.excerpt = first_paragraph(&content);
        }
        if extracted.direction.is_some() {
            metadata.direction = extracted.direction;
        }

        let article = Article::new(content, markdown, metadata);
        tracing::debug!(stage = %Stage::Done, text_length = article.text_length, "pipeline stage");
        Ok(article)
    }

    /// Extract an article, falling back to plain text when extraction fails.
    ///
    /// Recoverable failures fall back to the normalized text of the first
    /// `article`, `main` or `body` element with visible text, and to
    /// [`Capture::NoContent`] when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::ParseUnavailable`] when `doc` is `None`, and
    /// passes through errors that are not recoverable.
    pub fn capture(&self, doc: Option<&Document>) -> Result<Capture> {
        let doc = doc.ok_or(ReadmarkError::ParseUnavailable)?;

        match self.extract(doc) {
            Ok(article) => Ok(Capture::Article(Box::new(article))),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(error = %err, "falling back to plain text");
                Ok(match fallback_text(&doc.to_dom()) {
                    Some(text) => Capture::PlainText(self.truncate(text)),
                    None => Capture::NoContent,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn truncate(&self, text: String) -> String {
        let max = self.config.max_chars;
        if max == 0 || text.chars().count() <= max {
            return text;
        }
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str(&self.config.truncation_marker);
        cut
    }
}

fn fallback_text(dom: &Dom) -> Option<String> {
    FALLBACK_TAGS
        .iter()
        .filter_map(|tag| dom.find_first(dom.root(), tag))
        .map(|node| normalized_text(dom, node))
        .find(|text| !text.is_empty())
}

fn first_paragraph(content: &Dom) -> Option<String> {
    content
        .find_all(content.root(), "p")
        .into_iter()
        .map(|p| content.collapsed_text(p))
        .find(|text| !text.is_empty())
}

/// Convenience function for one-liner extraction with defaults.
///
/// # Example
///
/// ```rust
/// use readmark_core::readability::parse;
///
/// let html = "<html><body><article><p>Content here, long enough to be picked as the article body.</p></article></body></html>";
/// let article = parse(html).unwrap();
/// ```
pub fn parse(html: &str) -> Result<Article> {
    Readability::new().parse(html)
}

/// Convenience function for one-liner with URL context.
///
/// # Errors
///
/// Returns [`ReadmarkError::InvalidUrl`] if the URL is invalid.
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Readability::new().parse_with_url(html, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDEBAR_HTML: &str = r#"<body><div class="sidebar">nav</div><article><h1>T</h1><p>Hello world this is the article body with enough length to score well.</p></article></body>"#;

    const ARTICLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>A Long Story About Testing Things | Example News</title>
            <meta name="author" content="Test Author">
        </head>
        <body>
            <article class="main-content">
                <h2>Article Heading</h2>
                <p>This is a long paragraph with lots of content to ensure it meets the character threshold.</p>
                <p>This is another long paragraph with plenty of content, text, commas, and meaningful sentences for scoring.</p>
                <p>A third paragraph with substantial content that should help boost the overall readability score significantly.</p>
            </article>
        </body>
        </html>
    "##;

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.max_elements, 0);
        assert_eq!(config.max_chars, 0);
        assert!(config.remove_unlikely);
        assert!(!config.keep_classes);
        assert!(config.preserved_classes.is_empty());
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .max_elements(500)
            .max_chars(100)
            .truncation_marker("...")
            .remove_unlikely(false)
            .keep_classes(true)
            .preserve_class("keep-me")
            .build();

        assert_eq!(config.max_elements, 500);
        assert_eq!(config.max_chars, 100);
        assert_eq!(config.truncation_marker, "...");
        assert!(!config.remove_unlikely);
        assert!(config.keep_classes);
        assert_eq!(config.preserved_classes, vec!["keep-me".to_string()]);
    }

    #[test]
    fn test_sidebar_article_scenario() {
        let doc = Document::parse(SIDEBAR_HTML).unwrap();
        let article = Readability::new().extract(&doc).unwrap();

        assert_eq!(article.title.as_deref(), Some("T"));
        assert!(article.markdown.starts_with("# T"), "{}", article.markdown);
        assert!(!article.markdown.contains("nav"));
        assert_eq!(article.content.tag(article.content.root()), Some("article"));
    }

    #[test]
    fn test_metadata_and_excerpt() {
        let article = parse(ARTICLE_HTML).unwrap();
        assert_eq!(article.title.as_deref(), Some("A Long Story About Testing Things"));
        assert_eq!(article.byline.as_deref(), Some("Test Author"));
        assert_eq!(article.lang.as_deref(), Some("en"));
        assert!(article.excerpt.as_deref().is_some_and(|e| e.starts_with("This is a long paragraph")));
        assert!(article.text_length > 200);
    }

    #[test]
    fn test_element_ceiling_of_one_fails() {
        let doc = Document::parse("<p>one</p>").unwrap();
        let reader = Readability::with_config(ReadabilityConfig::builder().max_elements(1).build());
        match reader.extract(&doc) {
            Err(ReadmarkError::ElementBudgetExceeded { count, max }) => {
                assert_eq!(max, 1);
                assert!(count > 1);
            }
            other => panic!("expected budget error, got {other:?}"),
        }
    }

    #[test]
    fn test_output_ceiling_truncates() {
        let reader = Readability::with_config(ReadabilityConfig::builder().max_chars(10).truncation_marker("~").build());
        let article = reader.parse(ARTICLE_HTML).unwrap();
        assert_eq!(article.markdown.chars().count(), 11);
        assert!(article.markdown.ends_with('~'));
    }

    #[test]
    fn test_truncation_counts_chars() {
        let reader = Readability::with_config(ReadabilityConfig::builder().max_chars(3).truncation_marker("!").build());
        assert_eq!(reader.truncate("héllo".to_string()), "hél!");
        assert_eq!(reader.truncate("hé".to_string()), "hé");
    }

    #[test]
    fn test_parse_with_url_resolves_links() {
        let html = r#"<html><body><article><p>Read the <a href="/docs">documentation</a> for this library, which covers everything.</p></article></body></html>"#;
        let article = parse_with_url(html, "https://example.com/blog/").unwrap();
        assert!(article.markdown.contains("(https://example.com/docs)"), "{}", article.markdown);
    }

    #[test]
    fn test_parse_with_invalid_url() {
        assert!(matches!(parse_with_url("<p>x</p>", "not a url"), Err(ReadmarkError::InvalidUrl(_))));
    }

    #[test]
    fn test_capture_article() {
        let doc = Document::parse(SIDEBAR_HTML).unwrap();
        let capture = Readability::new().capture(Some(&doc)).unwrap();
        assert!(capture.article().is_some());
        assert!(capture.text().starts_with("# T"));
    }

    #[test]
    fn test_capture_falls_back_to_plain_text() {
        let doc = Document::parse("<body><div>  Short   note </div></body>").unwrap();
        let capture = Readability::new().capture(Some(&doc)).unwrap();
        assert!(matches!(capture, Capture::PlainText(ref text) if text == "Short note"), "{capture:?}");
    }

    #[test]
    fn test_capture_prefers_main_over_body() {
        let doc = Document::parse("<body><p>intro</p><main>First</main><main>Second</main></body>").unwrap();
        let capture = Readability::new().capture(Some(&doc)).unwrap();
        assert_eq!(capture.text(), "First");
    }

    #[test]
    fn test_capture_budget_falls_back() {
        let doc = Document::parse(SIDEBAR_HTML).unwrap();
        let reader = Readability::with_config(ReadabilityConfig::builder().max_elements(1).build());
        match reader.capture(Some(&doc)).unwrap() {
            Capture::PlainText(text) => assert!(text.starts_with("T Hello world this is"), "{text}"),
            other => panic!("expected plain text, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_no_content() {
        let doc = Document::parse("<body><div> </div></body>").unwrap();
        let capture = Readability::new().capture(Some(&doc)).unwrap();
        assert!(matches!(capture, Capture::NoContent));
        assert_eq!(capture.text(), NO_CONTENT);
    }

    #[test]
    fn test_capture_without_document() {
        assert!(matches!(Readability::new().capture(None), Err(ReadmarkError::ParseUnavailable)));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Serializing.to_string(), "serializing");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
