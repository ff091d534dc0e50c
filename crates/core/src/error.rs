//! Error types for Readmark operations.
//!
//! This module defines the main error type [`ReadmarkError`] which represents
//! every failure the extraction pipeline and the Markdown serializer can report.
//! Errors come in two tiers: recoverable ones, where the caller is expected to
//! fall back to plain text, and fatal ones, which indicate caller or programmer
//! error.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::{ReadmarkError, Result};
//!
//! fn first_heading(html: &str) -> Result<String> {
//!     if html.is_empty() {
//!         return Err(ReadmarkError::ParseUnavailable);
//!     }
//!     // ... extraction logic
//!     # Ok(String::new())
//! }
//! ```

use thiserror::Error;

/// Main error type for extraction and serialization.
///
/// # Example
///
/// ```rust
/// use readmark_core::{ReadmarkError, parse};
///
/// match parse("<html><body></body></html>") {
///     Ok(article) => println!("{}", article.markdown),
///     Err(e) if e.is_recoverable() => println!("falling back to plain text: {}", e),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ReadmarkError {
    /// No input document was supplied.
    #[error("No input document was supplied")]
    ParseUnavailable,

    /// The document holds more elements than the configured ceiling.
    ///
    /// Returned before any scoring work is done.
    #[error("Document has {count} elements, above the ceiling of {max}")]
    ElementBudgetExceeded { count: usize, max: usize },

    /// Neither a positive-scoring candidate nor a unique landmark element exists.
    ///
    /// This typically happens on navigation pages, search results,
    /// or pages with very little text content.
    #[error("No content candidate could be found in the document")]
    NoCandidateFound,

    /// The serializer was handed a node it cannot serialize.
    ///
    /// Returned for node ids outside the tree and for text or comment roots.
    #[error("Cannot serialize node: {0}")]
    SerializationTypeError(String),

    /// HTML parsing errors.
    ///
    /// Returned when HTML cannot be parsed, often due to invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// A base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON encoding errors.
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ReadmarkError {
    /// Whether the caller should recover by falling back to plain text.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ElementBudgetExceeded { .. } | Self::NoCandidateFound)
    }
}

/// Result type alias for ReadmarkError.
///
/// This is a convenience alias for `std::result::Result<T, ReadmarkError>`.
pub type Result<T> = std::result::Result<T, ReadmarkError>;
