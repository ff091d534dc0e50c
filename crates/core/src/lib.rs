pub mod article;
pub mod dom;
pub mod error;
pub mod extract;
pub mod formatters;
pub mod metadata;
pub mod parse;
pub mod postprocess;
#[cfg(feature = "preprocess")]
pub mod preprocess;
pub mod readability;
pub mod scoring;

pub use article::{Article, OutputFormat};
pub use dom::{Dom, NodeId, NodeKind};
pub use error::{ReadmarkError, Result};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, Selection};
pub use extract::extract_content;
pub use formatters::markdown::{
    CodeBlockStyle, Filter, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions, MarkdownSerializer,
    RenderContext, Rule,
};
pub use formatters::{TextConfig, TextFormatter, convert_to_markdown, convert_to_text};
pub use metadata::Metadata;
pub use parse::Document;
#[doc(hidden)]
pub use postprocess::PostProcessConfig;
#[cfg(feature = "preprocess")]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{
    Capture, NO_CONTENT, Readability, ReadabilityConfig, ReadabilityConfigBuilder, Stage, parse, parse_with_url,
};
#[doc(hidden)]
pub use scoring::{Candidate, Score, ScoreConfig, ScoreTable};
