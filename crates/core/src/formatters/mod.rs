pub mod markdown;
pub mod text;

pub use markdown::{MarkdownOptions, MarkdownSerializer, Rule, convert_to_markdown};
pub use text::{TextConfig, TextFormatter, convert_to_text, normalized_text};
