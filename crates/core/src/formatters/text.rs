use crate::dom::{Dom, NodeId, NodeKind};
use crate::formatters::markdown::BLOCK_ELEMENTS as BOUNDARY_ELEMENTS;
use crate::metadata::Metadata;

/// Elements whose text is never visible
const INVISIBLE_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

const BLOCK_ELEMENTS: [&str; 13] = ["p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre", "td", "th"];

/// Configuration for plain text output
#[derive(Debug, Clone, Default)]
pub struct TextConfig {
    /// Preserve paragraph structure with double newlines
    pub preserve_paragraphs: bool,

    /// Wrap lines at specified width (0 = no wrapping)
    pub line_width: usize,

    /// Include metadata header
    pub include_header: bool,
}

/// Plain text formatter for element trees
pub struct TextFormatter {
    config: TextConfig,
}

impl TextFormatter {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    /// Convert the subtree at `node` to plain text
    pub fn convert(&self, dom: &Dom, node: NodeId, metadata: &Metadata) -> String {
        convert_to_text(dom, node, metadata, &self.config)
    }
}

/// Convert the subtree at `node` to plain text with specified configuration
pub fn convert_to_text(dom: &Dom, node: NodeId, metadata: &Metadata, config: &TextConfig) -> String {
    let mut output = String::new();

    if config.include_header {
        output.push_str(generate_header(metadata).trim_end());
        output.push_str("\n\n");
    }

    let text = if config.preserve_paragraphs { text_with_paragraphs(dom, node) } else { normalized_text(dom, node) };

    let final_text = if config.line_width > 0 { wrap_text(&text, config.line_width) } else { text };

    output.push_str(&final_text);

    output.trim().to_string()
}

/// Visible text with whitespace runs collapsed to one space, trimmed.
///
/// Block boundaries and `br` separate words.
pub fn normalized_text(dom: &Dom, node: NodeId) -> String {
    let mut raw = String::new();
    let mut stack = vec![(node, false)];

    while let Some((id, exiting)) = stack.pop() {
        if exiting {
            raw.push(' ');
            continue;
        }
        match dom.kind(id) {
            NodeKind::Text(text) => raw.push_str(text),
            NodeKind::Element(data) if INVISIBLE_ELEMENTS.contains(&data.tag.as_str()) => {}
            NodeKind::Element(data) => {
                if BOUNDARY_ELEMENTS.contains(&data.tag.as_str()) || data.tag == "br" {
                    raw.push(' ');
                    stack.push((id, true));
                }
                stack.extend(dom.children(id).iter().rev().map(|child| (*child, false)));
            }
            NodeKind::Document => stack.extend(dom.children(id).iter().rev().map(|child| (*child, false))),
            NodeKind::Comment(_) => {}
        }
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generate a header from metadata
fn generate_header(metadata: &Metadata) -> String {
    let mut header = String::new();

    if let Some(title) = &metadata.title {
        header.push_str(title);
        header.push('\n');
        header.push_str(&"=".repeat(title.chars().count()));
        header.push('\n');
    }

    let mut meta_parts = Vec::new();

    if let Some(byline) = &metadata.byline {
        meta_parts.push(format!("By: {}", byline));
    }

    if let Some(site) = &metadata.site_name {
        meta_parts.push(format!("Site: {}", site));
    }

    if !meta_parts.is_empty() {
        header.push_str(&meta_parts.join(" | "));
        header.push('\n');
    }

    header
}

/// One paragraph per innermost block element
fn text_with_paragraphs(dom: &Dom, node: NodeId) -> String {
    let paragraphs: Vec<String> = dom
        .descendant_elements(node)
        .into_iter()
        .filter(|el| dom.is_tag(*el, &BLOCK_ELEMENTS))
        .filter(|el| !dom.descendant_elements(*el).iter().any(|d| dom.is_tag(*d, &BLOCK_ELEMENTS)))
        .map(|el| dom.collapsed_text(el))
        .filter(|text| !text.is_empty())
        .collect();

    if paragraphs.is_empty() { normalized_text(dom, node) } else { paragraphs.join("\n\n") }
}

/// Wrap text to specified line width, keeping paragraph breaks
fn wrap_text(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }

    text.split("\n\n")
        .map(|paragraph| {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            wrap_words(&words, width)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Wrap a slice of words to specified width
fn wrap_words(words: &[&str], width: usize) -> String {
    let mut lines = Vec::new();
    let mut current_line = Vec::new();
    let mut current_length = 0;

    for &word in words {
        let word_len = word.chars().count();

        if current_length == 0 {
            current_line.push(word);
            current_length = word_len;
        } else if current_length + 1 + word_len <= width {
            current_length += 1 + word_len;
            current_line.push(word);
        } else {
            lines.push(current_line.join(" "));
            current_line = vec![word];
            current_length = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines.join("\n")
}
