//! Rule-dispatch Markdown serializer.
//!
//! A node's children are serialized first; the resulting `content` is handed
//! to the first rule that matches the node. Rules are looked up in tiers:
//! blank nodes use the blank rule, then explicit rules (added ones before the
//! built-in set), then keep filters, then remove filters, then the default.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::parse::Document;
//! use readmark_core::formatters::markdown::{MarkdownOptions, MarkdownSerializer};
//!
//! let dom = Document::parse("<h1>Title</h1><p>Some <em>text</em></p>").unwrap().to_dom();
//! let serializer = MarkdownSerializer::new(MarkdownOptions::default());
//! let markdown = serializer.serialize(&dom, dom.root()).unwrap();
//! assert_eq!(markdown, "# Title\n\nSome _text_");
//! ```

mod escape;
mod options;
mod rules;
mod whitespace;

pub use escape::escape_markdown;
pub use options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions};
pub use rules::longest_fence_run;

use crate::dom::{Dom, NodeId, NodeKind, VOID_ELEMENTS};
use crate::{ReadmarkError, Result};

/// Elements treated as blocks by whitespace handling and the default rule
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "center", "dd", "dir", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "html", "isindex", "li", "main", "menu", "nav", "noframes", "noscript", "ol", "output", "p",
    "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Elements that still mean something without text
const MEANINGFUL_WHEN_BLANK: &[&str] =
    &["a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script", "audio", "video"];

/// State shared by the rules during one serialization call
#[derive(Debug, Default)]
pub struct RenderContext {
    /// Pending reference definitions
    pub references: Vec<String>,
    next_id: usize,
}

impl RenderContext {
    /// Allocate the next reference id, starting at 1.
    pub fn next_reference_id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }
}

/// A serialization rule.
pub trait Rule: Send + Sync {
    /// Whether this rule handles `node`.
    fn matches(&self, dom: &Dom, node: NodeId, options: &MarkdownOptions) -> bool;

    /// Markdown for `node`, given its already serialized children.
    fn render(
        &self, content: &str, dom: &Dom, node: NodeId, options: &MarkdownOptions, ctx: &mut RenderContext,
    ) -> String;

    /// Text appended once after the whole tree has been serialized.
    fn append(&self, _ctx: &mut RenderContext, _options: &MarkdownOptions) -> String {
        String::new()
    }
}

/// Selects nodes for keep and remove filters
pub enum Filter {
    /// Elements with any of these tag names
    Tags(Vec<String>),
    /// Elements accepted by the predicate
    Predicate(Box<dyn Fn(&Dom, NodeId) -> bool + Send + Sync>),
}

impl Filter {
    fn accepts(&self, dom: &Dom, node: NodeId) -> bool {
        match self {
            Filter::Tags(tags) => dom.tag(node).is_some_and(|tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag))),
            Filter::Predicate(predicate) => predicate(dom, node),
        }
    }
}

impl From<&str> for Filter {
    fn from(tag: &str) -> Self {
        Filter::Tags(vec![tag.to_string()])
    }
}

impl From<&[&str]> for Filter {
    fn from(tags: &[&str]) -> Self {
        Filter::Tags(tags.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Filter {
    fn from(tags: [&str; N]) -> Self {
        Filter::Tags(tags.iter().map(|t| t.to_string()).collect())
    }
}

/// Converts element trees into Markdown.
pub struct MarkdownSerializer {
    options: MarkdownOptions,
    user_rules: Vec<Box<dyn Rule>>,
    builtin_rules: Vec<Box<dyn Rule>>,
    keep: Vec<Filter>,
    remove: Vec<Filter>,
}

impl Default for MarkdownSerializer {
    fn default() -> Self {
        Self::new(MarkdownOptions::default())
    }
}

impl MarkdownSerializer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self {
            options,
            user_rules: Vec::new(),
            builtin_rules: rules::commonmark_rules(),
            keep: vec![Filter::Predicate(Box::new(|dom: &Dom, node: NodeId| {
                dom.tag(node) == Some("table") && !rules::is_pipe_table(dom, node)
            }))],
            remove: Vec::new(),
        }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Add a rule that takes precedence over every built-in rule.
    ///
    /// Rules added earlier win over rules added later.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) -> &mut Self {
        self.user_rules.push(rule);
        self
    }

    /// Emit matching elements as HTML.
    pub fn keep(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.keep.insert(0, filter.into());
        self
    }

    /// Drop matching elements and their content.
    pub fn remove(&mut self, filter: impl Into<Filter>) -> &mut Self {
        self.remove.push(filter.into());
        self
    }

    /// Serialize the subtree rooted at `node`.
    ///
    /// The tree is copied before whitespace is collapsed, so `dom` is left
    /// untouched and identical calls give identical output.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::SerializationTypeError`] when `node` does not
    /// belong to `dom` or is a text or comment node.
    pub fn serialize(&self, dom: &Dom, node: NodeId) -> Result<String> {
        if !dom.contains(node) {
            return Err(ReadmarkError::SerializationTypeError(format!(
                "node {} is outside a tree of {} nodes",
                node.index(),
                dom.len()
            )));
        }

        let mut work = Dom::new();
        let root = work.root();
        match dom.kind(node) {
            NodeKind::Document => {
                for child in dom.children(node) {
                    let copy = work.import_subtree(dom, *child);
                    work.append_child(root, copy);
                }
            }
            NodeKind::Element(_) => {
                let copy = work.import_subtree(dom, node);
                work.append_child(root, copy);
            }
            NodeKind::Text(_) => return Err(ReadmarkError::SerializationTypeError("text node root".to_string())),
            NodeKind::Comment(_) => {
                return Err(ReadmarkError::SerializationTypeError("comment node root".to_string()));
            }
        }

        whitespace::collapse_whitespace(&mut work, root);

        let mut ctx = RenderContext::default();
        let mut output = self.process(&work, root, &mut ctx);

        for rule in self.user_rules.iter().chain(self.builtin_rules.iter()) {
            let appended = rule.append(&mut ctx, &self.options);
            output = join(&output, &appended);
        }

        Ok(output.trim_start_matches(['\t', '\r', '\n']).trim_end().to_string())
    }

    /// Serialize the children of `root` bottom-up without recursion.
    fn process(&self, dom: &Dom, root: NodeId, ctx: &mut RenderContext) -> String {
        struct Frame {
            node: NodeId,
            next_child: usize,
            output: String,
        }

        let mut stack = vec![Frame { node: root, next_child: 0, output: String::new() }];

        loop {
            let Some(frame) = stack.last_mut() else {
                return String::new();
            };

            if let Some(&child) = dom.children(frame.node).get(frame.next_child) {
                frame.next_child += 1;
                match dom.kind(child) {
                    NodeKind::Text(text) => {
                        let replacement = if is_code(dom, child) { text.clone() } else { escape_markdown(text) };
                        frame.output = join(&frame.output, &replacement);
                    }
                    NodeKind::Element(_) => stack.push(Frame { node: child, next_child: 0, output: String::new() }),
                    _ => {}
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                return String::new();
            };
            let Some(parent) = stack.last_mut() else {
                return done.output;
            };
            let replacement = self.replacement_for_node(dom, done.node, &done.output, ctx);
            parent.output = join(&parent.output, &replacement);
        }
    }

    fn replacement_for_node(&self, dom: &Dom, node: NodeId, content: &str, ctx: &mut RenderContext) -> String {
        let (leading, trailing) = flanking_whitespace(dom, node);
        let content = if leading.is_empty() && trailing.is_empty() { content } else { content.trim() };
        let rendered = self.render_node(dom, node, content, ctx);
        format!("{}{}{}", leading, rendered, trailing)
    }

    fn render_node(&self, dom: &Dom, node: NodeId, content: &str, ctx: &mut RenderContext) -> String {
        if is_blank(dom, node) {
            return if is_block(dom, node) { "\n\n".to_string() } else { String::new() };
        }

        if let Some(rule) =
            self.user_rules.iter().chain(self.builtin_rules.iter()).find(|rule| rule.matches(dom, node, &self.options))
        {
            return rule.render(content, dom, node, &self.options, ctx);
        }

        if self.keep.iter().any(|filter| filter.accepts(dom, node)) {
            let html = dom.outer_html(node);
            return if is_block(dom, node) { format!("\n\n{}\n\n", html) } else { html };
        }

        if self.remove.iter().any(|filter| filter.accepts(dom, node)) {
            return String::new();
        }

        rules::default_render(content, dom, node)
    }
}

/// Serialize a subtree with the built-in rules.
pub fn convert_to_markdown(dom: &Dom, node: NodeId, options: &MarkdownOptions) -> Result<String> {
    MarkdownSerializer::new(options.clone()).serialize(dom, node)
}

/// Join two chunks so that at most one blank line separates them.
fn join(output: &str, replacement: &str) -> String {
    let head = output.trim_end_matches('\n');
    let tail = replacement.trim_start_matches('\n');
    let newlines = (output.len() - head.len()).max(replacement.len() - tail.len()).min(2);
    format!("{}{}{}", head, "\n".repeat(newlines), tail)
}

pub(crate) fn is_block(dom: &Dom, node: NodeId) -> bool {
    dom.is_tag(node, BLOCK_ELEMENTS)
}

fn is_code(dom: &Dom, node: NodeId) -> bool {
    dom.is_tag(node, &["code", "pre"]) || dom.has_ancestor_tag(node, &["code", "pre"])
}

fn is_blank(dom: &Dom, node: NodeId) -> bool {
    if dom.is_tag(node, VOID_ELEMENTS) || dom.is_tag(node, MEANINGFUL_WHEN_BLANK) {
        return false;
    }
    if !dom.text_content(node).trim().is_empty() {
        return false;
    }
    !dom.descendants(node)
        .into_iter()
        .any(|d| dom.is_tag(d, VOID_ELEMENTS) || dom.is_tag(d, MEANINGFUL_WHEN_BLANK))
}

/// Split leading and trailing whitespace of a text into ASCII and other parts.
fn edge_whitespace(text: &str) -> (String, String) {
    let leading: String = text.chars().take_while(|c| c.is_whitespace()).collect();
    if leading.len() == text.len() {
        return (leading, String::new());
    }
    let trailing: String = {
        let mut run: Vec<char> = text.chars().rev().take_while(|c| c.is_whitespace()).collect();
        run.reverse();
        run.into_iter().collect()
    };
    (leading, trailing)
}

fn is_ascii_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Whitespace at the edges of an inline element, moved outside its delimiters.
///
/// ASCII whitespace is dropped on a side where the neighbour already ends
/// (or starts) with a space.
fn flanking_whitespace(dom: &Dom, node: NodeId) -> (String, String) {
    if is_block(dom, node) {
        return (String::new(), String::new());
    }

    let (mut leading, mut trailing) = edge_whitespace(&dom.text_content(node));

    if leading.chars().next().is_some_and(is_ascii_space) && flanked_by_space(dom, node, true) {
        leading = leading.chars().skip_while(|c| is_ascii_space(*c)).collect();
    }
    if trailing.chars().last().is_some_and(is_ascii_space) && flanked_by_space(dom, node, false) {
        let kept: Vec<char> = trailing.chars().collect();
        let end = kept.iter().rposition(|c| !is_ascii_space(*c)).map(|i| i + 1).unwrap_or(0);
        trailing = kept[..end].iter().collect();
    }

    (leading, trailing)
}

fn flanked_by_space(dom: &Dom, node: NodeId, left: bool) -> bool {
    let sibling = if left { dom.prev_sibling(node) } else { dom.next_sibling(node) };
    let Some(sibling) = sibling else {
        return false;
    };
    let text = match dom.kind(sibling) {
        NodeKind::Text(text) => text.clone(),
        NodeKind::Element(_) if !is_block(dom, sibling) => dom.text_content(sibling),
        _ => return false,
    };
    if left { text.ends_with(' ') } else { text.starts_with(' ') }
}
