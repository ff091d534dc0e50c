//! Built-in serialization rules.
//!
//! The CommonMark set plus GFM strikethrough and pipe tables. Every rule is a
//! unit struct implementing [`Rule`].

use once_cell::sync::Lazy;
use regex::Regex;

use super::options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions};
use super::{RenderContext, Rule, is_block};
use crate::dom::{Dom, NodeId, colspan};

static ATTRIBUTE_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\n+\s*)+").unwrap());
static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"language-(\S+)").unwrap());
static EDGE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^`|^ .*?[^ ].* $|`$").unwrap());

/// Every built-in rule, in match order.
pub fn commonmark_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(Paragraph),
        Box::new(LineBreak),
        Box::new(Heading),
        Box::new(Blockquote),
        Box::new(List),
        Box::new(ListItem),
        Box::new(IndentedCodeBlock),
        Box::new(FencedCodeBlock),
        Box::new(HorizontalRule),
        Box::new(InlineLink),
        Box::new(ReferenceLink),
        Box::new(Emphasis),
        Box::new(Strong),
        Box::new(InlineCode),
        Box::new(Image),
        Box::new(Strikethrough),
        Box::new(Table),
        Box::new(TableSection),
        Box::new(TableRow),
        Box::new(TableCell),
    ]
}

/// Collapse newline runs inside attribute values.
fn clean_attribute(value: Option<&str>) -> String {
    value.map(|v| ATTRIBUTE_NEWLINES_RE.replace_all(v, "\n").into_owned()).unwrap_or_default()
}

fn block(content: &str) -> String {
    format!("\n\n{}\n\n", content)
}

pub struct Paragraph;

impl Rule for Paragraph {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("p")
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        block(content)
    }
}

pub struct LineBreak;

impl Rule for LineBreak {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("br")
    }

    fn render(&self, _: &str, _: &Dom, _: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        format!("{}\n", options.br)
    }
}

pub struct Heading;

impl Rule for Heading {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["h1", "h2", "h3", "h4", "h5", "h6"])
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        let level = dom
            .tag(node)
            .and_then(|tag| tag[1..].parse::<usize>().ok())
            .unwrap_or(1);
        let content =
            content.split('\n').map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join(" ");

        if options.heading_style == HeadingStyle::Setext && level < 3 {
            let underline = (if level == 1 { "=" } else { "-" }).repeat(content.chars().count());
            format!("\n\n{}\n{}\n\n", content, underline)
        } else {
            format!("\n\n{} {}\n\n", "#".repeat(level), content)
        }
    }
}

pub struct Blockquote;

impl Rule for Blockquote {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("blockquote")
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let quoted = content
            .trim_matches('\n')
            .split('\n')
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        block(&quoted)
    }
}

pub struct List;

impl Rule for List {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["ul", "ol"])
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let nested_last = dom
            .parent(node)
            .is_some_and(|parent| dom.tag(parent) == Some("li") && dom.last_element_child(parent) == Some(node));
        if nested_last { format!("\n{}", content) } else { block(content) }
    }
}

pub struct ListItem;

impl ListItem {
    fn marker(dom: &Dom, node: NodeId, options: &MarkdownOptions) -> String {
        let Some(parent) = dom.parent(node).filter(|p| dom.tag(*p) == Some("ol")) else {
            return options.bullet_list_marker.clone();
        };
        let start = dom.attr(parent, "start").and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(1);
        let index = dom.element_children(parent).position(|child| child == node).unwrap_or(0);
        format!("{}.", start.saturating_add(i64::try_from(index).unwrap_or(i64::MAX)))
    }
}

impl Rule for ListItem {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("li")
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        let marker = Self::marker(dom, node, options);
        let prefix = if marker.chars().count() < 4 { format!("{:<4}", marker) } else { format!("{} ", marker) };
        let indent = " ".repeat(prefix.chars().count());

        let body = content
            .trim_start_matches('\n')
            .trim_end_matches('\n')
            .split('\n')
            .enumerate()
            .map(|(i, line)| if i == 0 || line.is_empty() { line.to_string() } else { format!("{}{}", indent, line) })
            .collect::<Vec<_>>()
            .join("\n");

        format!("{}{}\n", prefix, body)
    }
}

/// Code text of a `pre`, with the language from a `language-*` class on it or its `code` child.
fn code_block_parts(dom: &Dom, node: NodeId) -> (String, String) {
    let code = dom.element_children(node).find(|child| dom.tag(*child) == Some("code"));
    let language = [code, Some(node)]
        .into_iter()
        .flatten()
        .filter_map(|n| dom.attr(n, "class"))
        .find_map(|class| LANGUAGE_RE.captures(class).map(|c| c[1].to_string()))
        .unwrap_or_default();
    (dom.text_content(node), language)
}

pub struct IndentedCodeBlock;

impl Rule for IndentedCodeBlock {
    fn matches(&self, dom: &Dom, node: NodeId, options: &MarkdownOptions) -> bool {
        options.code_block_style == CodeBlockStyle::Indented && dom.tag(node) == Some("pre")
    }

    fn render(&self, _: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let (code, _) = code_block_parts(dom, node);
        let code = code.strip_suffix('\n').unwrap_or(&code);
        format!("\n\n    {}\n\n", code.replace('\n', "\n    "))
    }
}

/// Length of the longest run of `fence_char` that is at least three long.
pub fn longest_fence_run(code: &str, fence_char: char) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == fence_char {
            run += 1;
            if run >= 3 {
                longest = longest.max(run);
            }
        } else {
            run = 0;
        }
    }
    longest
}

pub struct FencedCodeBlock;

impl Rule for FencedCodeBlock {
    fn matches(&self, dom: &Dom, node: NodeId, options: &MarkdownOptions) -> bool {
        options.code_block_style == CodeBlockStyle::Fenced && dom.tag(node) == Some("pre")
    }

    fn render(&self, _: &str, dom: &Dom, node: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        let (code, language) = code_block_parts(dom, node);
        let fence_char = options.fence.chars().next().unwrap_or('`');
        let base = options.fence.chars().count().max(3);
        let size = base.max(longest_fence_run(&code, fence_char) + 1);
        let fence = fence_char.to_string().repeat(size);
        let code = code.strip_suffix('\n').unwrap_or(&code);
        format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
    }
}

pub struct HorizontalRule;

impl Rule for HorizontalRule {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("hr")
    }

    fn render(&self, _: &str, _: &Dom, _: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        block(&options.hr)
    }
}

fn is_link(dom: &Dom, node: NodeId) -> bool {
    dom.tag(node) == Some("a") && dom.attr(node, "href").is_some()
}

fn link_title(dom: &Dom, node: NodeId) -> String {
    let title = clean_attribute(dom.attr(node, "title"));
    if title.is_empty() { title } else { format!(" \"{}\"", title.replace('"', "\\\"")) }
}

pub struct InlineLink;

impl Rule for InlineLink {
    fn matches(&self, dom: &Dom, node: NodeId, options: &MarkdownOptions) -> bool {
        options.link_style == LinkStyle::Inlined && is_link(dom, node)
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let href = dom.attr(node, "href").unwrap_or("").replace('(', "\\(").replace(')', "\\)");
        format!("[{}]({}{})", content, href, link_title(dom, node))
    }
}

pub struct ReferenceLink;

impl Rule for ReferenceLink {
    fn matches(&self, dom: &Dom, node: NodeId, options: &MarkdownOptions) -> bool {
        options.link_style == LinkStyle::Referenced && is_link(dom, node)
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, options: &MarkdownOptions, ctx: &mut RenderContext) -> String {
        let href = dom.attr(node, "href").unwrap_or("");
        let title = link_title(dom, node);

        let (replacement, reference) = match options.link_reference_style {
            LinkReferenceStyle::Collapsed => (format!("[{content}][]"), format!("[{content}]: {href}{title}")),
            LinkReferenceStyle::Shortcut => (format!("[{content}]"), format!("[{content}]: {href}{title}")),
            LinkReferenceStyle::Full => {
                let id = ctx.next_reference_id();
                (format!("[{content}][{id}]"), format!("[{id}]: {href}{title}"))
            }
        };

        ctx.references.push(reference);
        replacement
    }

    fn append(&self, ctx: &mut RenderContext, _: &MarkdownOptions) -> String {
        if ctx.references.is_empty() {
            return String::new();
        }
        let references = std::mem::take(&mut ctx.references);
        format!("\n\n{}\n\n", references.join("\n"))
    }
}

pub struct Emphasis;

impl Rule for Emphasis {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["em", "i"])
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        if content.trim().is_empty() {
            return String::new();
        }
        format!("{0}{1}{0}", options.em_delimiter, content)
    }
}

pub struct Strong;

impl Rule for Strong {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["strong", "b"])
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, options: &MarkdownOptions, _: &mut RenderContext) -> String {
        if content.trim().is_empty() {
            return String::new();
        }
        format!("{0}{1}{0}", options.strong_delimiter, content)
    }
}

pub struct InlineCode;

impl Rule for InlineCode {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("code") && !dom.has_ancestor_tag(node, &["pre"])
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        if content.is_empty() {
            return String::new();
        }
        let content = content.replace("\r\n", " ").replace(['\n', '\r'], " ");
        let extra_space = if EDGE_SPACE_RE.is_match(&content) { " " } else { "" };

        let mut delimiter = "`".to_string();
        let runs: Vec<&str> = content.split(|c| c != '`').filter(|run| !run.is_empty()).collect();
        while runs.contains(&delimiter.as_str()) {
            delimiter.push('`');
        }

        format!("{delimiter}{extra_space}{content}{extra_space}{delimiter}")
    }
}

pub struct Image;

impl Rule for Image {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("img")
    }

    fn render(&self, _: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let src = dom.attr(node, "src").unwrap_or("");
        if src.is_empty() {
            return String::new();
        }
        let alt = clean_attribute(dom.attr(node, "alt"));
        let title = clean_attribute(dom.attr(node, "title"));
        let title = if title.is_empty() { title } else { format!(" \"{}\"", title) };
        format!("![{}]({}{})", alt, src, title)
    }
}

pub struct Strikethrough;

impl Rule for Strikethrough {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["del", "s", "strike"])
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        if content.trim().is_empty() {
            return String::new();
        }
        format!("~~{}~~", content)
    }
}

/// Rows owned by `table`, nested tables excluded.
fn table_rows(dom: &Dom, table: NodeId) -> Vec<NodeId> {
    dom.find_all(table, "tr")
        .into_iter()
        .filter(|row| dom.ancestors(*row).find(|a| dom.tag(*a) == Some("table")) == Some(table))
        .collect()
}

fn owning_table(dom: &Dom, node: NodeId) -> Option<NodeId> {
    dom.ancestors(node).find(|a| dom.tag(*a) == Some("table"))
}

fn is_heading_row(dom: &Dom, row: NodeId) -> bool {
    if dom.parent(row).is_some_and(|p| dom.tag(p) == Some("thead")) {
        return true;
    }
    let mut cells = dom.element_children(row).peekable();
    cells.peek().is_some() && cells.all(|cell| dom.tag(cell) == Some("th"))
}

/// Tables that open with a heading row become pipe tables.
pub fn is_pipe_table(dom: &Dom, table: NodeId) -> bool {
    table_rows(dom, table).first().is_some_and(|row| is_heading_row(dom, *row))
}

fn in_pipe_table(dom: &Dom, node: NodeId) -> bool {
    owning_table(dom, node).is_some_and(|table| is_pipe_table(dom, table))
}

pub struct Table;

impl Rule for Table {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("table") && is_pipe_table(dom, node)
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        block(content.trim_matches('\n'))
    }
}

pub struct TableSection;

impl Rule for TableSection {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["thead", "tbody", "tfoot"]) && in_pipe_table(dom, node)
    }

    fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        content.to_string()
    }
}

pub struct TableRow;

impl Rule for TableRow {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.tag(node) == Some("tr") && in_pipe_table(dom, node)
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let is_first = owning_table(dom, node).is_some_and(|table| table_rows(dom, table).first() == Some(&node));
        if !(is_first && is_heading_row(dom, node)) {
            return format!("\n{}", content);
        }

        let columns: usize = dom
            .element_children(node)
            .map(|cell| colspan(dom, cell))
            .sum();
        let border = (0..columns.max(1)).map(|_| "| --- ").collect::<String>() + "|";
        format!("\n{}\n{}", content, border)
    }
}

pub struct TableCell;

impl Rule for TableCell {
    fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
        dom.is_tag(node, &["th", "td"]) && in_pipe_table(dom, node)
    }

    fn render(&self, content: &str, dom: &Dom, node: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
        let first = dom.parent(node).and_then(|row| dom.element_children(row).next()) == Some(node);
        let text = content.trim().replace('\n', " ").replace('|', "\\|");
        let padding = " |".repeat(colspan(dom, node) - 1);
        let prefix = if first { "| " } else { " " };
        format!("{}{} |{}", prefix, text, padding)
    }
}

/// Fallback for nodes no rule claims; blocks get blank lines around them.
pub fn default_render(content: &str, dom: &Dom, node: NodeId) -> String {
    if is_block(dom, node) { block(content) } else { content.to_string() }
}
