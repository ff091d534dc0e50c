use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, NodeId, NodeKind, colspan};
use crate::scoring::{ScoreConfig, ScoreTable};

static HEADER_WRAPPER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)header|heading|title").unwrap());

/// Attributes that only carry presentation
const PRESENTATIONAL_ATTRS: &[&str] = &[
    "align", "background", "bgcolor", "border", "cellpadding", "cellspacing", "frame", "hspace", "rules", "style",
    "valign", "vspace",
];

/// Elements whose `width` and `height` are presentation too
const SIZED_ELEMENTS: &[&str] = &["table", "th", "td", "hr", "pre"];

/// Content that keeps an otherwise empty paragraph alive
const MEDIA_TAGS: &[&str] = &["img", "picture", "video", "audio", "embed", "object", "iframe", "svg"];

pub const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i", "img", "ins", "kbd", "mark",
    "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Configuration for cleanup of the chosen content subtree
#[derive(Debug, Clone, Default)]
pub struct PostProcessConfig {
    /// Whether to keep class attributes (default: false)
    pub keep_classes: bool,
    /// Class names kept even when classes are stripped
    pub preserved_classes: Vec<String>,
}

/// Clean the subtree rooted at `root` in place.
///
/// `table` must hold the scores computed for this tree before any cleanup.
pub fn clean_content(
    dom: &mut Dom, root: NodeId, table: &ScoreTable, score: &ScoreConfig, config: &PostProcessConfig,
) {
    let protected = mark_data_tables(dom, root);
    let pruned = prune_low_scores(dom, root, table, score, &protected);
    let empty = remove_empty_paragraphs(dom, root);
    let headers = unwrap_header_wrappers(dom, root);
    let spans = unwrap_bare_spans(dom, root);
    let breaks = remove_stray_breaks(dom, root);
    strip_presentation(dom, root, config);

    tracing::trace!(
        protected_tables = protected.len(),
        pruned,
        empty,
        headers,
        spans,
        breaks,
        "cleanup passes complete"
    );
}

/// Remove presentation attributes and, unless kept, class names.
///
/// `language-*` classes survive; code blocks read their language from them.
pub fn strip_presentation(dom: &mut Dom, root: NodeId, config: &PostProcessConfig) {
    let mut nodes = vec![root];
    nodes.extend(dom.descendant_elements(root));

    for node in nodes {
        for attr in PRESENTATIONAL_ATTRS {
            dom.remove_attr(node, attr);
        }
        if dom.is_tag(node, SIZED_ELEMENTS) {
            dom.remove_attr(node, "width");
            dom.remove_attr(node, "height");
        }
        if config.keep_classes {
            continue;
        }
        let Some(class) = dom.attr(node, "class") else {
            continue;
        };
        let kept: Vec<&str> = class
            .split_whitespace()
            .filter(|name| name.starts_with("language-") || config.preserved_classes.iter().any(|p| p == name))
            .collect();
        if kept.is_empty() {
            dom.remove_attr(node, "class");
        } else {
            let kept = kept.join(" ");
            dom.set_attr(node, "class", &kept);
        }
    }
}

/// Tables under `root` that look like data tables.
pub fn mark_data_tables(dom: &Dom, root: NodeId) -> HashSet<NodeId> {
    let mut tables = dom.find_all(root, "table");
    if dom.tag(root) == Some("table") {
        tables.push(root);
    }
    tables.into_iter().filter(|table| is_data_table(dom, *table)).collect()
}

/// A header row plus the same column count in every row.
///
/// `role="presentation"` and `datatable="0"` opt out.
pub fn is_data_table(dom: &Dom, table: NodeId) -> bool {
    if dom.attr(table, "role") == Some("presentation") || dom.attr(table, "datatable") == Some("0") {
        return false;
    }

    let owned = |node: NodeId| dom.ancestors(node).find(|a| dom.tag(*a) == Some("table")) == Some(table);
    let rows: Vec<NodeId> = dom.find_all(table, "tr").into_iter().filter(|row| owned(*row)).collect();
    let Some(first_row) = rows.first() else {
        return false;
    };

    let has_thead = dom.find_all(table, "thead").into_iter().any(owned);
    let mut first_cells = dom.element_children(*first_row).peekable();
    let header_row = first_cells.peek().is_some() && first_cells.all(|cell| dom.tag(cell) == Some("th"));
    if !has_thead && !header_row {
        return false;
    }

    let widths: Vec<usize> = rows
        .iter()
        .map(|row| {
            dom.element_children(*row)
                .filter(|cell| dom.is_tag(*cell, &["td", "th"]))
                .map(|cell| colspan(dom, cell))
                .sum()
        })
        .collect();

    widths[0] > 0 && widths.iter().all(|w| *w == widths[0])
}

/// Drop descendants scoring below the floor with little text.
fn prune_low_scores(
    dom: &mut Dom, root: NodeId, table: &ScoreTable, score: &ScoreConfig, protected: &HashSet<NodeId>,
) -> usize {
    let mut removed = 0;
    let mut stack: Vec<NodeId> = dom.children(root).iter().rev().copied().collect();

    while let Some(node) = stack.pop() {
        if !dom.is_element(node) {
            continue;
        }
        if protected.contains(&node) {
            continue;
        }
        if table.value(node) < score.score_floor && table.text_len(node) < score.content_guard {
            dom.detach(node);
            removed += 1;
            continue;
        }
        stack.extend(dom.children(node).iter().rev().copied());
    }
    removed
}

/// Remove `p` elements with no text and no embedded media.
fn remove_empty_paragraphs(dom: &mut Dom, root: NodeId) -> usize {
    let mut removed = 0;
    for p in dom.find_all(root, "p") {
        let has_media = dom.descendants(p).into_iter().any(|d| dom.is_tag(d, MEDIA_TAGS));
        if !has_media && dom.collapsed_text(p).is_empty() {
            dom.detach(p);
            removed += 1;
        }
    }
    removed
}

fn is_header_wrapper(dom: &Dom, node: NodeId) -> bool {
    match dom.tag(node) {
        Some("header" | "hgroup") => true,
        Some("div" | "section") => HEADER_WRAPPER_RE.is_match(&dom.class_and_id(node)),
        _ => false,
    }
}

/// Unwrap wrappers whose only content is a single `h1` or `h2`.
fn unwrap_header_wrappers(dom: &mut Dom, root: NodeId) -> usize {
    let mut unwrapped = 0;
    let wrappers: Vec<NodeId> =
        dom.descendant_elements(root).into_iter().filter(|node| is_header_wrapper(dom, *node)).collect();

    for wrapper in wrappers.into_iter().rev() {
        let headings: Vec<NodeId> =
            dom.descendants(wrapper).into_iter().filter(|d| dom.is_tag(*d, &["h1", "h2"])).collect();
        let [heading] = headings.as_slice() else {
            continue;
        };
        if dom.collapsed_text(wrapper) == dom.collapsed_text(*heading) {
            dom.unwrap(wrapper);
            unwrapped += 1;
        }
    }
    unwrapped
}

/// Unwrap attribute-less spans that hold only inline content.
fn unwrap_bare_spans(dom: &mut Dom, root: NodeId) -> usize {
    let mut unwrapped = 0;
    for span in dom.find_all(root, "span").into_iter().rev() {
        if !dom.attrs(span).is_empty() {
            continue;
        }
        let inline_only = dom.children(span).iter().all(|child| match dom.kind(*child) {
            NodeKind::Element(data) => INLINE_TAGS.contains(&data.tag.as_str()),
            _ => true,
        });
        if inline_only {
            dom.unwrap(span);
            unwrapped += 1;
        }
    }
    unwrapped
}

/// Skip whitespace-only text and comments.
fn is_insignificant(dom: &Dom, node: NodeId) -> bool {
    match dom.kind(node) {
        NodeKind::Text(text) => text.trim().is_empty(),
        NodeKind::Comment(_) => true,
        _ => false,
    }
}

fn neighbour(dom: &Dom, node: NodeId, forward: bool) -> Option<NodeId> {
    let mut current = node;
    loop {
        current = if forward { dom.next_sibling(current)? } else { dom.prev_sibling(current)? };
        if !is_insignificant(dom, current) {
            return Some(current);
        }
    }
}

/// Remove leading and trailing `br` of blocks and `br` next to block elements.
fn remove_stray_breaks(dom: &mut Dom, root: NodeId) -> usize {
    let mut removed = 0;
    let breaks = dom.find_all(root, "br");

    let in_block = |dom: &Dom, br: NodeId| dom.parent(br).is_some_and(|p| dom.is_tag(p, BLOCK_TAGS));

    for &br in &breaks {
        let prev = neighbour(dom, br, false);
        let next = neighbour(dom, br, true);
        let leading = prev.is_none() && in_block(dom, br);
        let beside_block = prev.is_some_and(|p| dom.is_tag(p, BLOCK_TAGS)) || next.is_some_and(|n| dom.is_tag(n, BLOCK_TAGS));
        if leading || beside_block {
            dom.detach(br);
            removed += 1;
        }
    }

    for &br in breaks.iter().rev() {
        if dom.parent(br).is_none() {
            continue;
        }
        if neighbour(dom, br, true).is_none() && in_block(dom, br) {
            dom.detach(br);
            removed += 1;
        }
    }
    removed
}
