//! Whitespace collapsing ahead of serialization.
//!
//! Runs of ASCII whitespace become one space, spaces adjacent to block
//! boundaries are dropped, and `pre` subtrees are left alone. Comments are
//! removed along the way.

use crate::dom::{Dom, NodeId, NodeKind, VOID_ELEMENTS};

use super::BLOCK_ELEMENTS;

enum Event {
    Text(NodeId),
    Element(NodeId),
    Comment(NodeId),
}

/// Document-order walk; elements with children are visited on entry and exit.
fn events(dom: &Dom, root: NodeId) -> Vec<Event> {
    enum Step {
        Enter(NodeId),
        Exit(NodeId),
    }

    let mut out = Vec::new();
    let mut stack: Vec<Step> = dom.children(root).iter().rev().map(|c| Step::Enter(*c)).collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => match dom.kind(node) {
                NodeKind::Text(_) => out.push(Event::Text(node)),
                NodeKind::Comment(_) => out.push(Event::Comment(node)),
                NodeKind::Element(data) => {
                    out.push(Event::Element(node));
                    if data.tag != "pre" && !dom.children(node).is_empty() {
                        stack.push(Step::Exit(node));
                        stack.extend(dom.children(node).iter().rev().map(|c| Step::Enter(*c)));
                    }
                }
                NodeKind::Document => {
                    stack.extend(dom.children(node).iter().rev().map(|c| Step::Enter(*c)));
                }
            },
            Step::Exit(node) => out.push(Event::Element(node)),
        }
    }
    out
}

fn collapse_run(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn trim_trailing_space(dom: &mut Dom, node: NodeId) {
    if let Some(text) = dom.text(node)
        && let Some(stripped) = text.strip_suffix(' ')
    {
        let stripped = stripped.to_string();
        dom.set_text(node, stripped);
    }
}

/// Collapse whitespace in every text node under `root`.
pub fn collapse_whitespace(dom: &mut Dom, root: NodeId) {
    if dom.tag(root) == Some("pre") || dom.children(root).is_empty() {
        return;
    }

    let mut prev_text: Option<NodeId> = None;
    let mut keep_leading = false;

    for event in events(dom, root) {
        match event {
            Event::Comment(node) => dom.detach(node),
            Event::Text(node) => {
                let mut text = collapse_run(dom.text(node).unwrap_or(""));
                let after_space = prev_text.is_none_or(|p| dom.text(p).is_some_and(|t| t.ends_with(' ')));
                if after_space && !keep_leading && text.starts_with(' ') {
                    text.remove(0);
                }
                if text.is_empty() {
                    dom.detach(node);
                    continue;
                }
                dom.set_text(node, text);
                prev_text = Some(node);
            }
            Event::Element(node) => {
                let tag = dom.tag(node).unwrap_or("");
                if BLOCK_ELEMENTS.contains(&tag) || tag == "br" {
                    if let Some(prev) = prev_text {
                        trim_trailing_space(dom, prev);
                    }
                    prev_text = None;
                    keep_leading = false;
                } else if VOID_ELEMENTS.contains(&tag) {
                    prev_text = None;
                    keep_leading = true;
                } else if prev_text.is_some() {
                    keep_leading = false;
                }
            }
        }
    }

    if let Some(prev) = prev_text {
        trim_trailing_space(dom, prev);
        if dom.text(prev).is_some_and(str::is_empty) {
            dom.detach(prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;

    fn collapsed(html: &str) -> String {
        let mut dom = Document::parse(html).unwrap().to_dom();
        let body = dom.find_first(dom.root(), "body").unwrap();
        collapse_whitespace(&mut dom, body);
        dom.inner_html(body)
    }

    #[test]
    fn test_collapse_runs() {
        assert_eq!(collapsed("<p>  a \n\t b  </p>"), "<p>a b</p>");
    }

    #[test]
    fn test_inline_boundaries_keep_one_space() {
        assert_eq!(collapsed("<p>a <b> b </b> c</p>"), "<p>a <b>b </b>c</p>");
    }

    #[test]
    fn test_block_boundaries_drop_spaces() {
        assert_eq!(collapsed("<div> <p> x </p> <p> y </p> </div>"), "<div><p>x</p><p>y</p></div>");
    }

    #[test]
    fn test_pre_untouched() {
        assert_eq!(collapsed("<pre>  a\n   b  </pre>"), "<pre>  a\n   b  </pre>");
    }

    #[test]
    fn test_space_after_void_kept() {
        assert_eq!(collapsed("<p>a<img src=x> b</p>"), "<p>a<img src=\"x\"> b</p>");
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(collapsed("<p>a<!-- c -->b</p>"), "<p>ab</p>");
    }
}
