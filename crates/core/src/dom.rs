//! Arena-backed element tree.
//!
//! Every node lives in a [`Dom`] arena and is addressed by a [`NodeId`]. A node
//! owns the ordered list of its children; the upward `parent` link is a plain
//! index used for traversal and removal only. Detached nodes stay in the arena
//! but are unreachable from the root.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::dom::Dom;
//!
//! let mut dom = Dom::new();
//! let p = dom.create_element("p");
//! let text = dom.create_text("Hello");
//! dom.append_child(p, text);
//! dom.append_child(dom.root(), p);
//!
//! assert_eq!(dom.text_content(p), "Hello");
//! assert_eq!(dom.outer_html(p), "<p>Hello</p>");
//! ```

use std::fmt::Write as _;

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text is emitted without entity escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "xmp", "iframe", "noembed"];

/// Handle to a node inside a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of this node in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Tag and attributes of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root (has children, no tag)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Character data
    Text(String),
    /// Comment data
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An ordered tree of typed nodes.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a tree containing only a document root.
    pub fn new() -> Self {
        Self { nodes: vec![NodeData { kind: NodeKind::Document, parent: None, children: Vec::new() }], root: NodeId(0) }
    }

    /// The root node of this tree.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no node besides the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Whether `id` was allocated by this arena.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { kind, parent: None, children: Vec::new() });
        id
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_with_attrs(tag, Vec::new())
    }

    /// Create a detached element with attributes.
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeKind::Element(ElementData { tag: tag.to_ascii_lowercase(), attrs }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    /// The payload of a node.
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    /// Tag name of an element, `None` for other node kinds.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data.tag.as_str()),
            _ => None,
        }
    }

    /// Whether `id` is an element with one of the given tags.
    pub fn is_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.tag(id).is_some_and(|tag| tags.contains(&tag))
    }

    /// Text payload of a text or comment node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Replace the payload of a text node. No-op for other kinds.
    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let NodeKind::Text(text) = &mut self.nodes[id.0].kind {
            *text = value;
        }
    }

    /// All attributes of an element, empty for other kinds.
    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => &data.attrs,
            _ => &[],
        }
    }

    /// Attribute value by case-insensitive name.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set or overwrite an attribute, keeping its original position.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(data) = &mut self.nodes[id.0].kind {
            match data.attrs.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some(slot) => slot.1 = value.to_string(),
                None => data.attrs.push((name.to_ascii_lowercase(), value.to_string())),
            }
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(data) = &mut self.nodes[id.0].kind {
            data.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }
    }

    /// `class` and `id` joined by a space, used by the class-weight heuristics.
    pub fn class_and_id(&self, id: NodeId) -> String {
        let class = self.attr(id, "class").unwrap_or("");
        let ident = self.attr(id, "id").unwrap_or("");
        format!("{} {}", class, ident)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied().filter(|child| self.is_element(*child))
    }

    /// Last element child, if any.
    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.iter().rev().copied().find(|child| self.is_element(*child))
    }

    fn sibling(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|s| *s == id)?;
        let target = position.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, -1)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, 1)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { dom: self, next: self.parent(id) }
    }

    /// Whether any ancestor is an element with one of `tags`.
    pub fn has_ancestor_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.ancestors(id).any(|ancestor| self.is_tag(ancestor, tags))
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Element descendants in document order.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|node| self.is_element(*node)).collect()
    }

    /// First descendant element with the given tag.
    pub fn find_first(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|node| self.tag(*node) == Some(tag))
    }

    /// All descendant elements with the given tag.
    pub fn find_all(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|node| self.tag(*node) == Some(tag)).collect()
    }

    /// Number of element nodes in the subtree, `id` included.
    pub fn element_count(&self, id: NodeId) -> usize {
        let own = usize::from(self.is_element(id));
        own + self.descendants(id).into_iter().filter(|node| self.is_element(*node)).count()
    }

    /// Concatenated text of every text node in the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = &self.nodes[id.0].kind {
            return text.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = &self.nodes[node.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// Text content with whitespace runs collapsed to one space and trimmed.
    pub fn collapsed_text(&self, id: NodeId) -> String {
        self.text_content(id).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Detach `child` from its current parent and append it to `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detach `child` and insert it into `parent` right before `reference`.
    ///
    /// Appends when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|c| *c == reference) {
            Some(position) => children.insert(position, child),
            None => children.push(child),
        }
    }

    /// Remove a node from its parent. Both links are cleared.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Replace `id` by its own children, in place.
    pub fn unwrap(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(position) = siblings.iter().position(|c| *c == id) {
            siblings.splice(position..=position, children);
        }
        self.nodes[id.0].parent = None;
    }

    /// Put `replacement` where `id` was and detach `id`.
    pub fn replace(&mut self, id: NodeId, replacement: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.insert_before(parent, replacement, id);
            self.detach(id);
        }
    }

    /// Deep-copy the subtree rooted at `id` into a fresh tree whose root is the copy.
    pub fn clone_subtree(&self, id: NodeId) -> Dom {
        let mut out = Dom { nodes: Vec::new(), root: NodeId(0) };
        let root = out.push(self.nodes[id.0].kind.clone());
        out.root = root;
        let mut stack = vec![(id, root)];
        while let Some((source, target)) = stack.pop() {
            for child in self.children(source) {
                let copy = out.push(self.nodes[child.0].kind.clone());
                out.nodes[copy.0].parent = Some(target);
                out.nodes[target.0].children.push(copy);
                stack.push((*child, copy));
            }
        }
        out
    }

    /// Copy a subtree of another tree into this arena, returning the detached copy.
    pub fn import_subtree(&mut self, other: &Dom, id: NodeId) -> NodeId {
        let root = self.push(other.nodes[id.0].kind.clone());
        let mut stack = vec![(id, root)];
        while let Some((source, target)) = stack.pop() {
            for child in other.children(source) {
                let copy = self.push(other.nodes[child.0].kind.clone());
                self.nodes[copy.0].parent = Some(target);
                self.nodes[target.0].children.push(copy);
                stack.push((*child, copy));
            }
        }
        root
    }

    /// Serialize the node and its subtree as HTML.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, true, &mut out);
        out
    }

    /// Serialize only the children of the node as HTML.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, false, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, include_self: bool, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = if include_self {
            vec![Step::Open(id)]
        } else {
            self.children(id).iter().rev().map(|c| Step::Open(*c)).collect()
        };

        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => match &self.nodes[node.0].kind {
                    NodeKind::Document => {
                        stack.extend(self.children(node).iter().rev().map(|c| Step::Open(*c)));
                    }
                    NodeKind::Text(text) => {
                        let raw = self.parent(node).and_then(|p| self.tag(p)).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
                        if raw {
                            out.push_str(text);
                        } else {
                            out.push_str(&escape_text(text));
                        }
                    }
                    NodeKind::Comment(text) => {
                        let _ = write!(out, "<!--{}-->", text);
                    }
                    NodeKind::Element(data) => {
                        out.push('<');
                        out.push_str(&data.tag);
                        for (key, value) in &data.attrs {
                            let _ = write!(out, " {}=\"{}\"", key, escape_attr(value));
                        }
                        out.push('>');
                        if !VOID_ELEMENTS.contains(&data.tag.as_str()) {
                            stack.push(Step::Close(node));
                            stack.extend(self.children(node).iter().rev().map(|c| Step::Open(*c)));
                        }
                    }
                },
                Step::Close(node) => {
                    if let Some(tag) = self.tag(node) {
                        let _ = write!(out, "</{}>", tag);
                    }
                }
            }
        }
    }
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    dom: &'a Dom,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.dom.parent(current);
        Some(current)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('\u{a0}', "&nbsp;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;").replace('\u{a0}', "&nbsp;")
}

/// Largest `colspan` honoured, as in the HTML table model.
pub const MAX_COLSPAN: usize = 1000;

/// Column span of a table cell, clamped to `1..=MAX_COLSPAN`.
///
/// Leading digits are read the way browsers read them, so `"2px"` spans two
/// columns and an out-of-range number spans the maximum.
pub fn colspan(dom: &Dom, cell: NodeId) -> usize {
    let Some(value) = dom.attr(cell, "colspan").map(str::trim) else {
        return 1;
    };
    let digits = &value[..value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len())];
    match digits.parse::<u64>() {
        Ok(span) => span.clamp(1, MAX_COLSPAN as u64) as usize,
        Err(_) if !digits.is_empty() => MAX_COLSPAN,
        Err(_) => 1,
    }
}
