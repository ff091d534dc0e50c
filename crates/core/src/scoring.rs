use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, NodeId, NodeKind};

/// Class/ID patterns that suggest an element contains main content
static POSITIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story").unwrap()
});

/// Class/ID patterns that suggest an element does NOT contain main content
static NEGATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|footer|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|widget",
    )
    .unwrap()
});

/// Generic content containers
pub const CONTAINER_TAGS: &[&str] = &["div", "article", "section", "main"];

/// Tags eligible as the root of the main-content region
pub const CANDIDATE_TAGS: &[&str] = &["div", "article", "section", "main", "p", "td", "pre", "blockquote"];

/// Last-resort landmarks, in priority order
pub const LANDMARK_TAGS: &[&str] = &["article", "main", "table", "pre", "blockquote", "code", "ol", "ul", "dl", "section"];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Configuration for the content scoring algorithm.
///
/// The defaults are empirically tuned; overriding them changes which region
/// gets extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    /// Base score of `div`, `article`, `section`, `main`
    pub container_weight: f64,
    /// Base score of `blockquote`, `td`, `pre`
    pub quote_weight: f64,
    /// Base penalty of list, definition and form tags
    pub list_weight: f64,
    /// Base penalty of headings and `th`
    pub heading_weight: f64,
    /// Text length below which the short-text class weights apply
    pub short_text_threshold: usize,
    /// Class weights for elements with short text
    pub short_positive_weight: f64,
    pub short_negative_weight: f64,
    /// Class weights for elements with longer text
    pub long_positive_weight: f64,
    pub long_negative_weight: f64,
    /// Bonus per `p`, `pre` or `td` child
    pub paragraph_bonus: f64,
    /// Bonus per `ul`, `ol` or `dl` child
    pub list_bonus: f64,
    /// Bonus per heading child
    pub heading_bonus: f64,
    /// Bonus per `blockquote` child
    pub blockquote_bonus: f64,
    /// Bonus per `img` child
    pub image_bonus: f64,
    /// Bonus per `li` child
    pub list_item_bonus: f64,
    /// Bonus per `a` child
    pub anchor_bonus: f64,
    /// Penalty per `form` child
    pub form_penalty: f64,
    /// Penalty per negatively-classed child container
    pub negative_container_penalty: f64,
    /// Minimum text length of a candidate
    pub min_candidate_text: usize,
    /// Descendants whose value falls below this are pruned during cleanup
    pub score_floor: f64,
    /// Descendants with at least this much text survive pruning
    pub content_guard: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            container_weight: 5.0,
            quote_weight: 3.0,
            list_weight: 3.0,
            heading_weight: 5.0,
            short_text_threshold: 25,
            short_positive_weight: 25.0,
            short_negative_weight: 50.0,
            long_positive_weight: 50.0,
            long_negative_weight: 25.0,
            paragraph_bonus: 1.0,
            list_bonus: 1.0,
            heading_bonus: 1.0,
            blockquote_bonus: 1.0,
            image_bonus: 1.0,
            list_item_bonus: 0.5,
            anchor_bonus: 0.25,
            form_penalty: 2.0,
            negative_container_penalty: 25.0,
            min_candidate_text: 25,
            score_floor: -25.0,
            content_guard: 75,
        }
    }
}

/// Positive and negative evidence for one element
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Score {
    pub positive: f64,
    pub negative: f64,
}

impl Score {
    /// Net score
    pub fn value(&self) -> f64 {
        self.positive - self.negative
    }
}

/// Per-element statistics gathered in one scoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStats {
    pub score: Score,
    /// Characters of whitespace-collapsed text in the subtree
    pub text_len: usize,
    /// Characters of that text inside `a` elements
    pub link_len: usize,
}

impl NodeStats {
    /// Fraction of the text that sits inside links
    pub fn link_density(&self) -> f64 {
        if self.text_len == 0 { 0.0 } else { self.link_len as f64 / self.text_len as f64 }
    }
}

/// A scored node considered as the content root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    pub score: Score,
    /// `value * (1 - link_density)`
    pub ranking: f64,
}

/// Side table of scores for a single pass.
///
/// Rebuilt from scratch by every [`ScoreTable::compute`] call.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    stats: HashMap<NodeId, NodeStats>,
}

impl ScoreTable {
    /// Score every element under `root`, children before parents.
    pub fn compute(dom: &Dom, root: NodeId, config: &ScoreConfig) -> Self {
        let mut table = Self::default();
        let mut order = vec![root];
        order.extend(dom.descendants(root));

        for &node in order.iter().rev() {
            match dom.kind(node) {
                NodeKind::Text(text) => {
                    let len = collapsed_len(text);
                    table.stats.insert(node, NodeStats { text_len: len, ..Default::default() });
                }
                NodeKind::Element(_) | NodeKind::Document => {
                    let stats = table.score_node(dom, node, config);
                    table.stats.insert(node, stats);
                }
                NodeKind::Comment(_) => {}
            }
        }

        tracing::trace!(scored = table.stats.len(), "scoring pass complete");
        table
    }

    fn score_node(&self, dom: &Dom, node: NodeId, config: &ScoreConfig) -> NodeStats {
        let mut stats = NodeStats::default();

        for child in dom.children(node) {
            if let Some(child_stats) = self.stats.get(child) {
                stats.text_len += child_stats.text_len;
                stats.link_len += child_stats.link_len;
            }
        }

        let Some(tag) = dom.tag(node) else {
            return stats;
        };

        if tag == "a" {
            stats.link_len = stats.text_len;
        }

        let base = base_tag_score(tag, config);
        if base > 0.0 {
            stats.score.positive += base;
        } else {
            stats.score.negative -= base;
        }

        let weight = class_weight(&dom.class_and_id(node), stats.text_len, config);
        stats.score.positive += weight.positive;
        stats.score.negative += weight.negative;

        for child in dom.element_children(node) {
            let Some(child_tag) = dom.tag(child) else {
                continue;
            };
            if let Some(child_stats) = self.stats.get(&child) {
                stats.score.positive += child_stats.score.positive;
            }
            stats.score.positive += structural_bonus(child_tag, config);
            if child_tag == "form" {
                stats.score.negative += config.form_penalty;
            }
            if CONTAINER_TAGS.contains(&child_tag) && NEGATIVE_RE.is_match(&dom.class_and_id(child)) {
                stats.score.negative += config.negative_container_penalty;
            }
        }

        stats
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeStats> {
        self.stats.get(&node)
    }

    /// Score of a node, zero when it was not scored.
    pub fn score(&self, node: NodeId) -> Score {
        self.stats.get(&node).map(|s| s.score).unwrap_or_default()
    }

    pub fn value(&self, node: NodeId) -> f64 {
        self.score(node).value()
    }

    pub fn text_len(&self, node: NodeId) -> usize {
        self.stats.get(&node).map(|s| s.text_len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// All candidate-tag elements under `root` with enough text, in document order.
    pub fn candidates(&self, dom: &Dom, root: NodeId, config: &ScoreConfig) -> Vec<Candidate> {
        dom.descendants(root)
            .into_iter()
            .filter(|node| dom.is_tag(*node, CANDIDATE_TAGS))
            .filter_map(|node| {
                let stats = self.stats.get(&node)?;
                if stats.text_len < config.min_candidate_text {
                    return None;
                }
                let ranking = stats.score.value() * (1.0 - stats.link_density());
                Some(Candidate { node, score: stats.score, ranking })
            })
            .collect()
    }

    /// Highest-ranking candidate with a positive ranking; later nodes win ties.
    pub fn best_candidate(&self, dom: &Dom, root: NodeId, config: &ScoreConfig) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for candidate in self.candidates(dom, root, config) {
            if candidate.ranking <= 0.0 {
                continue;
            }
            if best.is_none_or(|b| candidate.ranking >= b.ranking) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Move the candidate up while its element siblings outweigh it.
    ///
    /// Stops below `html`.
    pub fn promote(&self, dom: &Dom, mut node: NodeId) -> NodeId {
        while let Some(parent) = dom.parent(node) {
            if !dom.is_element(parent) || dom.tag(parent) == Some("html") {
                break;
            }
            let siblings: f64 = dom
                .element_children(parent)
                .filter(|sibling| *sibling != node)
                .map(|sibling| self.value(sibling))
                .sum();
            if siblings > self.value(node) {
                tracing::debug!(from = ?dom.tag(node), to = ?dom.tag(parent), siblings, "promoting candidate");
                node = parent;
            } else {
                break;
            }
        }
        node
    }
}

/// First landmark tag that occurs exactly once under `root`.
pub fn landmark_fallback(dom: &Dom, root: NodeId) -> Option<NodeId> {
    for tag in LANDMARK_TAGS {
        let found = dom.find_all(root, tag);
        if let [only] = found.as_slice() {
            return Some(*only);
        }
    }
    None
}

/// Base score for a tag family; negative values are penalties.
pub fn base_tag_score(tag: &str, config: &ScoreConfig) -> f64 {
    match tag {
        "div" | "article" | "section" | "main" => config.container_weight,
        "blockquote" | "td" | "pre" => config.quote_weight,
        "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" | "address" => -config.list_weight,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -config.heading_weight,
        _ => 0.0,
    }
}

/// Class/ID weight as separate positive and negative terms.
///
/// Both terms apply when the string matches both patterns.
pub fn class_weight(class_and_id: &str, text_len: usize, config: &ScoreConfig) -> Score {
    let short = text_len < config.short_text_threshold;
    let mut score = Score::default();

    if class_and_id.trim().is_empty() {
        return score;
    }
    if NEGATIVE_RE.is_match(class_and_id) {
        score.negative += if short { config.short_negative_weight } else { config.long_negative_weight };
    }
    if POSITIVE_RE.is_match(class_and_id) {
        score.positive += if short { config.short_positive_weight } else { config.long_positive_weight };
    }
    score
}

/// Whether a class/ID string matches the negative pattern.
pub fn is_negative_class(class_and_id: &str) -> bool {
    NEGATIVE_RE.is_match(class_and_id)
}

fn structural_bonus(tag: &str, config: &ScoreConfig) -> f64 {
    match tag {
        "p" | "pre" | "td" => config.paragraph_bonus,
        "ul" | "ol" | "dl" => config.list_bonus,
        "blockquote" => config.blockquote_bonus,
        "img" => config.image_bonus,
        "li" => config.list_item_bonus,
        "a" => config.anchor_bonus,
        t if HEADING_TAGS.contains(&t) => config.heading_bonus,
        _ => 0.0,
    }
}

/// Length of a text run after collapsing whitespace.
fn collapsed_len(text: &str) -> usize {
    let mut len = 0;
    let mut in_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                len += 1;
                in_space = true;
            }
        } else {
            len += 1;
            in_space = false;
        }
    }
    if in_space && len > 0 { len - 1 } else { len }
}
