use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Dom, NodeId};
use crate::metadata::resolve_direction;
use crate::postprocess::{PostProcessConfig, clean_content};
use crate::readability::Stage;
use crate::scoring::{ScoreConfig, ScoreTable, landmark_fallback};
use crate::{ReadmarkError, Result};

/// Class/ID patterns of boilerplate that is removed before scoring
static UNLIKELY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    )
    .unwrap()
});

/// Class/ID patterns that rescue an unlikely match
static OK_MAYBE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)and|article|body|column|content|main|mathjax|shadow").unwrap());

/// Roles that never hold the main content
const UNLIKELY_ROLES: &[&str] = &["menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog"];

/// Elements that never render as content
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Whether to drop boilerplate-looking elements before scoring
    pub remove_unlikely: bool,
    /// Class names that protect an element from unlikely removal
    pub preserved_classes: Vec<String>,
    /// Scoring constants
    pub score: ScoreConfig,
    /// Post-processing configuration
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            remove_unlikely: true,
            preserved_classes: Vec::new(),
            score: ScoreConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// How the content root was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Best-scoring candidate, possibly promoted
    Scored,
    /// Unique landmark element
    Landmark,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned copy of the chosen subtree; its root is the chosen element
    pub content: Dom,
    /// Text direction found on the chosen element or its ancestors
    pub direction: Option<String>,
    /// Value of the chosen root before cleanup
    pub top_score: f64,
    pub selection: Selection,
}

/// Extract the main content from a document tree.
///
/// The tree is cloned first; `dom` itself is never modified.
pub fn extract_content(dom: &Dom, config: &ExtractConfig) -> Result<ExtractedContent> {
    let mut work = dom.clone_subtree(dom.root());
    let root = work.root();

    let stripped = strip_non_content(&mut work, root);
    tracing::trace!(stripped, "removed non-content elements");

    if config.remove_unlikely {
        let removed = remove_unlikely_candidates(&mut work, root, &config.preserved_classes);
        tracing::trace!(removed, "removed unlikely candidates");
    }

    tracing::debug!(stage = %Stage::Scoring, "pipeline stage");
    let table = ScoreTable::compute(&work, root, &config.score);

    tracing::debug!(stage = %Stage::Extracting, "pipeline stage");
    let (chosen, selection) = match table.best_candidate(&work, root, &config.score) {
        Some(candidate) => {
            tracing::debug!(tag = ?work.tag(candidate.node), ranking = candidate.ranking, "best candidate");
            (table.promote(&work, candidate.node), Selection::Scored)
        }
        None => match landmark_fallback(&work, root) {
            Some(landmark) => {
                tracing::debug!(tag = ?work.tag(landmark), "falling back to landmark");
                (landmark, Selection::Landmark)
            }
            None => return Err(ReadmarkError::NoCandidateFound),
        },
    };

    let top_score = table.value(chosen);
    let direction = resolve_direction(&work, chosen);

    tracing::debug!(stage = %Stage::Cleaning, "pipeline stage");
    clean_content(&mut work, chosen, &table, &config.score, &config.postprocess);

    Ok(ExtractedContent { content: work.clone_subtree(chosen), direction, top_score, selection })
}

/// Remove script, style, noscript and template elements.
fn strip_non_content(dom: &mut Dom, root: NodeId) -> usize {
    let targets: Vec<NodeId> =
        dom.descendant_elements(root).into_iter().filter(|node| dom.is_tag(*node, NON_CONTENT_TAGS)).collect();
    for node in &targets {
        dom.detach(*node);
    }
    targets.len()
}

fn is_unlikely(dom: &Dom, node: NodeId, preserved: &[String]) -> bool {
    if dom.is_tag(node, &["html", "body", "a"]) {
        return false;
    }

    if let Some(role) = dom.attr(node, "role")
        && UNLIKELY_ROLES.contains(&role.trim().to_ascii_lowercase().as_str())
    {
        return true;
    }

    let class_and_id = dom.class_and_id(node);
    if !UNLIKELY_RE.is_match(&class_and_id) || OK_MAYBE_RE.is_match(&class_and_id) {
        return false;
    }

    let has_preserved = dom
        .attr(node, "class")
        .is_some_and(|class| class.split_whitespace().any(|name| preserved.iter().any(|p| p == name)));
    if has_preserved {
        return false;
    }

    !dom.has_ancestor_tag(node, &["table", "code"])
}

/// Remove boilerplate-looking elements along with their subtrees.
pub fn remove_unlikely_candidates(dom: &mut Dom, root: NodeId, preserved: &[String]) -> usize {
    let mut removed = 0;
    let mut stack: Vec<NodeId> = dom.children(root).iter().rev().copied().collect();

    while let Some(node) = stack.pop() {
        if !dom.is_element(node) {
            continue;
        }
        if is_unlikely(dom, node, preserved) {
            dom.detach(node);
            removed += 1;
            continue;
        }
        stack.extend(dom.children(node).iter().rev().copied());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;

    const SIDEBAR_ARTICLE: &str = r#"<body><div class="sidebar">nav</div><article><h1>T</h1><p>Hello world this is the article body with enough length to score well.</p></article></body>"#;

    fn dom_of(html: &str) -> Dom {
        Document::parse(html).unwrap().to_dom()
    }

    #[test]
    fn test_extract_sidebar_article() {
        let dom = dom_of(SIDEBAR_ARTICLE);
        let result = extract_content(&dom, &ExtractConfig::default()).unwrap();
        let root = result.content.root();
        assert_eq!(result.content.tag(root), Some("article"));
        assert_eq!(result.selection, Selection::Scored);
        assert!(!result.content.text_content(root).contains("nav"));
    }

    #[test]
    fn test_source_tree_untouched() {
        let dom = dom_of(SIDEBAR_ARTICLE);
        let before = dom.outer_html(dom.root());
        extract_content(&dom, &ExtractConfig::default()).unwrap();
        assert_eq!(dom.outer_html(dom.root()), before);
    }

    #[test]
    fn test_table_landmark_fallback() {
        let dom = dom_of(
            "<body><table><thead><tr><th>Name</th><th>Qty</th></tr></thead><tbody><tr><td>Apple</td><td>3</td></tr></tbody></table></body>",
        );
        let result = extract_content(&dom, &ExtractConfig::default()).unwrap();
        assert_eq!(result.selection, Selection::Landmark);
        assert_eq!(result.content.tag(result.content.root()), Some("table"));
    }

    #[test]
    fn test_no_candidate() {
        let dom = dom_of("<body><span>hi</span><span>there</span></body>");
        let result = extract_content(&dom, &ExtractConfig::default());
        assert!(matches!(result, Err(ReadmarkError::NoCandidateFound)));
    }

    #[test]
    fn test_promotion_to_wrapper() {
        let links = format!(r##"<a href="#">{}</a>"##, "link ".repeat(20));
        let html = format!(
            r#"<body><div id="wrap"><p class="content">This paragraph carries the real article text for the page.</p><div class="entry">{links}</div><div class="entry">{links}</div></div></body>"#
        );
        let dom = dom_of(&html);
        let result = extract_content(&dom, &ExtractConfig::default()).unwrap();
        let root = result.content.root();
        assert_eq!(result.content.tag(root), Some("div"));
        assert_eq!(result.content.attr(root, "id"), Some("wrap"));
    }

    #[test]
    fn test_unlikely_removal() {
        let mut dom = dom_of(
            r#"<body><div class="menu">MENU</div><div class="main-menu">MAIN</div><div role="navigation">NAV</div><div class="comment keep">PRESERVED</div><a class="footer">LINK</a></body>"#,
        );
        let root = dom.root();
        let removed = remove_unlikely_candidates(&mut dom, root, &["keep".to_string()]);
        let text = dom.text_content(root);
        assert_eq!(removed, 2);
        assert!(!text.contains("MENU"));
        assert!(!text.contains("NAV"));
        assert!(text.contains("MAIN"));
        assert!(text.contains("PRESERVED"));
        assert!(text.contains("LINK"));
    }

    #[test]
    fn test_scripts_are_stripped() {
        let html = r#"<body><article><script>var x = 1;</script><p>Hello world this is the article body with enough length to score well.</p></article></body>"#;
        let dom = dom_of(html);
        let result = extract_content(&dom, &ExtractConfig::default()).unwrap();
        assert!(!result.content.text_content(result.content.root()).contains("var x"));
    }

    #[test]
    fn test_direction_from_ancestor() {
        let html = r#"<html dir="rtl"><body><article><p>Hello world this is the article body with enough length to score well.</p></article></body></html>"#;
        let dom = dom_of(html);
        let result = extract_content(&dom, &ExtractConfig::default()).unwrap();
        assert_eq!(result.direction.as_deref(), Some("rtl"));
    }
}
