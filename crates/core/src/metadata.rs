use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Document;
use crate::dom::{Dom, NodeId};

static BYLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)byline|author|dateline|writtenby|p-author").unwrap());
static TITLE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s[|\-\\/»]\s").unwrap());
static HIERARCHICAL_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s[\\/»]\s").unwrap());
static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|\-\\/»]+").unwrap());

const TITLE_KEYS: &[&str] =
    &["dc:title", "dcterm:title", "og:title", "weibo:article:title", "weibo:webpage:title", "title", "twitter:title"];
const BYLINE_KEYS: &[&str] = &["dc:creator", "dcterm:creator", "author", "article:author", "parsely-author"];
const EXCERPT_KEYS: &[&str] = &[
    "dc:description",
    "dcterm:description",
    "og:description",
    "weibo:article:description",
    "weibo:webpage:description",
    "description",
    "twitter:description",
];
const SITE_NAME_KEYS: &[&str] = &["og:site_name"];

/// Document-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    /// `ltr`, `rtl` or `auto`, taken from the content root
    pub direction: Option<String>,
    pub excerpt: Option<String>,
    pub lang: Option<String>,
}

impl Document {
    /// Extract all metadata at once
    pub fn extract_metadata(&self) -> Metadata {
        extract_metadata(&self.to_dom())
    }
}

/// Resolve title, byline, site name, excerpt and language of a document tree.
///
/// Direction depends on the extracted content and is left unset here.
pub fn extract_metadata(dom: &Dom) -> Metadata {
    let meta = collect_meta(dom);
    let json_ld = extract_json_ld(dom);
    let from_json = |key: &str| json_ld.as_ref().and_then(|value| json_ld_string(value, key));

    let title = first_value(&meta, TITLE_KEYS)
        .or_else(|| from_json("headline"))
        .or_else(|| document_title(dom));

    let byline = first_value(&meta, BYLINE_KEYS)
        .or_else(|| json_ld.as_ref().and_then(|value| value.get("author")).and_then(json_ld_author))
        .or_else(|| find_byline(dom));

    let excerpt = first_value(&meta, EXCERPT_KEYS).or_else(|| from_json("description"));

    let site_name = first_value(&meta, SITE_NAME_KEYS).or_else(|| {
        json_ld
            .as_ref()
            .and_then(|value| value.get("publisher"))
            .and_then(|publisher| publisher.get("name"))
            .and_then(|name| name.as_str())
            .map(|name| name.trim().to_string())
    });

    let lang = dom
        .find_first(dom.root(), "html")
        .and_then(|html| dom.attr(html, "lang"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string);

    Metadata { title, byline, site_name, direction: None, excerpt, lang }
}

/// `dir` of the node or its nearest ancestor that has one.
pub fn resolve_direction(dom: &Dom, node: NodeId) -> Option<String> {
    std::iter::once(node)
        .chain(dom.ancestors(node))
        .find_map(|n| dom.attr(n, "dir"))
        .map(|dir| dir.trim().to_ascii_lowercase())
        .filter(|dir| !dir.is_empty())
}

/// Meta values keyed by lowercased `name` and each `property` token.
///
/// The first value seen for a key wins.
fn collect_meta(dom: &Dom) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for meta in dom.find_all(dom.root(), "meta") {
        let Some(content) = dom.attr(meta, "content").map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };

        let mut keys: Vec<String> = Vec::new();
        if let Some(name) = dom.attr(meta, "name") {
            keys.push(normalize_meta_key(name));
        }
        if let Some(property) = dom.attr(meta, "property") {
            keys.extend(property.split_whitespace().map(normalize_meta_key));
        }

        for key in keys {
            values.entry(key).or_insert_with(|| content.to_string());
        }
    }

    values
}

fn normalize_meta_key(key: &str) -> String {
    key.trim().to_lowercase().replace('.', ":")
}

fn first_value(meta: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| meta.get(*key)).cloned()
}

/// Parse the first usable JSON-LD block
fn extract_json_ld(dom: &Dom) -> Option<serde_json::Value> {
    dom.find_all(dom.root(), "script")
        .into_iter()
        .filter(|script| {
            dom.attr(*script, "type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
        })
        .filter_map(|script| serde_json::from_str::<serde_json::Value>(dom.text_content(script).trim()).ok())
        .find_map(article_object)
}

/// Pick the article-like object out of a JSON-LD value.
fn article_object(value: serde_json::Value) -> Option<serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().find_map(article_object),
        serde_json::Value::Object(ref map) => {
            if let Some(graph) = map.get("@graph").and_then(|g| g.as_array())
                && let Some(found) = graph.iter().find(|item| item.get("headline").is_some())
            {
                return Some(found.clone());
            }
            Some(value)
        }
        _ => None,
    }
}

fn json_ld_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Author name from a string, an object or the first entry of an array
fn json_ld_author(author: &serde_json::Value) -> Option<String> {
    if let Some(name) = author.as_str() {
        return Some(name.trim().to_string());
    }

    if let Some(name) = author.get("name").and_then(|n| n.as_str()) {
        return Some(name.trim().to_string());
    }

    author.as_array().and_then(|items| items.first()).and_then(json_ld_author)
}

/// First author-like element with a short text.
fn find_byline(dom: &Dom) -> Option<String> {
    dom.descendant_elements(dom.root()).into_iter().find_map(|node| {
        let rel_author = dom.attr(node, "rel").is_some_and(|rel| rel.eq_ignore_ascii_case("author"));
        let itemprop_author = dom.attr(node, "itemprop").is_some_and(|prop| prop.contains("author"));
        if !rel_author && !itemprop_author && !BYLINE_RE.is_match(&dom.class_and_id(node)) {
            return None;
        }
        let text = dom.collapsed_text(node);
        let len = text.chars().count();
        (1..100).contains(&len).then_some(text)
    })
}

/// Title from `<title>` with the separator heuristic, else the first `h1`.
fn document_title(dom: &Dom) -> Option<String> {
    let root = dom.root();
    let raw = dom.find_first(root, "title").map(|t| dom.collapsed_text(t)).unwrap_or_default();

    if raw.is_empty() {
        return dom.find_first(root, "h1").map(|h1| dom.collapsed_text(h1)).filter(|t| !t.is_empty());
    }

    let headings: Vec<String> = dom
        .descendant_elements(root)
        .into_iter()
        .filter(|node| dom.is_tag(*node, &["h1", "h2"]))
        .map(|node| dom.collapsed_text(node))
        .collect();

    Some(clean_title(&raw, &headings))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Strip site names from a page title.
///
/// Splits at the last whitespace-surrounded separator and keeps the longer
/// side unless it has three words or fewer. Falls back to the full title when
/// the result drops too many words. A heading equal to the full title keeps
/// it untouched.
pub fn clean_title(raw: &str, headings: &[String]) -> String {
    let original = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if headings.iter().any(|heading| heading.trim() == original) {
        return original;
    }

    let Some(last) = TITLE_SEPARATOR_RE.find_iter(&original).last() else {
        return original;
    };

    let hierarchical = HIERARCHICAL_SEPARATOR_RE.is_match(&original);
    let left = original[..last.start()].trim();
    let right = original[last.end()..].trim();

    let (longer, shorter) = if right.chars().count() > left.chars().count() { (right, left) } else { (left, right) };
    let candidate = if word_count(longer) <= 3 { shorter } else { longer };

    let words = word_count(candidate);
    let original_words = word_count(&SEPARATOR_RUN_RE.replace_all(&original, ""));
    if candidate.is_empty() || (words <= 4 && (!hierarchical || words + 1 != original_words)) {
        return original;
    }

    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title</title>
            <meta name="author" content="John Doe">
            <meta name="description" content="This is a test description of the page.">
            <meta property="og:title" content="OG Title">
            <meta property="og:description" content="OG Description">
            <meta property="og:site_name" content="Example Site">
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "Article",
                "headline": "JSON-LD Headline",
                "author": { "@type": "Person", "name": "Jane Smith" },
                "description": "JSON-LD Description",
                "publisher": { "@type": "Organization", "name": "JSON-LD Publisher" }
            }
            </script>
        </head>
        <body>
            <h1>Main Heading</h1>
            <p>This is the first paragraph of the content.</p>
        </body>
        </html>
    "#;

    fn metadata_of(html: &str) -> Metadata {
        Document::parse(html).unwrap().extract_metadata()
    }

    #[test]
    fn test_meta_values_win() {
        let metadata = metadata_of(HTML_WITH_META);
        assert_eq!(metadata.title.as_deref(), Some("OG Title"));
        assert_eq!(metadata.byline.as_deref(), Some("John Doe"));
        assert_eq!(metadata.excerpt.as_deref(), Some("OG Description"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example Site"));
        assert_eq!(metadata.lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_json_ld_fills_gaps() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"headline": "Headline", "author": [{"name": "First Author"}, {"name": "Second"}],
             "publisher": {"name": "Publisher"}}
            </script>
            </head><body></body></html>
        "#;
        let metadata = metadata_of(html);
        assert_eq!(metadata.title.as_deref(), Some("Headline"));
        assert_eq!(metadata.byline.as_deref(), Some("First Author"));
        assert_eq!(metadata.site_name.as_deref(), Some("Publisher"));
    }

    #[test]
    fn test_property_tokens_and_dots() {
        let html = r#"<html><head>
            <meta property="twitter:title og:title" content="Shared">
            <meta name="DC.Creator" content="Dublin">
        </head><body></body></html>"#;
        let metadata = metadata_of(html);
        assert_eq!(metadata.title.as_deref(), Some("Shared"));
        assert_eq!(metadata.byline.as_deref(), Some("Dublin"));
    }

    #[test]
    fn test_byline_selectors() {
        let html = r#"<body><p>intro</p><span class="byline">By Ada Lovelace</span></body>"#;
        assert_eq!(metadata_of(html).byline.as_deref(), Some("By Ada Lovelace"));

        let html = r#"<body><a rel="author" href="/ada">Ada</a></body>"#;
        assert_eq!(metadata_of(html).byline.as_deref(), Some("Ada"));

        let long = "x".repeat(120);
        let html = format!(r#"<body><div class="author">{long}</div></body>"#);
        assert_eq!(metadata_of(&html).byline, None);
    }

    #[test]
    fn test_empty_title_falls_back_to_h1() {
        let html = "<html><head><title> </title></head><body><h1>T</h1></body></html>";
        assert_eq!(metadata_of(html).title.as_deref(), Some("T"));
    }

    #[rstest]
    #[case("My Great Article About Rust | Example Site", "My Great Article About Rust")]
    #[case("Example Site | My Great Article About Rust", "My Great Article About Rust")]
    #[case("Short Title - Site", "Short Title - Site")]
    #[case("No separator at all here", "No separator at all here")]
    #[case("Hyphenated-word title stays whole", "Hyphenated-word title stays whole")]
    #[case("News » Rust gets a brand new compiler", "Rust gets a brand new compiler")]
    fn test_clean_title(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_title(raw, &[]), expected);
    }

    #[test]
    fn test_heading_equal_to_title_skips_truncation() {
        let raw = "Why Rust Matters Today | Example Site";
        assert_eq!(clean_title(raw, &[raw.to_string()]), raw);
    }

    #[test]
    fn test_direction_nearest_ancestor() {
        let dom = Document::parse(r#"<html dir="RTL"><body><div dir="ltr"><p>a</p></div><p>b</p></body></html>"#)
            .unwrap()
            .to_dom();
        let paragraphs = dom.find_all(dom.root(), "p");
        assert_eq!(resolve_direction(&dom, paragraphs[0]).as_deref(), Some("ltr"));
        assert_eq!(resolve_direction(&dom, paragraphs[1]).as_deref(), Some("rtl"));
    }
}
