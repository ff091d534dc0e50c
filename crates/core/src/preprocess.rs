use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static HIDDEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script tags (JSON-LD blocks are kept for metadata)
    pub remove_scripts: bool,
    /// Whether to remove style tags
    pub remove_styles: bool,
    /// Whether to remove noscript and template tags
    pub remove_noscript: bool,
    /// Whether to remove elements hidden by inline styles or the `hidden` attribute
    pub remove_hidden: bool,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_noscript: true,
            remove_hidden: true,
            remove_comments: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

/// Preprocess HTML by removing non-content elements before parsing.
///
/// Whitespace is left untouched so `pre` blocks survive intact.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_scripts || config.remove_styles || config.remove_noscript {
        processed = remove_unwanted_tags(&processed, config);
    }

    if config.remove_comments {
        processed = COMMENT_RE.replace_all(&processed, "").to_string();
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

/// Run a single lol_html pass, handing the input back unchanged on rewriter failure.
fn rewrite(html: &str, handlers: Vec<(std::borrow::Cow<'static, lol_html::Selector>, lol_html::ElementContentHandlers<'_>)>) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }

    if rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove script, style, noscript and template tags from HTML
fn remove_unwanted_tags(html: &str, config: &PreprocessConfig) -> String {
    let handlers = vec![
        if config.remove_scripts {
            Some(lol_html::element!("script", |el| {
                let json_ld = el
                    .get_attribute("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("application/ld+json"));
                if !json_ld {
                    el.remove();
                }
                Ok(())
            }))
        } else {
            None
        },
        if config.remove_styles {
            Some(lol_html::element!("style", |el| {
                el.remove();
                Ok(())
            }))
        } else {
            None
        },
        if config.remove_noscript {
            Some(lol_html::element!("noscript, template", |el| {
                el.remove();
                Ok(())
            }))
        } else {
            None
        },
    ]
    .into_iter()
    .flatten()
    .collect();

    rewrite(html, handlers)
}

/// Convert relative URLs to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let handlers = vec![
        lol_html::element!("a[href]", |el| {
            if let Some(href) = el.get_attribute("href")
                && let Ok(absolute) = base_url.join(&href)
            {
                el.set_attribute("href", absolute.as_str()).ok();
            }
            Ok(())
        }),
        lol_html::element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src")
                && let Ok(absolute) = base_url.join(&src)
            {
                el.set_attribute("src", absolute.as_str()).ok();
            }
            Ok(())
        }),
    ];

    rewrite(html, handlers)
}

/// Remove elements with display:none, visibility:hidden or a `hidden` attribute
fn remove_hidden_elements(html: &str) -> String {
    let handlers = vec![lol_html::element!("*", |el| {
        let styled_hidden = el.get_attribute("style").is_some_and(|style| HIDDEN_RE.is_match(&style));
        if styled_hidden || el.has_attribute("hidden") {
            el.remove();
        }
        Ok(())
    })];

    rewrite(html, handlers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_unwanted_tags() {
        let html = r#"
            <html>
                <head><script>alert('test');</script><style>body{color:red;}</style></head>
                <body>
                    <noscript>Enable JavaScript</noscript>
                    <template><p>Later</p></template>
                    <p>Content</p>
                </body>
            </html>
        "#;

        let result = remove_unwanted_tags(html, &PreprocessConfig::default());
        assert!(!result.contains("<script"));
        assert!(!result.contains("<style"));
        assert!(!result.contains("<noscript"));
        assert!(!result.contains("Later"));
        assert!(result.contains("<p>Content</p>"));

        assert!(!result.contains("alert"), "Script content should be removed");
        assert!(!result.contains("color:red"), "Style content should be removed");
    }

    #[test]
    fn test_json_ld_survives() {
        let html = r#"<head><script type="application/ld+json">{"headline":"Kept"}</script><script>x()</script></head>"#;
        let result = remove_unwanted_tags(html, &PreprocessConfig::default());
        assert!(result.contains("Kept"));
        assert!(!result.contains("x()"));
    }

    #[test]
    fn test_remove_comments() {
        let html = "<body><!-- a\ncomment --><p>Visible content</p></body>";
        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(!result.contains("<!--"));
        assert!(result.contains("Visible content"));
    }

    #[test]
    fn test_convert_relative_urls() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let html = r#"
            <html>
                <body>
                    <a href="/about">About</a>
                    <a href="post.html">Post</a>
                    <img src="image.jpg" />
                </body>
            </html>
        "#;

        let result = convert_relative_urls(html, &base);
        assert!(result.contains("href=\"https://example.com/about\""));
        assert!(result.contains("href=\"https://example.com/blog/post.html\""));
        assert!(result.contains("src=\"https://example.com/blog/image.jpg\""));
    }

    #[test]
    fn test_remove_hidden_elements() {
        let html = r#"
            <html>
                <body>
                    <div style="display:none">Hidden content</div>
                    <div style="visibility:hidden">Invisible content</div>
                    <div hidden>Attribute hidden</div>
                    <div>Visible content</div>
                </body>
            </html>
        "#;

        let result = remove_hidden_elements(html);
        assert!(!result.contains("Hidden content"));
        assert!(!result.contains("Invisible content"));
        assert!(!result.contains("Attribute hidden"));
        assert!(result.contains("Visible content"));
    }

    #[test]
    fn test_pre_whitespace_preserved() {
        let html = "<pre>a\n    b</pre>";
        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(result.contains("a\n    b"));
    }
}
