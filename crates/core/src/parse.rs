//! HTML parsing and conversion into the element tree.
//!
//! This module provides the [`Document`] and [`Element`] types. A document is
//! parsed with `scraper` (html5ever) and can be queried with CSS selectors or
//! converted into a [`Dom`] for extraction.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs.len(), 1);
//! ```

use ego_tree::iter::Edge;
use scraper::{Html, Node, Selector};
use url::Url;

use crate::dom::Dom;
use crate::{ReadmarkError, Result};

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use readmark_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html).unwrap();
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    ///
    /// This creates a Document directly from the HTML string without any
    /// cleaning or modification.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses HTML from a string with preprocessing.
    ///
    /// Scripts, styles and hidden elements are removed before parsing and
    /// relative links are resolved against `base_url` when one is given.
    ///
    /// # Example
    ///
    /// ```rust
    /// use readmark_core::parse::Document;
    ///
    /// let html = "<html><body><script>x()</script><article>Content</article></body></html>";
    /// let doc = Document::parse_with_preprocessing(html, None).unwrap();
    /// assert!(!doc.as_string().contains("x()"));
    /// ```
    #[cfg(feature = "preprocess")]
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Result<Self> {
        let config = crate::PreprocessConfig { base_url: base_url.clone(), ..Default::default() };

        let cleaned = crate::preprocess::preprocess_html(html, &config);
        let html = Html::parse_document(&cleaned);

        Ok(Self { html, base_url })
    }

    /// Parses HTML from a string; preprocessing is unavailable without the
    /// `preprocess` feature, so only the base URL is recorded.
    #[cfg(not(feature = "preprocess"))]
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url })
    }

    /// Gets the base URL used for preprocessing.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| ReadmarkError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Raw text of the `<title>` element, if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    /// Number of elements in the parsed document.
    pub fn element_count(&self) -> usize {
        self.html.tree.values().filter(|node| node.is_element()).count()
    }

    /// Converts the parsed document into a fresh [`Dom`].
    ///
    /// Doctypes and processing instructions are dropped; every element,
    /// text and comment node is copied in document order.
    pub fn to_dom(&self) -> Dom {
        let mut dom = Dom::new();
        let mut stack = vec![dom.root()];

        for edge in self.html.tree.root().traverse() {
            match edge {
                Edge::Open(node) => {
                    let Some(&parent) = stack.last() else {
                        continue;
                    };
                    match node.value() {
                        Node::Element(element) => {
                            let attrs = element.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
                            let id = dom.create_element_with_attrs(element.name(), attrs);
                            dom.append_child(parent, id);
                            stack.push(id);
                        }
                        Node::Text(text) => {
                            let id = dom.create_text(text);
                            dom.append_child(parent, id);
                        }
                        Node::Comment(comment) => {
                            let id = dom.create_comment(comment);
                            dom.append_child(parent, id);
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if node.value().is_element() {
                        stack.pop();
                    }
                }
            }
        }

        dom
    }
}

/// Element matched by [`Document::select`].
///
/// # Example
///
/// ```rust
/// use readmark_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html).unwrap();
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}
