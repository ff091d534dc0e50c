//! Library API integration tests
use readmark_core::*;
use rstest::rstest;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

#[test]
fn test_parse_api() {
    let article = parse(&fixture("article.html")).expect("should parse");

    assert_eq!(article.title.as_deref(), Some("Understanding Ownership and Borrowing in Rust"));
    assert_eq!(article.byline.as_deref(), Some("Sam Rivera"));
    assert_eq!(article.site_name.as_deref(), Some("Dev Notes"));
    assert_eq!(article.lang.as_deref(), Some("en"));
    assert!(article.text_length > 0);
}

#[test]
fn test_boilerplate_is_dropped() {
    let article = parse(&fixture("article.html")).unwrap();

    assert!(article.markdown.contains("Ownership is the set of rules"), "{}", article.markdown);
    assert!(!article.markdown.contains("Popular posts"));
    assert!(!article.markdown.contains("Copyright"));
    assert!(!article.markdown.contains("Archive"));
    assert!(!article.markdown.contains("trackPageView"));
}

#[test]
fn test_article_markdown_structure() {
    let md = parse(&fixture("article.html")).unwrap().markdown;

    assert!(md.contains("## Moves and copies"), "{md}");
    assert!(md.contains("`String`"), "{md}");
    assert!(md.contains("[ownership chapter](/docs/ownership)"), "{md}");
    assert!(md.contains("```rust\nlet s1 = String::from(\"hello\");"), "{md}");
    assert!(md.contains("-   Each value has an owner."), "{md}");
}

#[test]
fn test_parse_with_url() {
    let article = parse_with_url(&fixture("article.html"), "https://devnotes.example/posts/ownership").unwrap();
    assert!(article.markdown.contains("(https://devnotes.example/docs/ownership)"), "{}", article.markdown);
}

#[test]
fn test_parse_with_invalid_url() {
    let result = parse_with_url(&fixture("article.html"), "not a url");
    assert!(matches!(result, Err(ReadmarkError::InvalidUrl(_))));
}

#[test]
fn test_extraction_is_deterministic() {
    let html = fixture("article.html");
    assert_eq!(parse(&html).unwrap().markdown, parse(&html).unwrap().markdown);
}

#[test]
fn test_article_output_formats() {
    let article = parse(&fixture("article.html")).unwrap();

    let md = article.to_format(OutputFormat::Markdown).unwrap();
    assert_eq!(md, article.markdown);

    let html = article.to_format(OutputFormat::Html).unwrap();
    assert!(html.contains("<h2>Moves and copies</h2>"), "{html}");

    let json = article.to_json().unwrap();
    assert!(json.is_object());
    assert!(json.get("markdown").is_some());
    assert!(json.get("content").and_then(|c| c.as_str()).is_some());

    let text = article.to_format(OutputFormat::PlainText).unwrap();
    assert!(text.starts_with("Understanding Ownership and Borrowing in Rust\n"), "{text}");
    assert!(text.contains("By: Sam Rivera | Site: Dev Notes"));
    assert!(text.contains("\n\nOwnership is the set of rules"), "{text}");
}

#[test]
fn test_readability_builder() {
    let config = ReadabilityConfig::builder().max_chars(40).truncation_marker(" [cut]").build();
    let article = Readability::with_config(config).parse(&fixture("article.html")).unwrap();

    assert!(article.markdown.ends_with(" [cut]"));
    assert_eq!(article.markdown.chars().count(), 46);
}

#[test]
fn test_element_budget() {
    let config = ReadabilityConfig::builder().max_elements(5).build();
    let result = Readability::with_config(config).parse(&fixture("article.html"));
    assert!(matches!(result, Err(ReadmarkError::ElementBudgetExceeded { max: 5, .. })));
}

#[test]
fn test_referenced_links() {
    let markdown = MarkdownOptions { link_style: LinkStyle::Referenced, ..Default::default() };
    let config = ReadabilityConfig::builder().markdown(markdown).build();
    let md = Readability::with_config(config).parse(&fixture("article.html")).unwrap().markdown;

    assert!(md.contains("[ownership chapter][1]"), "{md}");
    assert!(md.ends_with("[1]: /docs/ownership"), "{md}");
}

#[test]
fn test_capture_no_content() {
    let doc = Document::parse_with_preprocessing(&fixture("empty_content.html"), None).unwrap();
    let capture = Readability::new().capture(Some(&doc)).unwrap();

    assert!(matches!(capture, Capture::NoContent));
    assert_eq!(capture.text(), NO_CONTENT);
}

#[test]
fn test_capture_plain_text_fallback() {
    let doc = Document::parse_with_preprocessing(&fixture("short_note.html"), None).unwrap();
    let capture = Readability::new().capture(Some(&doc)).unwrap();

    assert!(matches!(capture, Capture::PlainText(ref text) if text == "Back in five minutes."), "{capture:?}");
}

#[test]
fn test_table_landmark() {
    let md = parse(&fixture("data_table.html")).unwrap().markdown;

    assert!(md.starts_with("| Version | Date |\n| --- | --- |"), "{md}");
    assert!(md.contains("| 1.1 | June |"), "{md}");
}

#[test]
fn test_code_fence_widening() {
    let md = parse(&fixture("code_fence.html")).unwrap().markdown;

    assert!(md.contains("`````\nSome text\n````\n"), "{md}");
    assert!(md.contains("\n`````"), "{md}");
    assert!(md.contains("5.  fifth\n6.  sixth\n7.  seventh"), "{md}");
    assert!(md.contains(r"\*stars\*"), "{md}");
    assert!(md.contains(r"\_underscores\_"), "{md}");
}

#[test]
fn test_unicode_content() {
    let article = parse(&fixture("unicode_heavy.html")).unwrap();

    assert_eq!(article.title.as_deref(), Some("International Writing Systems"));
    assert_eq!(article.direction.as_deref(), Some("rtl"));
    assert_eq!(article.lang.as_deref(), Some("ar"));
    assert!(article.markdown.contains("مرحبا بالعالم"));
    assert!(article.markdown.contains("日本語のテキスト"));
    assert!(article.markdown.contains("🦀"));
}

#[test]
fn test_custom_rule_through_serializer() {
    struct Upper;

    impl Rule for Upper {
        fn matches(&self, dom: &Dom, node: NodeId, _: &MarkdownOptions) -> bool {
            dom.tag(node) == Some("h2")
        }

        fn render(&self, content: &str, _: &Dom, _: NodeId, _: &MarkdownOptions, _: &mut RenderContext) -> String {
            format!("\n\n{}\n\n", content.to_uppercase())
        }
    }

    let article = parse(&fixture("article.html")).unwrap();
    let mut serializer = MarkdownSerializer::default();
    serializer.add_rule(Box::new(Upper));
    let md = serializer.serialize(&article.content, article.content.root()).unwrap();

    assert!(md.contains("\n\nMOVES AND COPIES\n\n"), "{md}");
}

fn deep_divs(depth: usize) -> String {
    format!(
        "<body>{}<p>The innermost paragraph holds the only real text on this page.</p>{}</body>",
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    )
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[rstest]
#[case::empty_input(String::new())]
#[case::comment_only("<!-- nothing -->".to_string())]
#[case::max_list_start(
    r#"<article><p>A list that starts very late follows this sentence.</p><ol start="9223372036854775807"><li>a</li><li>b</li></ol></article>"#.to_string()
)]
#[case::min_list_start(r#"<ol start="-9223372036854775808"><li>a</li><li>b</li></ol>"#.to_string())]
#[case::huge_header_colspan(
    r#"<table><tr><th colspan="18446744073709551615">A</th></tr><tr><td>1</td></tr></table>"#.to_string()
)]
#[case::huge_cell_colspan(
    r#"<table><tr><th>A</th><th>B</th></tr><tr><td colspan="18446744073709551615">wide</td></tr></table>"#.to_string()
)]
#[case::large_colspan(r#"<table><tr><th colspan="10000000000">A</th></tr><tr><td colspan="99999999999999999999">1</td></tr></table>"#.to_string())]
#[case::nested_tables(
    r#"<table><tr><th>Outer</th></tr><tr><td><table><tr><th colspan="5000">Inner</th></tr></table></td></tr></table>"#.to_string()
)]
#[case::empty_list_and_table("<body><ol></ol><ul></ul><table></table><table><tr></tr></table></body>".to_string())]
#[case::deep_nesting(deep_divs(1500))]
#[case::blank_inlines(r#"<p><em> </em><strong></strong><a href="/x"></a><code></code><del> </del></p>"#.to_string())]
#[case::text_only_pre("<pre>just text, no code element inside</pre>".to_string())]
#[case::break_in_heading(
    "<article><h1>a<br>b</h1><p>Enough words here to make the article a real candidate.</p></article>".to_string()
)]
#[case::replacement_chars(lossy(b"<article><p>bad \xff\xfe bytes \xc3 in a paragraph that is long enough</p></article>"))]
#[case::fences_everywhere("<pre>```\n~~~~\n`````</pre><p><code>``</code></p>".to_string())]
fn test_adversarial_documents_never_fail(#[case] html: String) {
    let options = [
        MarkdownOptions::default(),
        MarkdownOptions {
            heading_style: HeadingStyle::Setext,
            link_style: LinkStyle::Referenced,
            code_block_style: CodeBlockStyle::Indented,
            ..Default::default()
        },
    ];

    for options in options {
        let config = ReadabilityConfig::builder().markdown(options.clone()).build();
        let reader = Readability::with_config(config);
        let serializer = MarkdownSerializer::new(options);

        for doc in [Document::parse(&html).unwrap(), Document::parse_with_preprocessing(&html, None).unwrap()] {
            let capture = reader.capture(Some(&doc));
            assert!(capture.is_ok(), "{capture:?}");

            if let Ok(Capture::Article(article)) = capture {
                assert!(serializer.serialize(&article.content, article.content.root()).is_ok());
            }

            let dom = doc.to_dom();
            assert!(serializer.serialize(&dom, dom.root()).is_ok());
        }
    }
}
