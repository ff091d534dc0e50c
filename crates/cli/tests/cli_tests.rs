//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("readmark")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_file_input() {
    cmd()
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("## Moves and copies"));
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("article.html")).unwrap();
    cmd()
        .arg("-")
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ownership is the set of rules"));
}

#[test]
fn test_cli_default_input_is_stdin() {
    let html = std::fs::read_to_string(get_fixture_path("article.html")).unwrap();
    cmd().write_stdin(html).assert().success().stdout(predicate::str::contains("Borrowing"));
}

#[test]
fn test_cli_html_format() {
    cmd()
        .args(["-f", "html", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h2>Moves and copies</h2>"));
}

#[test]
fn test_cli_text_format() {
    cmd()
        .args(["-f", "text", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("By: Sam Rivera"))
        .stdout(predicate::str::contains("```").not());
}

#[test]
fn test_cli_json_format() {
    cmd()
        .args(["-f", "json", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"))
        .stdout(predicate::str::contains("\"markdown\""));
}

#[test]
fn test_cli_json_is_valid() {
    let output = cmd().args(["-f", "json", &get_fixture_path("article.html")]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["byline"], "Sam Rivera");
    assert_eq!(value["site_name"], "Dev Notes");
}

#[test]
fn test_cli_invalid_format() {
    cmd().args(["-f", "yaml", &get_fixture_path("article.html")]).assert().failure();
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("output.md");

    cmd()
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("## Moves and copies"));
}

#[test]
fn test_cli_base_url() {
    cmd()
        .args(["--base-url", "https://devnotes.example/posts/", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("(https://devnotes.example/docs/ownership)"));
}

#[test]
fn test_cli_invalid_base_url() {
    cmd()
        .args(["--base-url", "not a url", &get_fixture_path("article.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid base URL"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().arg("nonexistent.html").assert().failure();
}

#[test]
fn test_cli_empty_content() {
    cmd()
        .arg(get_fixture_path("empty_content.html"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No readable content found."));
}

#[test]
fn test_cli_plain_text_fallback() {
    cmd()
        .arg(get_fixture_path("short_note.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Back in five minutes."))
        .stderr(predicate::str::contains("falling back to page text"));
}

#[test]
fn test_cli_max_elements() {
    cmd()
        .args(["--max-elements", "1", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ownership is the set of rules"))
        .stdout(predicate::str::contains("##").not());
}

#[test]
fn test_cli_max_chars() {
    cmd()
        .args(["--max-chars", "20", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("[truncated]"));
}

#[test]
fn test_cli_unicode_content() {
    cmd()
        .arg(get_fixture_path("unicode_heavy.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("International"))
        .stdout(predicate::str::contains("🦀"));
}

#[test]
fn test_cli_table_fixture() {
    cmd()
        .arg(get_fixture_path("data_table.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("| Version | Date |"));
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Readmark"))
        .stderr(predicate::str::contains("Extraction Details"));
}

#[test]
fn test_cli_link_style_referenced() {
    cmd()
        .args(["--link-style", "referenced", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ownership chapter][1]"))
        .stdout(predicate::str::contains("[1]: /docs/ownership"));
}

#[test]
fn test_cli_heading_style_setext() {
    cmd()
        .args(["--heading-style", "setext", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moves and copies\n----------------"));
}

#[test]
fn test_cli_keep_classes() {
    cmd()
        .args(["-f", "html", "--keep-classes", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("class=\"post\""));
}

#[test]
fn test_cli_completions() {
    cmd()
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("readmark"));
}
