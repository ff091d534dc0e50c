use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that are significant anywhere in a line
const INLINE_SPECIALS: &[char] = &['\\', '*', '`', '_', '[', ']'];

/// Sequences that are significant only at the start of a line, in application order
static LINE_START_ESCAPES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"^-").unwrap(), r"\-"),
        (Regex::new(r"^\+ ").unwrap(), r"\+ "),
        (Regex::new(r"^(=+)").unwrap(), r"\${1}"),
        (Regex::new(r"^(#{1,6}) ").unwrap(), r"\${1} "),
        (Regex::new(r"^~~~").unwrap(), r"\~~~"),
        (Regex::new(r"^>").unwrap(), r"\>"),
        (Regex::new(r"^(\d+)\. ").unwrap(), r"${1}\. "),
    ]
});

/// Escape literal text so it reads back as the same text.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if INLINE_SPECIALS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped.split('\n').map(escape_line_start).collect::<Vec<_>>().join("\n")
}

fn escape_line_start(line: &str) -> String {
    let mut line = line.to_string();
    for (pattern, replacement) in LINE_START_ESCAPES.iter() {
        line = pattern.replace(&line, *replacement).into_owned();
    }
    line
}
