use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("readmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract the readable part of an HTML page as Markdown")
        .arg(clap::arg!([INPUT] "Local HTML file, or '-' for stdin").default_value("-"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (markdown, html, text, json)")
                .value_name("FORMAT")
                .default_value("markdown")
                .value_parser(["markdown", "html", "text", "json"]),
        )
        .arg(clap::arg!(--base_url <URL> "Base URL for resolving relative links").value_name("URL"))
        .arg(
            clap::arg!(--max_elements <NUM> "Fail when the page has more elements than this (0 = unlimited)")
                .default_value("0"),
        )
        .arg(clap::arg!(--max_chars <NUM> "Truncate output to this many characters (0 = unlimited)").default_value("0"))
        .arg(clap::arg!(--keep_classes "Keep class attributes in HTML output"))
        .arg(clap::arg!(--preserve_class <CLASS> "Class names that are never stripped (repeatable)").value_name("CLASS"))
        .arg(
            clap::arg!(--link_style <STYLE> "Link style (inlined, referenced)")
                .default_value("inlined")
                .value_parser(["inlined", "referenced"]),
        )
        .arg(
            clap::arg!(--heading_style <STYLE> "Heading style (atx, setext)")
                .default_value("atx")
                .value_parser(["atx", "setext"]),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"))
        .arg(
            clap::arg!(--completions <SHELL> "Generate shell completion script")
                .value_name("SHELL")
                .value_parser(["bash", "zsh", "fish", "powershell"]),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "readmark", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
