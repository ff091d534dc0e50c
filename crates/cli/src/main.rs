mod echo;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use readmark_core::{
    Capture, Document, HeadingStyle, LinkStyle, MarkdownOptions, OutputFormat, Readability, ReadabilityConfig,
};
use tracing_subscriber::EnvFilter;
use url::Url;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Format(OutputFormat);

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self(OutputFormat::Markdown)),
            "html" => Ok(Self(OutputFormat::Html)),
            "text" | "txt" => Ok(Self(OutputFormat::PlainText)),
            "json" => Ok(Self(OutputFormat::Json)),
            _ => Err(format!("Invalid format: {}. Valid options: markdown, html, text, json", s)),
        }
    }
}

fn parse_link_style(s: &str) -> Result<LinkStyle, String> {
    match s.to_lowercase().as_str() {
        "inlined" | "inline" => Ok(LinkStyle::Inlined),
        "referenced" | "reference" => Ok(LinkStyle::Referenced),
        _ => Err(format!("Invalid link style: {}. Valid options: inlined, referenced", s)),
    }
}

fn parse_heading_style(s: &str) -> Result<HeadingStyle, String> {
    match s.to_lowercase().as_str() {
        "atx" => Ok(HeadingStyle::Atx),
        "setext" => Ok(HeadingStyle::Setext),
        _ => Err(format!("Invalid heading style: {}. Valid options: atx, setext", s)),
    }
}

/// Extract the readable part of an HTML page and convert it to Markdown
#[derive(Parser, Debug)]
#[command(name = "readmark")]
#[command(version = VERSION)]
#[command(about = "Extract the readable part of an HTML page as Markdown", long_about = None)]
struct Args {
    /// Local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (markdown, html, text, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: Format,

    /// Base URL for resolving relative links
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Fail when the page has more elements than this (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_elements: usize,

    /// Truncate output to this many characters (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_chars: usize,

    /// Keep class attributes in HTML output
    #[arg(long)]
    keep_classes: bool,

    /// Class names that are never stripped (repeatable)
    #[arg(long = "preserve-class", value_name = "CLASS")]
    preserve_classes: Vec<String>,

    /// Link style (inlined, referenced)
    #[arg(long, default_value = "inlined", value_name = "STYLE", value_parser = parse_link_style)]
    link_style: LinkStyle,

    /// Heading style (atx, setext)
    #[arg(long, default_value = "atx", value_name = "STYLE", value_parser = parse_heading_style)]
    heading_style: HeadingStyle,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

impl Args {
    fn readability_config(&self) -> ReadabilityConfig {
        let markdown =
            MarkdownOptions { link_style: self.link_style, heading_style: self.heading_style, ..Default::default() };

        let builder = ReadabilityConfig::builder()
            .max_elements(self.max_elements)
            .max_chars(self.max_chars)
            .keep_classes(self.keep_classes)
            .markdown(markdown);

        self.preserve_classes.iter().fold(builder, |builder, class| builder.preserve_class(class)).build()
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_logging(verbose: bool) {
    let fallback = if verbose { "readmark_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "readmark", &mut io::stdout());
        return Ok(());
    }

    init_logging(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let started = Instant::now();

    if args.verbose {
        let source = if args.input == "-" { "stdin".to_string() } else { format!("file {}", args.input) };
        echo::print_step(1, 4, &format!("Reading from {}", source.bright_white()));
    }

    let html = read_input(&args.input)?;
    tracing::debug!(input = %args.input, bytes = html.len(), "read input");

    if args.verbose {
        echo::print_field("Size", &echo::format_size(html.len()));
        eprintln!();
        echo::print_step(2, 4, "Parsing HTML document");
    }

    let parse_started = Instant::now();
    let base_url = args
        .base_url
        .as_deref()
        .map(Url::parse)
        .transpose()
        .context("Invalid base URL")?;
    let doc = Document::parse_with_preprocessing(&html, base_url).context("Failed to parse HTML")?;
    let parse_time = parse_started.elapsed();

    if args.verbose {
        echo::print_field("Elements", &doc.element_count().to_string());
        eprintln!();
        echo::print_step(3, 4, "Extracting main content");
    }

    let extract_started = Instant::now();
    let reader = Readability::with_config(args.readability_config());
    let capture = reader.capture(Some(&doc)).context("Failed to extract content")?;
    let extract_time = extract_started.elapsed();

    let output = match &capture {
        Capture::Article(article) => {
            if args.verbose {
                echo::print_extraction_details(article);
            }
            article.to_format(args.format.0).context("Failed to format output")?
        }
        Capture::PlainText(text) => {
            echo::print_warning("No article found, falling back to page text");
            text.clone()
        }
        Capture::NoContent => anyhow::bail!("{}", capture.text()),
    };

    if args.verbose {
        echo::print_step(4, 4, "Writing output");
        echo::print_field("Format", &format!("{:?}", args.format.0));
        eprintln!();
        echo::print_timing_summary(started.elapsed(), &[("Parse", parse_time), ("Extract", extract_time)]);
    }

    match args.output {
        Some(path) => {
            fs::write(&path, &output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            println!("{}", output);
        }
    }

    Ok(())
}
