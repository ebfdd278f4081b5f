// src/main.rs
//
// jelly-inliner: inline CSS into a Jelly email template
//
// - Reads the template (default: html.jelly) and parses it case-insensitively.
// - Copies <style> and <link rel="stylesheet"> rules (local files or fetched over
//   http) into per-element `style` attributes; existing inline declarations win.
// - Writes the tree back out prettified, then restores the camel-cased Jelly names
//   (j:forEach, j:getStatic, varStatus, className) and re-escapes `&nbsp;` as
//   `&amp;nbsp;`.
// - Writes the result (default: html_gmail.jelly), overwriting it.
//
// CLI flags:
//   -d, --debug      : debug logging
//   --base-url <URL> : fetch relative <link> stylesheets from this URL

use anyhow::Context;
use clap::{ArgAction, Parser};
use jelly_inliner::config::{Config, DEFAULT_INPUT, DEFAULT_OUTPUT};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use url::Url;

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Base URL that relative stylesheet links are fetched from
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,

    /// Input template
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output file (created or truncated)
    #[arg(default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let mut config = Config {
        input: cli.input,
        output: cli.output,
        ..Config::default()
    };
    config.inliner.base_url = cli.base_url;

    jelly_inliner::run(&config).with_context(|| {
        format!(
            "failed to inline {} into {}",
            config.input.display(),
            config.output.display()
        )
    })
}
