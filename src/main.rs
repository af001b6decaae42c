// catascrape CLI
//
// Walks a paginated catalog listing with a stealth-configured Chromium
// session and writes the deduplicated aggregate as one JSON document.

use anyhow::{Result, bail};
use catascrape::ScrapeConfig;
use tracing_subscriber::EnvFilter;

struct CliArgs {
    base_url: String,
    listing_path: Option<String>,
    output: Option<String>,
    headed: bool,
    dedup_by_title: bool,
}

const USAGE: &str = "\
Usage: catascrape <base-url> [listing-path] [options]

Arguments:
  <base-url>       Site root, e.g. https://9animetv.to
  [listing-path]   Listing path relative to the root (default: /az-list)

Options:
  -o, --output <file>   Output JSON path (default: anime_data_paginated.json)
      --headed          Run the browser with a visible window
      --dedup-by-title  Deduplicate by display title instead of link
  -h, --help            Show this help
";

fn parse_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut positional: Vec<String> = Vec::new();
    let mut output = None;
    let mut headed = false;
    let mut dedup_by_title = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            "-o" | "--output" => match args.next() {
                Some(value) => output = Some(value),
                None => bail!("{arg} requires a value\n\n{USAGE}"),
            },
            "--headed" => headed = true,
            "--dedup-by-title" => dedup_by_title = true,
            other if other.starts_with('-') => bail!("unknown option '{other}'\n\n{USAGE}"),
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let Some(base_url) = positional.next() else {
        bail!("missing required <base-url>\n\n{USAGE}");
    };

    Ok(CliArgs {
        base_url,
        listing_path: positional.next(),
        output,
        headed,
        dedup_by_title,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let args = parse_args()?;

    let mut builder = ScrapeConfig::builder().base_url(&args.base_url);
    if let Some(path) = &args.listing_path {
        builder = builder.listing_path(path);
    }
    if let Some(output) = &args.output {
        builder = builder.output_path(output);
    }
    if args.headed {
        builder = builder.headed();
    }
    if args.dedup_by_title {
        builder = builder.dedup_by_link(false);
    }
    let config = builder.build()?;

    catascrape::scrape(config).await?;
    Ok(())
}
