use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use msgsplit::{split_message, DEFAULT_MAX_LEN};

/// Split an HTML message file into size-bounded, self-contained fragments
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Input HTML file
    input: PathBuf,

    /// Maximum fragment length in characters
    #[arg(long = "max-length", default_value_t = DEFAULT_MAX_LEN)]
    max_length: usize,

    /// Emit fragments as a JSON array instead of numbered text
    #[arg(long)]
    json: bool,
}

/// One emitted fragment, for `--json` output
#[derive(Serialize)]
struct FragmentRecord {
    index: usize,
    chars: usize,
    body: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    if cli.json {
        let mut records = Vec::new();
        for (i, fragment) in split_message(&source, cli.max_length).enumerate() {
            let body = fragment.with_context(|| format!("fragment #{}", i + 1))?;
            records.push(FragmentRecord {
                index: i + 1,
                chars: body.chars().count(),
                body,
            });
        }
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for (i, fragment) in split_message(&source, cli.max_length).enumerate() {
            let fragment = fragment.with_context(|| format!("fragment #{}", i + 1))?;
            println!("-- fragment #{} ({} chars) --", i + 1, fragment.chars().count());
            println!("{fragment}");
        }
    }

    Ok(())
}
