//! Parse command - run the receipt parser over plain text.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::info;

use rcpt_core::{DedupKey, ParsedReceipt, ReceiptParser, RuleBasedParser};

use super::load_config;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file containing receipt text
    #[arg(required = true)]
    input: PathBuf,

    /// Store identity used in the dedup key
    #[arg(long)]
    store_id: Option<String>,
}

#[derive(Serialize)]
struct ParseOutput {
    #[serde(flatten)]
    receipt: ParsedReceipt,
    dedup_key: DedupKey,
}

pub fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing text file: {}", args.input.display());
    let text = fs::read_to_string(&args.input)?;

    let parser = RuleBasedParser::from_config(&config)?;
    let receipt = parser.parse(&text);
    let dedup_key = receipt.dedup_key(args.store_id.as_deref());

    println!(
        "{}",
        serde_json::to_string_pretty(&ParseOutput { receipt, dedup_key })?
    );

    Ok(())
}
