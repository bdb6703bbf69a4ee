//! Process command - extract a receipt record from a single file.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use rcpt_core::models::config::RcptConfig;
use rcpt_core::{DisabledOcr, OcrEngineProvider, RawDocument, ReceiptPipeline};

use super::output::{format_record, OutputFormat};
use super::{cap_items, load_config, load_document, ocr_provider, process_with_timeout};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip OCR and accept only PDFs with a text layer
    #[arg(long)]
    text_only: bool,

    /// Store identity (e.g. fiscal code) used in the dedup key
    #[arg(long)]
    store_id: Option<String>,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    info!("Processing file: {}", args.input.display());
    let document = load_document(&args.input, &config.limits)?;

    let output = if args.text_only {
        let pipeline = ReceiptPipeline::from_config(DisabledOcr, &config)?;
        process_document(pipeline, document, &args, &config).await?
    } else {
        let provider = ocr_provider(&config, args.model_dir.as_deref());
        let pipeline = ReceiptPipeline::from_config(provider, &config)?;
        process_document(pipeline, document, &args, &config).await?
    };

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

async fn process_document<P>(
    pipeline: ReceiptPipeline<P>,
    document: RawDocument,
    args: &ProcessArgs,
    config: &RcptConfig,
) -> anyhow::Result<String>
where
    P: OcrEngineProvider + 'static,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Extracting text from {} document...", document.kind));

    let timeout = Duration::from_secs(config.limits.extraction_timeout_secs);
    let result = process_with_timeout(Arc::new(pipeline), document, timeout, None).await;
    pb.finish_and_clear();

    let mut record = result?;
    cap_items(&mut record, &config.limits);

    let dedup_key = record.dedup_key(args.store_id.as_deref());
    format_record(&record, &dedup_key, args.format)
}
