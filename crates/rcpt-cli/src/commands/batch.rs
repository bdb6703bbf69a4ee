//! Batch processing command for multiple receipt files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use rcpt_core::models::config::RcptConfig;
use rcpt_core::{DedupKey, DisabledOcr, DocumentKind, OcrEngineProvider, ReceiptPipeline, ReceiptRecord};

use super::output::{format_record, OutputFormat};
use super::{cap_items, load_config, load_document, ocr_provider, process_with_timeout};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Skip OCR and accept only PDFs with a text layer
    #[arg(long)]
    text_only: bool,

    /// Store identity used in the dedup key of every file
    #[arg(long)]
    store_id: Option<String>,
}

/// Outcome of one file.
enum Outcome {
    Accepted(ReceiptRecord, DedupKey),
    Duplicate(ReceiptRecord, DedupKey),
    Failed(String),
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Outcome,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| DocumentKind::from_path(p).is_some())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    // Create output directory if specified
    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let results = if args.text_only {
        let pipeline = ReceiptPipeline::from_config(DisabledOcr, &config)?;
        process_files(Arc::new(pipeline), files, &args, &config).await?
    } else {
        let provider = ocr_provider(&config, args.model_dir.as_deref());
        let pipeline = ReceiptPipeline::from_config(provider, &config)?;
        process_files(Arc::new(pipeline), files, &args, &config).await?
    };

    if !args.continue_on_error {
        if let Some(failed) = results.iter().find_map(|r| match &r.outcome {
            Outcome::Failed(e) => Some((r.path.as_path(), e)),
            _ => None,
        }) {
            error!("Failed to process {}: {}", failed.0.display(), failed.1);
            anyhow::bail!("Processing failed: {}", failed.1);
        }
    }

    // Write outputs
    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            if let Outcome::Accepted(record, key) = &result.outcome {
                let output_name = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("receipt");
                let output_path =
                    output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                fs::write(&output_path, format_record(record, key, args.format)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let count = |f: fn(&Outcome) -> bool| results.iter().filter(|r| f(&r.outcome)).count();
    let accepted = count(|o| matches!(o, Outcome::Accepted(..)));
    let duplicates = count(|o| matches!(o, Outcome::Duplicate(..)));
    let failed = count(|o| matches!(o, Outcome::Failed(_)));

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} accepted, {} duplicates, {} failed",
        style(accepted).green(),
        style(duplicates).yellow(),
        style(failed).red()
    );

    if failed > 0 {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &results {
            if let Outcome::Failed(e) = &result.outcome {
                println!("  - {}: {}", result.path.display(), e);
            }
        }
    }

    Ok(())
}

/// Process files concurrently, then reject duplicates in input order.
async fn process_files<P>(
    pipeline: Arc<ReceiptPipeline<P>>,
    files: Vec<PathBuf>,
    args: &BatchArgs,
    config: &RcptConfig,
) -> anyhow::Result<Vec<ProcessResult>>
where
    P: OcrEngineProvider + 'static,
{
    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let timeout = Duration::from_secs(config.limits.extraction_timeout_secs);
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        let config = config.clone();

        tasks.spawn(async move {
            let permit = semaphore.acquire_owned().await?;
            let file_start = Instant::now();

            let result = match load_document(&path, &config.limits) {
                Ok(document) => process_with_timeout(pipeline, document, timeout, Some(permit))
                    .await
                    .map(|mut record| {
                        cap_items(&mut record, &config.limits);
                        record
                    }),
                Err(e) => Err(e),
            };

            let elapsed = file_start.elapsed().as_millis() as u64;
            anyhow::Ok((index, path, result, elapsed))
        });
    }

    let mut finished = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        finished.push(joined??);
        overall_pb.inc(1);
    }
    overall_pb.finish_with_message("Complete");

    finished.sort_by_key(|(index, ..)| *index);

    let mut seen = HashSet::new();
    let results = finished
        .into_iter()
        .map(|(_, path, result, processing_time_ms)| {
            let outcome = match result {
                Ok(record) => classify(record, args.store_id.as_deref(), &mut seen, &path),
                Err(e) => {
                    warn!("Failed to process {}: {}", path.display(), e);
                    Outcome::Failed(e.to_string())
                }
            };
            ProcessResult {
                path,
                outcome,
                processing_time_ms,
            }
        })
        .collect();

    Ok(results)
}

/// Accept a record unless an earlier one in the batch has the same dedup key.
///
/// Records with neither a purchase date nor a total carry no purchase
/// identity and are never treated as duplicates, whatever the store id.
fn classify(
    record: ReceiptRecord,
    store_id: Option<&str>,
    seen: &mut HashSet<DedupKey>,
    path: &Path,
) -> Outcome {
    let key = record.dedup_key(store_id);
    let receipt = &record.receipt;
    let anonymous = receipt.purchase_datetime.is_none() && receipt.total_amount.is_none();

    if anonymous || seen.insert(key.clone()) {
        Outcome::Accepted(record, key)
    } else {
        warn!("Rejecting duplicate receipt {} ({})", path.display(), key);
        Outcome::Duplicate(record, key)
    }
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "store_name",
        "purchase_datetime",
        "total_amount",
        "items",
        "ocr_confidence",
        "dedup_key",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time_ms = result.processing_time_ms.to_string();

        match &result.outcome {
            Outcome::Accepted(record, key) | Outcome::Duplicate(record, key) => {
                let status = if matches!(result.outcome, Outcome::Accepted(..)) {
                    "success"
                } else {
                    "duplicate"
                };
                let receipt = &record.receipt;
                wtr.write_record([
                    filename,
                    status,
                    receipt.store_name.as_deref().unwrap_or(""),
                    receipt
                        .purchase_datetime
                        .map(|d| d.to_string())
                        .unwrap_or_default()
                        .as_str(),
                    receipt
                        .total_amount
                        .map(|t| t.to_string())
                        .unwrap_or_default()
                        .as_str(),
                    receipt.items.len().to_string().as_str(),
                    record
                        .ocr_confidence
                        .map(|c| format!("{:.2}", c))
                        .unwrap_or_default()
                        .as_str(),
                    key.as_str(),
                    time_ms.as_str(),
                    "",
                ])?;
            }
            Outcome::Failed(error) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    time_ms.as_str(),
                    error.as_str(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcpt_core::{ReceiptParser, RuleBasedParser};

    fn record(text: &str) -> ReceiptRecord {
        ReceiptRecord {
            receipt: RuleBasedParser::new().parse(text),
            ocr_confidence: None,
            source_kind: DocumentKind::Pdf,
            raw_text: text.to_string(),
        }
    }

    fn classify_all(texts: &[&str], store_id: Option<&str>) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        texts
            .iter()
            .map(|text| match classify(record(text), store_id, &mut seen, Path::new("r.pdf")) {
                Outcome::Accepted(..) => "accepted",
                Outcome::Duplicate(..) => "duplicate",
                Outcome::Failed(_) => "failed",
            })
            .collect()
    }

    #[test]
    fn test_repeated_purchase_is_duplicate() {
        let text = "KAUFLAND\nTOTAL 15,00\n2024-05-01 10:00";
        let other = "KAUFLAND\nTOTAL 16,00\n2024-05-01 10:00";

        assert_eq!(
            classify_all(&[text, other, text], None),
            vec!["accepted", "accepted", "duplicate"]
        );
    }

    #[test]
    fn test_store_id_is_part_of_the_key() {
        let text = "TOTAL 15,00\n2024-05-01 10:00";
        let mut seen = HashSet::new();
        let path = Path::new("r.pdf");

        assert!(matches!(
            classify(record(text), Some("RO123"), &mut seen, path),
            Outcome::Accepted(..)
        ));
        assert!(matches!(
            classify(record(text), Some("RO124"), &mut seen, path),
            Outcome::Accepted(..)
        ));
        assert!(matches!(
            classify(record(text), Some("RO123"), &mut seen, path),
            Outcome::Duplicate(..)
        ));
    }

    #[test]
    fn test_receipts_without_identity_are_never_duplicates() {
        let texts = ["ESPRESSO 7,50", "CROISSANT 6,50", "ESPRESSO 7,50"];

        assert_eq!(
            classify_all(&texts, None),
            vec!["accepted", "accepted", "accepted"]
        );
        assert_eq!(
            classify_all(&texts, Some("RO123")),
            vec!["accepted", "accepted", "accepted"]
        );
    }
}
