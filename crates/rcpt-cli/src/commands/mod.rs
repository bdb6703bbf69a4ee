//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod output;
pub mod parse;
pub mod process;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OwnedSemaphorePermit;
use tracing::{debug, warn};

use rcpt_core::models::config::{LimitsConfig, RcptConfig};
use rcpt_core::{
    ExtractionError, OcrEngineProvider, PureOcrProvider, RawDocument, ReceiptPipeline,
    ReceiptRecord,
};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// Load the configuration named on the command line, the default file, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    if let Some(path) = config_path {
        return Ok(RcptConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(RcptConfig::from_file(&default_path)?)
    } else {
        Ok(RcptConfig::default())
    }
}

/// OCR provider for the configured models, optionally from another directory.
pub fn ocr_provider(config: &RcptConfig, model_dir: Option<&Path>) -> PureOcrProvider {
    let mut models = config.models.clone();
    if let Some(dir) = model_dir {
        models.model_dir = dir.to_path_buf();
    }
    PureOcrProvider::new(models, &config.ocr)
}

/// Read a document from disk, enforcing the size limit.
pub fn load_document(path: &Path, limits: &LimitsConfig) -> anyhow::Result<RawDocument> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let size = std::fs::metadata(path)?.len();
    if size > limits.max_file_size_bytes {
        anyhow::bail!(
            "{} is {} bytes, which exceeds the {} byte limit",
            path.display(),
            size,
            limits.max_file_size_bytes
        );
    }

    Ok(RawDocument::from_path(path)?)
}

/// Run the pipeline on a blocking thread under a deadline.
///
/// When the deadline expires the extraction thread is left to finish on its
/// own; its engine is still released when it does. `permit` is held by the
/// extraction thread, so a concurrency slot stays taken until the extraction
/// really ends, not just until the caller stops waiting.
pub async fn process_with_timeout<P>(
    pipeline: Arc<ReceiptPipeline<P>>,
    document: RawDocument,
    timeout: Duration,
    permit: Option<OwnedSemaphorePermit>,
) -> anyhow::Result<ReceiptRecord>
where
    P: OcrEngineProvider + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.process(&document)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => Ok(joined??),
        Err(_) => {
            warn!("Extraction did not finish within {:?}", timeout);
            Err(ExtractionError::Timeout(timeout).into())
        }
    }
}

/// Apply the per-receipt item cap.
pub fn cap_items(record: &mut ReceiptRecord, limits: &LimitsConfig) {
    let dropped = record.truncate_items(limits.max_items);
    if dropped > 0 {
        warn!(
            "Receipt has more than {} items, dropped {}",
            limits.max_items, dropped
        );
    }
}
