//! Rendering of receipt records.

use serde::Serialize;

use rcpt_core::{DedupKey, ReceiptRecord};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// A record as handed to persistence, with its dedup key.
#[derive(Serialize)]
struct RecordOutput<'a> {
    #[serde(flatten)]
    record: &'a ReceiptRecord,
    dedup_key: &'a DedupKey,
}

pub fn format_record(
    record: &ReceiptRecord,
    dedup_key: &DedupKey,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&RecordOutput {
            record,
            dedup_key,
        })?),
        OutputFormat::Csv => format_csv(record),
        OutputFormat::Text => Ok(format_text(record, dedup_key)),
    }
}

fn format_csv(record: &ReceiptRecord) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let receipt = &record.receipt;

    wtr.write_record([
        "store_name",
        "purchase_datetime",
        "total_amount",
        "line_no",
        "product_name",
        "qty",
        "unit_price",
        "total_price",
        "category",
    ])?;

    let store = receipt.store_name.clone().unwrap_or_default();
    let datetime = receipt
        .purchase_datetime
        .map(|d| d.to_string())
        .unwrap_or_default();
    let total = receipt
        .total_amount
        .map(|t| t.to_string())
        .unwrap_or_default();

    if receipt.items.is_empty() {
        wtr.write_record([
            store.as_str(),
            datetime.as_str(),
            total.as_str(),
            "",
            "",
            "",
            "",
            "",
            "",
        ])?;
    }

    for item in &receipt.items {
        wtr.write_record([
            store.as_str(),
            datetime.as_str(),
            total.as_str(),
            item.line_no.to_string().as_str(),
            item.product_name.as_str(),
            item.qty.to_string().as_str(),
            item.unit_price.to_string().as_str(),
            item.total_price.to_string().as_str(),
            item.category.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(record: &ReceiptRecord, dedup_key: &DedupKey) -> String {
    let receipt = &record.receipt;
    let mut output = String::new();

    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    output.push_str(&format!("Store: {}\n", or_unknown(receipt.store_name.clone())));
    output.push_str(&format!(
        "Date:  {}\n",
        or_unknown(receipt.purchase_datetime.map(|d| d.format("%Y-%m-%d %H:%M").to_string()))
    ));
    output.push_str(&format!(
        "Total: {}\n",
        or_unknown(receipt.total_amount.map(|t| t.to_string()))
    ));
    output.push_str(&format!("Source: {}", record.source_kind));
    if let Some(confidence) = record.ocr_confidence {
        output.push_str(&format!(" (OCR confidence {:.2}%)", confidence));
    }
    output.push('\n');

    if !receipt.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &receipt.items {
            output.push_str(&format!(
                "  {:>3}. {:<30} {:>6} x {:>8} = {:>8}  [{}]\n",
                item.line_no,
                item.product_name,
                item.qty.to_string(),
                item.unit_price.to_string(),
                item.total_price.to_string(),
                item.category
            ));
        }
    }

    output.push_str(&format!("\nDedup key: {}\n", dedup_key));
    output
}
