use anyhow::{anyhow, Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::record::ResultSet;

pub const CSV_MIME_TYPE: &str = "text/csv";

/// A finished CSV ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub filename: String,
    pub mime_type: &'static str,
    pub body: String,
    pub record_count: usize,
}

impl CsvDownload {
    pub fn new(results: &ResultSet, filename: &str) -> Result<Self> {
        Ok(Self {
            filename: filename.to_string(),
            mime_type: CSV_MIME_TYPE,
            body: encode_csv(results)?,
            record_count: results.len(),
        })
    }

    /// Write the body into `output_dir/filename`, creating the directory.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
        let path = output_dir.join(&self.filename);
        debug!("Writing {} records to {}", self.record_count, path.display());
        fs::write(&path, self.body.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Successfully exported {} records to CSV: {}", self.record_count, path.display());
        Ok(path)
    }
}

/// Encode a result set as CSV text.
///
/// The header row is the first record's keys, joined verbatim. Every value
/// is double-quoted with embedded quotes doubled. Rows end in `\n` and the
/// last row has no trailing line break. An empty set encodes to `""`.
pub fn encode_csv(results: &ResultSet) -> Result<String> {
    let Some(headers) = results.headers() else {
        return Ok(String::new());
    };

    let mut header_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header_writer.write_record(&headers)?;
    let buffer = header_writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV header: {}", e.error()))?;

    let mut row_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for record in results {
        row_writer.write_record(headers.iter().map(|h| record.get(h).unwrap_or("")))?;
    }
    let mut bytes = row_writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV rows: {}", e.error()))?;

    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

pub fn print_scrape_summary(results: &ResultSet) {
    if results.is_empty() {
        println!("No items found.");
        return;
    }

    let headers = results.headers().unwrap_or_default();

    println!("\n=== Scrape Summary ===");
    println!("Items found: {}", results.len());
    println!("Columns: {}", headers.join(", "));

    // Columns that came back blank show which selectors need attention
    for header in &headers {
        let filled = results
            .iter()
            .filter(|r| r.get(header).map(|v| !v.is_empty()).unwrap_or(false))
            .count();
        println!("  {}: {}/{} filled", header, filled, results.len());
    }

    println!("======================\n");
}
