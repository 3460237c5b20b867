//! The single top-level scrape boundary.
//!
//! A run exposes the list, extracts rows, and encodes them. Every failure
//! surfaces here as a `ScrapeError`; nothing retries and nothing partial is
//! kept. Zero rows is not a failure: it comes back as `ScrapeOutcome::Empty`.

use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::export::CsvDownload;
use crate::exposer::{Exposer, ExposureState, Pause, ScrollTarget};
use crate::extractor::Extractor;
use crate::field::{sanitize_fields, FieldSpec};
use crate::logger::ScrapeLogger;
use crate::page::PageContext;
use crate::record::ResultSet;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("No active page to scrape: {0}")]
    NoTargetContext(String),

    #[error("Add at least one field with a selector.")]
    NoFieldsConfigured,

    #[error("Invalid selector for field '{field}': {selector} ({error})")]
    InvalidSelector {
        field: String,
        selector: String,
        error: String,
    },

    #[error("{0}")]
    ExecutionFailure(String),
}

#[derive(Debug)]
pub enum ScrapeOutcome {
    /// Rows were found and encoded
    Download {
        download: CsvDownload,
        results: ResultSet,
        exposure: ExposureState,
    },
    /// Extraction ran but nothing matched
    Empty { exposure: ExposureState },
}

impl ScrapeOutcome {
    pub fn record_count(&self) -> usize {
        match self {
            ScrapeOutcome::Download { results, .. } => results.len(),
            ScrapeOutcome::Empty { .. } => 0,
        }
    }
}

/// Run one scrape against `page`.
///
/// Fields are sanitized first, so a run with no usable field never touches
/// the page. The exposer always finishes its budget before extraction.
pub fn run_scrape(
    page: &dyn PageContext,
    fields: &[FieldSpec],
    config: &AppConfig,
    pause: &dyn Pause,
    logger: &ScrapeLogger,
) -> Result<ScrapeOutcome, ScrapeError> {
    let fields = sanitize_fields(fields)?;
    let exposer = Exposer::new(&config.exposure);
    let extractor = Extractor::new(&config.extraction);

    logger.log_run_start(&page.describe(), fields.len());
    logger.record_strategy(extractor.strategy().as_str());

    let exposure = exposer
        .expose_with_progress(page, pause, |state| {
            if state.iterations_done == 1 {
                logger.start_progress(state.iterations_planned as u64);
                logger.detail(&describe_target(&state.target));
            }
            logger.set_progress_position(state.iterations_done as u64);
        })
        .map_err(|e| ScrapeError::ExecutionFailure(format!("{:#}", e)));
    logger.finish_progress();
    let exposure = exposure?;
    logger.record_exposure(&describe_target(&exposure.target), exposure.iterations_done);

    let results = extractor.extract(page, &fields)?;
    logger.log_run_complete(results.len());

    if results.is_empty() {
        logger.log_empty_result();
        return Ok(ScrapeOutcome::Empty { exposure });
    }

    let download = CsvDownload::new(&results, &config.output.filename)
        .map_err(|e| ScrapeError::ExecutionFailure(format!("{:#}", e)))?;
    info!("Encoded {} records ({} bytes)", download.record_count, download.body.len());

    Ok(ScrapeOutcome::Download {
        download,
        results,
        exposure,
    })
}

fn describe_target(target: &ScrollTarget) -> String {
    match target {
        ScrollTarget::Container(selector) => format!("results container {}", selector),
        ScrollTarget::Window => "whole page".to_string(),
    }
}
