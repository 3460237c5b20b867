use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, CONFIG_PATH, MAX_SCROLL_ITERATIONS};
use crate::extractor::AlignmentStrategy;
use crate::field::FieldSpec;

#[derive(Parser, Debug)]
#[command(name = "placescrape")]
#[command(about = "Scroll a lazily-loaded results list in headless Chrome and export selected fields to CSV")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/placescrape.toml
    #[arg(long)]
    pub init: bool,

    /// Page to open in headless Chrome (e.g. a Google Maps search URL)
    #[arg(short, long, conflicts_with = "html_file")]
    pub url: Option<String>,

    /// Scrape a saved HTML page instead of a live browser tab
    #[arg(long, value_name = "PATH")]
    pub html_file: Option<PathBuf>,

    /// Output column as NAME=SELECTOR or NAME=SELECTOR@ATTR (repeatable; replaces the configured fields)
    #[arg(short, long = "field", value_name = "NAME=SELECTOR")]
    pub fields: Vec<FieldSpec>,

    /// Configuration file to load
    #[arg(short, long, value_name = "PATH", default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Output directory for the CSV (defaults to Desktop)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Output filename (overrides config)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Scroll+wait cycles against the results container (overrides config)
    #[arg(long, value_name = "N")]
    pub iterations: Option<u32>,

    /// Wait after each container scroll in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Wait after the whole-page fallback scroll in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    pub fallback_delay_ms: Option<u64>,

    /// Row alignment: 'positional' or 'common_ancestor' (overrides config)
    #[arg(long)]
    pub strategy: Option<AlignmentStrategy>,

    /// Keep at most N rows (0 = unlimited, overrides config)
    #[arg(long, value_name = "N")]
    pub max_records: Option<usize>,

    /// Collapse whitespace runs inside extracted values
    #[arg(long)]
    pub normalize_whitespace: bool,

    /// Drop non-ASCII symbols from extracted values
    #[arg(long)]
    pub ascii_only: bool,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Verbose logging (use -v for details, -vv for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Where the scrape runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(url::Url),
    HtmlFile(PathBuf),
}

impl Cli {
    /// Resolve the page to scrape. `Err` carries a user-facing message.
    pub fn target(&self) -> Result<Target, String> {
        if let Some(raw) = &self.url {
            let parsed = url::Url::parse(raw.trim())
                .map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("URL must be http or https: {}", raw));
            }
            return Ok(Target::Url(parsed));
        }
        if let Some(path) = &self.html_file {
            return Ok(Target::HtmlFile(path.clone()));
        }
        Err("No page given (use --url or --html-file)".to_string())
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(iterations) = self.iterations {
            if iterations == 0 || iterations > MAX_SCROLL_ITERATIONS {
                return Err(format!(
                    "Iterations must be between 1 and {}",
                    MAX_SCROLL_ITERATIONS
                ));
            }
        }
        if let Some(output) = &self.output {
            if output.trim().is_empty() {
                return Err("Output filename cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if !self.fields.is_empty() {
            config.fields = self.fields.clone();
        }
        if let Some(iterations) = self.iterations {
            config.exposure.iterations = iterations;
        }
        if let Some(delay) = self.delay_ms {
            config.exposure.delay_ms = delay;
        }
        if let Some(delay) = self.fallback_delay_ms {
            config.exposure.fallback_delay_ms = delay;
        }
        if let Some(strategy) = self.strategy {
            config.extraction.strategy = strategy;
        }
        if let Some(max) = self.max_records {
            config.extraction.max_records = max;
        }
        if self.normalize_whitespace {
            config.extraction.normalize_whitespace = true;
        }
        if self.ascii_only {
            config.extraction.ascii_only = true;
        }
        if self.headful {
            config.browser.headless = false;
        }
        if let Some(output) = &self.output {
            config.output.filename = output.trim().to_string();
        }
    }

    pub fn get_default_output_dir() -> String {
        match dirs::desktop_dir() {
            Some(desktop_dir) => desktop_dir.to_string_lossy().to_string(),
            // Fallback to current directory if Desktop can't be found
            None => ".".to_string(),
        }
    }

    pub fn get_output_dir(&self) -> String {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => Self::get_default_output_dir(),
        }
    }
}
