//! Configuration management for placescrape
//!
//! All configuration is loaded from `./config/placescrape.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the config template.

use serde::Deserialize;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::extractor::AlignmentStrategy;
use crate::field::FieldSpec;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/placescrape.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/placescrape.toml");

/// Upper bound on scroll+wait cycles. Exposure must always terminate.
pub const MAX_SCROLL_ITERATIONS: u32 = 100;

/// Upper bound on any single exposure delay (milliseconds).
pub const MAX_DELAY_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid selector in '{field}': {error}\n  Selector: {selector}")]
    InvalidSelector {
        field: String,
        selector: String,
        error: String,
    },

    #[error("Configuration field '{field}' is {value}, must be between {min} and {max}")]
    OutOfRange {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    pub exposure: ExposureConfig,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// Headless Chrome settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Wait after navigation before exposure starts (milliseconds)
    pub navigation_settle_ms: u64,
}

/// Scroll budget for forcing the results list to render
#[derive(Debug, Clone, Deserialize)]
pub struct ExposureConfig {
    /// Scrollable results container; the whole page is scrolled when absent
    pub container_selector: String,
    /// Scroll+wait cycles against the container
    pub iterations: u32,
    /// Wait after each container scroll (milliseconds)
    pub delay_ms: u64,
    /// Single wait after the whole-page fallback scroll (milliseconds)
    pub fallback_delay_ms: u64,
}

/// How field matches become rows
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: AlignmentStrategy,
    /// Collapse internal whitespace runs into a single space
    #[serde(default)]
    pub normalize_whitespace: bool,
    /// Drop non-ASCII symbols (icon glyphs, separators) from values
    #[serde(default)]
    pub ascii_only: bool,
    /// Keep at most this many rows (0 = unlimited)
    #[serde(default)]
    pub max_records: usize,
}

impl ExtractionConfig {
    pub fn record_limit(&self) -> Option<usize> {
        if self.max_records == 0 {
            None
        } else {
            Some(self.max_records)
        }
    }
}

/// Output artifact settings
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub filename: String,
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded template, parsed. Always valid.
    pub fn builtin() -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "browser.user_agent".to_string(),
            });
        }

        if self.exposure.container_selector.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "exposure.container_selector".to_string(),
            });
        }
        validate_selector("exposure.container_selector", &self.exposure.container_selector)?;

        validate_range(
            "exposure.iterations",
            self.exposure.iterations as u64,
            1,
            MAX_SCROLL_ITERATIONS as u64,
        )?;
        // A zero delay is allowed: scroll and read back immediately
        validate_range("exposure.delay_ms", self.exposure.delay_ms, 0, MAX_DELAY_MS)?;
        validate_range(
            "exposure.fallback_delay_ms",
            self.exposure.fallback_delay_ms,
            0,
            MAX_DELAY_MS,
        )?;

        if self.output.filename.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "output.filename".to_string(),
            });
        }

        // Blank fields are dropped at run time; a present selector must still compile
        for (i, field) in self.fields.iter().enumerate() {
            if let Some(field) = field.trimmed() {
                validate_selector(&format!("fields[{}].selector", i), field.query().0)?;
            }
        }

        Ok(())
    }

    /// Create default configuration file at the given location
    pub fn create_default_config(path: &Path) -> Result<PathBuf, ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal()
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config(path: &Path) -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config(path)?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}

fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    scraper::Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
        error: e.to_string(),
    })?;
    Ok(())
}

fn validate_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_CONFIG: &str = r#"
[browser]
headless = true
user_agent = "test/1.0"
window_width = 800
window_height = 600
navigation_settle_ms = 0

[exposure]
container_selector = "div[role='feed']"
iterations = 3
delay_ms = 10
fallback_delay_ms = 20

[extraction]

[output]
filename = "out.csv"
"#;

    #[test]
    fn test_default_config_parses() {
        let config: Result<AppConfig, _> = toml::from_str(DEFAULT_CONFIG);
        assert!(config.is_ok(), "Default config should parse: {:?}", config.err());
    }

    #[test]
    fn test_default_config_validates() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.validate().is_ok(), "Default config should validate");
    }

    #[test]
    fn test_default_config_carries_observed_constants() {
        let config = AppConfig::builtin().unwrap();
        assert_eq!(config.exposure.iterations, 8);
        assert_eq!(config.exposure.delay_ms, 600);
        assert_eq!(config.exposure.fallback_delay_ms, 1200);
        assert_eq!(config.output.filename, "places.csv");
        assert_eq!(config.extraction.strategy, AlignmentStrategy::Positional);
        assert_eq!(config.extraction.record_limit(), None);

        let names: Vec<&str> = config.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "rating", "reviews", "category", "address"]);
    }

    #[test]
    fn test_extraction_section_defaults() {
        let config: AppConfig = toml::from_str(MINIMAL_CONFIG).expect("Config should parse");
        assert_eq!(config.extraction.strategy, AlignmentStrategy::Positional);
        assert!(!config.extraction.normalize_whitespace);
        assert_eq!(config.extraction.max_records, 0);
        assert!(config.fields.is_empty(), "fields should default to empty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_parses_snake_case() {
        let with_strategy = MINIMAL_CONFIG.replace(
            "[extraction]\n",
            "[extraction]\nstrategy = \"common_ancestor\"\nmax_records = 25\n",
        );
        let config: AppConfig = toml::from_str(&with_strategy).unwrap();
        assert_eq!(config.extraction.strategy, AlignmentStrategy::CommonAncestor);
        assert_eq!(config.extraction.record_limit(), Some(25));
    }

    #[test]
    fn test_iteration_budget_must_be_bounded() {
        let mut config: AppConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.exposure.iterations = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        config.exposure.iterations = MAX_SCROLL_ITERATIONS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        config.exposure.iterations = MAX_SCROLL_ITERATIONS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_delays_allow_zero_but_stay_bounded() {
        let mut config: AppConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.exposure.delay_ms = 0;
        config.exposure.fallback_delay_ms = 0;
        assert!(config.validate().is_ok());

        config.exposure.delay_ms = MAX_DELAY_MS + 1;
        match config.validate() {
            Err(ConfigError::OutOfRange { field, min, .. }) => {
                assert_eq!(field, "exposure.delay_ms");
                assert_eq!(min, 0);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }

        config.exposure.delay_ms = MAX_DELAY_MS;
        config.exposure.fallback_delay_ms = 60_001;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_invalid_selectors_rejected() {
        let mut config: AppConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.exposure.container_selector = "div[".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSelector { .. })));

        let mut config: AppConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.fields = vec![FieldSpec::new("name", ".ok"), FieldSpec::new("bad", "..x")];
        match config.validate() {
            Err(ConfigError::InvalidSelector { field, .. }) => assert_eq!(field, "fields[1].selector"),
            other => panic!("expected InvalidSelector, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_fields_are_not_config_errors() {
        let mut config: AppConfig = toml::from_str(MINIMAL_CONFIG).unwrap();
        config.fields = vec![FieldSpec::new("", ""), FieldSpec::new("name", ".ok")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nope.toml");
        assert!(matches!(
            AppConfig::load_from_path(&path),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_create_default_config_round_trips() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config").join("placescrape.toml");
        let written = AppConfig::create_default_config(&path).unwrap();
        assert_eq!(written, path);
        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.fields.len(), 5);
    }
}
