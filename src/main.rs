use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use placescrape::browser_pool::ChromePage;
use placescrape::cli::{Cli, Target};
use placescrape::config::{self, AppConfig};
use placescrape::export;
use placescrape::field::sanitize_fields;
use placescrape::logger::{ScrapeLogger, VerbosityLevel};
use placescrape::page::{HtmlSnapshot, PageContext};
use placescrape::{run_scrape, ScrapeError, ScrapeOutcome, ThreadPause};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config(Path::new(config::CONFIG_PATH)) {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize fields and selectors, then run placescrape again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Load configuration (prompting must finish before any progress output)
    let mut app_config = match AppConfig::load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            match AppConfig::prompt_create_config(&path) {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize fields and selectors, then run placescrape again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    init_tracing(cli.verbose);
    let logger = match &cli.log_file {
        Some(log_file_path) => ScrapeLogger::with_log_file(verbosity, log_file_path.clone()),
        None => ScrapeLogger::new(verbosity),
    };

    if let Err(e) = cli.validate() {
        logger.error(&format!("Invalid arguments: {}", e));
        std::process::exit(1);
    }

    cli.apply_overrides(&mut app_config);
    if let Err(e) = app_config.validate() {
        logger.error(&format!("Configuration error: {}", e));
        std::process::exit(1);
    }

    // No usable field means the run never starts: no browser, no navigation
    if let Err(e) = sanitize_fields(&app_config.fields) {
        logger.log_failure(&e.to_string());
        finish_logs(&logger);
        std::process::exit(1);
    }

    let target = match cli.target() {
        Ok(target) => target,
        Err(message) => {
            logger.log_failure(&ScrapeError::NoTargetContext(message).to_string());
            finish_logs(&logger);
            std::process::exit(1);
        }
    };

    // headless_chrome is blocking; the whole run stays on one blocking thread
    let run_config = app_config.clone();
    let run_logger = logger.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let page = open_target(&target, &run_config)?;
        run_scrape(
            page.as_ref(),
            &run_config.fields,
            &run_config,
            &ThreadPause,
            &run_logger,
        )
    })
    .await
    .map_err(|e| ScrapeError::ExecutionFailure(format!("Scrape task panicked: {}", e)))
    .and_then(|result| result);

    let exit_code = match outcome {
        Ok(ScrapeOutcome::Download { download, results, .. }) => {
            let output_dir = cli.get_output_dir();
            match download.save(Path::new(&output_dir)) {
                Ok(path) => {
                    logger.log_export_success(&path.display().to_string());
                    if verbosity > VerbosityLevel::Silent && std::io::stdout().is_terminal() {
                        export::print_scrape_summary(&results);
                    }
                    0
                }
                Err(e) => {
                    logger.log_failure(&format!("{:#}", e));
                    1
                }
            }
        }
        // A diagnostic, not a failure: nothing is written
        Ok(ScrapeOutcome::Empty { .. }) => 0,
        Err(e) => {
            logger.log_failure(&e.to_string());
            1
        }
    };

    if verbosity > VerbosityLevel::Silent && exit_code == 0 {
        logger.print_final_summary();
    }
    finish_logs(&logger);
    std::process::exit(exit_code);
}

/// Resolve the execution context. Any failure here happens before exposure starts.
fn open_target(target: &Target, config: &AppConfig) -> Result<Box<dyn PageContext>, ScrapeError> {
    match target {
        Target::Url(url) => ChromePage::open(url.as_str(), &config.browser)
            .map(|page| Box::new(page) as Box<dyn PageContext>)
            .map_err(|e| ScrapeError::NoTargetContext(format!("{:#}", e))),
        Target::HtmlFile(path) => HtmlSnapshot::from_file(path)
            .map(|page| Box::new(page) as Box<dyn PageContext>)
            .map_err(|e| ScrapeError::NoTargetContext(format!("{:#}", e))),
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = if verbose >= 2 { "placescrape=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn finish_logs(logger: &ScrapeLogger) {
    if logger.is_log_export_enabled() {
        if let Err(e) = logger.export_logs() {
            eprintln!("❌ Failed to write log file: {}", e);
        }
    }
}
