use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only errors and the final summary
    Summary = 1,   // Run start/finish and outcome (default)
    Detailed = 2,  // Exposure target, per-step progress, warnings
    Debug = 3,     // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// User-facing run log with timestamped lines, a progress bar over the
/// scroll cycles, and optional export of every emitted line to a file.
#[derive(Clone)]
pub struct ScrapeLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<Mutex<Option<ProgressBar>>>,
    run_metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<String>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    target: String,
    strategy: String,
    scroll_target: String,
    scroll_cycles: u32,
    items_found: usize,
    output_file: String,
}

impl ScrapeLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(Mutex::new(None)),
            run_metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are shown at every verbosity
        self.print_message("ERROR", message);
    }

    pub fn detail(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("INFO", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", self.get_timestamp(), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Print above an active progress bar so it is not overwritten
        if let Ok(guard) = self.progress_bar.try_lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn get_timestamp(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = now.as_secs();
        let millis = now.subsec_millis();

        let hours = (secs / 3600) % 24;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    // Progress bar over exposure cycles
    pub fn start_progress(&self, total_steps: u64) {
        if self.verbosity == VerbosityLevel::Silent {
            return;
        }

        let pb = ProgressBar::new(total_steps);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Scrolling results...");

        if let Ok(mut guard) = self.progress_bar.lock() {
            *guard = Some(pb);
        }
    }

    pub fn set_progress_position(&self, position: u64) {
        if let Ok(guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(position);
            }
        }
    }

    pub fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress_bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    // Metadata recording
    pub fn record_strategy(&self, strategy: &str) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.strategy = strategy.to_string();
        }
    }

    pub fn record_exposure(&self, scroll_target: &str, cycles: u32) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.scroll_target = scroll_target.to_string();
            metadata.scroll_cycles = cycles;
        }
    }

    pub fn record_output_file(&self, path: &str) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.output_file = path.to_string();
        }
    }

    pub fn items_found(&self) -> usize {
        self.run_metadata
            .lock()
            .map(|metadata| metadata.items_found)
            .unwrap_or(0)
    }

    // Run lifecycle
    pub fn log_run_start(&self, target: &str, field_count: usize) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.start_time = Some(SystemTime::now());
            metadata.target = target.to_string();
        }
        self.info(&format!("Starting scrape of {} ({} fields)", target, field_count));
    }

    pub fn log_run_complete(&self, items_found: usize) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.end_time = Some(SystemTime::now());
            metadata.items_found = items_found;
        }
        self.info(&format!("Scrape finished. Items found: {}", items_found));
    }

    /// Shown at every verbosity: the run produced nothing to save.
    pub fn log_empty_result(&self) {
        self.print_message("WARN", "No items found. Check selectors or scroll the list first.");
    }

    pub fn log_failure(&self, message: &str) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.end_time = Some(SystemTime::now());
        }
        self.error(&format!("Error during scrape: {}", message));
    }

    pub fn log_export_success(&self, path: &str) {
        self.record_output_file(path);
        self.info(&format!("CSV saved: {}", path));
    }

    pub fn print_final_summary(&self) {
        let metadata = match self.run_metadata.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };

        println!("\n=== SCRAPE SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        println!("Target: {}", metadata.target);
        println!("Alignment Strategy: {}", metadata.strategy);
        println!("Scrolled: {} ({} cycles)", metadata.scroll_target, metadata.scroll_cycles);
        println!("Items Found: {}", metadata.items_found);
        if !metadata.output_file.is_empty() {
            println!("Results Exported: {}", metadata.output_file);
        }
        println!("======================\n");
    }

    /// Export all collected logs to the configured file
    pub fn export_logs(&self) -> io::Result<()> {
        let Some(ref log_file_path) = self.log_file_path else {
            return Ok(());
        };
        let Ok(buffer) = self.log_buffer.lock() else {
            return Ok(());
        };

        if let Some(parent) = Path::new(log_file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)?;

        for log_entry in buffer.iter() {
            writeln!(file, "{}", log_entry)?;
        }

        file.flush()
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|buffer| buffer.len()).unwrap_or(0)
    }
}
