//! Tests for the CLI startup sequence and offline runs.
//!
//! Configuration loading, including the interactive "create default config?"
//! prompt, must finish before any progress output starts. Otherwise the
//! prompt is hidden behind the progress bar and the binary appears to hang.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Helper: get a Command for the placescrape binary.
fn placescrape() -> assert_cmd::Command {
    cargo_bin_cmd!("placescrape")
}

/// Helper: copy the shipped config into a temp dir so the binary can find
/// `./config/placescrape.toml` relative to its working directory.
fn setup_config_dir(tmp: &TempDir) {
    let src = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    let dst = tmp.path().join("config");
    fs::create_dir_all(&dst).unwrap();
    fs::copy(src.join("placescrape.toml"), dst.join("placescrape.toml")).unwrap();
}

fn fixture(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Missing config must not hang
// ─────────────────────────────────────────────────────────────────────────────

/// With no config file and a non-TTY stdin (assert_cmd pipes stdin), the
/// binary exits quickly with an error instead of waiting on a prompt.
#[test]
fn test_missing_config_exits_fast_not_hangs() {
    let tmp = TempDir::new().expect("create temp dir");

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("simple_items.html"))
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("--init"));
}

#[test]
fn test_explicit_missing_config_path_reports_path() {
    let tmp = TempDir::new().expect("create temp dir");

    placescrape()
        .current_dir(tmp.path())
        .args(["--config", "elsewhere/custom.toml"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom.toml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// --init
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_init_creates_config_file() {
    let tmp = TempDir::new().expect("create temp dir");

    placescrape()
        .current_dir(tmp.path())
        .arg("--init")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Created default configuration file"));

    let config_path = tmp.path().join("config").join("placescrape.toml");
    assert!(config_path.exists(), "Config file should be created by --init");

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[exposure]"));
    assert!(content.contains("[[fields]]"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument handling
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_target_flags() {
    placescrape()
        .arg("--help")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("--url"))
        .stdout(predicate::str::contains("--html-file"))
        .stdout(predicate::str::contains("--field"));
}

#[test]
fn test_no_target_reports_missing_page() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active page to scrape"));
}

/// A config whose only field is blank stops before the page is resolved, so
/// even an unreadable snapshot path reports the field problem.
#[test]
fn test_blank_fields_fail_before_page_is_opened() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);
    let config_path = tmp.path().join("config").join("placescrape.toml");
    let template = fs::read_to_string(&config_path).unwrap();
    let without_fields = template
        .split("[[fields]]")
        .next()
        .unwrap()
        .to_string();
    fs::write(
        &config_path,
        format!("{}[[fields]]\nname = \"\"\nselector = \"   \"\n", without_fields),
    )
    .unwrap();

    placescrape()
        .current_dir(tmp.path())
        .args(["--html-file", "missing.html"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Add at least one field with a selector."))
        .stderr(predicate::str::contains("No active page to scrape").not());
}

#[test]
fn test_non_http_url_is_rejected() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .args(["--url", "file:///etc/hosts"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("http or https"));
}

#[test]
fn test_malformed_field_is_a_usage_error() {
    placescrape()
        .args(["--field", "no-selector-here"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=SELECTOR"));
}

#[test]
fn test_out_of_range_iterations_rejected() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("simple_items.html"))
        .args(["--iterations", "0"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Iterations must be between 1 and 100"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Offline runs against saved pages
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_html_file_run_writes_csv() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);
    let out = tmp.path().join("out");

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("simple_items.html"))
        .args(["-f", "title=.item .t", "-f", "price=.item .p"])
        .arg("--output-dir")
        .arg(&out)
        .args(["--fallback-delay-ms", "0"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stderr(predicate::str::contains("Items found: 2"));

    let written = fs::read_to_string(out.join("places.csv")).unwrap();
    assert_eq!(written, "title,price\n\"Alpha\",\"$5\"\n\"Beta\",\"$7\"");
}

#[test]
fn test_configured_fields_used_when_none_given() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("maps_results.html"))
        .args(["--output-dir", ".", "-o", "cafes.csv"])
        .args(["--delay-ms", "0", "--strategy", "common_ancestor"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    let written = fs::read_to_string(tmp.path().join("cafes.csv")).unwrap();
    assert!(written.starts_with("name,rating,reviews,category,address\n"));
    assert_eq!(written.lines().count(), 4);
    assert!(written.contains("\"Brew \"\"Lab\"\"\",\"\",\"\""));
}

#[test]
fn test_empty_result_writes_nothing_and_succeeds() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("simple_items.html"))
        .args(["-f", "missing=.nothing-here"])
        .args(["--output-dir", ".", "--fallback-delay-ms", "0"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stderr(predicate::str::contains("No items found"));

    assert!(!tmp.path().join("places.csv").exists());
}

#[test]
fn test_unreadable_html_file_is_no_target() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);

    placescrape()
        .current_dir(tmp.path())
        .args(["--html-file", "does-not-exist.html"])
        .timeout(Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No active page to scrape"));
}

#[test]
fn test_log_file_export() {
    let tmp = TempDir::new().expect("create temp dir");
    setup_config_dir(&tmp);
    let log_path = tmp.path().join("logs").join("run.log");

    placescrape()
        .current_dir(tmp.path())
        .arg("--html-file")
        .arg(fixture("simple_items.html"))
        .args(["-f", "title=.item .t", "--output-dir", ".", "--fallback-delay-ms", "0"])
        .arg("--log-file")
        .arg(&log_path)
        .timeout(Duration::from_secs(10))
        .assert()
        .success();

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Starting scrape of"));
    assert!(log.contains("CSV saved:"));
}
