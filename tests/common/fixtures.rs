use std::path::PathBuf;

use placescrape::page::HtmlSnapshot;

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    std::fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

pub fn snapshot_fixture(relative: &str) -> HtmlSnapshot {
    HtmlSnapshot::from_file(&fixture_path(relative))
        .unwrap_or_else(|e| panic!("Failed to open fixture {}: {}", relative, e))
}
