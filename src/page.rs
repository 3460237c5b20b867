//! The page a scrape runs against.
//!
//! `PageContext` is the seam between the scrape pipeline and whatever hosts
//! the DOM: a live headless Chrome tab (`browser_pool::ChromePage`) or a
//! static HTML snapshot loaded from disk (`HtmlSnapshot`).

use anyhow::{anyhow, Context, Result};
use scraper::{Html, Selector};
use std::path::Path;

/// Operations the exposer and extractor need from a page.
pub trait PageContext {
    /// Whether an element matching `selector` exists right now.
    fn has_element(&self, selector: &str) -> Result<bool>;

    /// Scroll the first element matching `selector` to its current maximum
    /// scroll extent. Returns `false` when the element is gone.
    fn scroll_element_to_end(&self, selector: &str) -> Result<bool>;

    /// Scroll the whole viewport to the bottom of the document.
    fn scroll_window_to_end(&self) -> Result<()>;

    /// Serialized HTML of the current document.
    fn content(&self) -> Result<String>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// A fixed document with nothing to lazy-load. Scrolling is a no-op.
#[derive(Debug, Clone)]
pub struct HtmlSnapshot {
    html: String,
    source: String,
}

impl HtmlSnapshot {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            source: "inline HTML".to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML snapshot {}", path.display()))?;
        Ok(Self {
            html,
            source: path.display().to_string(),
        })
    }
}

impl PageContext for HtmlSnapshot {
    fn has_element(&self, selector: &str) -> Result<bool> {
        let parsed = Selector::parse(selector)
            .map_err(|e| anyhow!("Invalid selector '{}': {}", selector, e))?;
        let document = Html::parse_document(&self.html);
        let found = document.select(&parsed).next().is_some();
        Ok(found)
    }

    fn scroll_element_to_end(&self, selector: &str) -> Result<bool> {
        self.has_element(selector)
    }

    fn scroll_window_to_end(&self) -> Result<()> {
        Ok(())
    }

    fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}
