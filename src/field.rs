//! Field definitions: one named selector per output column.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::scrape::ScrapeError;

/// What a field reads from each matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Text content of the element and its descendants
    Text,
    /// Value of the named attribute, `""` when absent
    Attribute(&'a str),
}

/// A named CSS selector defining one output column.
///
/// A trailing `@attr` on the selector reads that attribute instead of the
/// text, e.g. `a.hfpxzc@href` for the place link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }

    /// Trimmed copy, or `None` when either the name or the selector is blank.
    pub fn trimmed(&self) -> Option<FieldSpec> {
        let name = self.name.trim();
        let selector = self.selector.trim();
        if name.is_empty() || selector.is_empty() {
            return None;
        }
        Some(FieldSpec::new(name, selector))
    }

    /// Split the selector into the CSS part and what to read from each match.
    pub fn query(&self) -> (&str, FieldValue<'_>) {
        if let Some((css, attr)) = self.selector.rsplit_once('@') {
            let css = css.trim_end();
            if !css.is_empty() && is_attribute_name(attr) {
                return (css, FieldValue::Attribute(attr));
            }
        }
        (&self.selector, FieldValue::Text)
    }
}

// An '@' inside a quoted attribute selector (`a[href^="mailto:x@y"]`) is
// followed by quote or bracket characters and stays part of the CSS.
fn is_attribute_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.selector)
    }
}

/// Parses `name=selector`. Only the first `=` separates, so attribute
/// selectors such as `a[href*="/place/"]` survive intact.
impl FromStr for FieldSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, selector) = s
            .split_once('=')
            .ok_or_else(|| format!("Expected NAME=SELECTOR, got '{}'", s))?;
        FieldSpec::new(name, selector)
            .trimmed()
            .ok_or_else(|| format!("Field name and selector cannot be empty: '{}'", s))
    }
}

/// Trim every field and drop the ones with a blank name or selector.
///
/// Order is preserved. Returns `NoFieldsConfigured` when nothing usable remains.
pub fn sanitize_fields<'a, I>(fields: I) -> Result<Vec<FieldSpec>, ScrapeError>
where
    I: IntoIterator<Item = &'a FieldSpec>,
{
    let cleaned: Vec<FieldSpec> = fields.into_iter().filter_map(FieldSpec::trimmed).collect();
    if cleaned.is_empty() {
        return Err(ScrapeError::NoFieldsConfigured);
    }
    Ok(cleaned)
}
