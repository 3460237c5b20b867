//! Turning independent per-field selector matches into rows.
//!
//! Every field selector is run against the whole document on its own, so
//! fields can match different numbers of elements. `AlignmentStrategy`
//! decides how those match lists become rows:
//!
//! - `Positional` pairs the i-th match of every field into row i. The row
//!   count is the largest match count; shorter fields contribute `""` for
//!   the missing positions. This is only correct when every field matches
//!   exactly once per row, in row order. A field that skips a row shifts
//!   every later value of that field into the wrong row, silently.
//! - `CommonAncestor` assigns each match to the result card containing it
//!   (the child of the lowest common ancestor of all matches), so a missing
//!   field leaves a blank in its own row instead of shifting the rest.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::config::ExtractionConfig;
use crate::field::{FieldSpec, FieldValue};
use crate::page::PageContext;
use crate::record::{Record, ResultSet};
use crate::scrape::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStrategy {
    /// Row i holds the i-th match of every field
    #[default]
    Positional,
    /// Rows are the distinct children of the matches' lowest common ancestor
    CommonAncestor,
}

impl AlignmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentStrategy::Positional => "positional",
            AlignmentStrategy::CommonAncestor => "common_ancestor",
        }
    }
}

impl std::str::FromStr for AlignmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positional" => Ok(AlignmentStrategy::Positional),
            "common_ancestor" | "common-ancestor" => Ok(AlignmentStrategy::CommonAncestor),
            other => Err(format!(
                "Unknown strategy '{}' (expected 'positional' or 'common_ancestor')",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    strategy: AlignmentStrategy,
    normalize_whitespace: bool,
    ascii_only: bool,
    max_records: Option<usize>,
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            strategy: config.strategy,
            normalize_whitespace: config.normalize_whitespace,
            ascii_only: config.ascii_only,
            max_records: config.record_limit(),
        }
    }

    pub fn with_strategy(mut self, strategy: AlignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> AlignmentStrategy {
        self.strategy
    }

    /// Snapshot the page and extract rows from it.
    pub fn extract(
        &self,
        page: &dyn PageContext,
        fields: &[FieldSpec],
    ) -> Result<ResultSet, ScrapeError> {
        let html = page
            .content()
            .map_err(|e| ScrapeError::ExecutionFailure(format!("{:#}", e)))?;
        self.extract_html(&html, fields)
    }

    /// Extract rows from serialized HTML. Read-only; never mutates the input.
    pub fn extract_html(&self, html: &str, fields: &[FieldSpec]) -> Result<ResultSet, ScrapeError> {
        // Compile everything first so a bad selector fails before any matching
        let selectors = compile_selectors(fields)?;
        let reads: Vec<FieldValue<'_>> = fields.iter().map(|field| field.query().1).collect();
        let document = Html::parse_document(html);

        let matches: Vec<Vec<ElementRef<'_>>> = selectors
            .iter()
            .map(|selector| document.select(selector).collect())
            .collect();

        for (field, found) in fields.iter().zip(&matches) {
            debug!("Field '{}' ({}) matched {} elements", field.name, field.selector, found.len());
        }

        let mut results = match self.strategy {
            AlignmentStrategy::Positional => self.align_positional(fields, &reads, &matches),
            AlignmentStrategy::CommonAncestor => {
                self.align_common_ancestor(&document, fields, &reads, &matches)
            }
        };

        if let Some(limit) = self.max_records {
            if results.len() > limit {
                debug!("Truncating {} rows to max_records = {}", results.len(), limit);
                results.truncate(limit);
            }
        }

        Ok(results)
    }

    fn align_positional(
        &self,
        fields: &[FieldSpec],
        reads: &[FieldValue<'_>],
        matches: &[Vec<ElementRef<'_>>],
    ) -> ResultSet {
        // Empty domain (no fields) or no matches at all both mean zero rows
        let max_len = matches.iter().map(Vec::len).max().unwrap_or(0);

        let records = (0..max_len)
            .map(|i| {
                let mut record = Record::new();
                for ((field, read), found) in fields.iter().zip(reads).zip(matches) {
                    let value = found
                        .get(i)
                        .map(|el| self.element_value(el, *read))
                        .unwrap_or_default();
                    record.insert(&field.name, value);
                }
                record
            })
            .collect();

        ResultSet::new(records)
    }

    fn align_common_ancestor(
        &self,
        document: &Html,
        fields: &[FieldSpec],
        reads: &[FieldValue<'_>],
        matches: &[Vec<ElementRef<'_>>],
    ) -> ResultSet {
        // Root-to-element id path for every match, grouped per field
        let paths: Vec<Vec<Vec<_>>> = matches
            .iter()
            .map(|found| {
                found
                    .iter()
                    .map(|el| {
                        let mut path: Vec<_> = el.ancestors().map(|node| node.id()).collect();
                        path.reverse();
                        path.push(el.id());
                        path
                    })
                    .collect()
            })
            .collect();

        let mut all_paths = paths.iter().flatten();
        let Some(first) = all_paths.next() else {
            return ResultSet::default();
        };

        // Length of the prefix every path shares; its last id is the list container
        let shared = all_paths.fold(first.len(), |depth, path| {
            depth.min(first.iter().zip(path).take_while(|(a, b)| a == b).count())
        });
        let container_id = first[shared - 1];

        let child_order: HashMap<_, usize> = document
            .tree
            .get(container_id)
            .map(|container| {
                container
                    .children()
                    .enumerate()
                    .map(|(i, child)| (child.id(), i))
                    .collect()
            })
            .unwrap_or_default();

        // row position -> one slot per field, first match in the row wins
        let mut rows: BTreeMap<usize, Vec<Option<String>>> = BTreeMap::new();
        for (field_idx, (found, field_paths)) in matches.iter().zip(&paths).enumerate() {
            for (el, path) in found.iter().zip(field_paths) {
                // A match that is the container itself belongs to the first row
                let position = path
                    .get(shared)
                    .and_then(|row_id| child_order.get(row_id).copied())
                    .unwrap_or(0);
                let slots = rows
                    .entry(position)
                    .or_insert_with(|| vec![None; fields.len()]);
                if slots[field_idx].is_none() {
                    slots[field_idx] = Some(self.element_value(el, reads[field_idx]));
                }
            }
        }

        let records = rows
            .into_values()
            .map(|slots| {
                let mut record = Record::new();
                for (field, value) in fields.iter().zip(slots) {
                    record.insert(&field.name, value.unwrap_or_default());
                }
                record
            })
            .collect();

        ResultSet::new(records)
    }

    fn element_value(&self, el: &ElementRef<'_>, read: FieldValue<'_>) -> String {
        let raw: String = match read {
            FieldValue::Text => el.text().collect(),
            FieldValue::Attribute(name) => el.value().attr(name).unwrap_or_default().to_string(),
        };
        self.clean(raw)
    }

    /// Trim, then optionally drop non-ASCII symbols and collapse whitespace.
    fn clean(&self, raw: String) -> String {
        let text = if self.ascii_only {
            raw.chars().filter(char::is_ascii).collect::<String>()
        } else {
            raw
        };
        if self.normalize_whitespace {
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            text.trim().to_string()
        }
    }
}

fn compile_selectors(fields: &[FieldSpec]) -> Result<Vec<Selector>, ScrapeError> {
    fields
        .iter()
        .map(|field| {
            Selector::parse(field.query().0).map_err(|e| ScrapeError::InvalidSelector {
                field: field.name.clone(),
                selector: field.selector.clone(),
                error: e.to_string(),
            })
        })
        .collect()
}
