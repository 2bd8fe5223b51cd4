//! Request-scoped data model shared by the search and enrichment stages.

use serde::{Deserialize, Serialize};

/// Default number of results requested from the index
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// A single paper from the index, optionally enriched.
///
/// The core fields are always present (empty string when the feed omitted
/// them). The three enrichment fields are `None` until the matching stage
/// succeeds; `Some(String::new())` means the provider answered with nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Identifier assigned by the index (e.g. `2108.09112`)
    #[serde(rename = "id")]
    pub external_id: String,
    pub title: String,
    /// Display names joined with `", "`, feed order preserved
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Publication year, empty when undetermined
    pub year: String,
    pub url: String,
    /// Primary category code
    pub genre: String,
    pub translated_title: Option<String>,
    pub translated_abstract: Option<String>,
    pub summary: Option<String>,
}

impl PaperRecord {
    /// Whether any enrichment stage has written to this record.
    pub fn is_enriched(&self) -> bool {
        self.translated_title.is_some() || self.translated_abstract.is_some() || self.summary.is_some()
    }
}

/// Structured search input, either from the caller or from the refiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default, alias = "genre")]
    pub category: Option<String>,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            keyword: None,
            category: None,
            year_from: None,
            year_to: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchParameters {
    /// Search by keyword only.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    /// Year bounds used by the feed parser's second-pass filter.
    pub fn year_bounds(&self) -> YearBounds {
        YearBounds {
            from: self.year_from,
            to: self.year_to,
        }
    }
}

/// Inclusive year range; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearBounds {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl YearBounds {
    /// No filtering at all.
    pub const UNBOUNDED: YearBounds = YearBounds { from: None, to: None };

    pub fn contains(&self, year: i32) -> bool {
        self.from.map_or(true, |from| year >= from) && self.to.map_or(true, |to| year <= to)
    }
}
