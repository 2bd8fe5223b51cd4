//! arXiv query construction.
//!
//! Turns [`SearchParameters`] into the index's field-qualified boolean
//! syntax plus the fixed request parameters (no paging, newest first).

use crate::paper::SearchParameters;
use chrono::{Datelike, Local};

/// Query used when no clause applies
pub const WILDCARD_QUERY: &str = "all:*";

/// Fixed sort field
const SORT_BY: &str = "submittedDate";

/// Fixed sort order
const SORT_ORDER: &str = "descending";

/// Build the `search_query` value.
///
/// Clauses are joined with ` AND ` in the order keyword, category, date.
/// A date clause is emitted only when `year_from` is set; a missing
/// `year_to` is replaced by `current_year`. Empty strings count as absent.
pub fn build_search_query(params: &SearchParameters, current_year: i32) -> String {
    let mut clauses = Vec::with_capacity(3);

    if let Some(keyword) = non_empty(params.keyword.as_deref()) {
        clauses.push(format!("all:{}", keyword));
    }

    if let Some(category) = non_empty(params.category.as_deref()) {
        clauses.push(format!("cat:{}", category));
    }

    if let Some(from) = params.year_from {
        let to = params.year_to.unwrap_or(current_year);
        clauses.push(format!("submittedDate:[{} TO {}]", from, to));
    }

    if clauses.is_empty() {
        WILDCARD_QUERY.to_string()
    } else {
        clauses.join(" AND ")
    }
}

/// Full parameter list for one index request.
pub fn build_request_params(params: &SearchParameters, current_year: i32) -> Vec<(&'static str, String)> {
    vec![
        ("search_query", build_search_query(params, current_year)),
        ("start", "0".to_string()),
        ("max_results", params.max_results.to_string()),
        ("sortBy", SORT_BY.to_string()),
        ("sortOrder", SORT_ORDER.to_string()),
    ]
}

/// Current calendar year in local time.
pub fn current_year() -> i32 {
    Local::now().year()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
