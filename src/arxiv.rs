//! arXiv API client
//!
//! Sends one query to the export API and hands the Atom reply to the feed
//! parser. A reply with a non-success status is not an error here: the
//! search simply produced no records.

use crate::error::{PipelineError, Result};
use crate::feed::parse_feed;
use crate::paper::{PaperRecord, SearchParameters};
use crate::query::{build_request_params, current_year};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Public arXiv export API
pub const ARXIV_API_BASE: &str = "http://export.arxiv.org/api/query";

/// Client for the arXiv export API
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rustarxiv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// Run a search and return the parsed, year-filtered records in feed
    /// order.
    ///
    /// Transport failures surface as [`PipelineError::Network`]; a reply
    /// that is not a well-formed feed as [`PipelineError::Feed`].
    pub async fn search(&self, params: &SearchParameters) -> Result<Vec<PaperRecord>> {
        let query = build_request_params(params, current_year());
        info!(
            endpoint = %self.base_url,
            search_query = %query[0].1,
            max_results = params.max_results,
            "Starting arXiv query"
        );

        let response = self.http.get(&self.base_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "arXiv API returned non-success status, no results");
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "arXiv feed received");

        let records = parse_feed(&body, &params.year_bounds())?;
        info!(count = records.len(), "arXiv query complete");
        Ok(records)
    }
}
