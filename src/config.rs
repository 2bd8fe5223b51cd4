//! Service configuration.
//!
//! Missing provider credentials are not an error: the provider is simply
//! `None` and every stage that needs it is skipped.

use crate::arxiv::ARXIV_API_BASE;
use crate::enrich::DEFAULT_MAX_CONCURRENT_RECORDS;
use crate::error::{PipelineError, Result};
use crate::llm::{ChatClient, LlmConfig};
use crate::paper::DEFAULT_MAX_RESULTS;
use crate::translate::{DeeplClient, DEFAULT_TARGET_LANG};
use std::time::Duration;
use url::Url;

/// Largest page the index serves in one request
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Default HTTP and per-call deadline
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// DeepL credentials
#[derive(Clone)]
pub struct DeeplConfig {
    pub api_key: String,
    /// Overrides the endpoint picked from the key tier
    pub base_url: Option<String>,
}

impl std::fmt::Debug for DeeplConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeeplConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything needed to build a [`PaperService`](crate::service::PaperService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub arxiv_base_url: String,
    pub target_lang: String,
    /// Default page size for searches that do not name one
    pub max_results: usize,
    pub request_timeout_secs: u64,
    pub max_concurrent_records: usize,
    pub deepl: Option<DeeplConfig>,
    pub llm: Option<LlmConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            arxiv_base_url: ARXIV_API_BASE.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrent_records: DEFAULT_MAX_CONCURRENT_RECORDS,
            deepl: None,
            llm: None,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject values no search could run with.
    pub fn validate(&self) -> Result<()> {
        check_url("arXiv API URL", &self.arxiv_base_url)?;

        if let Some(deepl) = &self.deepl {
            if let Some(base_url) = &deepl.base_url {
                check_url("DeepL API URL", base_url)?;
            }
        }

        if let Some(llm) = &self.llm {
            check_url("LLM base URL", &llm.base_url)?;
            if llm.model.trim().is_empty() {
                return Err(PipelineError::Config("LLM model must not be empty".to_string()));
            }
        }

        validate_max_results(self.max_results).map_err(|e| PipelineError::Config(e.to_string()))?;

        if self.request_timeout_secs == 0 {
            return Err(PipelineError::Config("request timeout must be at least 1 second".to_string()));
        }

        if self.max_concurrent_records == 0 {
            return Err(PipelineError::Config("max concurrent records must be at least 1".to_string()));
        }

        if self.target_lang.trim().is_empty() {
            return Err(PipelineError::Config("target language must not be empty".to_string()));
        }

        Ok(())
    }

    /// DeepL client, or `None` when no key is configured.
    pub fn deepl_client(&self) -> Result<Option<DeeplClient>> {
        match &self.deepl {
            Some(deepl) if !deepl.api_key.trim().is_empty() => Ok(Some(DeeplClient::new(
                &deepl.api_key,
                deepl.base_url.as_deref(),
                self.request_timeout(),
            )?)),
            _ => Ok(None),
        }
    }

    /// Chat-completions client, or `None` when no key is configured.
    pub fn chat_client(&self) -> Result<Option<ChatClient>> {
        match &self.llm {
            Some(llm) if !llm.api_key.trim().is_empty() => {
                Ok(Some(ChatClient::new(llm.clone(), self.request_timeout())?))
            }
            _ => Ok(None),
        }
    }
}

/// Page sizes the index accepts.
pub fn validate_max_results(max_results: usize) -> Result<()> {
    if (1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        Ok(())
    } else {
        Err(PipelineError::Validation(format!(
            "max_results must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, max_results
        )))
    }
}

fn check_url(what: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| PipelineError::Config(format!("invalid {} '{}': {}", what, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PipelineError::Config(format!("{} must be http(s), got scheme '{}'", what, other))),
    }
}
