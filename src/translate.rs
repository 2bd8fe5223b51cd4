//! Translation provider boundary and the DeepL client behind it.

use crate::error::{PipelineError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// DeepL endpoint for free-tier keys
pub const DEEPL_FREE_API: &str = "https://api-free.deepl.com";

/// DeepL endpoint for paid keys
pub const DEEPL_PRO_API: &str = "https://api.deepl.com";

/// Default target language
pub const DEFAULT_TARGET_LANG: &str = "JA";

/// Something that can translate text into a target language.
///
/// Implemented by [`DeeplClient`] for production; mock implementations are
/// used in tests. `Option<T>` stands for a provider that may be unconfigured.
pub trait Translator {
    fn translate(&self, text: &str, target_lang: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<T: Translator + Sync> Translator for Option<T> {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        match self {
            Some(inner) => inner.translate(text, target_lang).await,
            None => Err(PipelineError::NotConfigured("translation")),
        }
    }
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// DeepL REST client
#[derive(Debug, Clone)]
pub struct DeeplClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

impl DeeplClient {
    /// Create a client. Without an explicit `base_url` the endpoint is
    /// chosen from the key: free-tier keys end in `:fx`.
    pub fn new(api_key: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(PipelineError::NotConfigured("translation"));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: ApiKey(api_key.to_string()),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| default_endpoint(api_key).to_string()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Endpoint matching the key's tier
pub fn default_endpoint(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        DEEPL_FREE_API
    } else {
        DEEPL_PRO_API
    }
}

impl Translator for DeeplClient {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let url = format!("{}/v2/translate", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key.0))
            .json(&TranslateRequest {
                text: [text],
                target_lang,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "DeepL API error");
            return Err(PipelineError::Api {
                code: status.as_u16(),
                message: format!("DeepL API error: {} - {}", status, error_text),
            });
        }

        let body: TranslateResponse = response.json().await?;
        let translation = body.translations.into_iter().next().ok_or_else(|| PipelineError::Api {
            code: status.as_u16(),
            message: "DeepL returned no translations".to_string(),
        })?;

        debug!(
            source = ?translation.detected_source_language,
            target = target_lang,
            chars = text.chars().count(),
            "Translated text"
        );
        Ok(translation.text)
    }
}
