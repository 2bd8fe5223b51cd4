//! Paper search service: search, optional refinement, enrichment.
//!
//! [`PaperService`] is what both the CLI and the HTTP server drive. It is
//! generic over the two provider traits so tests can plug in mocks;
//! production code uses [`DefaultService`].

use crate::arxiv::ArxivClient;
use crate::config::{validate_max_results, ServiceConfig};
use crate::enrich::{EnrichOptions, Enricher};
use crate::error::{PipelineError, Result};
use crate::llm::{ChatClient, TextGenerator, TokenUsage};
use crate::paper::{PaperRecord, SearchParameters};
use crate::prompts::build_summary_prompt;
use crate::refine::QueryRefiner;
use crate::translate::{DeeplClient, Translator};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

/// Service wired to DeepL and an OpenAI-compatible endpoint
pub type DefaultService = PaperService<Option<DeeplClient>, Option<ChatClient>>;

/// Result of a standalone translation.
///
/// On failure the original text comes back with `success = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOutcome {
    pub translated_text: String,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct PaperService<T, G> {
    arxiv: ArxivClient,
    enricher: Enricher<T, G>,
    refiner: QueryRefiner<G>,
}

impl DefaultService {
    /// Build the service from validated configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;

        let arxiv = ArxivClient::new(&config.arxiv_base_url, config.request_timeout())?;
        let translator = config.deepl_client()?;
        let generator = config.chat_client()?;

        info!(
            arxiv = %config.arxiv_base_url,
            translation = translator.is_some(),
            text_generation = generator.is_some(),
            target_lang = %config.target_lang,
            "Paper service configured"
        );

        let options = EnrichOptions {
            target_lang: config.target_lang.clone(),
            call_timeout: config.request_timeout(),
            max_concurrent: Some(config.max_concurrent_records),
        };
        Ok(Self::new(arxiv, translator, generator, options))
    }

    /// Tokens used by the text-generation provider so far.
    pub fn token_usage(&self) -> TokenUsage {
        self.enricher
            .generator()
            .as_ref()
            .map(ChatClient::usage)
            .unwrap_or_default()
    }
}

impl<T, G> PaperService<T, G>
where
    T: Translator + Sync,
    G: TextGenerator + Clone + Sync,
{
    pub fn new(arxiv: ArxivClient, translator: T, generator: G, options: EnrichOptions) -> Self {
        let refiner = QueryRefiner::new(generator.clone(), options.call_timeout);
        Self {
            arxiv,
            enricher: Enricher::new(translator, generator, options),
            refiner,
        }
    }

    /// Structured search. Enrichment runs only when `translate` is set.
    pub async fn search(&self, params: &SearchParameters, translate: bool) -> Result<Vec<PaperRecord>> {
        self.search_until(params, translate, std::future::pending()).await
    }

    /// Like [`search`](Self::search); `cancel` stops enrichment early and
    /// the records come back with whatever completed.
    pub async fn search_until<F>(
        &self,
        params: &SearchParameters,
        translate: bool,
        cancel: F,
    ) -> Result<Vec<PaperRecord>>
    where
        F: Future<Output = ()>,
    {
        validate_max_results(params.max_results)?;

        let records = self.arxiv.search(params).await?;
        if !translate || records.is_empty() {
            return Ok(records);
        }
        Ok(self.enricher.enrich_until(records, cancel).await)
    }

    /// Free-text search: refine into parameters, then search with
    /// enrichment. `fallback` is used for anything refinement cannot supply.
    pub async fn search_natural(&self, free_text: &str, fallback: &SearchParameters) -> Result<Vec<PaperRecord>> {
        self.search_natural_until(free_text, fallback, std::future::pending())
            .await
    }

    pub async fn search_natural_until<F>(
        &self,
        free_text: &str,
        fallback: &SearchParameters,
        cancel: F,
    ) -> Result<Vec<PaperRecord>>
    where
        F: Future<Output = ()>,
    {
        let params = self.refiner.refine(free_text, fallback).await;
        self.search_until(&params, true, cancel).await
    }

    /// Translate one piece of text. Never fails: any provider problem
    /// passes the input through unchanged.
    pub async fn translate_text(&self, text: &str) -> TranslationOutcome {
        let target_lang = self.enricher.options().target_lang.as_str();
        let call = self.enricher.translator().translate(text, target_lang);

        match tokio::time::timeout(self.enricher.options().call_timeout, call).await {
            Ok(Ok(translated_text)) => TranslationOutcome {
                translated_text,
                success: true,
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Translation failed, returning original text");
                TranslationOutcome {
                    translated_text: text.to_string(),
                    success: false,
                }
            }
            Err(_) => {
                warn!("Translation timed out, returning original text");
                TranslationOutcome {
                    translated_text: text.to_string(),
                    success: false,
                }
            }
        }
    }

    /// Summarize one piece of text in the target language.
    ///
    /// Unlike the pipeline, errors (including a missing provider) are
    /// returned to the caller.
    pub async fn summarize_text(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(PipelineError::Validation("text must not be empty".to_string()));
        }

        let options = self.enricher.options();
        let prompt = build_summary_prompt(&options.target_lang, text);
        tokio::time::timeout(options.call_timeout, self.enricher.generator().generate(&prompt))
            .await
            .map_err(|_| PipelineError::Timeout {
                what: "summarization",
                secs: options.call_timeout.as_secs(),
            })?
    }
}
