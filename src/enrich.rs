//! Translation and summarization enrichment for paper records.
//!
//! Every record is enriched concurrently. Within a record the title and
//! abstract translations run side by side; the summary is generated from the
//! translated abstract, so it waits for that translation and is skipped when
//! it did not succeed. Any provider failure (error, missing credentials,
//! timeout) leaves only the affected field as `None`.

use crate::error::{PipelineError, Result};
use crate::llm::TextGenerator;
use crate::paper::PaperRecord;
use crate::prompts::build_summary_prompt;
use crate::translate::{Translator, DEFAULT_TARGET_LANG};
use futures::future::join_all;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Default deadline for a single provider call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of records enriched at once
pub const DEFAULT_MAX_CONCURRENT_RECORDS: usize = 10;

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// DeepL-style target language code
    pub target_lang: String,
    /// Deadline for each provider call; elapsing counts as a failure
    pub call_timeout: Duration,
    /// Cap on records in flight, `None` for no cap
    pub max_concurrent: Option<usize>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_concurrent: Some(DEFAULT_MAX_CONCURRENT_RECORDS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TitleTranslation,
    AbstractTranslation,
    Summary,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::TitleTranslation => "title translation",
            Stage::AbstractTranslation => "abstract translation",
            Stage::Summary => "summarization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attaches translations and summaries to paper records.
#[derive(Debug, Clone)]
pub struct Enricher<T, G> {
    translator: T,
    generator: G,
    options: EnrichOptions,
}

impl<T, G> Enricher<T, G>
where
    T: Translator + Sync,
    G: TextGenerator + Sync,
{
    pub fn new(translator: T, generator: G, options: EnrichOptions) -> Self {
        Self {
            translator,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &EnrichOptions {
        &self.options
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Enrich all records and return them in input order.
    pub async fn enrich(&self, records: Vec<PaperRecord>) -> Vec<PaperRecord> {
        self.enrich_until(records, std::future::pending()).await
    }

    /// Like [`enrich`](Self::enrich), but stops when `cancel` resolves.
    ///
    /// In-flight provider calls are dropped; each record keeps exactly the
    /// enrichment fields that completed before cancellation.
    pub async fn enrich_until<F>(&self, mut records: Vec<PaperRecord>, cancel: F) -> Vec<PaperRecord>
    where
        F: Future<Output = ()>,
    {
        if records.is_empty() {
            return records;
        }

        let limit = self.options.max_concurrent.unwrap_or(records.len()).max(1);
        info!(
            count = records.len(),
            limit = limit,
            target_lang = %self.options.target_lang,
            "Starting enrichment"
        );

        let semaphore = Semaphore::new(limit);
        let mut cancelled = false;
        {
            let work = join_all(records.iter_mut().map(|record| {
                let semaphore = &semaphore;
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return;
                    };
                    self.enrich_record(record).await;
                }
            }));

            tokio::select! {
                _ = work => {}
                _ = cancel => cancelled = true,
            }
        }

        let count = |f: fn(&PaperRecord) -> bool| records.iter().filter(|&r| f(r)).count();
        let titles = count(|r| r.translated_title.is_some());
        let abstracts = count(|r| r.translated_abstract.is_some());
        let summaries = count(|r| r.summary.is_some());

        if cancelled {
            warn!(titles, abstracts, summaries, "Enrichment cancelled, returning partial results");
        } else {
            info!(
                total = records.len(),
                titles,
                abstracts,
                summaries,
                "Enrichment complete"
            );
        }
        records
    }

    /// Run all stages for one record, writing each field as soon as its
    /// stage completes.
    async fn enrich_record(&self, record: &mut PaperRecord) {
        let PaperRecord {
            external_id,
            title,
            abstract_text,
            translated_title,
            translated_abstract,
            summary,
            ..
        } = record;
        let id: &str = external_id;
        let title: &str = title;
        let abstract_text: &str = abstract_text;
        let target_lang = self.options.target_lang.as_str();

        let title_stage = async {
            if title.is_empty() {
                return;
            }
            let call = self.translator.translate(title, target_lang);
            if let Some(text) = self.run_stage(Stage::TitleTranslation, id, call).await {
                *translated_title = Some(text);
            }
        };

        let abstract_stage = async {
            if abstract_text.is_empty() {
                return;
            }
            let call = self.translator.translate(abstract_text, target_lang);
            if let Some(text) = self.run_stage(Stage::AbstractTranslation, id, call).await {
                *translated_abstract = Some(text);
            }
        };

        tokio::join!(title_stage, abstract_stage);

        let Some(source) = translated_abstract.as_deref().filter(|t| !t.is_empty()) else {
            debug!(id, "No translated abstract, summarization skipped");
            return;
        };
        let prompt = build_summary_prompt(target_lang, source);
        let call = self.generator.generate(&prompt);
        if let Some(text) = self.run_stage(Stage::Summary, id, call).await {
            *summary = Some(text);
        }
    }

    /// Await one provider call under the per-call deadline. Failures are
    /// logged and turned into `None`.
    async fn run_stage<F>(&self, stage: Stage, id: &str, call: F) -> Option<String>
    where
        F: Future<Output = Result<String>>,
    {
        let outcome = match tokio::time::timeout(self.options.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                what: stage.as_str(),
                secs: self.options.call_timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(text) => Some(text),
            Err(e @ PipelineError::NotConfigured(_)) => {
                debug!(id, stage = %stage, error = %e, "Provider not configured, stage skipped");
                None
            }
            Err(e) if e.is_degradable() => {
                warn!(id, stage = %stage, error = %e, "Enrichment stage failed, field left empty");
                None
            }
            Err(e) => {
                // Not a provider outcome; still confined to this field
                error!(id, stage = %stage, error = %e, "Unexpected enrichment error, field left empty");
                None
            }
        }
    }
}
