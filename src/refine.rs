//! Free-text query refinement.
//!
//! A text-generation provider is asked to pull search terms out of a
//! natural-language request and answer with a JSON object. Whatever it
//! says, refinement never fails: an unusable reply (or no provider at all)
//! means the caller's own parameters are used unchanged.

use crate::error::PipelineError;
use crate::llm::TextGenerator;
use crate::paper::SearchParameters;
use crate::prompts::build_refinement_prompt;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Additional keywords appended to the main keyword
pub const MAX_EXTRA_KEYWORDS: usize = 2;

/// Structured terms extracted from a free-text request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinedQuery {
    /// Empty when the reply named no main keyword
    pub main_keyword: String,
    pub additional_keywords: Vec<String>,
    pub category: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl RefinedQuery {
    /// Fold into search parameters, taking anything the reply left out from
    /// `fallback`.
    pub fn into_parameters(self, fallback: &SearchParameters) -> SearchParameters {
        let main = Some(self.main_keyword)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| fallback.keyword.clone());

        let parts: Vec<String> = main
            .into_iter()
            .chain(self.additional_keywords.into_iter().take(MAX_EXTRA_KEYWORDS))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        SearchParameters {
            keyword: (!parts.is_empty()).then(|| parts.join(" ")),
            category: self.category.or_else(|| fallback.category.clone()),
            year_from: self.year_from.or(fallback.year_from),
            year_to: self.year_to.or(fallback.year_to),
            max_results: fallback.max_results,
        }
    }
}

fn json_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy on purpose: spans from the first `{` to the last `}`
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap_or_else(|_| unreachable!("static pattern")))
}

/// Parse a provider reply. Returns `None` when the reply holds no JSON
/// object or the object does not parse.
pub fn parse_refinement(reply: &str) -> Option<RefinedQuery> {
    let span = json_span().find(reply)?;
    let object = match serde_json::from_str::<Value>(span.as_str()) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return None,
        Err(e) => {
            debug!(error = %e, "Refinement reply is not valid JSON");
            return None;
        }
    };

    let (year_from, year_to) = year_range(&object);

    Some(RefinedQuery {
        main_keyword: object
            .get("main_keywords")
            .or_else(|| object.get("main_keyword"))
            .map(keyword_list)
            .map(|words| words.join(" "))
            .unwrap_or_default(),
        additional_keywords: object.get("additional_keywords").map(keyword_list).unwrap_or_default(),
        category: object
            .get("category")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
        year_from,
        year_to,
    })
}

/// Strings from a string or an array of strings/numbers
fn keyword_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn year_range(object: &Map<String, Value>) -> (Option<i32>, Option<i32>) {
    let Some(Value::Array(items)) = object.get("year_range") else {
        return (None, None);
    };
    let year = |idx: usize| items.get(idx).and_then(as_year);
    (year(0), year(1))
}

fn as_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Turns free text into search parameters via a text-generation provider.
#[derive(Debug, Clone)]
pub struct QueryRefiner<G> {
    generator: G,
    call_timeout: Duration,
}

impl<G: TextGenerator + Sync> QueryRefiner<G> {
    pub fn new(generator: G, call_timeout: Duration) -> Self {
        Self {
            generator,
            call_timeout,
        }
    }

    /// Refine `free_text`, falling back to `fallback` on any failure.
    pub async fn refine(&self, free_text: &str, fallback: &SearchParameters) -> SearchParameters {
        let free_text = free_text.trim();
        if free_text.is_empty() {
            return fallback.clone();
        }

        let prompt = build_refinement_prompt(free_text);
        let reply = match tokio::time::timeout(self.call_timeout, self.generator.generate(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e @ PipelineError::NotConfigured(_))) => {
                debug!(error = %e, "No text-generation provider, using caller parameters");
                return fallback.clone();
            }
            Ok(Err(e)) if e.is_degradable() => {
                warn!(error = %e, "Query refinement failed, using caller parameters");
                return fallback.clone();
            }
            Ok(Err(e)) => {
                error!(error = %e, "Unexpected refinement error, using caller parameters");
                return fallback.clone();
            }
            Err(_) => {
                warn!(secs = self.call_timeout.as_secs(), "Query refinement timed out, using caller parameters");
                return fallback.clone();
            }
        };

        match parse_refinement(&reply) {
            Some(refined) => {
                let params = refined.into_parameters(fallback);
                info!(
                    keyword = ?params.keyword,
                    category = ?params.category,
                    year_from = ?params.year_from,
                    year_to = ?params.year_to,
                    "Refined free-text query"
                );
                params
            }
            None => {
                let preview: String = reply.chars().take(200).collect();
                info!(content_preview = %preview, "Refinement reply unparseable, using caller parameters");
                fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::sync::Mutex;

    /// Replies with `reply`, or fails when it is `None`
    struct CannedGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            self.reply.clone().ok_or(PipelineError::Api {
                code: 500,
                message: "down".into(),
            })
        }
    }

    fn fallback() -> SearchParameters {
        SearchParameters {
            keyword: Some("original".into()),
            category: Some("cs.LG".into()),
            year_from: Some(2019),
            year_to: Some(2020),
            max_results: 7,
        }
    }

    #[test]
    fn test_parse_reply_with_surrounding_prose() {
        let reply = r#"Sure! {"main_keywords": "quantum", "additional_keywords": ["computing","error","codes"]}"#;
        let refined = parse_refinement(reply).expect("parse");
        assert_eq!(refined.main_keyword, "quantum");
        assert_eq!(refined.additional_keywords, vec!["computing", "error", "codes"]);

        let params = refined.into_parameters(&SearchParameters::default());
        assert_eq!(params.keyword.as_deref(), Some("quantum computing error"));
    }

    #[test]
    fn test_parse_code_fenced_reply() {
        let reply = "```json\n{\n  \"main_keywords\": \"graph neural networks\",\n  \"category\": \"cs.LG\",\n  \"year_range\": [2021, 2023]\n}\n```";
        let refined = parse_refinement(reply).expect("parse");
        assert_eq!(refined.category.as_deref(), Some("cs.LG"));
        assert_eq!((refined.year_from, refined.year_to), (Some(2021), Some(2023)));
    }

    #[test]
    fn test_no_json_span() {
        assert_eq!(parse_refinement("I cannot help with that."), None);
    }

    #[test]
    fn test_invalid_json_span() {
        assert_eq!(parse_refinement("{main_keywords: quantum}"), None);
    }

    #[test]
    fn test_partial_reply_falls_back_per_field() {
        let refined = parse_refinement(r#"{"main_keywords": "transformers", "year_range": [2022]}"#).expect("parse");
        let params = refined.into_parameters(&fallback());
        assert_eq!(params.keyword.as_deref(), Some("transformers"));
        assert_eq!(params.category.as_deref(), Some("cs.LG"));
        assert_eq!(params.year_from, Some(2022));
        assert_eq!(params.year_to, Some(2020));
        assert_eq!(params.max_results, 7);
    }

    #[test]
    fn test_missing_main_keyword_uses_caller_keyword() {
        let refined = parse_refinement(r#"{"additional_keywords": ["extra"]}"#).expect("parse");
        let params = refined.into_parameters(&fallback());
        assert_eq!(params.keyword.as_deref(), Some("original extra"));
    }

    #[test]
    fn test_lenient_value_shapes() {
        let refined = parse_refinement(
            r#"{"main_keywords": ["diffusion", "models"], "additional_keywords": "sampling", "category": "", "year_range": ["2020", null]}"#,
        )
        .expect("parse");
        assert_eq!(refined.main_keyword, "diffusion models");
        assert_eq!(refined.additional_keywords, vec!["sampling"]);
        assert_eq!(refined.category, None);
        assert_eq!((refined.year_from, refined.year_to), (Some(2020), None));
    }

    #[tokio::test]
    async fn test_refine_uses_reply() {
        let generator = CannedGenerator::ok(r#"{"main_keywords": "quantum", "additional_keywords": ["error correction"], "category": "quant-ph"}"#);
        let refiner = QueryRefiner::new(generator, Duration::from_secs(5));
        let params = refiner.refine("how do people fix qubit errors?", &fallback()).await;

        assert_eq!(params.keyword.as_deref(), Some("quantum error correction"));
        assert_eq!(params.category.as_deref(), Some("quant-ph"));
        let prompts = refiner.generator.prompts.lock().expect("lock");
        assert!(prompts[0].contains("how do people fix qubit errors?"));
    }

    #[tokio::test]
    async fn test_refine_falls_back_on_provider_error() {
        let refiner = QueryRefiner::new(CannedGenerator::failing(), Duration::from_secs(5));
        assert_eq!(refiner.refine("anything", &fallback()).await, fallback());
    }

    #[tokio::test]
    async fn test_refine_falls_back_on_unexpected_error_kind() {
        struct Misconfigured;
        impl TextGenerator for Misconfigured {
            async fn generate(&self, _prompt: &str) -> Result<String> {
                Err(PipelineError::Validation("prompt rejected".into()))
            }
        }

        let refiner = QueryRefiner::new(Misconfigured, Duration::from_secs(5));
        assert_eq!(refiner.refine("anything", &fallback()).await, fallback());
    }

    #[tokio::test]
    async fn test_refine_falls_back_on_unparseable_reply() {
        let refiner = QueryRefiner::new(CannedGenerator::ok("no idea, sorry"), Duration::from_secs(5));
        assert_eq!(refiner.refine("anything", &fallback()).await, fallback());
    }

    #[tokio::test]
    async fn test_refine_without_provider_falls_back() {
        let refiner = QueryRefiner::new(None::<CannedGenerator>, Duration::from_secs(5));
        assert_eq!(refiner.refine("anything", &fallback()).await, fallback());
    }

    #[tokio::test]
    async fn test_blank_text_skips_provider() {
        let refiner = QueryRefiner::new(CannedGenerator::ok("{}"), Duration::from_secs(5));
        assert_eq!(refiner.refine("   ", &fallback()).await, fallback());
        assert!(refiner.generator.prompts.lock().expect("lock").is_empty());
    }
}
