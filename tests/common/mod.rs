//! Mock upstreams shared by the integration tests.

#![allow(dead_code)]

use rustarxiv::config::{DeeplConfig, ServiceConfig};
use rustarxiv::llm::LlmConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2403.00002v2</id>
    <published>2024-03-01T10:00:00Z</published>
    <title>Surface Codes at Scale</title>
    <summary>  We scale surface codes.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2403.00002v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2403.00002v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2108.09112v1</id>
    <published>2021-08-20T00:00:00Z</published>
    <title>Untranslatable Abstract</title>
    <summary>FAIL</summary>
    <author><name>Jane Doe</name></author>
    <link href="http://arxiv.org/abs/2108.09112v1" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

/// Mock DeepL: answers `JA:<text>`, or 500 when the text is `FAIL`.
struct DeeplResponder;

impl Respond for DeeplResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let text = body["text"][0].as_str().unwrap_or_default();
        let lang = body["target_lang"].as_str().unwrap_or_default();
        if text == "FAIL" {
            return ResponseTemplate::new(500).set_body_string("internal error");
        }
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "translations": [{"detected_source_language": "EN", "text": format!("{lang}:{text}")}]
        }))
    }
}

pub struct Upstreams {
    pub arxiv: MockServer,
    pub deepl: MockServer,
    pub llm: MockServer,
}

impl Upstreams {
    /// arXiv serving [`FEED`], DeepL echoing, LLM replying `reply`.
    pub async fn start(llm_reply: &str) -> Self {
        let arxiv = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&arxiv)
            .await;

        let deepl = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/translate"))
            .respond_with(DeeplResponder)
            .mount(&deepl)
            .await;

        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": llm_reply}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&llm)
            .await;

        Self { arxiv, deepl, llm }
    }

    pub fn config(&self) -> ServiceConfig {
        ServiceConfig {
            arxiv_base_url: format!("{}/api/query", self.arxiv.uri()),
            request_timeout_secs: 5,
            deepl: Some(DeeplConfig {
                api_key: "test-key".into(),
                base_url: Some(self.deepl.uri()),
            }),
            llm: Some(LlmConfig {
                base_url: format!("{}/v1", self.llm.uri()),
                api_key: "sk-test".into(),
                model: "test-model".into(),
            }),
            ..Default::default()
        }
    }

    /// Same upstreams, no provider credentials.
    pub fn config_without_providers(&self) -> ServiceConfig {
        ServiceConfig {
            deepl: None,
            llm: None,
            ..self.config()
        }
    }
}
