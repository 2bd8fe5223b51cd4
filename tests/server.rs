//! HTTP API tests against a server bound to an ephemeral port.

mod common;

use common::Upstreams;
use rustarxiv::config::ServiceConfig;
use rustarxiv::server;
use rustarxiv::service::DefaultService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(config: ServiceConfig) -> Self {
        let service = Arc::new(DefaultService::from_config(&config).expect("service"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            server::serve(listener, service, shutdown).await.expect("serve");
        });

        Self {
            addr,
            shutdown: Some(tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn test_health_and_root() {
    let upstreams = Upstreams::start("unused").await;
    let server = TestServer::start(upstreams.config_without_providers()).await;
    let client = reqwest::Client::new();

    let health = client.get(server.url("/health")).send().await.expect("health");
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.expect("body"), "OK");

    let root: serde_json::Value = client
        .get(server.url("/"))
        .send()
        .await
        .expect("root")
        .json()
        .await
        .expect("json");
    assert!(root["message"].as_str().is_some());
}

#[tokio::test]
async fn test_search_endpoint_returns_enriched_papers() {
    let upstreams = Upstreams::start("short summary").await;
    let server = TestServer::start(upstreams.config()).await;

    let papers: serde_json::Value = reqwest::Client::new()
        .get(server.url("/api/papers"))
        .query(&[("keyword", "surface codes"), ("genre", "quant-ph")])
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("json");

    let papers = papers.as_array().expect("array");
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0]["id"], "2403.00002v2");
    assert_eq!(papers[0]["abstract"], "We scale surface codes.");
    assert_eq!(papers[0]["genre"], "quant-ph");
    assert_eq!(papers[0]["translated_title"], "JA:Surface Codes at Scale");
    assert_eq!(papers[0]["summary"], "short summary");
    assert!(papers[1]["translated_abstract"].is_null());
    assert!(papers[1]["summary"].is_null());
}

#[tokio::test]
async fn test_search_endpoint_translate_false() {
    let upstreams = Upstreams::start("short summary").await;
    let server = TestServer::start(upstreams.config()).await;

    let papers: Vec<serde_json::Value> = reqwest::Client::new()
        .get(server.url("/api/papers?keyword=codes&translate=false"))
        .send()
        .await
        .expect("search")
        .json()
        .await
        .expect("json");

    assert_eq!(papers.len(), 2);
    assert!(papers.iter().all(|p| p["translated_title"].is_null()));
}

#[tokio::test]
async fn test_malformed_feed_is_bad_gateway() {
    let arxiv = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry>"))
        .mount(&arxiv)
        .await;
    let config = ServiceConfig {
        arxiv_base_url: arxiv.uri(),
        ..Default::default()
    };
    let server = TestServer::start(config).await;

    let response = reqwest::Client::new()
        .get(server.url("/api/papers?keyword=x"))
        .send()
        .await
        .expect("search");
    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.expect("json");
    assert!(body["detail"].as_str().expect("detail").contains("arXiv"));
}

#[tokio::test]
async fn test_out_of_range_max_results_is_bad_request() {
    let upstreams = Upstreams::start("unused").await;
    let server = TestServer::start(upstreams.config_without_providers()).await;

    let response = reqwest::Client::new()
        .get(server.url("/api/papers?keyword=x&max_results=500"))
        .send()
        .await
        .expect("search");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_search_natural_endpoint() {
    let upstreams = Upstreams::start(r#"{"main_keywords": "surface codes", "category": "quant-ph"}"#).await;
    let server = TestServer::start(upstreams.config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/papers/search-natural"))
        .json(&serde_json::json!({"keyword": "what is new in surface codes?", "genre": "cs.AI"}))
        .send()
        .await
        .expect("search");
    assert_eq!(response.status(), 200);
    let papers: Vec<serde_json::Value> = response.json().await.expect("json");
    assert_eq!(papers.len(), 2);

    let empty = client
        .post(server.url("/api/papers/search-natural"))
        .json(&serde_json::json!({"keyword": "  "}))
        .send()
        .await
        .expect("search");
    assert_eq!(empty.status(), 400);
}

#[tokio::test]
async fn test_search_natural_legacy_path() {
    let upstreams = Upstreams::start(r#"{"main_keywords": "surface codes"}"#).await;
    let server = TestServer::start(upstreams.config()).await;

    let response = reqwest::Client::new()
        .post(server.url("/api/papers/search-with-gemini"))
        .json(&serde_json::json!({"keyword": "what is new in surface codes?"}))
        .send()
        .await
        .expect("search");
    assert_eq!(response.status(), 200);
    let papers: Vec<serde_json::Value> = response.json().await.expect("json");
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0]["id"], "2403.00002v2");
}

#[tokio::test]
async fn test_translate_endpoint() {
    let upstreams = Upstreams::start("unused").await;
    let server = TestServer::start(upstreams.config()).await;

    let outcome: serde_json::Value = reqwest::Client::new()
        .post(server.url("/api/papers/translate"))
        .query(&[("paper_id", "2403.00002"), ("text", "hello")])
        .send()
        .await
        .expect("translate")
        .json()
        .await
        .expect("json");
    assert_eq!(outcome, serde_json::json!({"translated_text": "JA:hello", "success": true}));
}

#[tokio::test]
async fn test_translate_endpoint_passes_text_through_without_provider() {
    let upstreams = Upstreams::start("unused").await;
    let server = TestServer::start(upstreams.config_without_providers()).await;

    let outcome: serde_json::Value = reqwest::Client::new()
        .post(server.url("/api/papers/translate"))
        .query(&[("paper_id", "2403.00002"), ("text", "hello")])
        .send()
        .await
        .expect("translate")
        .json()
        .await
        .expect("json");
    assert_eq!(outcome, serde_json::json!({"translated_text": "hello", "success": false}));
}

#[tokio::test]
async fn test_summarize_endpoint() {
    let upstreams = Upstreams::start("a summary").await;
    let client = reqwest::Client::new();

    let configured = TestServer::start(upstreams.config()).await;
    let body: serde_json::Value = client
        .post(configured.url("/api/papers/summarize"))
        .query(&[("paper_id", "1"), ("text", "Long abstract.")])
        .send()
        .await
        .expect("summarize")
        .json()
        .await
        .expect("json");
    assert_eq!(body, serde_json::json!({"summary": "a summary", "success": true}));

    let unconfigured = TestServer::start(upstreams.config_without_providers()).await;
    let response = client
        .post(unconfigured.url("/api/papers/summarize"))
        .query(&[("paper_id", "1"), ("text", "Long abstract.")])
        .send()
        .await
        .expect("summarize");
    assert_eq!(response.status(), 503);
}
