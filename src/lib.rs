//! # rustarxiv
//!
//! arXiv search with translation and summarization enrichment - Rust Microservice
//!
//! ## Modules
//!
//! - [`query`] - arXiv query construction
//! - [`feed`] - Atom feed parsing
//! - [`arxiv`] - arXiv API client
//! - [`translate`] - Translation provider (DeepL)
//! - [`llm`] - Text-generation provider (OpenAI-compatible)
//! - [`enrich`] - Concurrent translation/summarization pipeline
//! - [`refine`] - Free-text query refinement
//! - [`service`] - Search service used by the CLI and HTTP server
//! - [`server`] - HTTP API
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustarxiv::{config::ServiceConfig, paper::SearchParameters, service::DefaultService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = DefaultService::from_config(&ServiceConfig::default())?;
//!     let papers = service.search(&SearchParameters::keyword("graph neural networks"), true).await?;
//!     println!("Found {} papers", papers.len());
//!     Ok(())
//! }
//! ```

pub mod arxiv;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod feed;
pub mod llm;
pub mod paper;
pub mod prompts;
pub mod query;
pub mod refine;
pub mod server;
pub mod service;
pub mod translate;

pub use error::{PipelineError, Result};
