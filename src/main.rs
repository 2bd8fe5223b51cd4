//! rustarxiv - arXiv search, translation and summarization
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustarxiv search "graph neural networks" --genre cs.LG --year-from 2022
//! rustarxiv search --natural "recent work on error-correcting codes for qubits"
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustarxiv serve --port 8000
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rustarxiv::{
    arxiv::ARXIV_API_BASE,
    config::{DeeplConfig, ServiceConfig, DEFAULT_REQUEST_TIMEOUT_SECS},
    enrich::DEFAULT_MAX_CONCURRENT_RECORDS,
    export,
    llm::{LlmConfig, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL},
    paper::{SearchParameters, DEFAULT_MAX_RESULTS},
    server,
    service::DefaultService,
    translate::DEFAULT_TARGET_LANG,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// arXiv search with translation and summarization
#[derive(Parser)]
#[command(name = "rustarxiv")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search arXiv and print the (enriched) results as JSON
    Search {
        /// Search keyword
        keyword: Option<String>,

        /// arXiv category (e.g. cs.AI)
        #[arg(long)]
        genre: Option<String>,

        /// Earliest submission year
        #[arg(long)]
        year_from: Option<i32>,

        /// Latest submission year (defaults to the current year when --year-from is set)
        #[arg(long)]
        year_to: Option<i32>,

        /// Number of results to request
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: usize,

        /// Skip translation and summarization
        #[arg(long)]
        no_translate: bool,

        /// Free-text request, refined into a query by the LLM
        #[arg(long, conflicts_with = "no_translate")]
        natural: Option<String>,

        /// Also write the results to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[command(flatten)]
        providers: ProviderArgs,
    },
}

/// Upstream endpoints and credentials
#[derive(Args)]
struct ProviderArgs {
    /// arXiv export API URL
    #[arg(long, env = "ARXIV_API_BASE_URL", default_value = ARXIV_API_BASE)]
    arxiv_url: String,

    /// DeepL API key (translation is skipped without it)
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    deepl_key: Option<String>,

    /// DeepL API URL (chosen from the key tier when omitted)
    #[arg(long, env = "DEEPL_API_URL")]
    deepl_url: Option<String>,

    /// LLM API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    llm_base_url: String,

    /// LLM API key (summaries and refinement are skipped without it)
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_key: Option<String>,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// Target language code for translations and summaries
    #[arg(long, env = "TARGET_LANG", default_value = DEFAULT_TARGET_LANG)]
    target_lang: String,

    /// Timeout for every upstream call, in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Records enriched at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_RECORDS)]
    max_concurrent: usize,
}

impl ProviderArgs {
    fn into_config(self, max_results: usize) -> ServiceConfig {
        ServiceConfig {
            arxiv_base_url: self.arxiv_url,
            target_lang: self.target_lang,
            max_results,
            request_timeout_secs: self.timeout_secs,
            max_concurrent_records: self.max_concurrent,
            deepl: self.deepl_key.map(|api_key| DeeplConfig {
                api_key,
                base_url: self.deepl_url,
            }),
            llm: self.llm_key.map(|api_key| LlmConfig {
                base_url: self.llm_base_url,
                api_key,
                model: self.llm_model,
            }),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for results
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Search {
            keyword,
            genre,
            year_from,
            year_to,
            max_results,
            no_translate,
            natural,
            csv,
            providers,
        } => {
            let params = SearchParameters {
                keyword,
                category: genre,
                year_from,
                year_to,
                max_results,
            };
            let config = providers.into_config(max_results);
            run_search(config, params, !no_translate, natural, csv).await
        }
        Commands::Serve { port, host, providers } => {
            run_server(providers.into_config(DEFAULT_MAX_RESULTS), host, port).await
        }
    }
}

// ============================================================================
// Search
// ============================================================================

async fn run_search(
    config: ServiceConfig,
    params: SearchParameters,
    translate: bool,
    natural: Option<String>,
    csv_path: Option<PathBuf>,
) -> Result<()> {
    let service = DefaultService::from_config(&config).context("Invalid configuration")?;

    let records = match natural {
        Some(text) => service
            .search_natural_until(&text, &params, ctrl_c())
            .await
            .context("Natural-language search failed")?,
        None => service
            .search_until(&params, translate, ctrl_c())
            .await
            .context("Search failed")?,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to serialize results")?
    );

    if let Some(path) = csv_path {
        export::write_csv(&path, &records).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let usage = service.token_usage();
    if usage.total_tokens > 0 {
        info!(
            prompt = usage.prompt_tokens,
            completion = usage.completion_tokens,
            total = usage.total_tokens,
            "LLM token usage"
        );
    }
    Ok(())
}

/// Resolves on the first Ctrl-C; never resolves if the handler cannot be
/// installed.
async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Interrupted, cancelling in-flight requests"),
        Err(e) => {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(config: ServiceConfig, host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let service = Arc::new(DefaultService::from_config(&config).context("Invalid configuration")?);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    println!("Listening on http://{}", addr);

    server::serve(listener, service, ctrl_c())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
