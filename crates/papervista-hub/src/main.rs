//! papervista binary - citation server and command-line client

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use papervista_citeproc::OutputFormat;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use papervista_hub::{CitationResult, HubConfig, HubContext, ProviderKind, client, server};

#[derive(Parser)]
#[command(name = "papervista")]
#[command(version, about = "Hybrid rules/LLM citation generator for research papers")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "PAPERVISTA_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for values from the configuration file.
#[derive(clap::Args)]
struct Settings {
    /// Directory of <name>.csl files checked before the built-in styles
    #[arg(long, global = true, env = "PAPERVISTA_STYLES_DIR")]
    styles_dir: Option<PathBuf>,

    /// Metadata provider
    #[arg(long, global = true, value_enum, env = "PAPERVISTA_PROVIDER")]
    provider: Option<ProviderKind>,

    /// JSON catalog file (catalog provider)
    #[arg(long, global = true, env = "PAPERVISTA_CATALOG")]
    catalog: Option<PathBuf>,

    /// Credential for the generative fallback (GEMINI_API_KEY is also read)
    #[arg(long, global = true, env = "PAPERVISTA_LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible base URL for the generative fallback
    #[arg(long, global = true, env = "PAPERVISTA_LLM_BASE_URL")]
    llm_base_url: Option<String>,

    /// Model name for the generative fallback
    #[arg(long, global = true, env = "PAPERVISTA_LLM_MODEL")]
    llm_model: Option<String>,

    /// Fallback timeout in seconds (1-120)
    #[arg(long, global = true, env = "PAPERVISTA_LLM_TIMEOUT_SECS")]
    llm_timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the citation HTTP API
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, env = "PAPERVISTA_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short = 'P', long, env = "PAPERVISTA_PORT")]
        port: Option<u16>,
    },

    /// Print the citation for a paper in the metadata source
    Cite {
        /// Paper identifier (e.g. 711722243044)
        paper_id: String,

        /// Citation style (e.g. apa, mla, ieee)
        #[arg(long, default_value = "apa")]
        style: String,

        /// Output markup: plain, html, or markdown
        #[arg(long, default_value = "plain")]
        format: OutputFormat,

        /// Resolve in this process instead of asking a running server
        #[arg(long)]
        local: bool,

        /// Base URL of a running `papervista serve`
        #[arg(long, env = "PAPERVISTA_SERVER", default_value = "http://127.0.0.1:8000")]
        server: String,
    },

    /// Search the metadata source, most recent first
    Search {
        /// Free-text query
        #[arg(required = true)]
        query: Vec<String>,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List available citation styles with their class and title
    Styles,
}

/// Layer CLI and environment values over the file configuration.
fn build_config(config_path: Option<PathBuf>, settings: Settings) -> anyhow::Result<HubConfig> {
    let mut config = HubConfig::load(config_path.as_deref())?;

    if let Some(dir) = settings.styles_dir {
        config.styles_dir = Some(dir);
    }
    if let Some(provider) = settings.provider {
        config.provider = provider;
    }
    if let Some(catalog) = settings.catalog {
        config.catalog = Some(catalog);
    }
    if let Some(key) = settings
        .api_key
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
    {
        config.generator.api_key = Some(key);
    }
    if let Some(base_url) = settings.llm_base_url {
        config.generator.base_url = base_url;
    }
    if let Some(model) = settings.llm_model {
        config.generator.model = model;
    }
    if let Some(timeout) = settings.llm_timeout_secs {
        config.generator.timeout_secs = timeout;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr keeps command output clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papervista_hub=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = build_config(args.config, args.settings)?;

    match args.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            info!(addr = %config.bind_addr(), "Starting papervista");
            let ctx = Arc::new(HubContext::from_config(config)?);
            server::run_server(ctx).await?;
        }
        Command::Cite {
            paper_id,
            style,
            format,
            local,
            server,
        } => {
            let ctx = HubContext::from_config(config)?;
            let paper = ctx
                .provider()
                .fetch_by_id(&paper_id)
                .await?
                .with_context(|| format!("Paper ID {} not found", paper_id))?;

            println!(
                "\n[Papervista Explorer] Requesting {} citation for {}...",
                style.to_uppercase(),
                paper_id
            );
            let result = if local {
                ctx.orchestrator().resolve(&paper, &style, format).await?
            } else {
                client::request_citation(&server, &paper, &style, format).await?
            };
            print_citation(&result);
        }
        Command::Search { query, limit } => {
            let ctx = HubContext::from_config(config)?;
            let query = query.join(" ");
            let results = ctx.provider().search_by_query(&query, limit).await?;
            if results.is_empty() {
                println!("No papers found for \"{}\"", query);
            }
            for paper in &results {
                print_search_result(paper);
            }
        }
        Command::Styles => {
            let ctx = HubContext::from_config(config)?;
            let registry = ctx.orchestrator().engine().registry();
            for name in registry.names() {
                match registry.load(&name) {
                    Ok(Some(style)) => {
                        let title = style.info.and_then(|i| i.title).unwrap_or_default();
                        println!("{:<24} {:<8} {}", name, style.class.as_str(), title);
                    }
                    Ok(None) => {}
                    Err(e) => println!("{:<24} invalid: {}", name, e),
                }
            }
        }
    }

    Ok(())
}

fn field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string()
}

fn print_citation(result: &CitationResult) {
    let rule = "-".repeat(50);
    println!("{}", rule);
    println!("STYLE: {}", result.style);
    println!("SOURCE ENGINE: {}", result.source.as_str());
    println!("{}", rule);
    println!("{}", result.citation);
    println!("{}", rule);
}

fn print_search_result(paper: &Value) {
    let id = field(paper, "id");
    let title = field(paper, "title");
    let year = paper
        .get("issued")
        .and_then(|i| i.get("date-parts").or_else(|| i.get("date_parts")))
        .and_then(|p| p.get(0)?.get(0))
        .and_then(|y| y.as_i64().map(|n| n.to_string()).or_else(|| y.as_str().map(str::to_string)))
        .unwrap_or_else(|| "n.d.".to_string());
    println!("{}  ({})  {}", id, year, title);
}
