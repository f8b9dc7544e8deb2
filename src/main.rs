use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use gemini_cli::config::Config;
use gemini_cli::gemini::{GeminiClient, GenerateOptions, ReqwestExecutor, RetryingExecutor};

#[derive(Parser, Debug)]
#[command(name = "gemini")]
#[command(about = "Send a prompt to Gemini and print the JSON response")]
#[command(version)]
struct Cli {
    /// Prompt text; all words are joined with single spaces
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    prompt: Vec<String>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("error"));

    // stdout carries the response JSON only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::from_env()?;

    init_logging(&cfg.log_level);
    info!("Starting gemini v{}", env!("CARGO_PKG_VERSION"));

    let prompt = cli.prompt.join(" ");
    debug!(
        "Request config: model={}, max_tokens={}, temperature={}, google_search={}",
        cfg.model, cfg.max_tokens, cfg.temperature, cfg.google_search
    );

    let client = GeminiClient::builder(cfg.api_key.clone())
        .model(cfg.model.as_str())
        .executor(RetryingExecutor::with_defaults(ReqwestExecutor::new(cfg.timeout)?))
        .build()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let options = GenerateOptions::default()
        .max_tokens(cfg.max_tokens)
        .temperature(cfg.temperature)
        .google_search(cfg.google_search);

    // Room for every retry attempt plus the backoff gaps.
    let deadline = cfg.timeout.saturating_mul(5);
    let result = tokio::time::timeout(deadline, client.generate(&cancel, &prompt, options))
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "deadline exceeded after {}",
                humantime::format_duration(deadline)
            )
        })?;

    let resp = result
        .inspect_err(|e| error!("Generate failed: {}", e))
        .context("generate content")?;

    println!("{}", serde_json::to_string_pretty(&resp)?);

    Ok(())
}
