//! Command-line front end for the artifact-dl engine
//!
//! Thin glue only: parse arguments, source the token, hand everything to
//! [`BatchDownloader`], render the summary, and map it to an exit code.

use artifact_dl::{
    AuthToken, BatchDownloader, Config, DownloadConfig, Error, Event, Result, RetryConfig,
    TOKEN_ENV_VAR, utils::format_bytes,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "artifact-dl",
    version,
    about = "Download model artifacts listed in a manifest file"
)]
struct Args {
    /// Manifest with "<name> - <url>" lines grouped under section headers
    #[arg(long = "url_file", value_name = "PATH")]
    url_file: PathBuf,

    /// Retry attempts for failed downloads
    #[arg(long, default_value_t = 3, value_name = "N")]
    retries: u32,

    /// Maximum concurrent downloads
    #[arg(long = "max_threads", default_value_t = 5, value_name = "N")]
    max_threads: usize,

    /// Base directory for the category subfolders
    #[arg(long, default_value = ".", value_name = "DIR")]
    base_dir: PathBuf,

    /// Print the summary as JSON instead of a human-readable report
    #[arg(long)]
    json: bool,
}

fn init_logging() {
    // Per-task progress goes through the event channel; logs default to
    // warnings so the terminal output stays readable. RUST_LOG overrides.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Token priority: environment variable, then interactive hidden prompt
fn resolve_token() -> Result<AuthToken> {
    if let Some(token) = AuthToken::from_env(TOKEN_ENV_VAR)? {
        return Ok(token);
    }
    let raw = dialoguer::Password::new()
        .with_prompt(format!("API token ({TOKEN_ENV_VAR} is unset)"))
        .interact()
        .map_err(|e| Error::InvalidToken(format!("failed to read token from prompt: {e}")))?;
    AuthToken::new(raw)
}

fn render_event(event: &Event) {
    match event {
        Event::Skipped { name, .. } => println!("  exists  {name}"),
        Event::Succeeded { name, bytes, .. } => {
            println!("  ok      {name} ({})", format_bytes(*bytes));
        }
        Event::Failed {
            name,
            attempts,
            error,
            ..
        } => println!("  failed  {name} after {attempts} attempt(s): {error}"),
        _ => {}
    }
}

async fn run(args: Args) -> Result<bool> {
    let token = resolve_token()?;

    let config = Config {
        download: DownloadConfig {
            base_dir: args.base_dir,
            max_concurrent_downloads: args.max_threads,
        },
        retry: RetryConfig {
            max_attempts: args.retries,
            ..RetryConfig::default()
        },
        ..Config::default()
    };

    let downloader = Arc::new(BatchDownloader::new(config, token)?);

    // Ctrl+C cancels the run; queued tasks are recorded as failed and the
    // summary is still printed
    {
        let downloader = Arc::clone(&downloader);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling remaining downloads");
                downloader.cancel();
            }
        });
    }

    if !args.json {
        let mut events = downloader.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                render_event(&event);
            }
        });
    }

    let summary = downloader.run_manifest(&args.url_file).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("\n{}", summary.render());
    }
    Ok(summary.is_success())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("artifact-dl error: {err}");
            ExitCode::FAILURE
        }
    }
}
