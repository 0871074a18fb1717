use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use cb_events_poller::api::{ReqwestTransport, check_allowed, redact};
use cb_events_poller::config::{AppConfig, CONFIG_PATH};
use cb_events_poller::PollError;
use cb_events_poller::poller::Poller;
use cb_events_poller::reporter::{self, OutputFormat, StdoutSink};
use cb_events_poller::types::PollSummary;

#[derive(Parser)]
#[command(name = "events-poller", about = "Poll the Events API and print each event")]
struct Args {
    /// Start URL (overrides EVENTS_API_URL and feed.url)
    #[arg(long)]
    url: Option<String>,

    /// Path to the TOML config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Output format for events on stdout
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Attempts per page before giving up on server errors
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Requests allowed per rate-limit window
    #[arg(long)]
    rate_limit: Option<u32>,
}

/// How the poll loop ended.
#[derive(Debug)]
enum RunOutcome {
    Interrupted,
    Finished(Result<PollSummary, PollError>),
}

/// Exit status contract: success on feed exhaustion or Ctrl+C, failure on a
/// fatal poll error.
fn exit_result(outcome: RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Interrupted | RunOutcome::Finished(Ok(_)) => Ok(()),
        RunOutcome::Finished(Err(e)) => {
            warn!("Polling stopped: {e}");
            Err(e).context("polling failed")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.max_attempts == Some(0) {
        anyhow::bail!("--max-attempts must be at least 1");
    }
    if args.rate_limit == Some(0) {
        anyhow::bail!("--rate-limit must be at least 1");
    }

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(n) = args.max_attempts {
        config.settings.max_attempts = n;
    }
    if let Some(n) = args.rate_limit {
        config.settings.rate_limit_requests = n;
    }

    let url = config.resolve_url(args.url)?;
    check_allowed(&url, &config.feed.allowed_prefixes)
        .with_context(|| format!("refusing to poll {}", redact(&url)))?;

    let format = args.format.unwrap_or(config.settings.output);
    let poller_config = config.poller_config(url);
    info!(
        "Starting poller: rate limit {}/{:?}, max attempts {}, backoff base {:?}",
        poller_config.rate_limit_requests,
        poller_config.rate_limit_period,
        poller_config.max_attempts,
        poller_config.backoff_base,
    );

    let transport = ReqwestTransport::new(config.settings.request_timeout())
        .context("failed to build HTTP client")?;
    let mut poller = Poller::new(poller_config, transport, StdoutSink::new(format));

    info!("Press Ctrl+C to stop.");
    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            RunOutcome::Interrupted
        }
        result = poller.run() => RunOutcome::Finished(result),
    };

    reporter::report_summary(poller.summary());
    exit_result(outcome)
}
