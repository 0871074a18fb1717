//! Probe: Events API page shape
//!
//! Fetches a single page from EVENTS_API_URL (or --url) and documents:
//! - Response status and latency
//! - Top-level fields and `nextUrl`
//! - Event method histogram and one sample payload per method
//! - Which events the dispatcher would skip or not recognise
//!
//! The access token in the URL is never printed.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use cb_events_poller::EVENTS_API_URL_ENV;
use cb_events_poller::api::{check_allowed, redact};
use cb_events_poller::default_allowed_prefixes;
use cb_events_poller::dispatcher::{Dispatch, dispatch};

#[derive(Parser)]
#[command(name = "probe_feed", about = "Fetch one Events API page and describe it")]
struct Args {
    /// Page URL (defaults to EVENTS_API_URL)
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let url = match args.url {
        Some(url) => url,
        None => std::env::var(EVENTS_API_URL_ENV)
            .with_context(|| format!("{EVENTS_API_URL_ENV} is not set"))?,
    };
    check_allowed(&url, &default_allowed_prefixes())?;

    let client = reqwest::Client::new();

    println!("=== Probe: Events API page ===");
    println!("Endpoint: {}", redact(&url));
    println!();

    // 1. Fetch
    println!("--- 1. Fetch ---");
    let start = Instant::now();
    let resp = client.get(&url).send().await?;
    let latency = start.elapsed();
    let status = resp.status();
    println!("Status: {}", status);
    println!("Latency: {:?}", latency);
    if !status.is_success() {
        println!("Body: {}", resp.text().await?);
        return Ok(());
    }
    let body: Value = resp.json().await?;
    println!();

    // 2. Top-level shape
    println!("--- 2. Top-level fields ---");
    if let Some(obj) = body.as_object() {
        for key in obj.keys() {
            println!("  - {}", key);
        }
    }
    match body.get("nextUrl").and_then(|v| v.as_str()) {
        Some(next) => println!("nextUrl: {}", redact(next)),
        None => println!("nextUrl: <none> (feed would stop here)"),
    }
    println!();

    // 3. Methods
    println!("--- 3. Event methods ---");
    let events = body
        .get("events")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    println!("Event count: {}", events.len());

    let mut samples: BTreeMap<String, (usize, Value)> = BTreeMap::new();
    for event in &events {
        let method = event
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("<missing>")
            .to_string();
        samples
            .entry(method)
            .and_modify(|(n, _)| *n += 1)
            .or_insert_with(|| (1, event.clone()));
    }
    for (method, (count, sample)) in &samples {
        println!("  {method}: {count}");
        if let Some(obj) = sample.get("object") {
            println!("{}", serde_json::to_string_pretty(obj)?);
        }
    }
    println!();

    // 4. Dispatch dry run
    println!("--- 4. Dispatch ---");
    let (mut formatted, mut skipped, mut unrecognized) = (0, 0, 0);
    for event in events {
        match dispatch(event) {
            Dispatch::Formatted(ev) => {
                formatted += 1;
                println!("  {}", ev.text);
            }
            Dispatch::Skipped { method, reason } => {
                skipped += 1;
                println!("  skipped {method}: {reason}");
            }
            Dispatch::Unrecognized { method } => {
                unrecognized += 1;
                println!("  unrecognized: {method}");
            }
        }
    }
    println!("Formatted: {formatted}, skipped: {skipped}, unrecognized: {unrecognized}");
    println!();

    println!("=== Probe Complete ===");
    Ok(())
}
