use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{FormattedEvent, PollSummary};

/// The receiving side of a sink has gone away; polling should stop.
#[derive(Debug, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination for formatted events, injected into the poller.
pub trait EventSink {
    fn emit(&mut self, event: &FormattedEvent) -> Result<(), SinkClosed>;
}

/// Line format for [`StdoutSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The rendered sentence only.
    #[default]
    Text,
    /// One JSON record per line.
    Json,
}

/// Write each event as a single line to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink {
    pub format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl EventSink for StdoutSink {
    fn emit(&mut self, event: &FormattedEvent) -> Result<(), SinkClosed> {
        match self.format {
            OutputFormat::Text => println!("{}", event.text),
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    println!("{json}");
                }
            }
        }
        Ok(())
    }
}

/// Forward rendered lines to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: &FormattedEvent) -> Result<(), SinkClosed> {
        self.tx.send(event.text.clone()).map_err(|_| SinkClosed)
    }
}

/// Collects events in memory.
impl EventSink for Vec<FormattedEvent> {
    fn emit(&mut self, event: &FormattedEvent) -> Result<(), SinkClosed> {
        self.push(event.clone());
        Ok(())
    }
}

/// Emit the run summary as pretty-printed JSON to stderr, keeping stdout
/// for events only.
pub fn report_summary(summary: &PollSummary) {
    if let Ok(json) = serde_json::to_string_pretty(summary) {
        eprintln!("{json}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormattedEvent {
        FormattedEvent {
            method: "follow".into(),
            text: "User bob followed broadcaster alice".into(),
            broadcaster: Some("alice".into()),
            username: Some("bob".into()),
        }
    }

    #[test]
    fn channel_sink_forwards_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        sink.emit(&sample()).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            "User bob followed broadcaster alice"
        );
    }

    #[test]
    fn channel_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        assert!(sink.emit(&sample()).is_err());
    }

    #[test]
    fn json_record_omits_missing_fields() {
        let mut event = sample();
        event.username = None;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["method"], "follow");
        assert!(json.get("username").is_none());
        assert_eq!(json["broadcaster"], "alice");
    }

    #[test]
    fn output_format_from_config_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            output: OutputFormat,
        }
        let w: Wrapper = toml::from_str("output = \"json\"").unwrap();
        assert_eq!(w.output, OutputFormat::Json);
    }
}
