use serde_json::Value;
use tracing::{debug, warn};

use crate::formatter::describe;
use crate::types::{Event, FormattedEvent, RawEvent};

/// What happened to a single feed event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Rendered and ready for a sink.
    Formatted(FormattedEvent),
    /// A known method whose payload lacked required fields, or an entry that
    /// was not an event object at all.
    Skipped { method: String, reason: String },
    /// A method outside the known set.
    Unrecognized { method: String },
}

/// Route one raw feed entry to its formatter.
///
/// Never fails: malformed or unknown events are logged and reported as
/// `Skipped` / `Unrecognized` so the poll loop can carry on.
pub fn dispatch(value: Value) -> Dispatch {
    let raw: RawEvent = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Skipping non-event entry: {e}");
            return Dispatch::Skipped {
                method: String::new(),
                reason: e.to_string(),
            };
        }
    };

    let method = raw.method.clone();
    let id = raw.id.clone().unwrap_or_default();
    let event = match Event::from_raw(raw) {
        Ok(event) => event,
        Err(e) => {
            debug!("Skipping {method} event {id}: {e}");
            return Dispatch::Skipped {
                method,
                reason: e.to_string(),
            };
        }
    };

    match describe(&event) {
        Some(text) => Dispatch::Formatted(FormattedEvent {
            method,
            text,
            broadcaster: event.broadcaster().map(str::to_string),
            username: event.username().map(str::to_string),
        }),
        None => {
            warn!("Unknown method: {method}");
            Dispatch::Unrecognized { method }
        }
    }
}
