use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Wire types ────────────────────────────────────────────────────────

/// One page of the events feed.
///
/// Events are kept as raw JSON values so a single malformed entry cannot
/// fail the whole page; each one is parsed on its own during dispatch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub events: Option<Vec<Value>>,
    #[serde(default, rename = "nextUrl")]
    pub next_url: Option<String>,
}

impl Page {
    pub fn into_parts(self) -> (Vec<Value>, Option<String>) {
        let next = self.next_url.filter(|u| !u.is_empty());
        (self.events.unwrap_or_default(), next)
    }
}

/// An event before its payload has been interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct BroadcasterPayload {
    broadcaster: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    broadcaster: String,
    user: UserRef,
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    broadcaster: String,
    user: UserRef,
    message: ChatBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateBody {
    message: String,
    #[serde(default)]
    from_user: Option<String>,
    #[serde(default)]
    to_user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrivateMessagePayload {
    broadcaster: String,
    #[serde(default)]
    user: Option<UserRef>,
    message: PrivateBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TipBody {
    tokens: u64,
    #[serde(default)]
    is_anon: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TipPayload {
    broadcaster: String,
    user: UserRef,
    tip: TipBody,
}

/// Room subjects arrive either as a bare string or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subject {
    Text(String),
    Nested { subject: String },
}

#[derive(Debug, Deserialize)]
struct SubjectPayload {
    broadcaster: String,
    subject: Subject,
}

#[derive(Debug, Deserialize)]
struct MediaBody {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MediaPayload {
    broadcaster: String,
    user: UserRef,
    media: MediaBody,
}

// ── Typed events ──────────────────────────────────────────────────────

/// A feed event resolved to its method, carrying only the fields it renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BroadcastStart {
        broadcaster: String,
    },
    BroadcastStop {
        broadcaster: String,
    },
    ChatMessage {
        broadcaster: String,
        username: String,
        message: String,
    },
    FanclubJoin {
        broadcaster: String,
        username: String,
    },
    Follow {
        broadcaster: String,
        username: String,
    },
    Unfollow {
        broadcaster: String,
        username: String,
    },
    MediaPurchase {
        broadcaster: String,
        username: String,
        media_type: String,
        media_name: String,
        tokens: Option<u64>,
    },
    PrivateMessage {
        broadcaster: String,
        from_user: String,
        to_user: String,
        message: String,
    },
    RoomSubjectChange {
        broadcaster: String,
        subject: String,
    },
    Tip {
        broadcaster: String,
        username: String,
        tokens: u64,
        is_anon: bool,
        message: String,
    },
    UserEnter {
        broadcaster: String,
        username: String,
    },
    UserLeave {
        broadcaster: String,
        username: String,
    },
    /// A method outside the known set.
    Unrecognized {
        method: String,
    },
}

impl Event {
    /// Interpret a raw event by its method.
    ///
    /// Fails when a known method is missing a field it needs; unknown
    /// methods always succeed as `Unrecognized`.
    pub fn from_raw(raw: RawEvent) -> Result<Self, serde_json::Error> {
        let RawEvent { method, object, .. } = raw;
        let event = match method.as_str() {
            "broadcastStart" => {
                let p: BroadcasterPayload = serde_json::from_value(object)?;
                Event::BroadcastStart {
                    broadcaster: p.broadcaster,
                }
            }
            "broadcastStop" => {
                let p: BroadcasterPayload = serde_json::from_value(object)?;
                Event::BroadcastStop {
                    broadcaster: p.broadcaster,
                }
            }
            "chatMessage" => {
                let p: ChatPayload = serde_json::from_value(object)?;
                Event::ChatMessage {
                    broadcaster: p.broadcaster,
                    username: p.user.username,
                    message: p.message.message,
                }
            }
            "fanclubJoin" | "follow" | "unfollow" | "userEnter" | "userLeave" => {
                let UserPayload { broadcaster, user } = serde_json::from_value(object)?;
                let username = user.username;
                match method.as_str() {
                    "fanclubJoin" => Event::FanclubJoin { broadcaster, username },
                    "follow" => Event::Follow { broadcaster, username },
                    "unfollow" => Event::Unfollow { broadcaster, username },
                    "userEnter" => Event::UserEnter { broadcaster, username },
                    _ => Event::UserLeave { broadcaster, username },
                }
            }
            "mediaPurchase" => {
                let p: MediaPayload = serde_json::from_value(object)?;
                Event::MediaPurchase {
                    broadcaster: p.broadcaster,
                    username: p.user.username,
                    media_type: p.media.kind,
                    media_name: p.media.name,
                    tokens: p.media.tokens,
                }
            }
            "privateMessage" => {
                let p: PrivateMessagePayload = serde_json::from_value(object)?;
                let from_user = p
                    .message
                    .from_user
                    .or_else(|| p.user.map(|u| u.username))
                    .ok_or_else(|| {
                        <serde_json::Error as serde::de::Error>::missing_field("fromUser")
                    })?;
                let to_user = p.message.to_user.unwrap_or_else(|| p.broadcaster.clone());
                Event::PrivateMessage {
                    broadcaster: p.broadcaster,
                    from_user,
                    to_user,
                    message: p.message.message,
                }
            }
            "roomSubjectChange" => {
                let p: SubjectPayload = serde_json::from_value(object)?;
                let subject = match p.subject {
                    Subject::Text(s) | Subject::Nested { subject: s } => s,
                };
                Event::RoomSubjectChange {
                    broadcaster: p.broadcaster,
                    subject,
                }
            }
            "tip" => {
                let p: TipPayload = serde_json::from_value(object)?;
                Event::Tip {
                    broadcaster: p.broadcaster,
                    username: p.user.username,
                    tokens: p.tip.tokens,
                    is_anon: p.tip.is_anon,
                    message: p.tip.message.unwrap_or_default(),
                }
            }
            _ => Event::Unrecognized {
                method: method.clone(),
            },
        };
        Ok(event)
    }

    /// The feed's method name for this event.
    pub fn method(&self) -> &str {
        match self {
            Event::BroadcastStart { .. } => "broadcastStart",
            Event::BroadcastStop { .. } => "broadcastStop",
            Event::ChatMessage { .. } => "chatMessage",
            Event::FanclubJoin { .. } => "fanclubJoin",
            Event::Follow { .. } => "follow",
            Event::Unfollow { .. } => "unfollow",
            Event::MediaPurchase { .. } => "mediaPurchase",
            Event::PrivateMessage { .. } => "privateMessage",
            Event::RoomSubjectChange { .. } => "roomSubjectChange",
            Event::Tip { .. } => "tip",
            Event::UserEnter { .. } => "userEnter",
            Event::UserLeave { .. } => "userLeave",
            Event::Unrecognized { method } => method,
        }
    }

    pub fn broadcaster(&self) -> Option<&str> {
        match self {
            Event::BroadcastStart { broadcaster }
            | Event::BroadcastStop { broadcaster }
            | Event::ChatMessage { broadcaster, .. }
            | Event::FanclubJoin { broadcaster, .. }
            | Event::Follow { broadcaster, .. }
            | Event::Unfollow { broadcaster, .. }
            | Event::MediaPurchase { broadcaster, .. }
            | Event::PrivateMessage { broadcaster, .. }
            | Event::RoomSubjectChange { broadcaster, .. }
            | Event::Tip { broadcaster, .. }
            | Event::UserEnter { broadcaster, .. }
            | Event::UserLeave { broadcaster, .. } => Some(broadcaster.as_str()),
            Event::Unrecognized { .. } => None,
        }
    }

    /// The acting user, if the event has one. Anonymous tips report none.
    pub fn username(&self) -> Option<&str> {
        match self {
            Event::ChatMessage { username, .. }
            | Event::FanclubJoin { username, .. }
            | Event::Follow { username, .. }
            | Event::Unfollow { username, .. }
            | Event::MediaPurchase { username, .. }
            | Event::UserEnter { username, .. }
            | Event::UserLeave { username, .. } => Some(username.as_str()),
            Event::PrivateMessage { from_user, .. } => Some(from_user.as_str()),
            Event::Tip {
                username, is_anon, ..
            } => (!is_anon).then_some(username.as_str()),
            _ => None,
        }
    }
}

// ── Output records ────────────────────────────────────────────────────

/// A rendered event as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedEvent {
    pub method: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcaster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Counters for one poll run, reported on exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub pages_fetched: u64,
    pub events_received: u64,
    pub events_formatted: u64,
    pub events_skipped: u64,
    pub events_unrecognized: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawEvent {
        serde_json::from_value(value).expect("valid raw event")
    }

    #[test]
    fn page_defaults_when_fields_absent() {
        let page: Page = serde_json::from_value(json!({})).unwrap();
        let (events, next) = page.into_parts();
        assert!(events.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn page_null_events_and_empty_next_url() {
        let page: Page = serde_json::from_value(json!({"events": null, "nextUrl": ""})).unwrap();
        let (events, next) = page.into_parts();
        assert!(events.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn parses_tip_with_defaults() {
        let event = Event::from_raw(raw(json!({
            "method": "tip",
            "object": {
                "broadcaster": "alice",
                "user": {"username": "bob", "inFanclub": false},
                "tip": {"tokens": 25}
            }
        })))
        .unwrap();
        assert_eq!(
            event,
            Event::Tip {
                broadcaster: "alice".into(),
                username: "bob".into(),
                tokens: 25,
                is_anon: false,
                message: String::new(),
            }
        );
        assert_eq!(event.username(), Some("bob"));
    }

    #[test]
    fn anonymous_tip_hides_username() {
        let event = Event::from_raw(raw(json!({
            "method": "tip",
            "object": {
                "broadcaster": "alice",
                "user": {"username": "bob"},
                "tip": {"tokens": 5, "isAnon": true, "message": null}
            }
        })))
        .unwrap();
        assert_eq!(event.username(), None);
        assert_eq!(event.broadcaster(), Some("alice"));
    }

    #[test]
    fn tip_without_tip_object_is_an_error() {
        let result = Event::from_raw(raw(json!({
            "method": "tip",
            "object": {"broadcaster": "alice", "user": {"username": "bob"}}
        })));
        assert!(result.is_err());
    }

    #[test]
    fn subject_accepts_string_or_object() {
        let flat = Event::from_raw(raw(json!({
            "method": "roomSubjectChange",
            "object": {"broadcaster": "alice", "subject": "Goal: 100"}
        })))
        .unwrap();
        let nested = Event::from_raw(raw(json!({
            "method": "roomSubjectChange",
            "object": {"broadcaster": "alice", "subject": {"subject": "Goal: 100"}}
        })))
        .unwrap();
        assert_eq!(flat, nested);
    }

    #[test]
    fn private_message_falls_back_to_user_and_broadcaster() {
        let event = Event::from_raw(raw(json!({
            "method": "privateMessage",
            "object": {
                "broadcaster": "alice",
                "user": {"username": "carol"},
                "message": {"message": "hi"}
            }
        })))
        .unwrap();
        assert_eq!(
            event,
            Event::PrivateMessage {
                broadcaster: "alice".into(),
                from_user: "carol".into(),
                to_user: "alice".into(),
                message: "hi".into(),
            }
        );
    }

    #[test]
    fn private_message_without_sender_is_an_error() {
        let result = Event::from_raw(raw(json!({
            "method": "privateMessage",
            "object": {"broadcaster": "alice", "message": {"message": "hi"}}
        })));
        assert!(result.is_err());
    }

    #[test]
    fn shared_user_payload_maps_to_each_method() {
        for method in ["fanclubJoin", "follow", "unfollow", "userEnter", "userLeave"] {
            let event = Event::from_raw(raw(json!({
                "method": method,
                "object": {"broadcaster": "alice", "user": {"username": "dave"}}
            })))
            .unwrap();
            assert_eq!(event.method(), method);
            assert_eq!(event.username(), Some("dave"));
        }
    }

    #[test]
    fn unknown_method_is_unrecognized_not_error() {
        let event = Event::from_raw(raw(json!({
            "method": "unknownMethod",
            "object": {"whatever": 1}
        })))
        .unwrap();
        assert_eq!(
            event,
            Event::Unrecognized {
                method: "unknownMethod".into()
            }
        );
        assert_eq!(event.broadcaster(), None);
    }
}
