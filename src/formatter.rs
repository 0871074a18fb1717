use crate::types::Event;

/// Strip the optional `|` marker the feed puts in front of tip notes,
/// together with the whitespace around it.
pub fn clean_tip_message(message: &str) -> &str {
    let trimmed = message.trim_start();
    match trimmed.strip_prefix('|') {
        Some(rest) => rest.trim_start(),
        None => message,
    }
}

/// Render an event as a single human-readable line.
///
/// Returns `None` for unrecognized methods, which have nothing to render.
pub fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::BroadcastStart { broadcaster } => {
            format!("Broadcaster {broadcaster} started a broadcast")
        }
        Event::BroadcastStop { broadcaster } => {
            format!("Broadcaster {broadcaster} stopped a broadcast")
        }
        Event::ChatMessage {
            broadcaster,
            username,
            message,
        } => format!(
            "User {username} sent a message '{message}' in the channel of broadcaster {broadcaster}"
        ),
        Event::FanclubJoin {
            broadcaster,
            username,
        } => format!("User {username} joined the fan club of broadcaster {broadcaster}"),
        Event::Follow {
            broadcaster,
            username,
        } => format!("User {username} followed broadcaster {broadcaster}"),
        Event::Unfollow {
            broadcaster,
            username,
        } => format!("User {username} unfollowed broadcaster {broadcaster}"),
        Event::MediaPurchase {
            broadcaster,
            username,
            media_type,
            media_name,
            tokens,
        } => {
            let price = tokens
                .map(|t| format!(" for {t} tokens"))
                .unwrap_or_default();
            format!(
                "User {username} purchased {media_type} {media_name}{price} from broadcaster {broadcaster}"
            )
        }
        Event::PrivateMessage {
            from_user,
            to_user,
            message,
            ..
        } => format!("User {from_user} sent a private message '{message}' to {to_user}"),
        Event::RoomSubjectChange {
            broadcaster,
            subject,
        } => format!("Broadcaster {broadcaster} changed the room subject to '{subject}'"),
        Event::Tip {
            broadcaster,
            username,
            tokens,
            is_anon,
            message,
        } => {
            let who = if *is_anon {
                "An anonymous user".to_string()
            } else {
                format!("User {username}")
            };
            let note = clean_tip_message(message);
            let note = if note.is_empty() {
                String::new()
            } else {
                format!(" with message: '{note}'")
            };
            format!("{who} tipped {tokens} tokens to broadcaster {broadcaster}{note}")
        }
        Event::UserEnter {
            broadcaster,
            username,
        } => format!("User {username} entered the channel of broadcaster {broadcaster}"),
        Event::UserLeave {
            broadcaster,
            username,
        } => format!("User {username} left the channel of broadcaster {broadcaster}"),
        Event::Unrecognized { .. } => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tip(message: &str, is_anon: bool) -> Event {
        Event::Tip {
            broadcaster: "alice".into(),
            username: "bob".into(),
            tokens: 50,
            is_anon,
            message: message.into(),
        }
    }

    #[test]
    fn tip_prefix_is_stripped() {
        let line = describe(&tip(" | hello", false)).unwrap();
        assert!(line.contains("bob"));
        assert!(line.contains("50"));
        assert!(line.contains("alice"));
        assert!(line.contains("hello"));
        assert!(!line.contains(" | "));
        assert_eq!(
            line,
            "User bob tipped 50 tokens to broadcaster alice with message: 'hello'"
        );
    }

    #[test]
    fn tip_without_message_has_no_suffix() {
        let line = describe(&tip("", false)).unwrap();
        assert_eq!(line, "User bob tipped 50 tokens to broadcaster alice");
    }

    #[test]
    fn tip_with_only_marker_has_no_suffix() {
        let line = describe(&tip(" | ", false)).unwrap();
        assert_eq!(line, "User bob tipped 50 tokens to broadcaster alice");
    }

    #[test]
    fn anonymous_tip_omits_username() {
        let line = describe(&tip("thanks", true)).unwrap();
        assert!(!line.contains("bob"));
        assert_eq!(
            line,
            "An anonymous user tipped 50 tokens to broadcaster alice with message: 'thanks'"
        );
    }

    #[test]
    fn clean_tip_message_variants() {
        assert_eq!(clean_tip_message(" | hi"), "hi");
        assert_eq!(clean_tip_message("|hi"), "hi");
        assert_eq!(clean_tip_message("  |   hi there"), "hi there");
        assert_eq!(clean_tip_message("a | b"), "a | b");
        assert_eq!(clean_tip_message("plain"), "plain");
    }

    #[test]
    fn media_purchase_with_and_without_price() {
        let mut event = Event::MediaPurchase {
            broadcaster: "alice".into(),
            username: "bob".into(),
            media_type: "photos".into(),
            media_name: "Beach".into(),
            tokens: Some(30),
        };
        assert_eq!(
            describe(&event).unwrap(),
            "User bob purchased photos Beach for 30 tokens from broadcaster alice"
        );
        if let Event::MediaPurchase { tokens, .. } = &mut event {
            *tokens = None;
        }
        assert_eq!(
            describe(&event).unwrap(),
            "User bob purchased photos Beach from broadcaster alice"
        );
    }

    #[test]
    fn broadcast_and_presence_lines() {
        let start = Event::BroadcastStart {
            broadcaster: "alice".into(),
        };
        assert_eq!(
            describe(&start).unwrap(),
            "Broadcaster alice started a broadcast"
        );

        let leave = Event::UserLeave {
            broadcaster: "alice".into(),
            username: "eve".into(),
        };
        assert_eq!(
            describe(&leave).unwrap(),
            "User eve left the channel of broadcaster alice"
        );
    }

    #[test]
    fn unrecognized_renders_nothing() {
        let event = Event::Unrecognized {
            method: "somethingNew".into(),
        };
        assert!(describe(&event).is_none());
    }
}
