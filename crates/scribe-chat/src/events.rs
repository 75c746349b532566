//! Session event types

use scribe_ai::Message;
use serde::{Deserialize, Serialize};

use crate::failure::ClassifiedError;

/// Events emitted while a session runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session opened its transport
    Started { session_id: String },

    /// The assistant message grew; `content` is the cumulative text
    MessageUpdate { content: String },

    /// The assistant message was finalized
    Finished {
        message: Message,
        mutation_observed: bool,
    },

    /// The session failed; one per failed session
    Errored { error: ClassifiedError },

    /// The user cancelled the session
    Cancelled,
}

impl SessionEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Finished { .. } | SessionEvent::Errored { .. } | SessionEvent::Cancelled
        )
    }
}

/// Broadcast after a reconciliation refreshed project data. Payload-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDataChanged;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::ErrorCategory;

    #[test]
    fn test_terminal_events() {
        assert!(SessionEvent::Cancelled.is_terminal());
        assert!(
            SessionEvent::Errored {
                error: ClassifiedError::timeout()
            }
            .is_terminal()
        );
        assert!(
            !SessionEvent::MessageUpdate {
                content: "Bon".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_serialized_shape() {
        let event = SessionEvent::Errored {
            error: ClassifiedError::timeout(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "errored");
        assert_eq!(value["error"]["category"], "timeout");

        let parsed: SessionEvent = serde_json::from_value(value).unwrap();
        let SessionEvent::Errored { error } = parsed else {
            panic!("expected errored");
        };
        assert_eq!(error.category, ErrorCategory::Timeout);
    }
}
