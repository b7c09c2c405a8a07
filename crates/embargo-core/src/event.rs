//! Collection events.
//!
//! Every state change a collection goes through is appended to its
//! description as an [`Event`]. The log is ordered and never rewritten.

use serde::{Deserialize, Serialize};

/// What happened to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    ApprovalSubmitted,
    Approved,
    ApprovalFailed,
    Unlocked,
    Deleted,
}

/// A single entry in a collection's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unix milliseconds.
    pub date: i64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Who triggered the event.
    pub email: String,
    /// Error text for failure events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_text: Option<String>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(event_type: EventType, email: impl Into<String>) -> Self {
        Self {
            date: now_millis(),
            event_type,
            email: email.into(),
            exception_text: None,
        }
    }

    /// Create a failure event carrying the error that caused it.
    pub fn failure(
        event_type: EventType,
        email: impl Into<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            exception_text: Some(error_chain(error)),
            ..Self::new(event_type, email)
        }
    }
}

/// An error and its sources, joined with `": "`.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "stage failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_failure_event_carries_cause_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let event = Event::failure(EventType::ApprovalFailed, "a@b.c", &err);

        assert_eq!(event.event_type, EventType::ApprovalFailed);
        assert_eq!(event.exception_text.as_deref(), Some("stage failed: disk full"));
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event {
            date: 42,
            event_type: EventType::Approved,
            email: "a@b.c".into(),
            exception_text: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"date":42,"type":"APPROVED","email":"a@b.c"}"#);
    }
}
