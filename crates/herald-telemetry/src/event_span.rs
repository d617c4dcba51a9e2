//! Event-scoped spans for correlating log lines.

use chrono::{DateTime, Utc};
use herald_core::Event;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity of an event as recorded on log lines.
///
/// Every span created from the same `EventSpan` shares a `correlation_id`,
/// so processing steps of one event can be grouped even when the event's
/// own `id` is missing or duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpan {
    /// Correlation identifier, unique per processed event.
    pub correlation_id: Uuid,
    /// `id` attribute.
    pub event_id: String,
    /// `type` attribute.
    pub event_type: String,
    /// `source` attribute.
    pub event_source: String,
    /// `specversion` attribute.
    pub spec_version: String,
    /// Processing step (e.g. `"to_event"`).
    pub operation: Option<String>,
    /// When processing started.
    pub started_at: DateTime<Utc>,
}

impl EventSpan {
    /// Capture the identity of an event.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            event_id: event.id().to_owned(),
            event_type: event.ty().to_owned(),
            event_source: event.source().to_string(),
            spec_version: event.spec_version().as_str().to_owned(),
            operation: None,
            started_at: Utc::now(),
        }
    }

    /// Name the processing step.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// A span for a later step of the same event.
    #[must_use]
    pub fn child(&self, operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            started_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Milliseconds since processing started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// A `tracing` span carrying the event identity.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "event",
            correlation_id = %self.correlation_id,
            event_id = %self.event_id,
            event_type = %self.event_type,
            event_source = %self.event_source,
            spec_version = %self.spec_version,
            operation = self.operation.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SpecVersion;

    fn event() -> Event {
        let mut event = Event::new(SpecVersion::V03);
        event.set_id("A-1");
        event.set_type("com.example.created");
        event.set_source("/orders");
        event
    }

    #[test]
    fn test_from_event() {
        let span = EventSpan::from_event(&event()).with_operation("decode");
        assert_eq!(span.event_id, "A-1");
        assert_eq!(span.event_source, "/orders");
        assert_eq!(span.spec_version, "0.3");
        assert_eq!(span.operation.as_deref(), Some("decode"));
        assert!(span.elapsed_ms() >= 0);
    }

    #[test]
    fn test_child_keeps_correlation() {
        let parent = EventSpan::from_event(&event());
        let child = parent.child("write");
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.operation.as_deref(), Some("write"));
    }

    #[test]
    fn test_span_enters() {
        let span = EventSpan::from_event(&event()).span();
        let _guard = span.enter();
        tracing::info!("inside event span");
    }
}
