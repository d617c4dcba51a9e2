//! Test fixtures for events and serialized documents.

use chrono::{DateTime, TimeZone, Utc};
use herald_core::{Event, SpecVersion};

/// A `traceparent` with the sampled flag set.
pub const TEST_TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

/// A 1.0 JSON document with a JSON object payload.
pub const JSON_V1_WITH_DATA: &str = r#"{
    "specversion": "1.0",
    "id": "ABC-123",
    "type": "com.example.order.created",
    "source": "/orders",
    "datacontenttype": "application/json",
    "exta": "value",
    "data": {"a": 42}
}"#;

/// A 1.0 JSON document with a `data_base64` payload (`hello`).
pub const JSON_V1_BASE64: &str = r#"{
    "specversion": "1.0",
    "id": "ABC-124",
    "type": "com.example.blob",
    "source": "/blobs",
    "datacontenttype": "application/octet-stream",
    "data_base64": "aGVsbG8="
}"#;

/// A 0.3 JSON document with a base64 payload (`hello`).
pub const JSON_V03_BASE64: &str = r#"{
    "specversion": "0.3",
    "id": "ABC-125",
    "type": "com.example.blob",
    "source": "/blobs",
    "schemaurl": "/schemas/blob",
    "datacontenttype": "application/octet-stream",
    "datacontentencoding": "base64",
    "data": "aGVsbG8="
}"#;

/// The fixed timestamp used by fixtures.
#[must_use]
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A minimal valid event of `version`.
#[must_use]
pub fn test_event(version: SpecVersion) -> Event {
    let mut event = Event::new(version);
    event.set_id("ABC-123");
    event.set_type("com.example.test");
    event.set_source("/test/source");
    event
}

/// A minimal valid 1.0 event.
#[must_use]
pub fn test_event_v1() -> Event {
    test_event(SpecVersion::V10)
}

/// A minimal valid 0.3 event.
#[must_use]
pub fn test_event_v03() -> Event {
    test_event(SpecVersion::V03)
}

/// A 1.0 event using every optional attribute, an extension and a JSON
/// payload.
#[must_use]
pub fn test_event_full_v1() -> Event {
    let mut event = test_event_v1();
    event.set_subject("orders/1");
    event.set_time(test_time());
    event.set_data_schema("https://schemas.example.com/order");
    event.set_extension("exta", "value");
    event.set_extension("count", 3);
    if let Err(e) = event.set_data("application/json", &serde_json::json!({"a": 42})) {
        tracing::warn!(error = %e, "fixture payload rejected");
    }
    event
}

/// A 0.3 event with a base64-flagged binary payload.
#[must_use]
pub fn test_event_base64_v03() -> Event {
    let mut event = test_event_v03();
    event.set_data_schema("/schemas/blob");
    event.set_data_bytes("application/octet-stream", b"hello".to_vec());
    event.set_data_content_encoding("base64");
    event
}
