//! End-to-end format scenarios.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use herald_core::content_type::{
    APPLICATION_CLOUDEVENTS_JSON, APPLICATION_CLOUDEVENTS_PROTOBUF, APPLICATION_PROTOBUF,
};
use herald_core::{Event, EventContext, SpecVersion, Value};
use herald_format::{json, protobuf, registry};
use herald_test::{JSON_V03_BASE64, JSON_V1_BASE64, JSON_V1_WITH_DATA, test_event_base64_v03};
use serde_json::json;

fn as_json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

#[test]
fn test_json_v1_struct_payload_round_trip() {
    let input = json!({
        "specversion": "1.0",
        "type": "com.example.test",
        "source": "http://example.com/source",
        "id": "ABC-123",
        "datacontenttype": "application/json",
        "data": {"a": 42, "b": "testing"}
    });
    let bytes = serde_json::to_vec(&input).unwrap();
    let event = registry::unmarshal(APPLICATION_CLOUDEVENTS_JSON, &bytes).unwrap();

    assert_eq!(event.spec_version(), SpecVersion::V10);
    assert!(!event.data_base64());
    assert_eq!(
        event.data_as::<serde_json::Value>().unwrap(),
        json!({"a": 42, "b": "testing"})
    );

    let out = registry::marshal(APPLICATION_CLOUDEVENTS_JSON, &event).unwrap();
    assert_eq!(as_json(&out), input);
}

#[test]
fn test_json_v1_base64_payload() {
    let input = br#"{"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/xml","data_base64":"PEE+PC9BPg=="}"#;
    let event = json::decode(input).unwrap();

    assert!(event.data_base64());
    assert_eq!(event.data(), Some(b"<A></A>".as_slice()));
    assert_eq!(event.data_content_type(), Some("application/xml"));
    assert_eq!(as_json(&json::encode(&event).unwrap()), as_json(input));
}

#[test]
fn test_attribute_order_is_unobservable() {
    let shuffled = br#"{"data":{"x":1},"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/json"}"#;
    let canonical = br#"{"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/json","data":{"x":1}}"#;
    assert_eq!(json::decode(shuffled).unwrap(), json::decode(canonical).unwrap());
}

#[test]
fn test_protobuf_payload_through_json() {
    let ts = prost_types::Timestamp {
        seconds: 1_709_294_400,
        nanos: 123,
    };
    let mut event = Event::new(SpecVersion::V10);
    event.set_id("1");
    event.set_type("com.example.tick");
    event.set_source("/clock");
    event.set_proto_data(&ts).unwrap();
    assert_eq!(event.data_content_type(), Some(APPLICATION_PROTOBUF));

    let doc = as_json(&json::encode(&event).unwrap());
    let b64 = doc["data_base64"].as_str().unwrap();
    assert!(doc.get("data").is_none());
    assert_eq!(STANDARD.decode(b64).unwrap(), event.data().unwrap());

    let back = json::decode(&serde_json::to_vec(&doc).unwrap()).unwrap();
    assert_eq!(back.proto_data_as::<prost_types::Timestamp>().unwrap(), ts);
}

#[test]
fn test_cross_version_keeps_content_encoding() {
    let ctx03 = test_event_base64_v03().context().clone();
    assert_eq!(ctx03.data_content_encoding(), Some("base64"));

    let v1 = ctx03.as_version(SpecVersion::V10);
    assert_eq!(v1.spec_version(), SpecVersion::V10);
    assert_eq!(v1.extension("datacontentencoding"), Some(&Value::from("base64")));

    let back: EventContext = v1.as_version(SpecVersion::V03);
    assert_eq!(back, ctx03);
}

#[test]
fn test_fixture_documents_decode() {
    let event = json::decode(JSON_V1_WITH_DATA.as_bytes()).unwrap();
    assert_eq!(event.extension("exta"), Some(&Value::from("value")));

    let event = json::decode(JSON_V1_BASE64.as_bytes()).unwrap();
    assert_eq!(event.data(), Some(b"hello".as_slice()));

    let event = json::decode(JSON_V03_BASE64.as_bytes()).unwrap();
    assert_eq!(event.spec_version(), SpecVersion::V03);
    assert_eq!(event.data(), Some(b"hello".as_slice()));
    assert_eq!(event.data_schema(), Some("/schemas/blob"));
}

#[test]
fn test_json_and_protobuf_agree() {
    let event = json::decode(JSON_V1_WITH_DATA.as_bytes()).unwrap();
    let pb = registry::marshal(APPLICATION_CLOUDEVENTS_PROTOBUF, &event).unwrap();
    let back = protobuf::decode(&pb).unwrap();
    assert_eq!(back.context(), event.context());
    assert_eq!(
        back.data_as::<serde_json::Value>().unwrap(),
        json!({"a": 42})
    );
}
