//! Protobuf event format (`application/cloudevents+protobuf`).
//!
//! The envelope is the `io.cloudevents.v1.CloudEvent` message. `id`,
//! `source`, `spec_version` and `type` are typed fields; every other
//! attribute and every extension lives in the `attributes` map with its
//! CloudEvents type preserved.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use herald_core::content_type;
use herald_core::{AttributeKind, Event, SpecVersion, Value, ValueKind};
use prost::Message;
use tracing::warn;

use self::cloud_event::Data;
use self::cloud_event_attribute_value::Attr;
use crate::error::{FormatError, FormatResult};
use crate::registry::Format;

/// The CloudEvent envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CloudEvent {
    /// `id`.
    #[prost(string, tag = "1")]
    pub id: String,
    /// `source`.
    #[prost(string, tag = "2")]
    pub source: String,
    /// `specversion`.
    #[prost(string, tag = "3")]
    pub spec_version: String,
    /// `type`.
    #[prost(string, tag = "4")]
    pub r#type: String,
    /// Optional attributes and extensions.
    #[prost(map = "string, message", tag = "5")]
    pub attributes: HashMap<String, CloudEventAttributeValue>,
    /// The payload.
    #[prost(oneof = "cloud_event::Data", tags = "6, 7, 8")]
    pub data: Option<cloud_event::Data>,
}

/// Nested types of [`CloudEvent`].
pub mod cloud_event {
    /// Payload variants.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        /// Opaque bytes.
        #[prost(bytes, tag = "6")]
        BinaryData(Vec<u8>),
        /// Text.
        #[prost(string, tag = "7")]
        TextData(String),
        /// A protobuf message.
        #[prost(message, tag = "8")]
        ProtoData(prost_types::Any),
    }
}

/// A typed attribute value.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CloudEventAttributeValue {
    /// The value.
    #[prost(oneof = "cloud_event_attribute_value::Attr", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub attr: Option<cloud_event_attribute_value::Attr>,
}

/// Nested types of [`CloudEventAttributeValue`].
pub mod cloud_event_attribute_value {
    /// Attribute value variants.
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Attr {
        /// Boolean.
        #[prost(bool, tag = "1")]
        CeBoolean(bool),
        /// Integer.
        #[prost(int32, tag = "2")]
        CeInteger(i32),
        /// String.
        #[prost(string, tag = "3")]
        CeString(String),
        /// Binary.
        #[prost(bytes, tag = "4")]
        CeBytes(Vec<u8>),
        /// URI.
        #[prost(string, tag = "5")]
        CeUri(String),
        /// URI-reference.
        #[prost(string, tag = "6")]
        CeUriRef(String),
        /// Timestamp.
        #[prost(message, tag = "7")]
        CeTimestamp(prost_types::Timestamp),
    }
}

const PACKAGE: &str = "io.cloudevents.v1";

impl prost::Name for CloudEvent {
    const NAME: &'static str = "CloudEvent";
    const PACKAGE: &'static str = PACKAGE;
}

impl prost::Name for CloudEventAttributeValue {
    const NAME: &'static str = "CloudEventAttributeValue";
    const PACKAGE: &'static str = PACKAGE;
}

/// Validate and encode an event as a protobuf envelope.
///
/// # Errors
///
/// Returns [`FormatError::Validation`] when the event is invalid.
pub fn encode(event: &Event) -> FormatResult<Vec<u8>> {
    event.validate()?;
    Ok(to_proto(event).encode_to_vec())
}

/// Decode a protobuf envelope.
///
/// # Errors
///
/// Returns [`FormatError::Protobuf`] for malformed bytes and the conversion
/// errors of [`from_proto`].
pub fn decode(bytes: &[u8]) -> FormatResult<Event> {
    from_proto(CloudEvent::decode(bytes)?)
}

/// Build the envelope for an event, without validating it.
///
/// Payloads of type `application/protobuf` travel as `proto_data`, with
/// `dataschema` as the `Any` type URL; every other payload travels as
/// `binary_data`.
#[must_use]
pub fn to_proto(event: &Event) -> CloudEvent {
    let ctx = event.context();
    let version = ctx.spec_version();
    let mut attributes = HashMap::new();

    for kind in version.attributes() {
        if matches!(
            kind,
            AttributeKind::SpecVersion | AttributeKind::Id | AttributeKind::Source | AttributeKind::Type
        ) {
            continue;
        }
        if let (Some(name), Some(value)) = (kind.name(version), ctx.get(*kind)) {
            attributes.insert(name.to_owned(), attribute_value(&value));
        }
    }
    for (name, value) in ctx.extensions() {
        if version.is_reserved(name) {
            continue;
        }
        attributes.insert(name.clone(), attribute_value(value));
    }

    let data = event.data().map(|bytes| {
        if content_type::media_type(event.data_media_type())
            .eq_ignore_ascii_case(content_type::APPLICATION_PROTOBUF)
        {
            Data::ProtoData(prost_types::Any {
                type_url: event.data_schema().unwrap_or_default().to_owned(),
                value: bytes.to_vec(),
            })
        } else {
            Data::BinaryData(bytes.to_vec())
        }
    });

    CloudEvent {
        id: ctx.id().to_owned(),
        source: ctx.source().to_string(),
        spec_version: version.as_str().to_owned(),
        r#type: ctx.ty().to_owned(),
        attributes,
        data,
    }
}

/// Build an event from an envelope.
///
/// Attribute values without a variant are skipped. A `binary_data` payload
/// leaves `datacontenttype` as it was sent, possibly unset.
///
/// # Errors
///
/// Returns [`FormatError::MissingSpecVersion`], an unknown spec version, or
/// the conversion error of a typed attribute.
pub fn from_proto(container: CloudEvent) -> FormatResult<Event> {
    if container.spec_version.is_empty() {
        return Err(FormatError::MissingSpecVersion);
    }
    let version: SpecVersion = container.spec_version.parse()?;
    let mut event = Event::new(version);
    let ctx = event.context_mut();
    ctx.set_id(container.id);
    ctx.set_type(container.r#type);
    ctx.set_source(container.source)?;

    for (name, value) in container.attributes {
        let Some(attr) = value.attr else {
            warn!(attribute = %name, "skipping attribute without a value");
            continue;
        };
        let value = from_attribute_value(attr)?;
        match version.attribute(&name).map(|a| a.kind()) {
            Some(
                AttributeKind::SpecVersion
                | AttributeKind::Id
                | AttributeKind::Source
                | AttributeKind::Type,
            ) => {
                warn!(attribute = %name, "ignoring envelope field repeated in attribute map");
            },
            Some(kind) => ctx.set(kind, Some(value))?,
            None => {
                ctx.extensions_mut().insert(name.to_lowercase(), value);
            },
        }
    }

    match container.data {
        None => {},
        Some(Data::ProtoData(any)) => {
            ctx.set_data_content_type(Some(content_type::APPLICATION_PROTOBUF.to_owned()));
            event.set_data_raw(Some(any.value), false);
        },
        Some(Data::BinaryData(bytes)) => event.set_data_raw(Some(bytes), false),
        Some(Data::TextData(text)) => event.set_data_raw(Some(text.into_bytes()), false),
    }
    Ok(event)
}

fn attribute_value(value: &Value) -> CloudEventAttributeValue {
    let attr = match value {
        Value::Boolean(b) => Attr::CeBoolean(*b),
        Value::Integer(i) => Attr::CeInteger(*i),
        Value::String(s) => Attr::CeString(s.clone()),
        Value::Binary(b) => Attr::CeBytes(b.clone()),
        Value::Uri(u) => Attr::CeUri(u.to_string()),
        Value::UriRef(u) => Attr::CeUriRef(u.to_string()),
        Value::Timestamp(t) => Attr::CeTimestamp(prost_types::Timestamp {
            seconds: t.timestamp(),
            nanos: i32::try_from(t.timestamp_subsec_nanos()).unwrap_or_default(),
        }),
    };
    CloudEventAttributeValue { attr: Some(attr) }
}

fn from_attribute_value(attr: Attr) -> FormatResult<Value> {
    Ok(match attr {
        Attr::CeBoolean(b) => Value::Boolean(b),
        Attr::CeInteger(i) => Value::Integer(i),
        Attr::CeString(s) => Value::String(s),
        Attr::CeBytes(b) => Value::Binary(b),
        Attr::CeUri(s) => Value::parse(ValueKind::Uri, &s)?,
        Attr::CeUriRef(s) => Value::parse(ValueKind::UriRef, &s)?,
        Attr::CeTimestamp(ts) => Value::Timestamp(timestamp(&ts)?),
    })
}

fn timestamp(ts: &prost_types::Timestamp) -> FormatResult<DateTime<Utc>> {
    let invalid = || FormatError::InvalidTimestamp {
        seconds: ts.seconds,
        nanos: ts.nanos,
    };
    let nanos = u32::try_from(ts.nanos).map_err(|_| invalid())?;
    DateTime::from_timestamp(ts.seconds, nanos).ok_or_else(invalid)
}

/// The `application/cloudevents+protobuf` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufFormat;

impl Format for ProtobufFormat {
    fn media_type(&self) -> &'static str {
        content_type::APPLICATION_CLOUDEVENTS_PROTOBUF
    }

    fn marshal(&self, event: &Event) -> FormatResult<Vec<u8>> {
        encode(event)
    }

    fn unmarshal(&self, bytes: &[u8]) -> FormatResult<Event> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use herald_core::UriRef;

    fn sample() -> Event {
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("ABC-123");
        event.set_type("com.example.test");
        event.set_source("http://example.com/source");
        event.set_subject("orders/1");
        event.set_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        event.set_data_schema("http://example.com/schema");
        event.set_extension("flag", true);
        event.set_extension("count", 7);
        event.set_extension("blob", vec![1u8, 2, 3]);
        event.set_extension("link", UriRef::parse("/relative").unwrap());
        event
            .set_data("application/json", &serde_json::json!({"a": 42}))
            .unwrap();
        event
    }

    #[test]
    fn test_round_trip_keeps_types() {
        let event = sample();
        let back = decode(&encode(&event).unwrap()).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.extension("count"), Some(&Value::Integer(7)));
        assert!(matches!(back.extension("link"), Some(Value::UriRef(_))));
    }

    #[test]
    fn test_envelope_layout() {
        let pb = to_proto(&sample());
        assert_eq!(pb.spec_version, "1.0");
        assert_eq!(pb.source, "http://example.com/source");
        assert!(!pb.attributes.contains_key("id"));
        assert!(matches!(
            pb.attributes["time"].attr,
            Some(Attr::CeTimestamp(_))
        ));
        assert!(matches!(pb.attributes["dataschema"].attr, Some(Attr::CeUri(_))));
        assert!(matches!(pb.data, Some(Data::BinaryData(_))));
    }

    #[test]
    fn test_v03_round_trip() {
        let mut event = Event::new(SpecVersion::V03);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event.set_data_schema("/schema");
        event.set_data_bytes("application/octet-stream", vec![0u8, 255]);
        event.set_data_content_encoding("base64");

        let pb = to_proto(&event);
        assert!(pb.attributes.contains_key("schemaurl"));
        assert!(pb.attributes.contains_key("datacontentencoding"));

        let back = from_proto(pb).unwrap();
        assert_eq!(back.context(), event.context());
        assert_eq!(back.data(), Some([0u8, 255].as_slice()));
    }

    #[test]
    fn test_proto_payload_uses_any() {
        let ts = prost_types::Timestamp {
            seconds: 1_700_000_000,
            nanos: 5,
        };
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event.set_proto_data(&ts).unwrap();
        event.set_data_schema("https://schemas.example.com/google.protobuf.Timestamp");

        let pb = to_proto(&event);
        let Some(Data::ProtoData(any)) = &pb.data else {
            panic!("expected proto_data");
        };
        assert_eq!(any.type_url, "https://schemas.example.com/google.protobuf.Timestamp");

        let back = from_proto(pb).unwrap();
        assert_eq!(
            back.data_content_type(),
            Some(content_type::APPLICATION_PROTOBUF)
        );
        assert_eq!(back.proto_data_as::<prost_types::Timestamp>().unwrap(), ts);
    }

    #[test]
    fn test_binary_data_without_content_type() {
        let pb = CloudEvent {
            id: "1".into(),
            source: "/s".into(),
            spec_version: "1.0".into(),
            r#type: "t".into(),
            attributes: HashMap::new(),
            data: Some(Data::BinaryData(vec![9, 9])),
        };
        let event = from_proto(pb).unwrap();
        assert_eq!(event.data_content_type(), None);
        assert_eq!(event.data(), Some([9u8, 9].as_slice()));
        assert!(!event.data_base64());
    }

    #[test]
    fn test_text_data() {
        let mut attributes = HashMap::new();
        attributes.insert(
            "datacontenttype".to_owned(),
            CloudEventAttributeValue {
                attr: Some(Attr::CeString("text/plain".into())),
            },
        );
        attributes.insert("empty".to_owned(), CloudEventAttributeValue { attr: None });
        let pb = CloudEvent {
            id: "1".into(),
            source: "/s".into(),
            spec_version: "1.0".into(),
            r#type: "t".into(),
            attributes,
            data: Some(Data::TextData("hello".into())),
        };
        let event = from_proto(pb).unwrap();
        assert_eq!(event.data_as::<String>().unwrap(), "hello");
        assert!(event.extension("empty").is_none());
    }

    #[test]
    fn test_missing_spec_version() {
        let err = from_proto(CloudEvent::default()).unwrap_err();
        assert!(matches!(err, FormatError::MissingSpecVersion));
    }

    #[test]
    fn test_malformed_bytes() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff]).unwrap_err(),
            FormatError::Protobuf(_)
        ));
    }
}
