//! JSON event format (`application/cloudevents+json`).
//!
//! # Decoding
//!
//! Attributes may appear in any order, but several of them can only be
//! interpreted once `specversion` is known: `schemaurl` is an attribute in
//! 0.3 and an extension in 1.0, `dataschema` the reverse, and so on. The
//! decoder makes a single pass over the object. Version-independent
//! attributes are staged as they arrive; the four version-dependent keys
//! (`schemaurl`, `dataschema`, `datacontentencoding`, `data_base64`) wait in
//! a small pending queue until `specversion` arrives. The payload is captured
//! as raw JSON and decoded exactly once, after every typing attribute has
//! been seen.
//!
//! Extension values keep their JSON type when it is a boolean or a 32-bit
//! integer. Everything else becomes a string, since JSON cannot distinguish
//! a URI or timestamp from a plain string.
//!
//! # Encoding
//!
//! The payload is emitted as raw JSON for JSON content types, as a string
//! for other UTF-8 payloads, and as base64 otherwise or when the event is
//! flagged `data_base64`: under `data_base64` for 1.0, and under `data` with
//! `datacontentencoding: "base64"` for 0.3.

use std::collections::VecDeque;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use herald_core::content_type;
use herald_core::value::parse_timestamp;
use herald_core::{Event, SpecVersion, Value};
use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use tracing::{debug, trace};

use crate::error::{FormatError, FormatResult};
use crate::registry::Format;

const SPECVERSION: &str = "specversion";
const DATACONTENTTYPE: &str = "datacontenttype";
const DATACONTENTENCODING: &str = "datacontentencoding";
const DATA: &str = "data";
const DATA_BASE64: &str = "data_base64";

/// Keys whose meaning depends on the spec version.
const VERSION_DEPENDENT: [&str; 4] = ["schemaurl", "dataschema", DATACONTENTENCODING, DATA_BASE64];

/// Validate and encode an event as a JSON object.
///
/// # Errors
///
/// Returns [`FormatError::Validation`] when the event is invalid.
pub fn encode(event: &Event) -> FormatResult<Vec<u8>> {
    event.validate()?;
    Ok(serde_json::to_vec(&JsonEvent(event))?)
}

/// Decode a JSON object into an event.
///
/// # Errors
///
/// Returns [`FormatError::Json`] for malformed JSON and the other
/// [`FormatError`] variants for well-formed JSON that is not a CloudEvent.
pub fn decode(bytes: &[u8]) -> FormatResult<Event> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let result = Deserializer::deserialize_map(&mut de, EventVisitor)?;
    de.end()?;
    result
}

/// Validate and encode events as a JSON array.
///
/// # Errors
///
/// Returns [`FormatError::Validation`] for the first invalid event.
pub fn encode_batch(events: &[Event]) -> FormatResult<Vec<u8>> {
    for event in events {
        event.validate()?;
    }
    let batch: Vec<JsonEvent<'_>> = events.iter().map(JsonEvent).collect();
    Ok(serde_json::to_vec(&batch)?)
}

/// Decode a JSON array of events.
///
/// # Errors
///
/// Returns the first error encountered.
pub fn decode_batch(bytes: &[u8]) -> FormatResult<Vec<Event>> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let result = Deserializer::deserialize_seq(&mut de, BatchVisitor)?;
    de.end()?;
    result
}

/// The `application/cloudevents+json` format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn media_type(&self) -> &'static str {
        content_type::APPLICATION_CLOUDEVENTS_JSON
    }

    fn marshal(&self, event: &Event) -> FormatResult<Vec<u8>> {
        encode(event)
    }

    fn unmarshal(&self, bytes: &[u8]) -> FormatResult<Event> {
        decode(bytes)
    }
}

/// The `application/cloudevents-batch+json` format.
///
/// As a single-event [`Format`] it writes a one-element array and reads an
/// array holding exactly one event; use [`encode_batch`] and
/// [`decode_batch`] for whole batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchJsonFormat;

impl Format for BatchJsonFormat {
    fn media_type(&self) -> &'static str {
        content_type::APPLICATION_CLOUDEVENTS_BATCH_JSON
    }

    fn marshal(&self, event: &Event) -> FormatResult<Vec<u8>> {
        encode_batch(std::slice::from_ref(event))
    }

    fn unmarshal(&self, bytes: &[u8]) -> FormatResult<Event> {
        let mut events = decode_batch(bytes)?;
        if events.len() != 1 {
            return Err(FormatError::BatchSize(events.len()));
        }
        events.pop().ok_or(FormatError::BatchSize(0))
    }
}

/// Serializes an event as a CloudEvents JSON object, without validating it.
#[derive(Debug, Clone, Copy)]
pub struct JsonEvent<'a>(pub &'a Event);

enum EncodedData<'a> {
    Raw(&'a RawValue),
    Text(&'a str),
    Base64(String),
}

fn encoded_data(event: &Event) -> Option<EncodedData<'_>> {
    let bytes = event.data()?;
    let base64 = event.data_base64() || event.context().is_base64_encoded();
    if !base64 {
        if content_type::is_json(event.data_media_type())
            && let Ok(raw) = serde_json::from_slice::<&RawValue>(bytes)
        {
            return Some(EncodedData::Raw(raw));
        }
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Some(EncodedData::Text(text));
        }
    }
    Some(EncodedData::Base64(STANDARD.encode(bytes)))
}

struct ExtensionValue<'a>(&'a Value);

impl Serialize for ExtensionValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i32(*i),
            other => serializer.collect_str(other),
        }
    }
}

impl Serialize for JsonEvent<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let event = self.0;
        let ctx = event.context();
        let version = ctx.spec_version();
        let data = encoded_data(event);
        let v03_base64 =
            version == SpecVersion::V03 && matches!(data, Some(EncodedData::Base64(_)));

        let mut map = serializer.serialize_map(None)?;
        for kind in version.attributes() {
            let Some(name) = kind.name(version) else {
                continue;
            };
            if name == DATACONTENTENCODING && v03_base64 {
                map.serialize_entry(name, ctx.data_content_encoding().unwrap_or("base64"))?;
            } else if let Some(value) = ctx.get(*kind) {
                map.serialize_entry(name, &value.to_string())?;
            }
        }

        for (name, value) in ctx.extensions() {
            if version.is_reserved(name) {
                continue;
            }
            map.serialize_entry(name, &ExtensionValue(value))?;
        }

        match &data {
            None => {},
            Some(EncodedData::Raw(raw)) => map.serialize_entry(DATA, raw)?,
            Some(EncodedData::Text(text)) => map.serialize_entry(DATA, text)?,
            Some(EncodedData::Base64(b64)) if version == SpecVersion::V03 => {
                map.serialize_entry(DATA, b64)?;
            },
            Some(EncodedData::Base64(b64)) => map.serialize_entry(DATA_BASE64, b64)?,
        }
        map.end()
    }
}

/// Attributes seen so far in a single decoding pass.
#[derive(Default)]
struct Staging {
    version: Option<SpecVersion>,
    id: Option<String>,
    ty: Option<String>,
    source: Option<String>,
    subject: Option<String>,
    time: Option<String>,
    data_content_type: Option<String>,
    content_type_seen: bool,
    schema: Option<String>,
    encoding: Option<String>,
    data: Option<Box<RawValue>>,
    data_base64: Option<String>,
    extensions: Vec<(String, Value)>,
    dependent_seen: Vec<String>,
    pending: VecDeque<(String, serde_json::Value)>,
}

impl Staging {
    fn accept(&mut self, key: String, value: serde_json::Value) -> FormatResult<()> {
        match key.as_str() {
            SPECVERSION => {
                if self.version.is_some() {
                    return Err(FormatError::DuplicateAttribute(key));
                }
                let text = string_attr(&key, value)?.ok_or(FormatError::MissingSpecVersion)?;
                let version: SpecVersion = text.parse()?;
                self.version = Some(version);
                if !self.pending.is_empty() {
                    trace!(pending = self.pending.len(), %version, "resolving deferred attributes");
                }
                while let Some((key, value)) = self.pending.pop_front() {
                    self.resolve(version, key, value)?;
                }
            },
            "id" => self.id = string_attr(&key, value)?,
            "type" => self.ty = string_attr(&key, value)?,
            "source" => self.source = string_attr(&key, value)?,
            "subject" => self.subject = string_attr(&key, value)?,
            "time" => self.time = string_attr(&key, value)?,
            DATACONTENTTYPE => {
                if self.content_type_seen {
                    return Err(FormatError::DuplicateAttribute(key));
                }
                self.content_type_seen = true;
                self.data_content_type = string_attr(&key, value)?;
            },
            k if VERSION_DEPENDENT.contains(&k) => {
                if self.dependent_seen.contains(&key) {
                    return Err(FormatError::DuplicateAttribute(key));
                }
                self.dependent_seen.push(key.clone());
                match self.version {
                    Some(version) => self.resolve(version, key, value)?,
                    None => self.pending.push_back((key, value)),
                }
            },
            _ => self.extension(key, value),
        }
        Ok(())
    }

    fn accept_data(&mut self, raw: Box<RawValue>) -> FormatResult<()> {
        if self.data.is_some() {
            return Err(FormatError::DuplicateAttribute(DATA.to_owned()));
        }
        self.data = Some(raw);
        Ok(())
    }

    fn resolve(
        &mut self,
        version: SpecVersion,
        key: String,
        value: serde_json::Value,
    ) -> FormatResult<()> {
        match (version, key.as_str()) {
            (SpecVersion::V10, "dataschema") | (SpecVersion::V03, "schemaurl") => {
                self.schema = string_attr(&key, value)?;
            },
            (SpecVersion::V03, DATACONTENTENCODING) => {
                let encoding = string_attr(&key, value)?;
                if let Some(enc) = &encoding
                    && !enc.trim().eq_ignore_ascii_case("base64")
                {
                    return Err(FormatError::IllegalEncoding(enc.clone()));
                }
                self.encoding = encoding;
            },
            (SpecVersion::V10, DATA_BASE64) => self.data_base64 = string_attr(&key, value)?,
            _ => self.extension(key, value),
        }
        Ok(())
    }

    fn extension(&mut self, key: String, value: serde_json::Value) {
        let value = match value {
            serde_json::Value::Null => return,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map_or_else(|| Value::String(n.to_string()), Value::Integer),
            other => {
                debug!(extension = %key, "non-scalar extension kept as a JSON string");
                Value::String(other.to_string())
            },
        };
        self.extensions.push((key.to_ascii_lowercase(), value));
    }

    fn finish(self) -> FormatResult<Event> {
        let version = self.version.ok_or(FormatError::MissingSpecVersion)?;
        let mut event = Event::new(version);
        let ctx = event.context_mut();
        ctx.set_id(self.id.unwrap_or_default());
        ctx.set_type(self.ty.unwrap_or_default());
        if let Some(source) = &self.source {
            ctx.set_source(source.as_str())?;
        }
        ctx.set_subject(self.subject);
        if let Some(time) = &self.time {
            ctx.set_time(parse_timestamp(time)?);
        }
        ctx.set_data_schema(self.schema.as_deref())?;
        ctx.set_data_content_type(self.data_content_type);
        if version == SpecVersion::V03 {
            ctx.set_data_content_encoding(self.encoding)?;
        }
        ctx.extensions_mut().extend(self.extensions);

        match (self.data, self.data_base64) {
            (Some(_), Some(_)) => return Err(FormatError::DataConflict),
            (None, Some(b64)) => event.set_data_raw(Some(STANDARD.decode(b64)?), true),
            (Some(raw), None) => decode_data(&mut event, &raw)?,
            (None, None) => {},
        }
        Ok(event)
    }
}

fn decode_data(event: &mut Event, raw: &RawValue) -> FormatResult<()> {
    let text = raw.get();
    if text == "null" {
        return Ok(());
    }
    let base64_encoded = event.context().is_base64_encoded();
    if !base64_encoded && content_type::is_json(event.data_media_type()) {
        event.set_data_raw(Some(text.as_bytes().to_vec()), false);
        return Ok(());
    }
    match serde_json::from_str::<String>(text) {
        Ok(s) if base64_encoded => event.set_data_raw(Some(STANDARD.decode(s)?), true),
        Ok(s) => event.set_data_raw(Some(s.into_bytes()), false),
        Err(_) if base64_encoded => {
            return Err(FormatError::WrongType {
                name: DATA.to_owned(),
                expected: "a base64 string",
            });
        },
        Err(_) => event.set_data_raw(Some(text.as_bytes().to_vec()), false),
    }
    Ok(())
}

fn string_attr(name: &str, value: serde_json::Value) -> FormatResult<Option<String>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Err(FormatError::WrongType {
            name: name.to_owned(),
            expected: "a string",
        }),
    }
}

struct EventVisitor;

impl<'de> Visitor<'de> for EventVisitor {
    type Value = FormatResult<Event>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a CloudEvent JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut staging = Staging::default();
        let mut failure = None;
        while let Some(key) = map.next_key::<String>()? {
            // Keep consuming after a failure so the JSON stays well-formed.
            if failure.is_some() {
                map.next_value::<IgnoredAny>()?;
                continue;
            }
            let result = if key == DATA {
                let raw = map.next_value::<Box<RawValue>>()?;
                staging.accept_data(raw)
            } else {
                let value = map.next_value::<serde_json::Value>()?;
                staging.accept(key, value)
            };
            if let Err(e) = result {
                failure = Some(e);
            }
        }
        Ok(match failure {
            Some(e) => Err(e),
            None => staging.finish(),
        })
    }
}

struct EventSeed;

impl<'de> DeserializeSeed<'de> for EventSeed {
    type Value = FormatResult<Event>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(EventVisitor)
    }
}

struct BatchVisitor;

impl<'de> Visitor<'de> for BatchVisitor {
    type Value = FormatResult<Vec<Event>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of CloudEvent JSON objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut events = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        let mut failure = None;
        while let Some(result) = seq.next_element_seed(EventSeed)? {
            match result {
                Ok(event) => events.push(event),
                Err(e) => {
                    failure.get_or_insert(e);
                },
            }
        }
        Ok(match failure {
            Some(e) => Err(e),
            None => Ok(events),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use herald_core::FieldError;

    fn parse(json: &str) -> serde_json::Value {
        serde_json::from_str(json).unwrap()
    }

    fn reencode(event: &Event) -> serde_json::Value {
        serde_json::from_slice(&encode(event).unwrap()).unwrap()
    }

    const STRUCT_PAYLOAD: &str = r#"{"specversion":"1.0","type":"com.example.test","source":"http://example.com/source","id":"ABC-123","datacontenttype":"application/json","data":{"a":42,"b":"testing"}}"#;

    #[test]
    fn test_v1_struct_payload_round_trip() {
        let event = decode(STRUCT_PAYLOAD.as_bytes()).unwrap();
        assert_eq!(event.spec_version(), SpecVersion::V10);
        assert_eq!(event.id(), "ABC-123");
        assert_eq!(event.data(), Some(br#"{"a":42,"b":"testing"}"#.as_slice()));
        assert!(!event.data_base64());
        assert_eq!(reencode(&event), parse(STRUCT_PAYLOAD));
    }

    #[test]
    fn test_v1_base64_payload() {
        let json = r#"{"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/xml","data_base64":"PEE+PC9BPg=="}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert!(event.data_base64());
        assert_eq!(event.data(), Some(b"<A></A>".as_slice()));
        assert_eq!(event.data_content_type(), Some("application/xml"));
        assert_eq!(reencode(&event), parse(json));
    }

    #[test]
    fn test_attribute_order_is_irrelevant() {
        let canonical = r#"{"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/json","data":{"x":1}}"#;
        let shuffled = r#"{"data":{"x":1},"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"application/json"}"#;
        assert_eq!(
            decode(canonical.as_bytes()).unwrap(),
            decode(shuffled.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_version_dependent_keys_before_specversion() {
        let json = r#"{"dataschema":"http://example.com/schema","schemaurl":"/old","data_base64":"AQID","id":"1","type":"t","source":"/s","specversion":"1.0"}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert_eq!(event.data_schema(), Some("http://example.com/schema"));
        assert_eq!(event.extension("schemaurl"), Some(&Value::from("/old")));
        assert_eq!(event.data(), Some([1u8, 2, 3].as_slice()));

        let json = r#"{"schemaurl":"/old","dataschema":"x","id":"1","type":"t","source":"/s","specversion":"0.3"}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert_eq!(event.data_schema(), Some("/old"));
        assert_eq!(event.extension("dataschema"), Some(&Value::from("x")));
    }

    #[test]
    fn test_v03_base64_data() {
        let json = r#"{"specversion":"0.3","type":"t","source":"/s","id":"1","datacontenttype":"application/xml","datacontentencoding":"BaSe64","data":"PEE+PC9BPg=="}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert!(event.data_base64());
        assert_eq!(event.data(), Some(b"<A></A>".as_slice()));

        let out = reencode(&event);
        assert_eq!(out["data"], "PEE+PC9BPg==");
        assert_eq!(out["datacontentencoding"], "BaSe64");
        assert!(out.get("data_base64").is_none());
    }

    #[test]
    fn test_v03_binary_payload_gains_encoding() {
        let mut event = Event::new(SpecVersion::V03);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event.set_data_bytes("application/octet-stream", vec![0xff, 0x00]);
        let out = reencode(&event);
        assert_eq!(out["datacontentencoding"], "base64");
        assert_eq!(out["data"], "/wA=");
        let back = decode(&encode(&event).unwrap()).unwrap();
        assert_eq!(back.data(), Some([0xff, 0x00].as_slice()));
    }

    #[test]
    fn test_text_payload_is_a_string() {
        let json = r#"{"specversion":"1.0","type":"t","source":"/s","id":"1","datacontenttype":"text/plain","data":"hello"}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert_eq!(event.data(), Some(b"hello".as_slice()));
        assert!(!event.data_base64());
        assert_eq!(reencode(&event), parse(json));
    }

    #[test]
    fn test_missing_content_type_means_json() {
        let json = r#"{"specversion":"1.0","type":"t","source":"/s","id":"1","data":"hello"}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert_eq!(event.data(), Some(br#""hello""#.as_slice()));
        assert_eq!(reencode(&event), parse(json));
    }

    #[test]
    fn test_structural_errors() {
        let cases: [(&str, fn(&FormatError) -> bool); 10] = [
            (r#"{"id":"1"}"#, |e| matches!(e, FormatError::MissingSpecVersion)),
            (
                r#"{"specversion":"1.0","specversion":"1.0"}"#,
                |e| matches!(e, FormatError::DuplicateAttribute(k) if k == "specversion"),
            ),
            (
                r#"{"specversion":"1.0","datacontenttype":"a/b","datacontenttype":"a/b"}"#,
                |e| matches!(e, FormatError::DuplicateAttribute(k) if k == "datacontenttype"),
            ),
            (
                r#"{"specversion":"0.3","datacontentencoding":"gzip"}"#,
                |e| matches!(e, FormatError::IllegalEncoding(_)),
            ),
            (
                r#"{"specversion":"1.0","data":1,"data_base64":"AQ=="}"#,
                |e| matches!(e, FormatError::DataConflict),
            ),
            (
                r#"{"specversion":"2.0"}"#,
                |e| matches!(e, FormatError::Event(_)),
            ),
            (
                r#"{"specversion":"1.0","id":5}"#,
                |e| matches!(e, FormatError::WrongType { .. }),
            ),
            (
                r#"{"specversion":"1.0","dataschema":"http://a.example","dataschema":"http://b.example"}"#,
                |e| matches!(e, FormatError::DuplicateAttribute(k) if k == "dataschema"),
            ),
            (
                r#"{"schemaurl":"/a","specversion":"0.3","schemaurl":"/b"}"#,
                |e| matches!(e, FormatError::DuplicateAttribute(k) if k == "schemaurl"),
            ),
            (
                r#"{"specversion":"0.3","datacontentencoding":"base64","data":{"a":1}}"#,
                |e| matches!(e, FormatError::WrongType { name, .. } if name == "data"),
            ),
        ];
        for (json, check) in cases {
            let err = decode(json.as_bytes()).unwrap_err();
            assert!(check(&err), "{json}: {err}");
        }
        assert!(matches!(decode(b"[1]"), Err(FormatError::Json(_))));
        assert!(matches!(decode(b"{\"specversion\":"), Err(FormatError::Json(_))));
    }

    #[test]
    fn test_extension_typing() {
        let json = r#"{"specversion":"1.0","type":"t","source":"/s","id":"1","ExtBool":true,"extint":42,"extbig":3000000000,"extfloat":1.5,"exturi":"http://example.com","extobj":{"a":1},"extnull":null}"#;
        let event = decode(json.as_bytes()).unwrap();
        assert_eq!(event.extension("extbool"), Some(&Value::Boolean(true)));
        assert_eq!(event.extension("extint"), Some(&Value::Integer(42)));
        assert_eq!(event.extension("extbig"), Some(&Value::from("3000000000")));
        assert_eq!(event.extension("extfloat"), Some(&Value::from("1.5")));
        assert_eq!(event.extension("exturi"), Some(&Value::from("http://example.com")));
        assert_eq!(event.extension("extobj"), Some(&Value::from(r#"{"a":1}"#)));
        assert_eq!(event.extension("extnull"), None);
    }

    #[test]
    fn test_encode_requires_valid_event() {
        let mut event = Event::default();
        event.set_id("1");
        let err = encode(&event).unwrap_err();
        let FormatError::Validation(v) = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(v.get("type"), Some(&FieldError::Missing));
    }

    #[test]
    fn test_typed_extensions_and_time_encode() {
        let mut event = Event::default();
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event.set_time(Utc.with_ymd_and_hms(2020, 3, 21, 12, 34, 56).unwrap());
        event.set_extension("flag", true);
        event.set_extension("count", 3);
        event.set_extension("blob", vec![1u8, 2]);
        let out = reencode(&event);
        assert_eq!(out["time"], "2020-03-21T12:34:56Z");
        assert_eq!(out["flag"], true);
        assert_eq!(out["count"], 3);
        assert_eq!(out["blob"], "AQI=");
    }

    #[test]
    fn test_batch_round_trip() {
        let first = decode(STRUCT_PAYLOAD.as_bytes()).unwrap();
        let mut second = first.clone();
        second.set_id("DEF-456");
        let bytes = encode_batch(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(decode_batch(&bytes).unwrap(), vec![first, second]);
        assert!(decode_batch(b"[]").unwrap().is_empty());
        assert!(decode_batch(br#"[{"id":"1"}]"#).is_err());
    }

    #[test]
    fn test_batch_format_single_event() {
        let event = decode(STRUCT_PAYLOAD.as_bytes()).unwrap();
        let bytes = BatchJsonFormat.marshal(&event).unwrap();
        assert_eq!(BatchJsonFormat.unmarshal(&bytes).unwrap(), event);
        assert!(matches!(
            BatchJsonFormat.unmarshal(b"[]"),
            Err(FormatError::BatchSize(0))
        ));
    }
}
