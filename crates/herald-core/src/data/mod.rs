//! Payload codecs keyed by content type.
//!
//! The registry is process-wide and read-mostly: built-in codecs are
//! installed on first use, and [`add_encoder`]/[`add_decoder`] install or
//! replace entries. Register custom codecs at startup, before events are
//! encoded on other threads.
//!
//! Lookup uses the lowercased media type (parameters stripped). An empty
//! content type is JSON. A `text/*` content type without its own entry falls
//! back to the `text/*` entry.
//!
//! Codecs are type-erased: serde values travel as
//! [`erased_serde::Serialize`] and are decoded through a [`SerdeSink`];
//! protobuf messages travel as [`ProtoData`] and decode into a [`ProtoSink`].

pub mod json;
pub mod protobuf;
pub mod text;
pub mod xml;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::content_type;
use crate::error::{CodecError, CodecResult};

/// A payload offered to an encoder.
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    /// Any serde-serializable value.
    Serde(&'a dyn erased_serde::Serialize),
    /// A protobuf message.
    Proto(&'a dyn ProtoData),
}

impl std::fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serde(_) => f.write_str("Payload::Serde"),
            Self::Proto(p) => write!(f, "Payload::Proto({})", p.type_url()),
        }
    }
}

/// Destination of a decoder.
pub enum PayloadSink<'a> {
    /// Receives a deserializer for the payload.
    Serde(&'a mut dyn SerdeSink),
    /// Receives raw protobuf bytes.
    Proto(&'a mut dyn ProtoSink),
}

/// A protobuf message as seen by encoders.
pub trait ProtoData {
    /// Fully qualified message name, e.g. `google.protobuf.Timestamp`.
    fn full_name(&self) -> String;
    /// Type URL used when wrapping in `Any`.
    fn type_url(&self) -> String;
    /// Wire encoding of the message.
    fn encode_bytes(&self) -> Vec<u8>;
}

impl<M: prost::Name> ProtoData for M {
    fn full_name(&self) -> String {
        M::full_name()
    }

    fn type_url(&self) -> String {
        M::type_url()
    }

    fn encode_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }
}

/// A protobuf message as seen by decoders.
pub trait ProtoSink {
    /// Merge wire bytes into the message.
    ///
    /// # Errors
    ///
    /// Returns the protobuf decode error.
    fn merge_bytes(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError>;
    /// Reset the message to its default.
    fn reset(&mut self);
}

impl<M: prost::Message> ProtoSink for M {
    fn merge_bytes(&mut self, bytes: &[u8]) -> Result<(), prost::DecodeError> {
        self.merge(bytes)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

/// A typed slot filled from a type-erased deserializer.
pub trait SerdeSink {
    /// Deserialize the payload into the slot.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's error.
    fn fill(&mut self, de: &mut dyn erased_serde::Deserializer<'_>) -> Result<(), erased_serde::Error>;
}

/// [`SerdeSink`] holding the decoded value.
#[derive(Debug)]
pub struct Slot<T>(pub Option<T>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: DeserializeOwned> SerdeSink for Slot<T> {
    fn fill(&mut self, de: &mut dyn erased_serde::Deserializer<'_>) -> Result<(), erased_serde::Error> {
        self.0 = Some(erased_serde::deserialize(de)?);
        Ok(())
    }
}

/// Encoder function: `(content_type, payload) -> bytes`.
pub type Encoder = Arc<dyn Fn(&str, Payload<'_>) -> CodecResult<Vec<u8>> + Send + Sync>;

/// Decoder function: `(content_type, bytes, sink)`.
pub type Decoder = Arc<dyn Fn(&str, &[u8], PayloadSink<'_>) -> CodecResult<()> + Send + Sync>;

/// Registry key that every `text/*` type falls back to.
pub const TEXT_WILDCARD: &str = "text/*";

struct Registry {
    encoders: HashMap<String, Encoder>,
    decoders: HashMap<String, Decoder>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut registry = Self {
            encoders: HashMap::new(),
            decoders: HashMap::new(),
        };
        for ct in ["", content_type::APPLICATION_JSON, content_type::TEXT_JSON] {
            registry.install(ct, Arc::new(json::encode), Arc::new(json::decode));
        }
        for ct in [content_type::APPLICATION_XML, content_type::TEXT_XML] {
            registry.install(ct, Arc::new(xml::encode), Arc::new(xml::decode));
        }
        for ct in [content_type::TEXT_PLAIN, TEXT_WILDCARD] {
            registry.install(ct, Arc::new(text::encode), Arc::new(text::decode));
        }
        registry.install(
            content_type::APPLICATION_PROTOBUF,
            Arc::new(protobuf::encode),
            Arc::new(protobuf::decode),
        );
        registry
    }

    fn install(&mut self, ct: &str, encoder: Encoder, decoder: Decoder) {
        self.encoders.insert(ct.to_owned(), encoder);
        self.decoders.insert(ct.to_owned(), decoder);
    }

    fn lookup<'a, F>(map: &'a HashMap<String, F>, content_type: &str) -> Option<&'a F> {
        let key = content_type::normalize(content_type);
        map.get(&key).or_else(|| {
            if key.starts_with("text/") {
                map.get(TEXT_WILDCARD)
            } else {
                None
            }
        })
    }
}

static REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_builtins()));

/// Install or replace the encoder for a content type.
pub fn add_encoder(content_type: &str, encoder: Encoder) {
    let key = content_type::normalize(content_type);
    debug!(content_type = %key, "registering data encoder");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .encoders
        .insert(key, encoder);
}

/// Install or replace the decoder for a content type.
pub fn add_decoder(content_type: &str, decoder: Decoder) {
    let key = content_type::normalize(content_type);
    debug!(content_type = %key, "registering data decoder");
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .decoders
        .insert(key, decoder);
}

/// Whether an encoder is registered for the content type.
#[must_use]
pub fn has_encoder(content_type: &str) -> bool {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    Registry::lookup(&registry.encoders, content_type).is_some()
}

/// Encode a payload with the codec registered for `content_type`.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedContentType`] when nothing is registered,
/// or the codec's own error.
pub fn encode(content_type: &str, payload: Payload<'_>) -> CodecResult<Vec<u8>> {
    let encoder = {
        let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        Registry::lookup(&registry.encoders, content_type).cloned()
    };
    let encoder =
        encoder.ok_or_else(|| CodecError::UnsupportedContentType(content_type.to_owned()))?;
    encoder(content_type, payload)
}

/// Decode bytes into a sink with the codec registered for `content_type`.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedContentType`] when nothing is registered,
/// or the codec's own error.
pub fn decode(content_type: &str, bytes: &[u8], sink: PayloadSink<'_>) -> CodecResult<()> {
    let decoder = {
        let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        Registry::lookup(&registry.decoders, content_type).cloned()
    };
    let decoder =
        decoder.ok_or_else(|| CodecError::UnsupportedContentType(content_type.to_owned()))?;
    decoder(content_type, bytes, sink)
}

/// Encode a serde value.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_serde<T: serde::Serialize>(content_type: &str, value: &T) -> CodecResult<Vec<u8>> {
    encode(content_type, Payload::Serde(value))
}

/// Decode into a serde value.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_serde<T: DeserializeOwned>(content_type: &str, bytes: &[u8]) -> CodecResult<T> {
    let mut slot = Slot::<T>::default();
    decode(content_type, bytes, PayloadSink::Serde(&mut slot))?;
    slot.0.ok_or_else(|| {
        CodecError::decode(content_type, "decoder produced no value".to_owned())
    })
}

pub(crate) fn unsupported(content_type: &str, what: &'static str) -> CodecError {
    CodecError::UnsupportedValue {
        content_type: content_type.to_owned(),
        what,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        a: i32,
        b: String,
    }

    #[test]
    fn test_empty_content_type_is_json() {
        let bytes = encode_serde("", &Sample { a: 42, b: "testing".into() }).unwrap();
        assert_eq!(bytes, br#"{"a":42,"b":"testing"}"#);
    }

    #[test]
    fn test_lookup_ignores_parameters_and_case() {
        let bytes = encode_serde("Application/JSON; charset=utf-8", &1).unwrap();
        assert_eq!(bytes, b"1");
        let s: String = decode_serde("text/markdown", b"# title").unwrap();
        assert_eq!(s, "# title");
    }

    #[test]
    fn test_unknown_content_type() {
        let err = encode_serde("application/x-unknown", &1).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedContentType(_)));
        let err = decode_serde::<i32>("application/x-unknown", b"1").unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedContentType(_)));
    }

    #[test]
    fn test_custom_codec_registration() {
        add_encoder(
            "application/x-shout",
            Arc::new(|_ct: &str, payload: Payload<'_>| match payload {
                Payload::Serde(value) => {
                    let text = serde_json::to_string(value)
                        .map_err(|e| CodecError::encode("application/x-shout", e))?;
                    Ok(text.to_uppercase().into_bytes())
                },
                Payload::Proto(_) => Err(unsupported("application/x-shout", "protobuf")),
            }),
        );
        assert!(has_encoder("application/x-shout"));
        let bytes = encode_serde("application/x-shout", &"hi").unwrap();
        assert_eq!(bytes, br#""HI""#);
    }
}
