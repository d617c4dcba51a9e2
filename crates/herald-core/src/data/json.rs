//! `application/json` and `text/json` payloads.

use super::{Payload, PayloadSink, unsupported};
use crate::error::{CodecError, CodecResult};

/// Serialize a serde value as JSON.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] on serializer failure and
/// [`CodecError::UnsupportedValue`] for protobuf messages.
pub fn encode(content_type: &str, payload: Payload<'_>) -> CodecResult<Vec<u8>> {
    match payload {
        Payload::Serde(value) => {
            serde_json::to_vec(value).map_err(|e| CodecError::encode(content_type, e))
        },
        Payload::Proto(_) => Err(unsupported(content_type, "protobuf messages")),
    }
}

/// Deserialize JSON into the sink. Trailing content is rejected.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed JSON or a type mismatch.
pub fn decode(content_type: &str, bytes: &[u8], sink: PayloadSink<'_>) -> CodecResult<()> {
    let PayloadSink::Serde(sink) = sink else {
        return Err(unsupported(content_type, "protobuf messages"));
    };
    let mut de = serde_json::Deserializer::from_slice(bytes);
    sink.fill(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
        .map_err(|e| CodecError::decode(content_type, e))?;
    de.end().map_err(|e| CodecError::decode(content_type, e))
}
