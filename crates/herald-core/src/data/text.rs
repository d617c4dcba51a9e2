//! `text/plain` and other `text/*` payloads: the bytes are the string.

use super::{Payload, PayloadSink, unsupported};
use crate::error::{CodecError, CodecResult};

/// Store a string value as its UTF-8 bytes. Only strings are accepted.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedValue`] for anything but a string.
pub fn encode(content_type: &str, payload: Payload<'_>) -> CodecResult<Vec<u8>> {
    let Payload::Serde(value) = payload else {
        return Err(unsupported(content_type, "protobuf messages"));
    };
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s.into_bytes()),
        Ok(_) => Err(unsupported(content_type, "non-string values")),
        Err(e) => Err(CodecError::encode(content_type, e)),
    }
}

/// Hand the payload to the sink as a string.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the bytes are not UTF-8 or the sink
/// does not accept a string.
pub fn decode(content_type: &str, bytes: &[u8], sink: PayloadSink<'_>) -> CodecResult<()> {
    let PayloadSink::Serde(sink) = sink else {
        return Err(unsupported(content_type, "protobuf messages"));
    };
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::decode(content_type, e))?;
    let de = serde_json::Value::String(text.to_owned());
    sink.fill(&mut <dyn erased_serde::Deserializer>::erase(de))
        .map_err(|e| CodecError::decode(content_type, e))
}
