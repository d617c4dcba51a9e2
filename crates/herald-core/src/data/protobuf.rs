//! `application/protobuf` payloads, wrapped in `google.protobuf.Any`.
//!
//! Encoding wraps every message in an `Any` (an `Any` itself is encoded
//! as is). Decoding first tries to read an `Any` and merge its value into the
//! destination, then falls back to merging the bytes directly. The `Any`
//! type URL is never compared against the destination type: producers and
//! consumers may register the same schema under different names.

use prost::Message;
use prost_types::Any;
use tracing::trace;

use super::{Payload, PayloadSink, unsupported};
use crate::error::{CodecError, CodecResult};

/// Full name of `google.protobuf.Any` itself.
pub const ANY_FULL_NAME: &str = "google.protobuf.Any";

/// Wrap a protobuf message in an `Any` and encode it.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedValue`] for serde values.
pub fn encode(content_type: &str, payload: Payload<'_>) -> CodecResult<Vec<u8>> {
    let Payload::Proto(message) = payload else {
        return Err(unsupported(content_type, "non-protobuf values"));
    };
    if message.full_name() == ANY_FULL_NAME {
        return Ok(message.encode_bytes());
    }
    let any = Any {
        type_url: message.type_url(),
        value: message.encode_bytes(),
    };
    Ok(any.encode_to_vec())
}

/// Decode bytes into a protobuf sink, unwrapping an `Any` when present.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when neither interpretation fits, and
/// [`CodecError::UnsupportedValue`] for serde sinks.
pub fn decode(content_type: &str, bytes: &[u8], sink: PayloadSink<'_>) -> CodecResult<()> {
    let PayloadSink::Proto(sink) = sink else {
        return Err(unsupported(content_type, "non-protobuf destinations"));
    };
    if let Ok(any) = Any::decode(bytes)
        && !any.type_url.is_empty()
    {
        match sink.merge_bytes(&any.value) {
            Ok(()) => return Ok(()),
            Err(e) => {
                trace!(type_url = %any.type_url, error = %e, "Any value did not decode, trying raw bytes");
                sink.reset();
            },
        }
    }
    sink.merge_bytes(bytes)
        .map_err(|e| CodecError::decode(content_type, e))
}

#[cfg(test)]
mod tests {
    use prost_types::Timestamp;

    use super::*;

    #[test]
    fn test_wraps_in_any() {
        let ts = Timestamp {
            seconds: 1_600_000_000,
            nanos: 5,
        };
        let bytes = encode("application/protobuf", Payload::Proto(&ts)).unwrap();
        let any = Any::decode(bytes.as_slice()).unwrap();
        assert!(any.type_url.ends_with("/google.protobuf.Timestamp"));
        assert_eq!(any.value, ts.encode_to_vec());

        let mut out = Timestamp::default();
        decode("application/protobuf", &bytes, PayloadSink::Proto(&mut out)).unwrap();
        assert_eq!(out, ts);
    }

    #[test]
    fn test_falls_back_to_raw_bytes() {
        let ts = Timestamp {
            seconds: 42,
            nanos: 0,
        };
        let mut out = Timestamp::default();
        decode(
            "application/protobuf",
            &ts.encode_to_vec(),
            PayloadSink::Proto(&mut out),
        )
        .unwrap();
        assert_eq!(out, ts);
    }

    #[test]
    fn test_type_url_not_checked() {
        let any = Any {
            type_url: "example.com/some.other.Name".into(),
            value: Timestamp {
                seconds: 7,
                nanos: 0,
            }
            .encode_to_vec(),
        };
        let mut out = Timestamp::default();
        decode(
            "application/protobuf",
            &any.encode_to_vec(),
            PayloadSink::Proto(&mut out),
        )
        .unwrap();
        assert_eq!(out.seconds, 7);
    }

    #[test]
    fn test_any_not_double_wrapped() {
        let any = Any {
            type_url: "type.googleapis.com/google.protobuf.Timestamp".into(),
            value: Timestamp::default().encode_to_vec(),
        };
        let bytes = encode("application/protobuf", Payload::Proto(&any)).unwrap();
        assert_eq!(bytes, any.encode_to_vec());
    }

    #[test]
    fn test_serde_values_rejected() {
        assert!(encode("application/protobuf", Payload::Serde(&1)).is_err());
    }
}
