//! `application/xml` and `text/xml` payloads via `quick-xml`.
//!
//! Values serialize under a `<data>` root element unless they name their
//! own root.

use super::{Payload, PayloadSink, unsupported};
use crate::error::{CodecError, CodecResult};

/// Root element used for encoded values.
pub const ROOT: &str = "data";

/// Serialize a serde value as XML.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] on serializer failure and
/// [`CodecError::UnsupportedValue`] for protobuf messages.
pub fn encode(content_type: &str, payload: Payload<'_>) -> CodecResult<Vec<u8>> {
    let Payload::Serde(value) = payload else {
        return Err(unsupported(content_type, "protobuf messages"));
    };
    quick_xml::se::to_string_with_root(ROOT, value)
        .map(String::into_bytes)
        .map_err(|e| CodecError::encode(content_type, e))
}

/// Deserialize XML into the sink.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when the bytes are not UTF-8 XML matching
/// the sink's type.
pub fn decode(content_type: &str, bytes: &[u8], sink: PayloadSink<'_>) -> CodecResult<()> {
    let PayloadSink::Serde(sink) = sink else {
        return Err(unsupported(content_type, "protobuf messages"));
    };
    let text = std::str::from_utf8(bytes).map_err(|e| CodecError::decode(content_type, e))?;
    let mut de = quick_xml::de::Deserializer::from_str(text);
    sink.fill(&mut <dyn erased_serde::Deserializer>::erase(&mut de))
        .map_err(|e| CodecError::decode(content_type, e))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::data::Slot;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        item: String,
        qty: u32,
    }

    #[test]
    fn test_struct_round_trip() {
        let order = Order {
            item: "widget".into(),
            qty: 3,
        };
        let bytes = encode("application/xml", Payload::Serde(&order)).unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "<data><item>widget</item><qty>3</qty></data>"
        );
        let mut slot = Slot::<Order>::default();
        decode("text/xml", &bytes, PayloadSink::Serde(&mut slot)).unwrap();
        assert_eq!(slot.0, Some(order));
    }
}
