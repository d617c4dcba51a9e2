//! A header-map transport binding.
//!
//! Binary mode carries each attribute in a `ce-<name>` header, except
//! `datacontenttype`, which travels as `content-type`. Structured mode
//! carries a `content-type` starting with `application/cloudevents` and the
//! serialized event as body. Header names are case-insensitive.

use std::collections::BTreeMap;

use async_trait::async_trait;
use herald_core::content_type;
use herald_core::{Attribute, AttributeKind, SpecVersion, Value};
use tracing::trace;

use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{
    BinaryWriter, Message, MetadataReader, MetadataWriter, StructuredWriter,
};

/// Prefix of attribute headers.
pub const CE_PREFIX: &str = "ce-";

/// The content type header.
pub const CONTENT_TYPE: &str = "content-type";

const SPEC_VERSION_HEADER: &str = "ce-specversion";

/// A message received as headers plus body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMessage {
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl HeaderMessage {
    /// A message from headers and a body. Header names are lowercased.
    pub fn new<I, K, V>(headers: I, body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body: body.into(),
        }
    }

    /// A header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keyed by lowercased name.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn version(&self) -> BindingResult<SpecVersion> {
        let raw = self.header(SPEC_VERSION_HEADER).ok_or(BindingError::NotBinary)?;
        Ok(raw.trim().parse()?)
    }
}

#[async_trait]
impl Message for HeaderMessage {
    fn encoding(&self) -> Encoding {
        if self.header(CONTENT_TYPE).is_some_and(content_type::is_structured) {
            Encoding::Structured
        } else if self.headers.contains_key(SPEC_VERSION_HEADER) {
            Encoding::Binary
        } else {
            Encoding::Unknown
        }
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        if self.encoding() != Encoding::Structured {
            return Err(BindingError::NotStructured);
        }
        let media_type = self.header(CONTENT_TYPE).unwrap_or_default();
        writer.set_structured_event(media_type, &self.body)
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        if self.encoding() != Encoding::Binary {
            return Err(BindingError::NotBinary);
        }
        let version = self.version()?;
        writer.set_attribute(
            Attribute::new(AttributeKind::SpecVersion, version),
            Some(Value::from(version.as_str())),
        )?;

        for (name, raw) in &self.headers {
            if name == CONTENT_TYPE {
                writer.set_attribute(
                    Attribute::new(AttributeKind::DataContentType, version),
                    Some(Value::from(raw.as_str())),
                )?;
                continue;
            }
            let Some(attr_name) = name.strip_prefix(CE_PREFIX) else {
                continue;
            };
            match version.attribute(attr_name) {
                Some(attribute) if attribute.kind() == AttributeKind::SpecVersion => {},
                Some(attribute) => {
                    let value = Value::parse(attribute.value_kind(), raw).map_err(|e| {
                        BindingError::InvalidHeader {
                            name: name.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    writer.set_attribute(attribute, Some(value))?;
                },
                None => writer.set_extension(attr_name, Some(Value::from(raw.as_str())))?,
            }
        }

        if !self.body.is_empty() {
            writer.set_data(&self.body)?;
        }
        trace!(headers = self.headers.len(), "binary headers read");
        Ok(())
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        (self.encoding() == Encoding::Binary).then_some(self as &dyn MetadataReader)
    }

    fn finish(&self, _error: Option<BindingError>) -> BindingResult<()> {
        Ok(())
    }
}

impl MetadataReader for HeaderMessage {
    fn spec_version(&self) -> SpecVersion {
        self.version().unwrap_or_default()
    }

    fn attribute(&self, kind: AttributeKind) -> Option<Value> {
        let version = MetadataReader::spec_version(self);
        if kind == AttributeKind::DataContentType {
            return self.header(CONTENT_TYPE).map(Value::from);
        }
        let raw = self.header(&format!("{CE_PREFIX}{}", kind.name(version)?))?;
        Value::parse(kind.value_kind(version), raw).ok()
    }

    fn extension(&self, name: &str) -> Option<Value> {
        self.header(&format!("{CE_PREFIX}{name}")).map(Value::from)
    }
}

/// Collects headers and a body. Writes either mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderWriter {
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl HeaderWriter {
    /// An empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers written so far.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The written headers and body as a message.
    #[must_use]
    pub fn into_message(self) -> HeaderMessage {
        HeaderMessage {
            headers: self.headers,
            body: self.body,
        }
    }

    fn put(&mut self, key: String, value: Option<Value>) {
        match value {
            Some(value) => {
                self.headers.insert(key, value.to_string());
            },
            None => {
                self.headers.remove(&key);
            },
        }
    }
}

impl MetadataWriter for HeaderWriter {
    fn set_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> BindingResult<()> {
        let key = if attribute.kind() == AttributeKind::DataContentType {
            CONTENT_TYPE.to_owned()
        } else {
            format!("{CE_PREFIX}{}", attribute.name())
        };
        self.put(key, value);
        Ok(())
    }

    fn set_extension(&mut self, name: &str, value: Option<Value>) -> BindingResult<()> {
        self.put(format!("{CE_PREFIX}{}", name.to_ascii_lowercase()), value);
        Ok(())
    }
}

impl BinaryWriter for HeaderWriter {
    fn start(&mut self) -> BindingResult<()> {
        self.headers.clear();
        self.body.clear();
        Ok(())
    }

    fn set_data(&mut self, data: &[u8]) -> BindingResult<()> {
        self.body = data.to_vec();
        Ok(())
    }
}

impl StructuredWriter for HeaderWriter {
    fn set_structured_event(&mut self, media_type: &str, body: &[u8]) -> BindingResult<()> {
        self.headers.clear();
        self.headers.insert(CONTENT_TYPE.to_owned(), media_type.to_owned());
        self.body = body.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::Event;

    fn binary() -> HeaderMessage {
        HeaderMessage::new(
            [
                ("CE-SpecVersion", "0.3"),
                ("ce-id", "1"),
                ("ce-type", "t"),
                ("ce-source", "/s"),
                ("ce-time", "2020-01-01T00:00:00Z"),
                ("ce-schemaurl", "/schema"),
                ("ce-exta", "x"),
                ("Content-Type", "text/plain"),
            ],
            b"hello".to_vec(),
        )
    }

    #[test]
    fn test_encoding_detection() {
        assert_eq!(binary().encoding(), Encoding::Binary);
        let structured = HeaderMessage::new(
            [("content-type", "application/cloudevents+json; charset=utf-8")],
            Vec::new(),
        );
        assert_eq!(structured.encoding(), Encoding::Structured);
        assert_eq!(
            HeaderMessage::new([("content-type", "text/plain")], Vec::new()).encoding(),
            Encoding::Unknown
        );
    }

    #[tokio::test]
    async fn test_binary_read_types_attributes() {
        let mut event = Event::default();
        binary().read_binary(&mut event).await.unwrap();
        assert_eq!(event.spec_version(), SpecVersion::V03);
        assert!(event.time().is_some());
        assert_eq!(event.data_schema(), Some("/schema"));
        assert_eq!(event.extension("exta"), Some(&Value::from("x")));
        assert_eq!(event.data_content_type(), Some("text/plain"));
        assert_eq!(event.data(), Some(b"hello".as_slice()));
        assert!(event.validate().is_ok());
    }

    #[tokio::test]
    async fn test_bad_header_value() {
        let message = HeaderMessage::new(
            [("ce-specversion", "1.0"), ("ce-time", "yesterday")],
            Vec::new(),
        );
        let err = message.read_binary(&mut Event::default()).await.unwrap_err();
        assert!(matches!(err, BindingError::InvalidHeader { ref name, .. } if name == "ce-time"));
    }

    #[tokio::test]
    async fn test_wrong_mode() {
        let mut writer = HeaderWriter::new();
        let err = binary().read_structured(&mut writer).await.unwrap_err();
        assert!(matches!(err, BindingError::NotStructured));
    }

    #[test]
    fn test_metadata_reader() {
        let message = binary();
        let reader = message.metadata_reader().unwrap();
        assert_eq!(reader.spec_version(), SpecVersion::V03);
        assert_eq!(reader.attribute(AttributeKind::Id), Some(Value::from("1")));
        assert_eq!(
            reader.attribute(AttributeKind::DataContentType),
            Some(Value::from("text/plain"))
        );
        assert_eq!(reader.extension("exta"), Some(Value::from("x")));
        assert!(reader.attribute(AttributeKind::Subject).is_none());
    }

    #[test]
    fn test_writer_maps_names() {
        let mut writer = HeaderWriter::new();
        writer
            .set_attribute(
                Attribute::new(AttributeKind::DataContentType, SpecVersion::V10),
                Some(Value::from("application/json")),
            )
            .unwrap();
        writer
            .set_attribute(
                Attribute::new(AttributeKind::Id, SpecVersion::V10),
                Some(Value::from("1")),
            )
            .unwrap();
        writer.set_extension("Ext", Some(Value::Integer(3))).unwrap();
        writer.set_extension("ext", None).unwrap();
        assert_eq!(writer.headers().get("content-type").map(String::as_str), Some("application/json"));
        assert_eq!(writer.headers().get("ce-id").map(String::as_str), Some("1"));
        assert!(!writer.headers().contains_key("ce-ext"));
    }
}
