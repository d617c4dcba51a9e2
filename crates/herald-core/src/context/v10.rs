//! CloudEvents 1.0 context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use url::Url;

use super::{DATA_CONTENT_ENCODING_EXT, SCHEMA_URL_EXT, exact_url, validate_common};
use crate::context::ContextV03;
use crate::error::{FieldError, ValidationError};
use crate::spec_version::SpecVersion;
use crate::value::{UriRef, Value};

/// Attributes of a CloudEvents 1.0 event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextV10 {
    /// `id`.
    pub id: String,
    /// `type`.
    pub ty: String,
    /// `source`.
    pub source: UriRef,
    /// `subject`.
    pub subject: Option<String>,
    /// `time`.
    pub time: Option<DateTime<Utc>>,
    /// `dataschema`, always absolute.
    pub data_schema: Option<Url>,
    /// `datacontenttype`.
    pub data_content_type: Option<String>,
    /// Extension attributes keyed by lowercase name.
    pub extensions: BTreeMap<String, Value>,
}

impl ContextV10 {
    /// Check every attribute, returning one entry per failing field.
    ///
    /// # Errors
    ///
    /// Returns the collected failures when any attribute is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = validate_common(
            SpecVersion::V10,
            &self.id,
            &self.ty,
            &self.source,
            self.subject.as_deref(),
            self.data_content_type.as_deref(),
            &self.extensions,
        );
        if let Some(Value::String(enc)) = self.extensions.get(DATA_CONTENT_ENCODING_EXT)
            && !enc.eq_ignore_ascii_case("base64")
        {
            errors.insert(
                DATA_CONTENT_ENCODING_EXT,
                FieldError::Invalid("if present, MUST be \"base64\"".to_owned()),
            );
        }
        errors.into_result()
    }

    /// Convert to a 0.3 context.
    ///
    /// The `datacontentencoding` extension becomes the 0.3 attribute. A
    /// `schemaurl` extension holding a [`Value::UriRef`] with no exact
    /// `dataschema` form (as left by [`ContextV03::as_v1`]) becomes
    /// `schemaurl` again when no `dataschema` is set. With `dataschema` set,
    /// a `schemaurl` extension has no place in 0.3 and is dropped.
    #[must_use]
    pub fn as_v03(&self) -> ContextV03 {
        let mut extensions = self.extensions.clone();

        let data_content_encoding = extensions
            .remove(DATA_CONTENT_ENCODING_EXT)
            .map(|v| v.to_string());

        let schema_url = match &self.data_schema {
            Some(url) => {
                if extensions.remove(SCHEMA_URL_EXT).is_some() {
                    warn!(id = %self.id, "schemaurl extension dropped in favor of dataschema");
                }
                Some(UriRef::from(url))
            },
            None => match extensions.get(SCHEMA_URL_EXT) {
                Some(Value::UriRef(r)) if exact_url(r).is_none() => {
                    let r = r.clone();
                    extensions.remove(SCHEMA_URL_EXT);
                    Some(r)
                },
                _ => None,
            },
        };

        ContextV03 {
            id: self.id.clone(),
            ty: self.ty.clone(),
            source: self.source.clone(),
            subject: self.subject.clone(),
            time: self.time,
            schema_url,
            data_content_type: self.data_content_type.clone(),
            data_content_encoding,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ContextV10 {
        ContextV10 {
            id: "ABC-123".into(),
            ty: "com.example.test".into(),
            source: UriRef::parse("/source").unwrap(),
            ..ContextV10::default()
        }
    }

    #[test]
    fn test_minimal_is_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_missing_required_fields_reported_individually() {
        let ctx = ContextV10 {
            id: "  ".into(),
            ..ContextV10::default()
        };
        let err = ctx.validate().unwrap_err();
        assert_eq!(err.get("id"), Some(&FieldError::Missing));
        assert_eq!(err.get("type"), Some(&FieldError::Missing));
        assert_eq!(err.get("source"), Some(&FieldError::Missing));
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn test_reserved_extension_rejected() {
        let mut ctx = minimal();
        ctx.extensions.insert("dataschema".into(), Value::from("x"));
        ctx.extensions.insert("Bad-Name".into(), Value::from("x"));
        let err = ctx.validate().unwrap_err();
        assert!(err.contains("dataschema"));
        assert!(err.contains("Bad-Name"));
    }

    #[test]
    fn test_data_schema_moves_to_schema_url() {
        let mut ctx = minimal();
        ctx.data_schema = Some(Url::parse("http://example.com/schema").unwrap());
        let v03 = ctx.as_v03();
        assert_eq!(
            v03.schema_url.as_ref().map(UriRef::as_str),
            Some("http://example.com/schema")
        );
    }

    #[test]
    fn test_encoding_extension_moves_out() {
        let mut ctx = minimal();
        ctx.extensions
            .insert(DATA_CONTENT_ENCODING_EXT.into(), Value::from("base64"));
        let v03 = ctx.as_v03();
        assert_eq!(v03.data_content_encoding.as_deref(), Some("base64"));
        assert!(v03.extensions.is_empty());
    }

    #[test]
    fn test_string_schema_url_extension_round_trips() {
        for text in ["http://example.com/x", "/x"] {
            let mut ctx = minimal();
            ctx.extensions
                .insert(SCHEMA_URL_EXT.into(), Value::from(text));
            let back = ctx.as_v03().as_v1();
            assert!(back.data_schema.is_none());
            assert_eq!(back, ctx);
        }
    }

    #[test]
    fn test_canonical_uri_ref_extension_is_left_alone() {
        let mut ctx = minimal();
        ctx.extensions.insert(
            SCHEMA_URL_EXT.into(),
            Value::UriRef(UriRef::parse("http://example.com/x").unwrap()),
        );
        let v03 = ctx.as_v03();
        assert!(v03.schema_url.is_none());
        assert_eq!(v03.as_v1(), ctx);
    }

    #[test]
    fn test_schema_url_extension_dropped_beside_data_schema() {
        let mut ctx = minimal();
        ctx.data_schema = Some(Url::parse("http://example.com/schema").unwrap());
        ctx.extensions
            .insert(SCHEMA_URL_EXT.into(), Value::from("/other"));
        let v03 = ctx.as_v03();
        assert!(v03.validate().is_ok());
        assert!(v03.extensions.is_empty());
        assert_eq!(
            v03.schema_url.as_ref().map(UriRef::as_str),
            Some("http://example.com/schema")
        );
    }
}
