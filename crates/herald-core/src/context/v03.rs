//! CloudEvents 0.3 context.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{DATA_CONTENT_ENCODING_EXT, SCHEMA_URL_EXT, exact_url, validate_common};
use crate::context::ContextV10;
use crate::error::{FieldError, ValidationError};
use crate::spec_version::SpecVersion;
use crate::value::{UriRef, Value};

/// Attributes of a CloudEvents 0.3 event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextV03 {
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
    /// `schemaurl`, possibly relative.
    pub schema_url: Option<UriRef>,
    /// `datacontenttype`.
    pub data_content_type: Option<String>,
    /// `datacontentencoding`; only `base64` is legal.
    pub data_content_encoding: Option<String>,
    /// Extension attributes keyed by lowercase name.
    pub extensions: BTreeMap<String, Value>,
}

impl ContextV03 {
    /// Check every attribute, returning one entry per failing field.
    ///
    /// # Errors
    ///
    /// Returns the collected failures when any attribute is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = validate_common(
            SpecVersion::V03,
            &self.id,
            &self.ty,
            &self.source,
            self.subject.as_deref(),
            self.data_content_type.as_deref(),
            &self.extensions,
        );
        if self.schema_url.as_ref().is_some_and(UriRef::is_empty) {
            errors.insert(
                SCHEMA_URL_EXT,
                FieldError::Invalid("if present, MUST be a non-empty URI-reference".to_owned()),
            );
        }
        if let Some(enc) = &self.data_content_encoding
            && !enc.trim().eq_ignore_ascii_case("base64")
        {
            errors.insert(
                DATA_CONTENT_ENCODING_EXT,
                FieldError::Invalid("if present, MUST be \"base64\"".to_owned()),
            );
        }
        errors.into_result()
    }

    /// Convert to a 1.0 context.
    ///
    /// `datacontentencoding` becomes an extension of the same name. An
    /// absolute `schemaurl` becomes `dataschema` when parsing leaves its text
    /// unchanged; anything else is kept verbatim as a `schemaurl` extension.
    #[must_use]
    pub fn as_v1(&self) -> ContextV10 {
        let mut extensions = self.extensions.clone();

        if let Some(enc) = &self.data_content_encoding {
            extensions.insert(DATA_CONTENT_ENCODING_EXT.to_owned(), Value::from(enc.as_str()));
        }

        let data_schema = self.schema_url.as_ref().and_then(|r| {
            let url = exact_url(r);
            if url.is_none() {
                extensions.insert(SCHEMA_URL_EXT.to_owned(), Value::UriRef(r.clone()));
            }
            url
        });

        ContextV10 {
            id: self.id.clone(),
            ty: self.ty.clone(),
            source: self.source.clone(),
            subject: self.subject.clone(),
            time: self.time,
            data_schema,
            data_content_type: self.data_content_type.clone(),
            extensions,
        }
    }
}
