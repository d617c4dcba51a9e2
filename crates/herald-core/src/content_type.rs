//! Media type constants and helpers.

/// `application/json`.
pub const APPLICATION_JSON: &str = "application/json";
/// `text/json`.
pub const TEXT_JSON: &str = "text/json";
/// `application/xml`.
pub const APPLICATION_XML: &str = "application/xml";
/// `text/xml`.
pub const TEXT_XML: &str = "text/xml";
/// `text/plain`.
pub const TEXT_PLAIN: &str = "text/plain";
/// `application/protobuf`.
pub const APPLICATION_PROTOBUF: &str = "application/protobuf";
/// Prefix shared by every structured CloudEvents media type.
pub const APPLICATION_CLOUDEVENTS: &str = "application/cloudevents";
/// `application/cloudevents+json`.
pub const APPLICATION_CLOUDEVENTS_JSON: &str = "application/cloudevents+json";
/// `application/cloudevents-batch+json`.
pub const APPLICATION_CLOUDEVENTS_BATCH_JSON: &str = "application/cloudevents-batch+json";
/// `application/cloudevents+protobuf`.
pub const APPLICATION_CLOUDEVENTS_PROTOBUF: &str = "application/cloudevents+protobuf";

/// The media type of a content type: parameters stripped, whitespace
/// trimmed. Case is preserved.
///
/// ```
/// use herald_core::content_type::media_type;
/// assert_eq!(media_type("text/plain; charset=utf-8"), "text/plain");
/// ```
#[must_use]
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(mt, _)| mt)
        .trim()
}

/// Lowercased media type, used as a registry key.
#[must_use]
pub fn normalize(content_type: &str) -> String {
    media_type(content_type).to_ascii_lowercase()
}

/// Whether a payload of this content type is JSON text.
///
/// An empty content type counts as JSON.
#[must_use]
pub fn is_json(content_type: &str) -> bool {
    let mt = media_type(content_type);
    mt.is_empty()
        || [
            APPLICATION_JSON,
            TEXT_JSON,
            APPLICATION_CLOUDEVENTS_JSON,
            APPLICATION_CLOUDEVENTS_BATCH_JSON,
        ]
        .iter()
        .any(|json| mt.eq_ignore_ascii_case(json))
}

/// Whether this content type names a structured CloudEvents body.
#[must_use]
pub fn is_structured(content_type: &str) -> bool {
    media_type(content_type)
        .get(..APPLICATION_CLOUDEVENTS.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(APPLICATION_CLOUDEVENTS))
}

/// Loose RFC 2046 check: `type/subtype`, both non-empty tokens.
#[must_use]
pub fn is_valid(content_type: &str) -> bool {
    let Some((ty, subtype)) = media_type(content_type).split_once('/') else {
        return false;
    };
    is_token(ty) && is_token(subtype)
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b)
        })
}
