//! Spec versions and their attribute tables.

use std::fmt;
use std::str::FromStr;

use crate::error::EventError;
use crate::value::ValueKind;

/// A supported CloudEvents specification version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    /// CloudEvents 0.3.
    V03,
    /// CloudEvents 1.0.
    #[default]
    V10,
}

const V03_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::SpecVersion,
    AttributeKind::Id,
    AttributeKind::Type,
    AttributeKind::Source,
    AttributeKind::Subject,
    AttributeKind::Time,
    AttributeKind::DataSchema,
    AttributeKind::DataContentType,
    AttributeKind::DataContentEncoding,
];

const V10_ATTRIBUTES: &[AttributeKind] = &[
    AttributeKind::SpecVersion,
    AttributeKind::Id,
    AttributeKind::Type,
    AttributeKind::Source,
    AttributeKind::Subject,
    AttributeKind::Time,
    AttributeKind::DataSchema,
    AttributeKind::DataContentType,
];

impl SpecVersion {
    /// Every supported version, newest first.
    pub const ALL: [SpecVersion; 2] = [SpecVersion::V10, SpecVersion::V03];

    /// The wire string (`"0.3"` or `"1.0"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V03 => "0.3",
            Self::V10 => "1.0",
        }
    }

    /// Context attributes defined by this version, `specversion` first.
    #[must_use]
    pub fn attributes(self) -> &'static [AttributeKind] {
        match self {
            Self::V03 => V03_ATTRIBUTES,
            Self::V10 => V10_ATTRIBUTES,
        }
    }

    /// Look up a context attribute by its wire name.
    #[must_use]
    pub fn attribute(self, name: &str) -> Option<Attribute> {
        self.attributes()
            .iter()
            .copied()
            .find(|kind| kind.name(self) == Some(name))
            .map(|kind| Attribute::new(kind, self))
    }

    /// Whether `name` is defined by this version and therefore cannot be
    /// used as an extension name. Includes the payload keys.
    #[must_use]
    pub fn is_reserved(self, name: &str) -> bool {
        if self.attribute(name).is_some() || name == "data" {
            return true;
        }
        self == Self::V10 && name == "data_base64"
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpecVersion {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0.3" => Ok(Self::V03),
            "1.0" => Ok(Self::V10),
            other => Err(EventError::UnknownSpecVersion(other.to_owned())),
        }
    }
}

impl TryFrom<&str> for SpecVersion {
    type Error = EventError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A context attribute, independent of the version that names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// `specversion`.
    SpecVersion,
    /// `id`.
    Id,
    /// `type`.
    Type,
    /// `source`.
    Source,
    /// `subject`.
    Subject,
    /// `time`.
    Time,
    /// `dataschema` in 1.0, `schemaurl` in 0.3.
    DataSchema,
    /// `datacontenttype`.
    DataContentType,
    /// `datacontentencoding`, 0.3 only.
    DataContentEncoding,
}

impl AttributeKind {
    /// Wire name of the attribute in `version`, or `None` when the version
    /// does not define it.
    #[must_use]
    pub fn name(self, version: SpecVersion) -> Option<&'static str> {
        Some(match (self, version) {
            (Self::SpecVersion, _) => "specversion",
            (Self::Id, _) => "id",
            (Self::Type, _) => "type",
            (Self::Source, _) => "source",
            (Self::Subject, _) => "subject",
            (Self::Time, _) => "time",
            (Self::DataSchema, SpecVersion::V03) => "schemaurl",
            (Self::DataSchema, SpecVersion::V10) => "dataschema",
            (Self::DataContentType, _) => "datacontenttype",
            (Self::DataContentEncoding, SpecVersion::V03) => "datacontentencoding",
            (Self::DataContentEncoding, SpecVersion::V10) => return None,
        })
    }

    /// Type of the attribute's value in `version`.
    #[must_use]
    pub fn value_kind(self, version: SpecVersion) -> ValueKind {
        match (self, version) {
            (Self::Source, _) | (Self::DataSchema, SpecVersion::V03) => ValueKind::UriRef,
            (Self::DataSchema, SpecVersion::V10) => ValueKind::Uri,
            (Self::Time, _) => ValueKind::Timestamp,
            _ => ValueKind::String,
        }
    }

    /// Whether every valid event must carry the attribute.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::SpecVersion | Self::Id | Self::Type | Self::Source)
    }
}

/// An attribute as named by a specific version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    kind: AttributeKind,
    version: SpecVersion,
}

impl Attribute {
    /// Pair an attribute kind with a version.
    #[must_use]
    pub fn new(kind: AttributeKind, version: SpecVersion) -> Self {
        Self { kind, version }
    }

    /// The version-independent kind.
    #[must_use]
    pub fn kind(self) -> AttributeKind {
        self.kind
    }

    /// The version naming this attribute.
    #[must_use]
    pub fn version(self) -> SpecVersion {
        self.version
    }

    /// Wire name; empty when the version does not define the kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.kind.name(self.version).unwrap_or_default()
    }

    /// Type of the attribute's value.
    #[must_use]
    pub fn value_kind(self) -> ValueKind {
        self.kind.value_kind(self.version)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!("1.0".parse::<SpecVersion>().unwrap(), SpecVersion::V10);
        assert_eq!("0.3".parse::<SpecVersion>().unwrap(), SpecVersion::V03);
        assert!("0.2".parse::<SpecVersion>().is_err());
        assert_eq!(SpecVersion::default(), SpecVersion::V10);
    }

    #[test]
    fn test_attribute_names_per_version() {
        assert_eq!(
            AttributeKind::DataSchema.name(SpecVersion::V03),
            Some("schemaurl")
        );
        assert_eq!(
            AttributeKind::DataSchema.name(SpecVersion::V10),
            Some("dataschema")
        );
        assert_eq!(AttributeKind::DataContentEncoding.name(SpecVersion::V10), None);
        assert_eq!(
            SpecVersion::V03.attribute("schemaurl").map(Attribute::kind),
            Some(AttributeKind::DataSchema)
        );
        assert!(SpecVersion::V10.attribute("schemaurl").is_none());
    }

    #[test]
    fn test_specversion_listed_first() {
        for v in SpecVersion::ALL {
            assert_eq!(v.attributes()[0], AttributeKind::SpecVersion);
        }
    }

    #[test]
    fn test_reserved_names() {
        assert!(SpecVersion::V10.is_reserved("data_base64"));
        assert!(!SpecVersion::V03.is_reserved("dataschema"));
        assert!(SpecVersion::V03.is_reserved("datacontentencoding"));
        assert!(!SpecVersion::V10.is_reserved("datacontentencoding"));
        assert!(SpecVersion::V10.is_reserved("data"));
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(
            AttributeKind::DataSchema.value_kind(SpecVersion::V10),
            ValueKind::Uri
        );
        assert_eq!(
            AttributeKind::DataSchema.value_kind(SpecVersion::V03),
            ValueKind::UriRef
        );
        assert_eq!(
            AttributeKind::Time.value_kind(SpecVersion::V10),
            ValueKind::Timestamp
        );
    }
}
