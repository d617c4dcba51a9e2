//! Stock transformers.

use chrono::Utc;
use herald_core::{Attribute, AttributeKind, Event, SpecVersion, Value};
use uuid::Uuid;

use super::{Affinity, Transformer};
use crate::error::BindingResult;
use crate::message::{MetadataReader, MetadataWriter};

type AttributeUpdater = dyn Fn(Option<Value>) -> Option<Value> + Send + Sync;
type ExtensionUpdater = dyn Fn(Option<Value>) -> Value + Send + Sync;

/// Rewrites one attribute. See [`set_attribute`].
pub struct SetAttribute {
    kind: AttributeKind,
    updater: Box<AttributeUpdater>,
}

/// Replace an attribute with `updater(current)`. Returning `None` removes an
/// optional attribute and blanks a required one.
pub fn set_attribute(
    kind: AttributeKind,
    updater: impl Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
) -> SetAttribute {
    SetAttribute {
        kind,
        updater: Box::new(updater),
    }
}

/// Remove an attribute.
#[must_use]
pub fn delete_attribute(kind: AttributeKind) -> SetAttribute {
    set_attribute(kind, |_| None)
}

impl Transformer for SetAttribute {
    fn name(&self) -> &str {
        "set_attribute"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        let version = reader.spec_version();
        if self.kind.name(version).is_none() {
            return Ok(());
        }
        let value = (self.updater)(reader.attribute(self.kind));
        writer.set_attribute(Attribute::new(self.kind, version), value)
    }
}

/// Rewrites one extension. See [`set_extension`].
pub struct SetExtension {
    name: String,
    updater: Box<ExtensionUpdater>,
}

/// Set an extension to `updater(current)`.
pub fn set_extension(
    name: impl Into<String>,
    updater: impl Fn(Option<Value>) -> Value + Send + Sync + 'static,
) -> SetExtension {
    SetExtension {
        name: name.into(),
        updater: Box::new(updater),
    }
}

impl Transformer for SetExtension {
    fn name(&self) -> &str {
        "set_extension"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        let value = (self.updater)(reader.extension(&self.name));
        writer.set_extension(&self.name, Some(value))
    }
}

/// Removes one extension. See [`delete_extension`].
#[derive(Debug, Clone)]
pub struct DeleteExtension {
    name: String,
}

/// Remove an extension.
pub fn delete_extension(name: impl Into<String>) -> DeleteExtension {
    DeleteExtension { name: name.into() }
}

impl Transformer for DeleteExtension {
    fn name(&self) -> &str {
        "delete_extension"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        _reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        writer.set_extension(&self.name, None)
    }
}

/// Sets `time` when absent. See [`add_time_now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddTimeNow;

/// Set `time` to the current time when the message has none.
#[must_use]
pub fn add_time_now() -> AddTimeNow {
    AddTimeNow
}

impl Transformer for AddTimeNow {
    fn name(&self) -> &str {
        "add_time_now"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        if reader.attribute(AttributeKind::Time).is_some() {
            return Ok(());
        }
        writer.set_attribute(
            Attribute::new(AttributeKind::Time, reader.spec_version()),
            Some(Value::Timestamp(Utc::now())),
        )
    }
}

/// Sets a random `id` when empty. See [`add_uuid_if_missing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AddUuidIfMissing;

/// Set `id` to a random UUID when the message has none.
#[must_use]
pub fn add_uuid_if_missing() -> AddUuidIfMissing {
    AddUuidIfMissing
}

impl Transformer for AddUuidIfMissing {
    fn name(&self) -> &str {
        "add_uuid_if_missing"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        let missing = reader
            .attribute(AttributeKind::Id)
            .is_none_or(|id| id.as_str().is_some_and(str::is_empty));
        if !missing {
            return Ok(());
        }
        writer.set_attribute(
            Attribute::new(AttributeKind::Id, reader.spec_version()),
            Some(Value::String(Uuid::new_v4().to_string())),
        )
    }
}

/// Converts events to a spec version. See [`convert_version`].
#[derive(Debug, Clone, Copy)]
pub struct ConvertVersion {
    version: SpecVersion,
}

/// Convert the event to `version`. Works on events only, so routing through
/// it always materializes the event.
#[must_use]
pub fn convert_version(version: SpecVersion) -> ConvertVersion {
    ConvertVersion { version }
}

impl Transformer for ConvertVersion {
    fn name(&self) -> &str {
        "convert_version"
    }

    fn affinity(&self) -> Affinity {
        Affinity::EVENT
    }

    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        event.set_spec_version(self.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event() -> Event {
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("1");
        event.set_type("t");
        event.set_source("/s");
        event.set_extension("keep", "yes");
        event.set_extension("drop", "no");
        event
    }

    #[test]
    fn test_delete_extension() {
        let mut event = event();
        delete_extension("drop").transform_event(&mut event).unwrap();
        assert!(event.extension("drop").is_none());
        assert!(event.extension("keep").is_some());
    }

    #[test]
    fn test_add_time_now_keeps_existing() {
        let fixed = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut event = event();
        event.set_time(fixed);
        add_time_now().transform_event(&mut event).unwrap();
        assert_eq!(event.time(), Some(&fixed));

        let mut event = self::event();
        add_time_now().transform_event(&mut event).unwrap();
        assert!(event.time().is_some());
    }

    #[test]
    fn test_add_uuid_if_missing() {
        let mut event = event();
        add_uuid_if_missing().transform_event(&mut event).unwrap();
        assert_eq!(event.id(), "1");

        event.set_id("");
        add_uuid_if_missing().transform_event(&mut event).unwrap();
        assert!(Uuid::parse_str(event.id()).is_ok());
    }

    #[test]
    fn test_delete_subject() {
        let mut event = event();
        event.set_subject("s");
        delete_attribute(AttributeKind::Subject)
            .transform_event(&mut event)
            .unwrap();
        assert_eq!(event.subject(), None);
    }

    #[test]
    fn test_set_attribute_skips_undefined_kind() {
        let mut event = event();
        let before = event.clone();
        set_attribute(AttributeKind::DataContentEncoding, |_| Some(Value::from("base64")))
            .transform_event(&mut event)
            .unwrap();
        assert_eq!(event, before);
    }

    #[test]
    fn test_convert_version() {
        let mut event = event();
        let t = convert_version(SpecVersion::V03);
        assert_eq!(t.affinity(), Affinity::EVENT);
        t.transform_event(&mut event).unwrap();
        assert_eq!(event.spec_version(), SpecVersion::V03);
        assert!(matches!(
            t.transform_structured("application/cloudevents+json", &mut Vec::new()),
            Err(crate::error::BindingError::Affinity { .. })
        ));
    }
}
