//! Message transformers.
//!
//! A transformer edits a message while it is routed. It declares which of
//! the three views it can work on through its [`Affinity`], and the router
//! picks the cheapest path every transformer in the list supports. Each
//! transformer runs exactly once per routed message, in list order.

mod builtin;

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use herald_core::Event;
use tracing::trace;

use crate::error::{BindingError, BindingResult};
use crate::message::{MetadataReader, MetadataWriter};

pub use builtin::{
    AddTimeNow, AddUuidIfMissing, ConvertVersion, DeleteExtension, SetAttribute, SetExtension,
    add_time_now, add_uuid_if_missing, convert_version, delete_attribute, delete_extension,
    set_attribute, set_extension,
};

/// The modes a transformer supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Affinity(u8);

impl Affinity {
    /// No mode.
    pub const NONE: Self = Self(0);
    /// Rewrites serialized bodies.
    pub const STRUCTURED: Self = Self(0b001);
    /// Rewrites attributes through a reader/writer pair.
    pub const BINARY: Self = Self(0b010);
    /// Edits an in-memory event.
    pub const EVENT: Self = Self(0b100);
    /// Binary and event.
    pub const METADATA: Self = Self::BINARY.union(Self::EVENT);
    /// Every mode.
    pub const ALL: Self = Self::STRUCTURED.union(Self::METADATA);

    /// Both sets of modes.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every mode of `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Affinity {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Edits a message in one or more modes.
///
/// Implement the methods matching the declared [`Affinity`]. A transformer
/// with binary affinity gets event support for free: the default
/// [`transform_event`](Self::transform_event) runs
/// [`transform_metadata`](Self::transform_metadata) against the event.
pub trait Transformer: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Supported modes.
    fn affinity(&self) -> Affinity;

    /// Rewrite a serialized event in place.
    ///
    /// # Errors
    ///
    /// The default returns [`BindingError::Affinity`].
    fn transform_structured(&self, media_type: &str, body: &mut Vec<u8>) -> BindingResult<()> {
        let _ = (media_type, body);
        Err(mismatch(self.name(), "structured"))
    }

    /// Read the message's attributes from `reader` and write changes to
    /// `writer`. The reader shows the attributes as the message carried
    /// them, before any transformer ran.
    ///
    /// # Errors
    ///
    /// The default returns [`BindingError::Affinity`].
    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        let _ = (reader, writer);
        Err(mismatch(self.name(), "binary"))
    }

    /// Edit an in-memory event.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Affinity`] when the transformer supports
    /// neither event nor binary mode.
    fn transform_event(&self, event: &mut Event) -> BindingResult<()> {
        if !self.affinity().contains(Affinity::BINARY) {
            return Err(mismatch(self.name(), "event"));
        }
        let snapshot = event.context().clone();
        self.transform_metadata(&snapshot, event)
    }
}

fn mismatch(name: &str, mode: &'static str) -> BindingError {
    BindingError::Affinity {
        name: name.to_owned(),
        mode,
    }
}

/// An ordered list of transformers.
#[derive(Clone, Default)]
pub struct Transformers(Vec<Arc<dyn Transformer>>);

impl Transformers {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transformer.
    #[must_use]
    pub fn with(mut self, transformer: impl Transformer + 'static) -> Self {
        self.0.push(Arc::new(transformer));
        self
    }

    /// Append a shared transformer.
    pub fn push(&mut self, transformer: Arc<dyn Transformer>) {
        self.0.push(transformer);
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate in application order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Transformer>> {
        self.0.iter()
    }

    /// Whether every transformer supports `mode`. Binary affinity counts as
    /// event support. An empty list supports everything.
    #[must_use]
    pub fn supports(&self, mode: Affinity) -> bool {
        self.0.iter().all(|t| {
            let affinity = t.affinity();
            let affinity = if affinity.contains(Affinity::BINARY) {
                affinity | Affinity::EVENT
            } else {
                affinity
            };
            affinity.contains(mode)
        })
    }

    pub(crate) fn apply_structured(&self, media_type: &str, body: &mut Vec<u8>) -> BindingResult<()> {
        for t in &self.0 {
            trace!(transformer = t.name(), "structured transform");
            t.transform_structured(media_type, body)?;
        }
        Ok(())
    }

    pub(crate) fn apply_metadata(
        &self,
        reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        for t in &self.0 {
            trace!(transformer = t.name(), "binary transform");
            t.transform_metadata(reader, writer)?;
        }
        Ok(())
    }

    /// Apply every transformer to an event, in order.
    ///
    /// # Errors
    ///
    /// Returns the first transformer error.
    pub fn apply_event(&self, event: &mut Event) -> BindingResult<()> {
        for t in &self.0 {
            trace!(transformer = t.name(), "event transform");
            t.transform_event(event)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Transformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|t| t.name())).finish()
    }
}

impl FromIterator<Arc<dyn Transformer>> for Transformers {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Transformer>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{AttributeKind, SpecVersion, Value};

    struct Upper;

    impl Transformer for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn affinity(&self) -> Affinity {
            Affinity::STRUCTURED
        }

        fn transform_structured(&self, _: &str, body: &mut Vec<u8>) -> BindingResult<()> {
            body.make_ascii_uppercase();
            Ok(())
        }
    }

    #[test]
    fn test_affinity_set_ops() {
        assert!(Affinity::ALL.contains(Affinity::BINARY));
        assert!(Affinity::METADATA.contains(Affinity::EVENT));
        assert!(!Affinity::STRUCTURED.contains(Affinity::EVENT));
        assert!(Affinity::NONE.contains(Affinity::NONE));
        assert_eq!(Affinity::BINARY | Affinity::EVENT, Affinity::METADATA);
    }

    #[test]
    fn test_supports() {
        let list = Transformers::new()
            .with(add_time_now())
            .with(delete_extension("x"));
        assert!(list.supports(Affinity::BINARY));
        assert!(list.supports(Affinity::EVENT));
        assert!(!list.supports(Affinity::STRUCTURED));

        let list = list.with(Upper);
        assert!(!list.supports(Affinity::BINARY));
        assert!(Transformers::new().supports(Affinity::ALL));
    }

    #[test]
    fn test_structured_only_rejects_event() {
        let mut event = Event::new(SpecVersion::V10);
        let err = Upper.transform_event(&mut event).unwrap_err();
        assert!(matches!(err, BindingError::Affinity { mode: "event", .. }));
    }

    #[test]
    fn test_apply_event_in_order() {
        let mut event = Event::new(SpecVersion::V10);
        event.set_id("1");
        let list = Transformers::new()
            .with(set_attribute(AttributeKind::Id, |_| Some(Value::from("2"))))
            .with(set_extension("seen", |current| {
                Value::from(current.is_some())
            }))
            .with(set_extension("seen", |current| {
                Value::from(current.is_some())
            }));
        list.apply_event(&mut event).unwrap();
        assert_eq!(event.id(), "2");
        assert_eq!(event.extension("seen"), Some(&Value::Boolean(true)));
        assert_eq!(format!("{list:?}"), r#"["set_attribute", "set_extension", "set_extension"]"#);
    }
}
