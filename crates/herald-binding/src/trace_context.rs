//! Transformers for the distributed tracing extension.

use std::sync::{Mutex, PoisonError};

use herald_core::Value;
use herald_core::extensions::{DistributedTracingExtension, TRACEPARENT, TRACESTATE};
use tracing::debug;

use crate::error::BindingResult;
use crate::message::{MetadataReader, MetadataWriter};
use crate::transformer::{Affinity, Transformer};

/// Stamps `traceparent` and `tracestate` on routed messages.
#[derive(Debug, Clone)]
pub struct TracingWriteTransformer {
    extension: DistributedTracingExtension,
}

/// Write `extension` onto every routed message. An empty `tracestate`
/// removes the header.
#[must_use]
pub fn tracing_write_transformer(extension: DistributedTracingExtension) -> TracingWriteTransformer {
    TracingWriteTransformer { extension }
}

impl Transformer for TracingWriteTransformer {
    fn name(&self) -> &str {
        "tracing_write"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        _reader: &dyn MetadataReader,
        writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        writer.set_extension(TRACEPARENT, Some(Value::from(self.extension.traceparent.as_str())))?;
        let state = (!self.extension.tracestate.is_empty())
            .then(|| Value::from(self.extension.tracestate.as_str()));
        writer.set_extension(TRACESTATE, state)
    }
}

/// Records the tracing extension of the last routed message.
#[derive(Debug, Default)]
pub struct TracingReadTransformer {
    captured: Mutex<Option<DistributedTracingExtension>>,
}

impl TracingReadTransformer {
    /// A transformer with nothing captured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The extension seen on the last message, if it carried one.
    #[must_use]
    pub fn captured(&self) -> Option<DistributedTracingExtension> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transformer for TracingReadTransformer {
    fn name(&self) -> &str {
        "tracing_read"
    }

    fn affinity(&self) -> Affinity {
        Affinity::METADATA
    }

    fn transform_metadata(
        &self,
        reader: &dyn MetadataReader,
        _writer: &mut dyn MetadataWriter,
    ) -> BindingResult<()> {
        let extension = reader.extension(TRACEPARENT).map(|parent| DistributedTracingExtension {
            traceparent: parent.to_string(),
            tracestate: reader
                .extension(TRACESTATE)
                .map(|s| s.to_string())
                .unwrap_or_default(),
        });
        if let Some(ext) = &extension {
            debug!(traceparent = %ext.traceparent, "trace context received");
        }
        *self.captured.lock().unwrap_or_else(PoisonError::into_inner) = extension;
        Ok(())
    }
}
