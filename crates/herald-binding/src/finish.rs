//! Completion wrappers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use herald_core::Event;
use tracing::{trace, warn};

use crate::encoding::Encoding;
use crate::error::{BindingError, BindingResult};
use crate::message::{BinaryWriter, Message, MetadataReader, StructuredWriter};

type FinishCallback = Box<dyn FnOnce(Option<&BindingError>) + Send>;

/// A message that runs a callback when finished. See [`with_finish`].
pub struct WithFinish<M> {
    inner: M,
    callback: Mutex<Option<FinishCallback>>,
}

/// Run `callback` with the finish error, at most once, before finishing
/// `message`.
pub fn with_finish<M: Message>(
    message: M,
    callback: impl FnOnce(Option<&BindingError>) + Send + 'static,
) -> WithFinish<M> {
    WithFinish {
        inner: message,
        callback: Mutex::new(Some(Box::new(callback))),
    }
}

impl<M> WithFinish<M> {
    /// The wrapped message.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: Message> Message for WithFinish<M> {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        self.inner.read_structured(writer).await
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        self.inner.read_binary(writer).await
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        self.inner.metadata_reader()
    }

    fn as_event(&self) -> Option<&Event> {
        self.inner.as_event()
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback(error.as_ref());
        }
        self.inner.finish(error)
    }
}

/// A message finished after a number of acknowledgements. See
/// [`acks_before_finish`].
pub struct AcksBeforeFinish<M> {
    inner: M,
    remaining: AtomicUsize,
    first_error: Mutex<Option<BindingError>>,
}

/// Share `message` among `acks` consumers.
///
/// Each consumer calls `finish` once. The call that brings the count to
/// zero finishes `message`, passing the first error any consumer reported.
/// Calls beyond `acks` are ignored. An `acks` of zero counts as one.
pub fn acks_before_finish<M: Message>(message: M, acks: usize) -> AcksBeforeFinish<M> {
    AcksBeforeFinish {
        inner: message,
        remaining: AtomicUsize::new(acks.max(1)),
        first_error: Mutex::new(None),
    }
}

impl<M> AcksBeforeFinish<M> {
    /// Acknowledgements still expected.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// The wrapped message.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: Message> Message for AcksBeforeFinish<M> {
    fn encoding(&self) -> Encoding {
        self.inner.encoding()
    }

    async fn read_structured(&self, writer: &mut dyn StructuredWriter) -> BindingResult<()> {
        self.inner.read_structured(writer).await
    }

    async fn read_binary(&self, writer: &mut dyn BinaryWriter) -> BindingResult<()> {
        self.inner.read_binary(writer).await
    }

    fn metadata_reader(&self) -> Option<&dyn MetadataReader> {
        self.inner.metadata_reader()
    }

    fn as_event(&self) -> Option<&Event> {
        self.inner.as_event()
    }

    fn finish(&self, error: Option<BindingError>) -> BindingResult<()> {
        if let Some(error) = error {
            self.first_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_insert(error);
        }
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => {
                let error = self
                    .first_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                trace!(failed = error.is_some(), "last ack received");
                self.inner.finish(error)
            },
            Ok(_) => Ok(()),
            Err(_) => {
                warn!("finish called after every ack was received");
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::SpecVersion;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_callback_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let message = with_finish(Event::new(SpecVersion::V10), move |error| {
            assert!(error.is_some());
            seen.fetch_add(1, Ordering::SeqCst);
        });
        message.finish(Some(BindingError::Cancelled)).unwrap();
        message.finish(Some(BindingError::Cancelled)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(message.encoding(), Encoding::Event);
    }

    #[test]
    fn test_acks_keep_first_error() {
        let failed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&failed);
        let inner = with_finish(Event::new(SpecVersion::V10), move |error| {
            flag.store(matches!(error, Some(BindingError::NotBinary)), Ordering::SeqCst);
        });
        let message = acks_before_finish(inner, 3);
        message.finish(None).unwrap();
        message.finish(Some(BindingError::NotBinary)).unwrap();
        assert_eq!(message.remaining(), 1);
        assert!(!failed.load(Ordering::SeqCst));
        message.finish(Some(BindingError::NotStructured)).unwrap();
        assert_eq!(message.remaining(), 0);
        assert!(failed.load(Ordering::SeqCst));
        message.finish(None).unwrap();
    }

    #[test]
    fn test_zero_acks_counts_as_one() {
        let message = acks_before_finish(Event::new(SpecVersion::V10), 0);
        assert_eq!(message.remaining(), 1);
        message.finish(None).unwrap();
        assert_eq!(message.remaining(), 0);
    }
}
