//! Herald Test - shared test utilities.
//!
//! This crate provides fixtures and mock messages, writers and transformers
//! that can be used across Herald crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! herald-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use herald_binding::{WriteContext, write};
//! use herald_test::{MockMessage, RecordingWriter, test_event_v1};
//!
//! #[tokio::test]
//! async fn test_binary_passthrough() {
//!     let message = MockMessage::binary(test_event_v1());
//!     let mut writer = RecordingWriter::new();
//!     write(&WriteContext::new(), &message, None, Some(&mut writer), &Default::default())
//!         .await
//!         .unwrap();
//!     assert_eq!(writer.attribute_names()[0], "specversion");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Install a test-friendly subscriber once. Honors `RUST_LOG`.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
