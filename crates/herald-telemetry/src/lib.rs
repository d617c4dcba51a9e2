//! Herald Telemetry - logging setup and event-scoped spans.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - [`EventSpan`] for correlating log lines with the event being processed
//!
//! # Example
//!
//! ```rust,no_run
//! use herald_core::Event;
//! use herald_telemetry::{EventSpan, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), herald_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("herald_binding=trace");
//! setup_logging(&config)?;
//!
//! let event = Event::default();
//! let span = EventSpan::from_event(&event).with_operation("route").span();
//! let _guard = span.enter();
//! tracing::info!("routing event");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod event_span;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use event_span::EventSpan;
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
