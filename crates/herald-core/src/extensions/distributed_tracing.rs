//! The distributed tracing extension (`traceparent`, `tracestate`).
//!
//! `traceparent` uses the W3C trace-context wire form:
//!
//! ```text
//! 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//! ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^ ^^
//! |  trace id (16 bytes)              span id (8)      flags
//! version
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{EventError, EventResult};
use crate::event::Event;
use crate::value::to_string;

/// `traceparent` extension name.
pub const TRACEPARENT: &str = "traceparent";
/// `tracestate` extension name.
pub const TRACESTATE: &str = "tracestate";

const VERSION: u8 = 0;

/// Trace flags byte. Bit 0 is `sampled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraceFlags(pub u8);

impl TraceFlags {
    /// The sampled bit.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Whether the sampled bit is set.
    #[must_use]
    pub fn is_sampled(self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }
}

/// A span context, as carried across process boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpanContext {
    /// 128-bit trace identifier.
    pub trace_id: [u8; 16],
    /// 64-bit parent span identifier.
    pub span_id: [u8; 8],
    /// Trace flags.
    pub flags: TraceFlags,
    /// Vendor-specific `tracestate` list, verbatim.
    pub trace_state: String,
}

impl SpanContext {
    /// A context without trace state.
    #[must_use]
    pub fn new(trace_id: [u8; 16], span_id: [u8; 8], flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            flags,
            trace_state: String::new(),
        }
    }

    /// Attach a `tracestate` list.
    #[must_use]
    pub fn with_trace_state(mut self, trace_state: impl Into<String>) -> Self {
        self.trace_state = trace_state.into();
        self
    }

    /// Both identifiers are non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.trace_id.iter().any(|b| *b != 0) && self.span_id.iter().any(|b| *b != 0)
    }

    /// The `traceparent` wire form.
    #[must_use]
    pub fn to_traceparent(&self) -> String {
        format!(
            "{:02x}-{}-{}-{:02x}",
            VERSION,
            hex::encode(self.trace_id),
            hex::encode(self.span_id),
            self.flags.0
        )
    }

    /// Parse a `traceparent` header. Trace state is left empty.
    ///
    /// Versions other than `00` are accepted as long as the first four
    /// fields have the `00` layout; version `ff` is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTraceParent`] for malformed values and
    /// all-zero identifiers.
    pub fn parse_traceparent(traceparent: &str) -> EventResult<Self> {
        let invalid = || EventError::InvalidTraceParent(traceparent.to_owned());
        let mut parts = traceparent.trim().split('-');
        let (Some(version), Some(trace_id), Some(span_id), Some(flags)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let version = parse_byte(version).ok_or_else(invalid)?;
        if version == 0xff || (version == VERSION && parts.next().is_some()) {
            return Err(invalid());
        }

        let mut ctx = SpanContext::new([0; 16], [0; 8], TraceFlags::default());
        decode_lower_hex(trace_id, &mut ctx.trace_id).ok_or_else(invalid)?;
        decode_lower_hex(span_id, &mut ctx.span_id).ok_or_else(invalid)?;
        ctx.flags = TraceFlags(parse_byte(flags).ok_or_else(invalid)?);

        if ctx.is_valid() { Ok(ctx) } else { Err(invalid()) }
    }
}

impl fmt::Display for SpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

impl FromStr for SpanContext {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_traceparent(s)
    }
}

fn parse_byte(s: &str) -> Option<u8> {
    let mut out = [0u8; 1];
    decode_lower_hex(s, &mut out)?;
    Some(out[0])
}

fn decode_lower_hex(s: &str, out: &mut [u8]) -> Option<()> {
    if s.bytes().any(|b| b.is_ascii_uppercase()) {
        return None;
    }
    hex::decode_to_slice(s, out).ok()
}

/// The `traceparent`/`tracestate` pair as found on an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistributedTracingExtension {
    /// `traceparent`.
    pub traceparent: String,
    /// `tracestate`, empty when absent.
    pub tracestate: String,
}

impl DistributedTracingExtension {
    /// Read the extension from an event. `None` without a `traceparent`.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        let traceparent = to_string(event.extension(TRACEPARENT)?).ok()?;
        let tracestate = event
            .extension(TRACESTATE)
            .and_then(|v| to_string(v).ok())
            .unwrap_or_default();
        Some(Self {
            traceparent,
            tracestate,
        })
    }

    /// Write the extension onto an event. An empty `tracestate` is omitted.
    pub fn add_to(&self, event: &mut Event) {
        event.set_extension(TRACEPARENT, self.traceparent.as_str());
        if self.tracestate.is_empty() {
            event.remove_extension(TRACESTATE);
        } else {
            event.set_extension(TRACESTATE, self.tracestate.as_str());
        }
    }

    /// Convert to a span context.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTraceParent`] when `traceparent` is
    /// malformed.
    pub fn to_span_context(&self) -> EventResult<SpanContext> {
        Ok(SpanContext::parse_traceparent(&self.traceparent)?
            .with_trace_state(self.tracestate.clone()))
    }
}

impl From<&SpanContext> for DistributedTracingExtension {
    fn from(ctx: &SpanContext) -> Self {
        Self {
            traceparent: ctx.to_traceparent(),
            tracestate: ctx.trace_state.clone(),
        }
    }
}
