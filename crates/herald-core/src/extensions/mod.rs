//! Well-known extension attributes.

mod dataref;
mod distributed_tracing;

pub use dataref::{DATAREF, DataRefExtension};
pub use distributed_tracing::{
    DistributedTracingExtension, SpanContext, TRACEPARENT, TRACESTATE, TraceFlags,
};
