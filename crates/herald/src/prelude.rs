//! Unified prelude.
//!
//! Use `use herald::prelude::*;` to bring in the essential types of every
//! Herald crate.

pub use herald_binding::prelude::*;
pub use herald_core::prelude::*;
pub use herald_format::prelude::*;
pub use herald_telemetry::prelude::*;

pub use herald_config::{Config, ConfigError, ConfigResult};

pub use crate::{HeraldError, HeraldResult, new_event, setup};
