//! Observability infrastructure
//!
//! The engine logs through `tracing` everywhere. This module installs the
//! subscriber that turns those events into output.

pub mod logging;

pub use logging::{build_filter, init};
