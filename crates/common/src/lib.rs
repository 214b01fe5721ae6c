//! Building blocks shared by the CareBridge crates.
//!
//! The crate is split into opt-in tiers:
//! - `foundation`: [`error`], the shared error vocabulary
//! - `runtime`: [`time`], wall-clock abstraction used to stamp records
//! - `test-utils`: [`testing`], helpers for async test suites

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "foundation")]
pub mod error;

#[cfg(feature = "runtime")]
pub mod time;

#[cfg(any(feature = "test-utils", all(test, feature = "runtime")))]
pub mod testing;

#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
