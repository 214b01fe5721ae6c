//! Time utilities and abstractions
//!
//! CareBridge records every timestamp as wall-clock milliseconds since the
//! UNIX epoch. Components that stamp records take a [`Clock`] so tests can
//! pin time with [`MockClock`] instead of sleeping.
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "runtime")]
//! # {
//! use std::time::Duration;
//!
//! use carebridge_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at(1_700_000_000_000);
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now_millis(), 1_700_000_005_000);
//! # }
//! ```

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
