//! Helpers for async tests, plus the clock doubles under one import path

pub mod async_utils;

pub use async_utils::poll_until;

pub use crate::time::{Clock, MockClock, SystemClock};
