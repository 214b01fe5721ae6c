//! Integration tests for the `time` module.
//!
//! Covers the wall-clock abstraction as downstream crates consume it: through
//! a shared `Arc<dyn Clock>` handed to services.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use carebridge_common::time::{Clock, MockClock, SystemClock};

fn stamp(clock: &Arc<dyn Clock>) -> i64 {
    clock.now_millis()
}

#[test]
fn mock_clock_drives_shared_trait_object() {
    let mock = MockClock::at(1_700_000_000_000);
    let shared: Arc<dyn Clock> = Arc::new(mock.clone());

    assert_eq!(stamp(&shared), 1_700_000_000_000);

    mock.advance(Duration::from_secs(30));
    assert_eq!(stamp(&shared), 1_700_000_030_000);
}

#[test]
fn system_clock_is_monotonic_enough_for_ordering() {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let first = stamp(&clock);
    let second = stamp(&clock);
    assert!(second >= first);
}

#[tokio::test]
async fn mock_clock_is_shareable_across_tasks() {
    let clock = MockClock::at(0);
    let handle = {
        let clock = clock.clone();
        tokio::spawn(async move {
            clock.advance(Duration::from_millis(750));
        })
    };
    handle.await.unwrap();

    assert_eq!(clock.now_millis(), 750);
}
