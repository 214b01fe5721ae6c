//! Async testing utilities
//!
//! Spawned drains and worker ticks finish on their own schedule; tests wait
//! for the observable effect instead of sleeping a fixed amount.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Re-evaluate `condition` every `interval` until it holds or `timeout`
/// passes. Returns whether it held.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}
