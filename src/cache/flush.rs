//! Periodic full flush shared by both cache policies.

use crate::error::{MapperError, MapperResult};
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Background task clearing a cache every interval. Aborted on drop.
#[derive(Debug)]
pub(crate) struct FlushTask {
    handle: JoinHandle<()>,
}

impl Drop for FlushTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task calling `flush` on `target` every `interval`, starting one
/// interval from now. The task holds only a weak reference and stops once the
/// target is gone. A zero interval is a configuration error.
///
/// Must be called from within a tokio runtime.
pub(crate) fn spawn_flush_task<T>(
    target: Weak<T>,
    interval: Duration,
    flush: fn(&T),
) -> MapperResult<FlushTask>
where
    T: Send + Sync + 'static,
{
    if interval.is_zero() {
        return Err(MapperError::configuration("Cache TTL must be greater than zero"));
    }
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(target) = target.upgrade() else {
                break;
            };
            flush(&target);
            debug!(interval_ms = interval.as_millis() as u64, "Cache flushed by TTL timer");
        }
    });
    Ok(FlushTask { handle })
}
