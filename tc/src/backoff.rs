//! Rate-limit backoff countdown
//!
//! One timer exists per armed backoff: an owned tokio task that decrements
//! the channel's visible countdown once per tick and resubmits the last
//! payload when it reaches zero. The owning controller aborts the task on
//! `cancel()`/`clear()` or when a new request supersedes it, so no timer
//! ever outlives its purpose.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::channel::ChannelController;
use crate::config::BackoffConfig;

/// Handle to an armed countdown task
#[derive(Debug)]
pub struct BackoffTimer {
    handle: JoinHandle<()>,
}

impl BackoffTimer {
    /// Arm a countdown for the given request generation
    ///
    /// Each tick reports the remaining seconds back to the controller; the
    /// controller rejects ticks from a superseded generation, which also
    /// stops the task. At zero the controller resubmits the last payload.
    pub fn arm(config: BackoffConfig, generation: u64, controller: ChannelController) -> Self {
        let handle = tokio::spawn(async move {
            let tick = config.tick();
            let mut remaining = config.seconds;
            debug!(generation, remaining, "arm: countdown started");
            while remaining > 0 {
                tokio::time::sleep(tick).await;
                remaining -= 1;
                // zero is never published from here; the resubmission
                // publishes it together with its loading transition, so
                // observers cannot catch the channel looking idle in between
                if remaining > 0 && !controller.backoff_tick(generation, remaining).await {
                    debug!(generation, "arm: countdown superseded, stopping");
                    return;
                }
            }
            controller.backoff_fire(generation).await;
        });
        Self { handle }
    }

    /// Stop the countdown immediately, leaving no dangling timer
    pub fn stop(self) {
        self.handle.abort();
    }
}
