//! Injectable delays for retry policies.

use std::time::Duration;

/// Source of retry delays.
///
/// Production code sleeps on the tokio timer; tests substitute a clock that
/// only records the requested delays.
#[allow(async_fn_in_trait)]
pub trait Clock {
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<C: Clock> Clock for &C {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}
