use super::traits::{Observer, ScrapiEvent};

/// Observer that discards every event.
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline(always)]
    fn record_event(&self, _event: &ScrapiEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}
