use tokio::sync::OwnedSemaphorePermit;
use tracing::trace;

/// 🎟️ One unit of a throttler's capacity, held for as long as this value lives.
///
/// Dropping it hands the permit back. That includes early returns, `?`, and panics
/// unwinding through the scope, so the release path can't be skipped.
#[derive(Debug)]
pub struct ThrottlePermit {
    permit: OwnedSemaphorePermit,
    group: Option<String>,
}

impl ThrottlePermit {
    pub(super) fn new(permit: OwnedSemaphorePermit, group: Option<String>) -> Self {
        Self { permit, group }
    }

    /// The group of the throttler this permit came from, if it has one.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Permits this one stands for. Always 1, the throttler never hands out bulk tickets.
    pub fn num_permits(&self) -> usize {
        self.permit.num_permits()
    }
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        // -- 🔓 the OwnedSemaphorePermit field does the actual giving-back right after this
        trace!(
            "🔓 releasing permit for group {:?}",
            self.group.as_deref().unwrap_or("<standalone>")
        );
    }
}
