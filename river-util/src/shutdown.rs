//! Process-wide cancellation.
//!
//! A single [`Shutdown`] is shared between the replication consumer task
//! and the Sync Loop task. Any fatal error trips it; both tasks check it
//! at their suspension points (a channel send/receive, a bulk submission,
//! a position save) and unwind rather than polling it on a timer.

use tokio_util::sync::CancellationToken;

/// A cloneable handle onto one cancellation signal. Cloning shares the
/// underlying token, it does not create an independent signal.
#[derive(Clone, Default)]
pub struct Shutdown(CancellationToken);

impl Shutdown {
    /// Create a fresh, untripped signal.
    pub fn new() -> Self {
        Shutdown(CancellationToken::new())
    }

    /// Trip the signal. Idempotent.
    pub fn trip(&self) {
        self.0.cancel();
    }

    /// True once `trip` has been called on this signal or any of its clones.
    pub fn is_tripped(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once the signal has been tripped. Used in `tokio::select!`
    /// arms alongside channel receives and ticker ticks.
    pub async fn tripped(&self) {
        self.0.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trip_is_observed_by_every_clone() {
        let a = Shutdown::new();
        let b = a.clone();
        assert!(!a.is_tripped());
        assert!(!b.is_tripped());
        b.trip();
        assert!(a.is_tripped());
        a.tripped().await;
    }
}
