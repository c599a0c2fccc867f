use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use marquee_core::HolderToken;

/// Holders with a confirmation in flight. A second concurrent confirm for
/// the same holder is turned away instead of queued.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<HashSet<HolderToken>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if `holder` already has a request in flight.
    pub fn begin(&self, holder: &HolderToken) -> Option<PendingGuard> {
        if self.lock().insert(holder.clone()) {
            Some(PendingGuard {
                requests: self.clone(),
                holder: holder.clone(),
            })
        } else {
            None
        }
    }

    pub fn is_pending(&self, holder: &HolderToken) -> bool {
        self.lock().contains(holder)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<HolderToken>> {
        // The set is valid after any panic mid-update, so ignore poisoning.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears the holder's pending mark when dropped.
#[derive(Debug)]
pub struct PendingGuard {
    requests: PendingRequests,
    holder: HolderToken,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.requests.lock().remove(&self.holder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_request_per_holder() {
        let pending = PendingRequests::new();
        let x = HolderToken::new("x");

        let guard = pending.begin(&x).unwrap();
        assert!(pending.is_pending(&x));
        assert!(pending.begin(&x).is_none());
        assert!(pending.begin(&HolderToken::new("y")).is_some());

        drop(guard);
        assert!(!pending.is_pending(&x));
        assert!(pending.begin(&x).is_some());
    }
}
