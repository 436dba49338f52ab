//! Strategy registry.

use crate::strategy::SharedStrategy;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Opaque registration handle, used to remove a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyHandle(u64);

impl fmt::Display for StrategyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strategy#{}", self.0)
    }
}

/// Registry of strategies receiving live updates.
///
/// Dispatch iterates over a `snapshot`, so strategies may be registered or
/// removed while an event is being delivered, including from inside a
/// strategy callback.
#[derive(Default)]
pub struct StrategyNotifier {
    next_handle: AtomicU64,
    strategies: RwLock<BTreeMap<StrategyHandle, SharedStrategy>>,
}

impl StrategyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, strategy: SharedStrategy) -> StrategyHandle {
        let handle = StrategyHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let name = strategy.lock().name().to_string();
        self.strategies.write().insert(handle, strategy);
        info!(%handle, strategy = %name, "Strategy registered");
        handle
    }

    /// Remove a strategy. Returns it if the handle was registered.
    pub fn remove(&self, handle: StrategyHandle) -> Option<SharedStrategy> {
        let removed = self.strategies.write().remove(&handle);
        if removed.is_some() {
            info!(%handle, "Strategy removed");
        } else {
            debug!(%handle, "Remove for unknown strategy handle");
        }
        removed
    }

    /// Registered strategies in registration order.
    pub fn snapshot(&self) -> Vec<SharedStrategy> {
        self.strategies.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }
}

impl fmt::Debug for StrategyNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyNotifier")
            .field("registered", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::RecordingStrategy;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_handles_are_unique_and_ordered() {
        let notifier = StrategyNotifier::new();
        let a = notifier.register(Arc::new(Mutex::new(RecordingStrategy::new("A"))));
        let b = notifier.register(Arc::new(Mutex::new(RecordingStrategy::new("B"))));
        assert_ne!(a, b);
        assert!(a < b);

        let symbols: Vec<String> = notifier
            .snapshot()
            .iter()
            .map(|s| s.lock().contract().symbol().to_string())
            .collect();
        assert_eq!(symbols, vec!["A", "B"]);
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let notifier = StrategyNotifier::new();
        let handle = notifier.register(Arc::new(Mutex::new(RecordingStrategy::new("A"))));
        let snapshot = notifier.snapshot();

        notifier.remove(handle);
        assert!(notifier.is_empty());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].lock().name(), "recording");
    }
}
