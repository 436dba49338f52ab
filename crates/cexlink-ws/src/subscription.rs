//! Subscription tracking.
//!
//! The registry is the source of truth for what the session should be
//! subscribed to. It outlives individual connections: every open replays
//! the full set exactly once.

use crate::error::{WsError, WsResult};
use cexlink_core::Channel;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Maximum pairs per subscribe message.
pub const DEFAULT_BATCH_LIMIT: usize = 200;

/// Instrument/channel pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub symbol: String,
    pub channel: Channel,
}

impl SubscriptionKey {
    pub fn new(symbol: impl Into<String>, channel: Channel) -> Self {
        Self {
            symbol: symbol.into(),
            channel,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.symbol)
    }
}

/// Tracked pairs plus the request id counter.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    tracked: RwLock<BTreeSet<SubscriptionKey>>,
    batch_limit: usize,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new(batch_limit: usize) -> Self {
        Self {
            tracked: RwLock::new(BTreeSet::new()),
            batch_limit: batch_limit.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Record the pairs not tracked yet and return them.
    ///
    /// # Errors
    /// `SubscriptionBatchTooLarge` if more than `batch_limit` pairs are new.
    /// Nothing is recorded in that case.
    pub fn add_new<I, S>(&self, symbols: I, channel: Channel) -> WsResult<Vec<SubscriptionKey>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracked = self.tracked.write();

        let mut fresh = BTreeSet::new();
        for symbol in symbols {
            let key = SubscriptionKey::new(symbol, channel);
            if !tracked.contains(&key) {
                fresh.insert(key);
            }
        }

        if fresh.len() > self.batch_limit {
            return Err(WsError::SubscriptionBatchTooLarge {
                requested: fresh.len(),
                limit: self.batch_limit,
            });
        }

        tracked.extend(fresh.iter().cloned());
        debug!(added = fresh.len(), total = tracked.len(), %channel, "Subscriptions recorded");
        Ok(fresh.into_iter().collect())
    }

    /// Stop tracking pairs. Returns the ones that were tracked.
    pub fn remove<I, S>(&self, symbols: I, channel: Channel) -> Vec<SubscriptionKey>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tracked = self.tracked.write();
        let mut removed = Vec::new();
        for symbol in symbols {
            let key = SubscriptionKey::new(symbol, channel);
            if tracked.remove(&key) {
                removed.push(key);
            }
        }
        removed
    }

    /// Track a pair regardless of the batch limit. Returns `true` if added.
    pub fn ensure(&self, key: SubscriptionKey) -> bool {
        self.tracked.write().insert(key)
    }

    pub fn contains(&self, key: &SubscriptionKey) -> bool {
        self.tracked.read().contains(key)
    }

    /// All tracked pairs, split into subscribe-sized batches.
    pub fn batches(&self) -> Vec<Vec<SubscriptionKey>> {
        let tracked = self.tracked.read();
        let all: Vec<SubscriptionKey> = tracked.iter().cloned().collect();
        all.chunks(self.batch_limit).map(<[_]>::to_vec).collect()
    }

    pub fn len(&self) -> usize {
        self.tracked.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.read().is_empty()
    }

    /// Monotonic request id, starting at 1.
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_LIMIT)
    }
}
