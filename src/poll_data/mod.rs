pub mod file;

use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use async_trait::async_trait;
use crate::types::TradeOfferId;
use crate::enums::TradeOfferState;
use crate::error::Result;

pub use file::FileStore;

/// Margin (seconds) subtracted from `offers_since` when computing a poll cutoff, and used as
/// the minimum age an entry must reach (past `offers_since`) before it's eligible for pruning.
/// Matches the server's own backdating tolerance for offer updates.
pub const CUTOFF_MARGIN_SECONDS: i64 = 1800;

/// Which side of a trade offer a [`PollData::record`] call is updating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Sent,
    Received,
}

/// Persisted bookkeeping the reconciliation loop uses to detect state transitions and scope
/// its next delta fetch. Survives process restarts via an injected [`PollDataStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollData {
    #[serde(default)]
    pub sent: HashMap<TradeOfferId, TradeOfferState>,
    #[serde(default)]
    pub received: HashMap<TradeOfferId, TradeOfferState>,
    #[serde(default)]
    pub timestamps: HashMap<TradeOfferId, i64>,
    #[serde(default)]
    pub cancel_times: HashMap<TradeOfferId, i64>,
    #[serde(default)]
    pub pending_cancel_times: HashMap<TradeOfferId, i64>,
    /// Seconds-since-epoch cutoff used to scope the next delta poll.
    #[serde(default)]
    pub offers_since: i64,
    /// Whether anything has changed since the last successful save. Avoids needless writes.
    #[serde(default, skip_serializing)]
    pub changed: bool,
}

impl PollData {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_for(&mut self, side: Side) -> &mut HashMap<TradeOfferId, TradeOfferState> {
        match side {
            Side::Sent => &mut self.sent,
            Side::Received => &mut self.received,
        }
    }

    /// Records the last-known state and timestamp for an offer on the given side.
    pub fn record(&mut self, side: Side, id: TradeOfferId, state: TradeOfferState, updated_at_seconds: i64) {
        if self.map_for(side).insert(id, state) != Some(state) {
            self.changed = true;
        }

        if self.timestamps.insert(id, updated_at_seconds) != Some(updated_at_seconds) {
            self.changed = true;
        }
    }

    /// Sets a per-offer override (ms) for the active-offer auto-cancel timer.
    pub fn set_cancel(&mut self, id: TradeOfferId, ms: i64) {
        if self.cancel_times.insert(id, ms) != Some(ms) {
            self.changed = true;
        }
    }

    /// Sets a per-offer override (ms) for the unconfirmed-offer auto-cancel timer.
    pub fn set_pending_cancel(&mut self, id: TradeOfferId, ms: i64) {
        if self.pending_cancel_times.insert(id, ms) != Some(ms) {
            self.changed = true;
        }
    }

    /// Clears both per-offer cancel-timer overrides, e.g. after an auto-cancel fires.
    pub fn delete_time_props(&mut self, id: TradeOfferId) {
        let removed_cancel = self.cancel_times.remove(&id).is_some();
        let removed_pending = self.pending_cancel_times.remove(&id).is_some();

        if removed_cancel || removed_pending {
            self.changed = true;
        }
    }

    /// Removes every trace of an offer from the store.
    pub fn delete_all(&mut self, id: TradeOfferId) {
        let removed = [
            self.sent.remove(&id).is_some(),
            self.received.remove(&id).is_some(),
            self.timestamps.remove(&id).is_some(),
            self.cancel_times.remove(&id).is_some(),
            self.pending_cancel_times.remove(&id).is_some(),
        ].into_iter().any(|r| r);

        if removed {
            self.changed = true;
        }
    }

    /// Advances `offers_since`. The cutoff is monotonically nondecreasing across ticks, so a
    /// regression is silently ignored rather than applied.
    pub fn set_offers_since(&mut self, seconds: i64) {
        if seconds > self.offers_since {
            self.offers_since = seconds;
            self.changed = true;
        }
    }

    /// Sweeps both `sent` and `received` for offers that are terminal and old enough (more than
    /// [`CUTOFF_MARGIN_SECONDS`] before `offers_since`) to drop entirely. Called at the tail of
    /// every successful reconcile tick.
    pub fn prune(&mut self) {
        let cutoff = self.offers_since - CUTOFF_MARGIN_SECONDS;
        let stale: Vec<TradeOfferId> = self.sent.iter()
            .chain(self.received.iter())
            .filter(|(id, state)| {
                state.is_terminal() && self.timestamps.get(*id).is_some_and(|ts| *ts < cutoff)
            })
            .map(|(id, _)| *id)
            .collect();

        for id in stale {
            self.delete_all(id);
        }
    }

    /// Merges `loaded` (read from persistence) underneath any entries already accumulated
    /// in-memory before the load completed. In-memory entries win on collision.
    pub fn merge_loaded(&mut self, loaded: PollData) {
        let mut merged = loaded;

        for (id, state) in self.sent.drain() {
            merged.sent.insert(id, state);
        }
        for (id, state) in self.received.drain() {
            merged.received.insert(id, state);
        }
        for (id, ts) in self.timestamps.drain() {
            merged.timestamps.insert(id, ts);
        }
        for (id, ms) in self.cancel_times.drain() {
            merged.cancel_times.insert(id, ms);
        }
        for (id, ms) in self.pending_cancel_times.drain() {
            merged.pending_cancel_times.insert(id, ms);
        }

        merged.offers_since = merged.offers_since.max(self.offers_since);
        merged.changed = self.changed || merged.changed;

        *self = merged;
    }
}

/// Injected persistence for [`PollData`], keyed by account username. Both `load` and `save`
/// must be configured together to activate persistence; if absent, the store lives in memory
/// only for the process lifetime.
#[async_trait]
pub trait PollDataStore: Send + Sync {
    async fn load(&self, username: &str) -> Result<Option<PollData>>;
    async fn save(&self, username: &str, data: &PollData) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TradeOfferState;

    #[test]
    fn record_marks_changed_only_on_actual_change() {
        let mut data = PollData::new();

        data.record(Side::Sent, 1, TradeOfferState::Active, 1000);
        assert!(data.changed);

        data.changed = false;
        data.record(Side::Sent, 1, TradeOfferState::Active, 1000);
        assert!(!data.changed);

        data.record(Side::Sent, 1, TradeOfferState::Accepted, 1010);
        assert!(data.changed);
    }

    #[test]
    fn prune_removes_only_old_terminal_entries() {
        let mut data = PollData::new();

        data.set_offers_since(10_000);
        data.record(Side::Sent, 1, TradeOfferState::Declined, 10_000 - CUTOFF_MARGIN_SECONDS - 1);
        data.record(Side::Sent, 2, TradeOfferState::Declined, 10_000 - CUTOFF_MARGIN_SECONDS + 1);
        data.record(Side::Sent, 3, TradeOfferState::Active, 10_000 - CUTOFF_MARGIN_SECONDS - 1);

        data.prune();

        assert!(!data.sent.contains_key(&1));
        assert!(data.sent.contains_key(&2));
        assert!(data.sent.contains_key(&3));
    }

    #[test]
    fn offers_since_never_regresses() {
        let mut data = PollData::new();

        data.set_offers_since(500);
        data.set_offers_since(100);

        assert_eq!(data.offers_since, 500);
    }

    #[test]
    fn merge_loaded_prefers_in_memory_on_collision() {
        let mut data = PollData::new();
        data.record(Side::Sent, 1, TradeOfferState::Active, 100);

        let mut loaded = PollData::new();
        loaded.record(Side::Sent, 1, TradeOfferState::Accepted, 50);
        loaded.record(Side::Sent, 2, TradeOfferState::Active, 40);
        loaded.offers_since = 30;

        data.merge_loaded(loaded);

        assert_eq!(data.sent.get(&1), Some(&TradeOfferState::Active));
        assert_eq!(data.sent.get(&2), Some(&TradeOfferState::Active));
        assert_eq!(data.offers_since, 30);
    }
}
