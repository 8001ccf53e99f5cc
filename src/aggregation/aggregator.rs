use std::collections::HashSet;
use std::hash::Hash;

use log::{debug, trace};
use serde::Deserialize;

use super::stats::{ActionBreakdown, AggregateStats, KeyedIndex};
use crate::record::SavRecord;

/// What to do with a record whose `record_number` was already ingested.
///
/// A feed reconnect can make the server replay records. `Disabled` counts
/// every delivery; `ByRecordNumber` skips numbers seen since the last reset
/// or playback completion. Records without a number are always counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    #[default]
    Disabled,
    ByRecordNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied,
    Duplicate,
}

/// Owns the aggregate state of one viewing session.
///
/// Calls must not overlap: the aggregator takes `&mut self`, so sharing it
/// between tasks requires wrapping it in a lock (see
/// [`crate::view::SharedDashboard`]).
#[derive(Debug, Default)]
pub struct StreamAggregator {
    stats: AggregateStats,
    policy: DedupPolicy,
    seen: HashSet<u64>,
}

impl StreamAggregator {
    /// Aggregator that counts every delivery.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DedupPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Folds `record` into the running statistics.
    ///
    /// Never fails: unknown or missing codes simply match no bucket.
    pub fn ingest(&mut self, record: &SavRecord) -> IngestOutcome {
        if let (DedupPolicy::ByRecordNumber, Some(number)) = (self.policy, record.record_number) {
            if !self.seen.insert(number) {
                debug!("Skipping replayed record #{}", number);
                return IngestOutcome::Duplicate;
            }
        }

        trace!(
            "Ingesting record #{:?} ({} mappings)",
            record.record_number,
            record.mappings.len()
        );
        self.stats.apply(record);
        IngestOutcome::Applied
    }

    /// Read-only view of the current state.
    pub fn snapshot(&self) -> &AggregateStats {
        &self.stats
    }

    /// Drops all state, including the replay guard.
    pub fn reset(&mut self) {
        debug!("Resetting aggregate statistics ({} records)", self.stats.total);
        self.stats = AggregateStats::default();
        self.seen.clear();
    }

    /// Folds `record` in regardless of the dedup policy. Used for batch
    /// snapshots, where every entry is a distinct record.
    pub fn ingest_unguarded(&mut self, record: &SavRecord) {
        self.stats.apply(record);
    }

    /// Reconciles the replay guard with the server's playback position.
    ///
    /// A position below the highest record number seen means the server
    /// started a new pass whose `completed` or `reset` event never reached
    /// us; the guard is cleared so the new pass is counted. Returns whether
    /// it was cleared.
    pub fn observe_position(&mut self, current_index: u64) -> bool {
        match self.seen.iter().max() {
            Some(&highest) if current_index < highest => {
                debug!(
                    "Playback restarted at {} (seen up to #{}), clearing replay guard",
                    current_index, highest
                );
                self.seen.clear();
                true
            }
            _ => false,
        }
    }

    /// Marks the end of a playback pass. The server restarts numbering on the
    /// next pass, so the replay guard is cleared while the counters are kept.
    pub fn end_playback(&mut self) {
        self.seen.clear();
    }

    pub fn top_interfaces(&self, k: usize) -> Vec<(&u32, &ActionBreakdown)> {
        top_k(&self.stats.interface_index, k)
    }

    pub fn top_prefixes(&self, k: usize) -> Vec<(&String, &ActionBreakdown)> {
        top_k(&self.stats.prefix_index, k)
    }
}

/// Leaderboard query over an index: descending count, ties by first
/// insertion, at most `k` entries.
pub fn top_k<K: Eq + Hash + Clone>(index: &KeyedIndex<K>, k: usize) -> Vec<(&K, &ActionBreakdown)> {
    index.top_k(k)
}
