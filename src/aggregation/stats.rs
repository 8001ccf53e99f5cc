use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::Serialize;

use crate::record::{PolicyAction, RuleType, SavRecord, TargetType};

/// Per-key hit counters: total mappings seen for the key and the split of
/// those hits by policy action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionBreakdown {
    pub count: u64,
    pub permit: u64,
    pub discard: u64,
    pub ratelimit: u64,
    pub redirect: u64,
}

impl ActionBreakdown {
    /// Counts one hit. An unknown action still counts towards `count`.
    pub(crate) fn record(&mut self, action: Option<PolicyAction>) {
        self.count += 1;
        match action {
            Some(PolicyAction::Permit) => self.permit += 1,
            Some(PolicyAction::Discard) => self.discard += 1,
            Some(PolicyAction::RateLimit) => self.ratelimit += 1,
            Some(PolicyAction::Redirect) => self.redirect += 1,
            None => {}
        }
    }
}

/// Insertion ordered map from a ranking key to its [`ActionBreakdown`].
#[derive(Debug, Clone)]
pub struct KeyedIndex<K> {
    entries: Vec<(K, ActionBreakdown)>,
    positions: HashMap<K, usize>,
}

impl<K> Default for KeyedIndex<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedIndex<K> {
    /// Returns the entry for `key`, inserting a zeroed one on first sight.
    pub(crate) fn entry_mut(&mut self, key: K) -> &mut ActionBreakdown {
        let position = match self.positions.get(&key).copied() {
            Some(position) => position,
            None => {
                let position = self.entries.len();
                self.positions.insert(key.clone(), position);
                self.entries.push((key, ActionBreakdown::default()));
                position
            }
        };
        &mut self.entries[position].1
    }

    pub fn get(&self, key: &K) -> Option<&ActionBreakdown> {
        self.positions.get(key).map(|position| &self.entries[*position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &ActionBreakdown)> {
        self.entries.iter().map(|(key, stats)| (key, stats))
    }

    /// Sum of `count` over all entries.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|(_, stats)| stats.count).sum()
    }

    /// The `k` busiest entries, by descending count. Ties keep first-insertion
    /// order because the sort is stable over the insertion ordered entries.
    pub fn top_k(&self, k: usize) -> Vec<(&K, &ActionBreakdown)> {
        let mut ranked: Vec<(&K, &ActionBreakdown)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        ranked.truncate(k);
        ranked
    }
}

/// Aggregate counters for one viewing session.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub total: u64,

    pub interface_based: u64,
    pub prefix_based: u64,

    pub allowlist: u64,
    pub blocklist: u64,

    pub permit: u64,
    pub discard: u64,
    pub ratelimit: u64,
    pub redirect: u64,

    /// Allowlist records whose traffic was discarded.
    pub allowlist_failures: u64,
    /// Blocklist records whose traffic was discarded.
    pub blocklist_hits: u64,

    pub interface_index: KeyedIndex<u32>,
    pub prefix_index: KeyedIndex<String>,

    pub interface_set: HashSet<u32>,
    pub prefix_set: HashSet<String>,
}

impl AggregateStats {
    /// Folds one record into the counters.
    pub(crate) fn apply(&mut self, record: &SavRecord) {
        self.total += 1;

        let rule = record.rule();
        let action = record.action();

        match record.target() {
            Some(TargetType::InterfaceBased) => self.interface_based += 1,
            Some(TargetType::PrefixBased) => self.prefix_based += 1,
            None => {}
        }

        match rule {
            Some(RuleType::Allowlist) => self.allowlist += 1,
            Some(RuleType::Blocklist) => self.blocklist += 1,
            None => {}
        }

        match action {
            Some(PolicyAction::Permit) => self.permit += 1,
            Some(PolicyAction::Discard) => self.discard += 1,
            Some(PolicyAction::RateLimit) => self.ratelimit += 1,
            Some(PolicyAction::Redirect) => self.redirect += 1,
            None => {}
        }

        match (rule, action) {
            (Some(RuleType::Allowlist), Some(PolicyAction::Discard)) => {
                self.allowlist_failures += 1
            }
            (Some(RuleType::Blocklist), Some(PolicyAction::Discard)) => self.blocklist_hits += 1,
            _ => {}
        }

        for mapping in &record.mappings {
            let prefix_key = mapping.prefix_key();

            self.interface_set.insert(mapping.interface_id);
            self.interface_index
                .entry_mut(mapping.interface_id)
                .record(action);

            self.prefix_set.insert(prefix_key.clone());
            self.prefix_index.entry_mut(prefix_key).record(action);
        }
    }

    pub fn distinct_interfaces(&self) -> usize {
        self.interface_set.len()
    }

    pub fn distinct_prefixes(&self) -> usize {
        self.prefix_set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_index_keeps_first_insertion_order() {
        let mut index: KeyedIndex<&str> = KeyedIndex::default();
        index.entry_mut("b").record(None);
        index.entry_mut("a").record(None);
        index.entry_mut("b").record(Some(PolicyAction::Permit));

        let keys: Vec<&&str> = index.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![&"b", &"a"]);
        assert_eq!(index.get(&"b").map(|s| s.count), Some(2));
        assert_eq!(index.get(&"b").map(|s| s.permit), Some(1));
        assert_eq!(index.total_count(), 3);
    }

    #[test]
    fn unknown_action_counts_without_sub_counter() {
        let mut stats = ActionBreakdown::default();
        stats.record(None);
        assert_eq!(
            stats,
            ActionBreakdown {
                count: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn top_k_of_empty_index_is_empty() {
        let index: KeyedIndex<u32> = KeyedIndex::default();
        assert!(index.top_k(5).is_empty());
    }
}
