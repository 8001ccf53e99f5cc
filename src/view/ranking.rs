use std::fmt::Display;

use serde::Serialize;

use crate::aggregation::{ActionBreakdown, AggregateStats};
use crate::record::{PolicyAction, TargetType};

const MAX_BARS: usize = 20;

/// One line of an interface or prefix leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub key: String,
    pub count: u64,
    pub permit: u64,
    pub discard: u64,
    pub ratelimit: u64,
    pub redirect: u64,
    /// Compact action split, e.g. `1P 2D 0R 0L`.
    pub actions: String,
    /// Length of the relative-volume bar, between 1 and 20.
    pub bars: usize,
}

impl RankingRow {
    pub(crate) fn build<K: Display>(
        rank: usize,
        key: &K,
        stats: &ActionBreakdown,
        total_records: u64,
    ) -> Self {
        Self {
            rank,
            key: key.to_string(),
            count: stats.count,
            permit: stats.permit,
            discard: stats.discard,
            ratelimit: stats.ratelimit,
            redirect: stats.redirect,
            actions: format!(
                "{}P {}D {}R {}L",
                stats.permit, stats.discard, stats.redirect, stats.ratelimit
            ),
            bars: bar_length(stats.count, total_records),
        }
    }
}

/// Bar scaled against the record total (not the mapping total), so busy keys
/// in micro-heavy streams saturate at the cap.
pub fn bar_length(count: u64, total_records: u64) -> usize {
    if total_records == 0 {
        return 1;
    }
    let scaled = (count as f64 / total_records as f64 * 50.0).round() as usize;
    scaled.clamp(1, MAX_BARS)
}

/// Labelled values for one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<&'static str>,
    pub values: Vec<u64>,
}

impl ChartSeries {
    /// Interface-based vs prefix-based validation.
    pub fn validation_mode(stats: &AggregateStats) -> Self {
        Self {
            labels: vec![TargetType::InterfaceBased.name(), TargetType::PrefixBased.name()],
            values: vec![stats.interface_based, stats.prefix_based],
        }
    }

    /// Policy action distribution.
    pub fn policy_actions(stats: &AggregateStats) -> Self {
        Self {
            labels: PolicyAction::ALL.iter().map(|a| a.name()).collect(),
            values: vec![stats.permit, stats.discard, stats.ratelimit, stats.redirect],
        }
    }
}
