use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregation::AggregateStats;
use crate::batch::{BatchSnapshot, RecordFilter};
use crate::record::SavRecord;
use crate::view::{
    ChartSeries, ConnectionState, Dashboard, PlaybackState, Progress, RankingRow, TimelineEntry,
};

/// API error payload
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

/// Aggregate counters as served by `GET /api/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsResponse {
    pub total: u64,
    pub interface_based: u64,
    pub prefix_based: u64,
    pub allowlist: u64,
    pub blocklist: u64,
    pub permit: u64,
    pub discard: u64,
    pub ratelimit: u64,
    pub redirect: u64,
    pub allowlist_failures: u64,
    pub blocklist_hits: u64,
    pub distinct_interfaces: usize,
    pub distinct_prefixes: usize,
}

impl From<&AggregateStats> for StatsResponse {
    fn from(stats: &AggregateStats) -> Self {
        Self {
            total: stats.total,
            interface_based: stats.interface_based,
            prefix_based: stats.prefix_based,
            allowlist: stats.allowlist,
            blocklist: stats.blocklist,
            permit: stats.permit,
            discard: stats.discard,
            ratelimit: stats.ratelimit,
            redirect: stats.redirect,
            allowlist_failures: stats.allowlist_failures,
            blocklist_hits: stats.blocklist_hits,
            distinct_interfaces: stats.distinct_interfaces(),
            distinct_prefixes: stats.distinct_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingResponse {
    pub k: usize,
    pub rows: Vec<RankingRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartsResponse {
    pub validation_mode: ChartSeries,
    pub policy_actions: ChartSeries,
}

/// Everything the rendering layer needs for one repaint.
#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    pub playback: PlaybackState,
    pub connection: ConnectionState,
    pub status_message: Option<String>,
    pub speed: Option<f64>,
    pub progress: Progress,
    pub stats: StatsResponse,
    pub recent_records: Vec<SavRecord>,
    pub timeline: Vec<TimelineEntry>,
    pub top_interfaces: Vec<RankingRow>,
    pub top_prefixes: Vec<RankingRow>,
    pub charts: ChartsResponse,
}

impl ViewResponse {
    pub fn build(dashboard: &Dashboard) -> Self {
        let k = dashboard.ranking_size();
        Self {
            playback: dashboard.playback().clone(),
            connection: dashboard.connection().clone(),
            status_message: dashboard.status_message().map(str::to_string),
            speed: dashboard.speed(),
            progress: dashboard.progress(),
            stats: StatsResponse::from(dashboard.snapshot()),
            recent_records: dashboard.recent_records().cloned().collect(),
            timeline: dashboard.timeline().cloned().collect(),
            top_interfaces: dashboard.interface_ranking(k),
            top_prefixes: dashboard.prefix_ranking(k),
            charts: ChartsResponse {
                validation_mode: dashboard.mode_chart(),
                policy_actions: dashboard.policy_chart(),
            },
        }
    }
}

/// Acknowledgement of a forwarded control request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlResponse {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Loaded batch as served by `GET /api/batch`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub ip_version: String,
    pub total_records: u64,
    pub total_rules: usize,
    pub generated_at: Option<DateTime<Utc>>,
    /// Records passing the filter, in snapshot order.
    pub matched: usize,
    pub records: Vec<SavRecord>,
}

impl BatchResponse {
    pub fn build(snapshot: &BatchSnapshot, filter: &RecordFilter) -> Self {
        let records: Vec<SavRecord> = snapshot.filter(filter).cloned().collect();
        Self {
            ip_version: snapshot.ip_version_label(),
            total_records: snapshot.declared_total(),
            total_rules: snapshot.total_rules(),
            generated_at: snapshot.generated_at,
            matched: records.len(),
            records,
        }
    }
}
