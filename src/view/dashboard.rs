use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

use super::ranking::{ChartSeries, RankingRow};
use crate::aggregation::{AggregateStats, DedupPolicy, IngestOutcome, StreamAggregator};
use crate::batch::BatchSnapshot;
use crate::control::types::{PlaybackReport, PlaybackStatus};
use crate::feed::FeedEvent;
use crate::record::SavRecord;

pub const DEFAULT_RECENT_RECORDS: usize = 10;
pub const DEFAULT_RANKING_SIZE: usize = 5;
const TIMELINE_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Ready,
    Playing,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum ConnectionState {
    Offline,
    Connected,
    Reconnecting { attempt: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub record_number: Option<u64>,
    pub time: Option<String>,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

/// View state of one dashboard session.
#[derive(Debug)]
pub struct Dashboard {
    aggregator: StreamAggregator,
    /// Newest first.
    recent: VecDeque<SavRecord>,
    recent_limit: usize,
    ranking_size: usize,
    timeline: VecDeque<TimelineEntry>,
    progress: Progress,
    playback: PlaybackState,
    status_message: Option<String>,
    speed: Option<f64>,
    connection: ConnectionState,
    batch: Option<BatchSnapshot>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(StreamAggregator::new())
    }
}

impl Dashboard {
    pub fn new(aggregator: StreamAggregator) -> Self {
        Self {
            aggregator,
            recent: VecDeque::new(),
            recent_limit: DEFAULT_RECENT_RECORDS,
            ranking_size: DEFAULT_RANKING_SIZE,
            timeline: VecDeque::new(),
            progress: Progress::default(),
            playback: PlaybackState::Ready,
            status_message: None,
            speed: None,
            connection: ConnectionState::Offline,
            batch: None,
        }
    }

    pub fn with_policy(policy: DedupPolicy) -> Self {
        Self::new(StreamAggregator::with_policy(policy))
    }

    pub fn with_limits(mut self, recent_limit: usize, ranking_size: usize) -> Self {
        self.recent_limit = recent_limit;
        self.ranking_size = ranking_size;
        self
    }

    /// Applies one feed event. Events must be applied in arrival order.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => self.connection = ConnectionState::Connected,
            FeedEvent::Reconnecting { attempt, .. } => {
                self.connection = ConnectionState::Reconnecting { attempt }
            }
            FeedEvent::Status { status, message } => match status {
                PlaybackStatus::Playing => self.set_playback(PlaybackState::Playing, None),
                PlaybackStatus::Paused => self.set_playback(PlaybackState::Paused, None),
                PlaybackStatus::Reset => {
                    self.reset();
                    self.status_message = message;
                }
            },
            FeedEvent::Report(report) => self.apply_report(&report),
            FeedEvent::Record(record) => {
                self.handle_record(*record);
            }
            FeedEvent::Completed { message } => {
                info!(
                    "Playback completed after {} records",
                    self.aggregator.snapshot().total
                );
                self.aggregator.end_playback();
                self.set_playback(PlaybackState::Completed, message);
            }
            FeedEvent::Speed { speed } => {
                debug!("Playback speed changed to {}x", speed);
                self.speed = Some(speed);
            }
            FeedEvent::Unknown { event, .. } => debug!("Ignoring '{}' feed event", event),
        }
    }

    /// Ingests a record and, unless it was a replay, updates the cards,
    /// timeline and progress.
    pub fn handle_record(&mut self, record: SavRecord) -> IngestOutcome {
        let outcome = self.aggregator.ingest(&record);
        if outcome == IngestOutcome::Applied {
            self.show_record(record);
        }
        outcome
    }

    fn show_record(&mut self, record: SavRecord) {
        self.timeline.push_back(TimelineEntry {
            record_number: record.record_number,
            time: record.timestamp.as_deref().map(time_of_day),
            action: record.action_name().to_string(),
        });
        if self.timeline.len() > TIMELINE_LIMIT {
            self.timeline.pop_front();
        }

        if let Some(current) = record.record_number {
            self.progress.current = current;
        }
        if let Some(total) = record.total_records {
            self.progress.total = total;
        }

        self.recent.push_front(record);
        self.recent.truncate(self.recent_limit);
    }

    /// Feeds a whole batch snapshot through the aggregator and keeps it for
    /// filtered listing. Batch entries bypass the replay guard.
    pub fn load_batch(&mut self, snapshot: BatchSnapshot) {
        for record in &snapshot.records {
            self.aggregator.ingest_unguarded(record);
            self.show_record(record.clone());
        }
        self.progress.total = snapshot.declared_total();
        self.batch = Some(snapshot);
        self.set_playback(PlaybackState::Completed, None);
    }

    /// The loaded batch snapshot, if any.
    pub fn batch(&self) -> Option<&BatchSnapshot> {
        self.batch.as_ref()
    }

    /// Back to an empty session. Progress keeps the known batch size.
    pub fn reset(&mut self) {
        self.aggregator.reset();
        self.recent.clear();
        self.timeline.clear();
        self.progress.current = 0;
        self.set_playback(PlaybackState::Ready, None);
    }

    pub fn aggregator(&self) -> &StreamAggregator {
        &self.aggregator
    }

    pub fn snapshot(&self) -> &AggregateStats {
        self.aggregator.snapshot()
    }

    pub fn recent_records(&self) -> impl Iterator<Item = &SavRecord> {
        self.recent.iter()
    }

    pub fn timeline(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.timeline.iter()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn ranking_size(&self) -> usize {
        self.ranking_size
    }

    pub fn interface_ranking(&self, k: usize) -> Vec<RankingRow> {
        let total = self.snapshot().total;
        self.aggregator
            .top_interfaces(k)
            .into_iter()
            .enumerate()
            .map(|(i, (key, stats))| RankingRow::build(i + 1, key, stats, total))
            .collect()
    }

    pub fn prefix_ranking(&self, k: usize) -> Vec<RankingRow> {
        let total = self.snapshot().total;
        self.aggregator
            .top_prefixes(k)
            .into_iter()
            .enumerate()
            .map(|(i, (key, stats))| RankingRow::build(i + 1, key, stats, total))
            .collect()
    }

    pub fn mode_chart(&self) -> ChartSeries {
        ChartSeries::validation_mode(self.snapshot())
    }

    pub fn policy_chart(&self) -> ChartSeries {
        ChartSeries::policy_actions(self.snapshot())
    }

    fn apply_report(&mut self, report: &PlaybackReport) {
        self.aggregator.observe_position(report.current_index);
        let state = match (report.is_playing, report.is_paused) {
            (true, true) => PlaybackState::Paused,
            (true, false) => PlaybackState::Playing,
            (false, _) => self.playback.clone(),
        };
        self.set_playback(state, None);
        self.speed = Some(report.speed);
        if report.total_records > 0 {
            self.progress.total = report.total_records;
        }
    }

    fn set_playback(&mut self, state: PlaybackState, message: Option<String>) {
        self.playback = state;
        self.status_message = message;
    }
}

/// Time part of a `YYYY-MM-DD HH:MM:SS` timestamp; other formats fall back to
/// the second whitespace separated token, then to the whole string.
fn time_of_day(timestamp: &str) -> String {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S") {
        return parsed.format("%H:%M:%S").to_string();
    }
    timestamp
        .split_whitespace()
        .nth(1)
        .unwrap_or(timestamp)
        .to_string()
}

/// A [`Dashboard`] shared between the feed consumer and the web handlers.
///
/// Every access takes the lock, so ingest calls never overlap.
#[derive(Debug, Clone)]
pub struct SharedDashboard {
    inner: Arc<Mutex<Dashboard>>,
}

impl SharedDashboard {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(dashboard)),
        }
    }

    /// Locks the dashboard. A poisoned lock is recovered: the state is plain
    /// counters and stays usable.
    pub fn lock(&self) -> MutexGuard<'_, Dashboard> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply(&self, event: FeedEvent) {
        self.lock().apply(event);
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Owned copy of the aggregate counters.
    pub fn stats(&self) -> AggregateStats {
        self.lock().snapshot().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::types::PlaybackReport;
    use crate::record::Mapping;

    fn numbered(n: u64, action: i64) -> SavRecord {
        SavRecord {
            record_number: Some(n),
            total_records: Some(27),
            timestamp: Some(format!("2025-12-10 12:28:{:02}", n)),
            rule_type: Some(0),
            target_type: Some(0),
            policy_action: Some(action),
            mappings: vec![Mapping {
                interface_id: (n % 3) as u32,
                prefix: "203.0.113.0".to_string(),
                prefix_length: 24,
                is_ipv6: false,
            }],
            ..Default::default()
        }
    }

    fn record_event(n: u64) -> FeedEvent {
        FeedEvent::Record(Box::new(numbered(n, 1)))
    }

    #[test]
    fn keeps_only_the_last_ten_cards_newest_first() {
        let mut dashboard = Dashboard::default();
        for n in 1..=12 {
            dashboard.apply(record_event(n));
        }

        let shown: Vec<u64> = dashboard
            .recent_records()
            .filter_map(|r| r.record_number)
            .collect();
        assert_eq!(shown, (3..=12).rev().collect::<Vec<u64>>());
        assert_eq!(dashboard.snapshot().total, 12);
        assert_eq!(dashboard.progress(), Progress { current: 12, total: 27 });
    }

    #[test]
    fn timeline_shows_time_and_action() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(record_event(7));

        let entry = dashboard.timeline().next().cloned().unwrap();
        assert_eq!(entry.record_number, Some(7));
        assert_eq!(entry.time.as_deref(), Some("12:28:07"));
        assert_eq!(entry.action, "Discard");
    }

    #[test]
    fn status_events_drive_playback_state() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(FeedEvent::Status {
            status: PlaybackStatus::Playing,
            message: None,
        });
        assert_eq!(dashboard.playback(), &PlaybackState::Playing);

        dashboard.apply(FeedEvent::Status {
            status: PlaybackStatus::Paused,
            message: None,
        });
        assert_eq!(dashboard.playback(), &PlaybackState::Paused);

        dashboard.apply(FeedEvent::Completed {
            message: Some("Playback completed. Click Reset to replay.".to_string()),
        });
        assert_eq!(dashboard.playback(), &PlaybackState::Completed);
        assert!(dashboard.status_message().unwrap().contains("Reset"));
    }

    #[test]
    fn reset_status_clears_view_but_keeps_batch_size() {
        let mut dashboard = Dashboard::default();
        for n in 1..=3 {
            dashboard.apply(record_event(n));
        }
        dashboard.apply(FeedEvent::Status {
            status: PlaybackStatus::Reset,
            message: Some("Click Start to begin playback".to_string()),
        });

        assert_eq!(dashboard.snapshot().total, 0);
        assert!(dashboard.snapshot().interface_index.is_empty());
        assert_eq!(dashboard.recent_records().count(), 0);
        assert_eq!(dashboard.timeline().count(), 0);
        assert_eq!(dashboard.progress(), Progress { current: 0, total: 27 });
        assert_eq!(dashboard.playback(), &PlaybackState::Ready);
        assert_eq!(dashboard.status_message(), Some("Click Start to begin playback"));
    }

    #[test]
    fn replays_after_reconnect_are_not_shown_twice() {
        let mut dashboard = Dashboard::with_policy(DedupPolicy::ByRecordNumber);
        dashboard.apply(FeedEvent::Connected);
        dashboard.apply(record_event(1));
        dashboard.apply(record_event(2));
        dashboard.apply(FeedEvent::Reconnecting {
            attempt: 1,
            delay: std::time::Duration::from_secs(3),
        });
        assert_eq!(
            dashboard.connection(),
            &ConnectionState::Reconnecting { attempt: 1 }
        );
        dashboard.apply(FeedEvent::Connected);
        dashboard.apply(record_event(1));
        dashboard.apply(record_event(2));
        dashboard.apply(record_event(3));

        assert_eq!(dashboard.snapshot().total, 3);
        assert_eq!(dashboard.recent_records().count(), 3);
        assert_eq!(dashboard.connection(), &ConnectionState::Connected);
    }

    #[test]
    fn next_playback_pass_counts_again_after_completion() {
        let mut dashboard = Dashboard::with_policy(DedupPolicy::ByRecordNumber);
        dashboard.apply(record_event(1));
        dashboard.apply(FeedEvent::Completed { message: None });
        dashboard.apply(record_event(1));

        assert_eq!(dashboard.snapshot().total, 2);
    }

    #[test]
    fn report_sets_speed_and_total() {
        let mut dashboard = Dashboard::default();
        dashboard.apply(FeedEvent::Report(PlaybackReport {
            is_playing: true,
            is_paused: true,
            current_index: 4,
            total_records: 27,
            speed: 2.0,
        }));

        assert_eq!(dashboard.playback(), &PlaybackState::Paused);
        assert_eq!(dashboard.speed(), Some(2.0));
        assert_eq!(dashboard.progress().total, 27);
    }

    #[test]
    fn rankings_are_numbered_from_one() {
        let mut dashboard = Dashboard::default().with_limits(10, 2);
        for n in 1..=6 {
            dashboard.apply(record_event(n));
        }

        let rows = dashboard.interface_ranking(dashboard.ranking_size());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        // ids 1, 2, 0 all seen twice; first seen wins the tie
        assert_eq!(rows[0].key, "1");
        assert_eq!(rows[1].key, "2");

        let prefixes = dashboard.prefix_ranking(5);
        assert_eq!(prefixes.len(), 1);
        assert_eq!(prefixes[0].key, "203.0.113.0/24");
        assert_eq!(prefixes[0].discard, 6);
    }

    #[test]
    fn batch_load_aggregates_every_record() {
        let snapshot = BatchSnapshot {
            records: (1..=4).map(|n| numbered(n, 0)).collect(),
            total_records: Some(4),
            ..Default::default()
        };
        let mut dashboard = Dashboard::default();
        dashboard.load_batch(snapshot);

        assert_eq!(dashboard.snapshot().total, 4);
        assert_eq!(dashboard.snapshot().permit, 4);
        assert_eq!(dashboard.progress(), Progress { current: 4, total: 4 });
        assert_eq!(dashboard.playback(), &PlaybackState::Completed);
        assert_eq!(dashboard.batch().map(|b| b.records.len()), Some(4));
    }

    #[test]
    fn batch_load_ignores_the_replay_guard() {
        // two producers numbering from 1 merged into one snapshot
        let snapshot = BatchSnapshot {
            records: (1..=3).chain(1..=3).map(|n| numbered(n, 1)).collect(),
            ..Default::default()
        };
        let mut dashboard = Dashboard::with_policy(DedupPolicy::ByRecordNumber);
        dashboard.load_batch(snapshot);

        assert_eq!(dashboard.snapshot().total, 6);
        assert_eq!(dashboard.recent_records().count(), 6);
    }

    fn missed_completion_then_new_pass(policy: DedupPolicy) -> u64 {
        let mut dashboard = Dashboard::with_policy(policy);
        dashboard.apply(FeedEvent::Connected);
        for n in 1..=3 {
            dashboard.apply(record_event(n));
        }
        // `completed` lost while disconnected; the server restarted playback
        dashboard.apply(FeedEvent::Reconnecting {
            attempt: 1,
            delay: std::time::Duration::from_secs(3),
        });
        dashboard.apply(FeedEvent::Connected);
        dashboard.apply(FeedEvent::Report(PlaybackReport {
            is_playing: true,
            is_paused: false,
            current_index: 0,
            total_records: 3,
            speed: 1.0,
        }));
        for n in 1..=3 {
            dashboard.apply(record_event(n));
        }
        dashboard.snapshot().total
    }

    #[test]
    fn new_pass_is_counted_when_completion_was_missed() {
        assert_eq!(missed_completion_then_new_pass(DedupPolicy::Disabled), 6);
        assert_eq!(missed_completion_then_new_pass(DedupPolicy::ByRecordNumber), 6);
    }

    #[test]
    fn report_mid_pass_keeps_the_replay_guard() {
        let mut dashboard = Dashboard::with_policy(DedupPolicy::ByRecordNumber);
        for n in 1..=3 {
            dashboard.apply(record_event(n));
        }
        dashboard.apply(FeedEvent::Report(PlaybackReport {
            is_playing: true,
            is_paused: false,
            current_index: 3,
            total_records: 27,
            speed: 1.0,
        }));
        dashboard.apply(record_event(3));
        dashboard.apply(record_event(4));

        assert_eq!(dashboard.snapshot().total, 4);
    }

    #[test]
    fn time_of_day_falls_back_gracefully() {
        assert_eq!(time_of_day("2025-12-10 08:01:02"), "08:01:02");
        assert_eq!(time_of_day("day 12:00"), "12:00");
        assert_eq!(time_of_day("1765369718000"), "1765369718000");
    }

    #[test]
    fn shared_dashboard_serialises_access() {
        let shared = SharedDashboard::new(Dashboard::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for n in 0..25 {
                        shared.apply(record_event(t * 100 + n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.stats().total, 100);
        shared.reset();
        assert_eq!(shared.stats().total, 0);
    }
}
