//! Dashboard view state.
//!
//! [`Dashboard`] is what the rendering layer reads: the aggregate counters,
//! the last few record cards, the timeline, progress and playback state. It
//! applies [`crate::feed::FeedEvent`]s in arrival order and is the only
//! writer of its [`crate::aggregation::StreamAggregator`].

pub mod dashboard;
pub mod ranking;

pub use dashboard::{
    ConnectionState, Dashboard, PlaybackState, Progress, SharedDashboard, TimelineEntry,
};
pub use ranking::{ChartSeries, RankingRow};
