//! Running statistics over a stream of SAV records.
//!
//! [`StreamAggregator`] owns an [`AggregateStats`] and mutates it once per
//! ingested record. Interface and prefix rankings are kept in insertion
//! ordered [`KeyedIndex`]es so that [`top_k`] can break count ties by first
//! appearance.
//!
//! ```
//! use savview::aggregation::StreamAggregator;
//! use savview::record::SavRecord;
//!
//! let mut aggregator = StreamAggregator::new();
//! let record: SavRecord = serde_json::from_str(
//!     r#"{"rule_type":0,"target_type":0,"policy_action":1,"mappings":[]}"#,
//! ).unwrap();
//! aggregator.ingest(&record);
//! assert_eq!(aggregator.snapshot().allowlist_failures, 1);
//! ```

pub mod aggregator;
pub mod stats;

pub use aggregator::{top_k, DedupPolicy, IngestOutcome, StreamAggregator};
pub use stats::{ActionBreakdown, AggregateStats, KeyedIndex};
