//! SAV record model.
//!
//! Records arrive as JSON, either from the live feed (snake_case field names)
//! or from a batch snapshot (camelCase names, `rules` instead of `mappings`).
//! Both shapes decode into [`SavRecord`]. Decoding is deliberately lenient:
//! a field with an unexpected JSON type decodes as absent instead of failing
//! the whole record, so one bad record never stalls aggregation.

pub(crate) mod lenient;
pub mod types;

pub use types::{Mapping, PolicyAction, RecordKind, RuleType, SavRecord, TargetType};
