//! One-shot batch snapshot of SAV records.
//!
//! A batch is a JSON document `{ records, totalRecords, ipVersion,
//! generatedAt }` produced offline from an IPFIX capture. It is loaded either
//! over HTTP or from a local file; any failure aborts the batch view with a
//! single error.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error_handling::types::BatchError;
use crate::record::lenient;
use crate::record::SavRecord;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSnapshot {
    #[serde(default, deserialize_with = "lenient_records")]
    pub records: Vec<SavRecord>,
    #[serde(default, rename = "totalRecords", deserialize_with = "lenient::loose_number")]
    pub total_records: Option<u64>,
    #[serde(default, rename = "ipVersion", deserialize_with = "lenient::loose_number")]
    pub ip_version: Option<u8>,
    #[serde(default, rename = "generatedAt", deserialize_with = "epoch_seconds")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl BatchSnapshot {
    pub fn parse(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::ParseError(e.to_string()))
    }

    /// Record count announced by the producer, or the number actually loaded.
    pub fn declared_total(&self) -> u64 {
        self.total_records.unwrap_or(self.records.len() as u64)
    }

    /// `IPv4` unless the producer said otherwise.
    pub fn ip_version_label(&self) -> String {
        format!("IPv{}", self.ip_version.unwrap_or(4))
    }

    /// Number of rule mappings across all records.
    pub fn total_rules(&self) -> usize {
        self.records.iter().map(|r| r.mappings.len()).sum()
    }

    pub fn filter<'a>(&'a self, filter: &'a RecordFilter) -> impl Iterator<Item = &'a SavRecord> {
        self.records.iter().filter(move |r| filter.matches(r))
    }
}

/// Record selection for the batch view: an exact rule type name and a
/// case-insensitive search over source prefixes and interface ids.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub rule_type_name: Option<String>,
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn new(rule_type_name: Option<&str>, search: Option<&str>) -> Self {
        Self {
            rule_type_name: rule_type_name
                .filter(|name| !name.is_empty() && *name != "all")
                .map(str::to_string),
            search: search
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, record: &SavRecord) -> bool {
        if let Some(name) = &self.rule_type_name {
            if record.rule_type_name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }

        if let Some(text) = &self.search {
            let hit = record.mappings.iter().any(|m| {
                m.prefix.to_lowercase().contains(text.as_str())
                    || m.interface_id.to_string().contains(text.as_str())
            });
            if !hit {
                return false;
            }
        }

        true
    }
}

/// Loads a batch from an `http(s)://` URL or a file path.
pub async fn load_batch(source: &str) -> Result<BatchSnapshot, BatchError> {
    let snapshot = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_batch(source).await?
    } else {
        load_batch_file(source)?
    };

    info!(
        "Loaded batch of {} records ({} rules, {}) from {}",
        snapshot.records.len(),
        snapshot.total_rules(),
        snapshot.ip_version_label(),
        source
    );
    Ok(snapshot)
}

pub async fn fetch_batch(url: &str) -> Result<BatchSnapshot, BatchError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BatchError::FetchFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(BatchError::UnexpectedStatus(response.status().as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| BatchError::FetchFailed(e.to_string()))?;
    BatchSnapshot::parse(&body)
}

pub fn load_batch_file<P: AsRef<Path>>(path: P) -> Result<BatchSnapshot, BatchError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    BatchSnapshot::parse(&content)
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<SavRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| match serde_json::from_value::<SavRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping batch entry {}: {}", i, e);
                None
            }
        })
        .collect())
}

fn epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .and_then(|secs| DateTime::from_timestamp(secs.trunc() as i64, 0)))
}
