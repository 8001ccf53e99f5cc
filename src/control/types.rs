use serde::{Deserialize, Serialize};

use crate::error_handling::types::ControlError;

/// Playback state announced by `status` feed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Reset,
}

/// Snapshot of the backend's playback loop, as returned by `GET /api/status`
/// and pushed as the first `status` event of every feed connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackReport {
    pub is_playing: bool,
    pub is_paused: bool,
    pub current_index: u64,
    pub total_records: u64,
    pub speed: f64,
}

/// Playback speed multiplier. The dashboard offers 0.5, 1, 2 and 4, the
/// backend accepts any positive value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackSpeed(f64);

impl PlaybackSpeed {
    pub const SLOW: PlaybackSpeed = PlaybackSpeed(0.5);
    pub const NORMAL: PlaybackSpeed = PlaybackSpeed(1.0);
    pub const FAST: PlaybackSpeed = PlaybackSpeed(2.0);
    pub const VERY_FAST: PlaybackSpeed = PlaybackSpeed(4.0);

    pub fn new(value: f64) -> Result<Self, ControlError> {
        if value.is_finite() && value > 0.0 {
            Ok(PlaybackSpeed(value))
        } else {
            Err(ControlError::InvalidSpeed(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        PlaybackSpeed::NORMAL
    }
}

impl TryFrom<f64> for PlaybackSpeed {
    type Error = ControlError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        PlaybackSpeed::new(value)
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> Self {
        speed.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_rejects_non_positive_values() {
        assert!(PlaybackSpeed::new(0.0).is_err());
        assert!(PlaybackSpeed::new(-1.0).is_err());
        assert!(PlaybackSpeed::new(f64::NAN).is_err());
        assert_eq!(PlaybackSpeed::new(2.0).unwrap(), PlaybackSpeed::FAST);
    }

    #[test]
    fn report_tolerates_missing_fields() {
        let report: PlaybackReport = serde_json::from_str(r#"{"is_playing":true}"#).unwrap();
        assert!(report.is_playing);
        assert_eq!(report.total_records, 0);
    }

    #[test]
    fn status_uses_lowercase_names() {
        let status: PlaybackStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, PlaybackStatus::Paused);
    }
}
