use std::time::Duration;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use super::sse::SseFrame;
use crate::control::types::{PlaybackReport, PlaybackStatus};
use crate::record::SavRecord;

/// Typed event delivered by a [`super::FeedSubscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Transport (re)established.
    Connected,
    /// Transport dropped; the next attempt starts after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// Playback state change pushed by the backend.
    Status {
        status: PlaybackStatus,
        message: Option<String>,
    },
    /// Full playback report, sent as the first `status` event on connect.
    Report(PlaybackReport),
    Record(Box<SavRecord>),
    Completed { message: Option<String> },
    Speed { speed: f64 },
    /// Anything this client does not understand; kept for logging.
    Unknown { event: String, data: String },
}

#[derive(Deserialize)]
struct StatusPayload {
    status: PlaybackStatus,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct CompletedPayload {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct SpeedPayload {
    speed: f64,
}

fn payload(frame: &SseFrame) -> Result<Value, String> {
    serde_json::from_str(&frame.data).map_err(|e| format!("non-JSON payload: {}", e))
}

impl FeedEvent {
    /// Maps an SSE frame to a feed event.
    ///
    /// Unknown event names pass through untouched, whatever their payload.
    /// Returns `None` when a known event carries an undecodable payload; the
    /// frame is dropped with a warning and the feed carries on.
    pub fn from_frame(frame: &SseFrame) -> Option<FeedEvent> {
        let event = match frame.event.as_str() {
            "status" => payload(frame).and_then(Self::status),
            "record" => payload(frame).and_then(|p| {
                serde_json::from_value::<SavRecord>(p)
                    .map(|record| FeedEvent::Record(Box::new(record)))
                    .map_err(|e| e.to_string())
            }),
            "completed" => payload(frame).and_then(|p| {
                serde_json::from_value::<CompletedPayload>(p)
                    .map(|p| FeedEvent::Completed { message: p.message })
                    .map_err(|e| e.to_string())
            }),
            "speed" => payload(frame).and_then(|p| {
                serde_json::from_value::<SpeedPayload>(p)
                    .map(|p| FeedEvent::Speed { speed: p.speed })
                    .map_err(|e| e.to_string())
            }),
            _ => {
                return Some(FeedEvent::Unknown {
                    event: frame.event.clone(),
                    data: frame.data.clone(),
                })
            }
        };

        match event {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Dropping malformed '{}' event: {}", frame.event, e);
                None
            }
        }
    }

    // `status` carries either a state change or the full playback report
    fn status(payload: Value) -> Result<FeedEvent, String> {
        if payload.get("status").is_some() {
            serde_json::from_value::<StatusPayload>(payload)
                .map(|p| FeedEvent::Status {
                    status: p.status,
                    message: p.message,
                })
                .map_err(|e| e.to_string())
        } else {
            serde_json::from_value::<PlaybackReport>(payload)
                .map(FeedEvent::Report)
                .map_err(|e| e.to_string())
        }
    }
}
