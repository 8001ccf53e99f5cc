//! Playback control surface of the backend.
//!
//! Control calls are fire-and-forget: only successful delivery matters, the
//! response bodies are not interpreted. The one exception is the status query,
//! which returns a [`PlaybackReport`].

pub mod client;
pub mod types;

pub use client::{ControlAction, ControlClient};
pub use types::{PlaybackReport, PlaybackSpeed, PlaybackStatus};
