use std::time::Duration;

use log::{debug, info};

use super::types::{PlaybackReport, PlaybackSpeed};
use crate::error_handling::types::ControlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Start,
    Pause,
    Resume,
    Reset,
}

impl ControlAction {
    pub fn path(self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Reset => "reset",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "start" => Some(ControlAction::Start),
            "pause" => Some(ControlAction::Pause),
            "resume" => Some(ControlAction::Resume),
            "reset" => Some(ControlAction::Reset),
            _ => None,
        }
    }
}

/// HTTP client for the backend's `/api/control/*` endpoints.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn action_url(&self, action: ControlAction) -> String {
        format!("{}/api/control/{}", self.base_url, action.path())
    }

    pub fn speed_url(&self, speed: PlaybackSpeed) -> String {
        format!("{}/api/control/speed?value={}", self.base_url, speed.value())
    }

    pub fn status_url(&self) -> String {
        format!("{}/api/status", self.base_url)
    }

    pub async fn send(&self, action: ControlAction) -> Result<(), ControlError> {
        info!("Requesting playback {}", action.path());
        self.post(&self.action_url(action)).await
    }

    pub async fn start(&self) -> Result<(), ControlError> {
        self.send(ControlAction::Start).await
    }

    pub async fn pause(&self) -> Result<(), ControlError> {
        self.send(ControlAction::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ControlError> {
        self.send(ControlAction::Resume).await
    }

    /// Asks the backend to rewind playback. Callers holding aggregate state
    /// must reset it once this returns `Ok`, before ingesting anything else.
    pub async fn reset(&self) -> Result<(), ControlError> {
        self.send(ControlAction::Reset).await
    }

    pub async fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), ControlError> {
        info!("Requesting playback speed {}x", speed.value());
        self.post(&self.speed_url(speed)).await
    }

    pub async fn status(&self) -> Result<PlaybackReport, ControlError> {
        let response = self
            .client
            .get(self.status_url())
            .send()
            .await
            .map_err(|e| ControlError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ControlError::UnexpectedStatus(response.status().as_u16()));
        }

        response
            .json::<PlaybackReport>()
            .await
            .map_err(|e| ControlError::DecodeFailed(e.to_string()))
    }

    async fn post(&self, url: &str) -> Result<(), ControlError> {
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| ControlError::RequestFailed(e.to_string()))?;

        let status = response.status();
        debug!("POST {} -> {}", url, status);
        if !status.is_success() {
            return Err(ControlError::UnexpectedStatus(status.as_u16()));
        }
        Ok(())
    }
}
