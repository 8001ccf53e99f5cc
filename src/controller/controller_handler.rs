use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::batch::load_batch;
use crate::configuration::{Config, ViewMode};
use crate::control::{ControlClient, PlaybackSpeed};
use crate::error_handling::types::*;
use crate::feed::{FeedEvent, FeedSubscription, HttpTransport};
use crate::view::{Dashboard, SharedDashboard};
use crate::web_interface::WebServer;

pub struct Controller {
    pub config: Config,
    id: Uuid,
    dashboard: SharedDashboard,
    control: ControlClient,
    web_task: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate()?;

        let id = Uuid::new_v4();
        debug!("[{}] Creating controller in {:?} mode", id, config.mode);

        let dashboard = SharedDashboard::new(
            Dashboard::with_policy(config.dedup)
                .with_limits(config.recent_records, config.ranking_size),
        );
        let control = ControlClient::new(&config.backend_url);

        Ok(Self {
            config,
            id,
            dashboard,
            control,
            web_task: None,
        })
    }

    /// Handle on the view state, shared with the web interface.
    pub fn dashboard(&self) -> SharedDashboard {
        self.dashboard.clone()
    }

    /// Runs the configured mode to completion. With the web interface enabled
    /// the API keeps serving the final state afterwards.
    pub async fn run(&mut self) -> Result<(), ControllerError> {
        info!("[{}] Controller running", self.id);

        if self.config.web_ui_enabled {
            self.start_web_interface();
        }

        match self.config.mode {
            ViewMode::Batch => self.run_batch().await?,
            ViewMode::Live => self.run_live().await?,
        }

        if let Some(task) = self.web_task.as_mut() {
            info!("[{}] Feed finished, web interface still serving", self.id);
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    return Err(ControllerError::InitializationFailed(e.to_string()));
                }
            }
        }

        Ok(())
    }

    pub fn shutdown(&mut self) {
        info!("[{}] Shutting down", self.id);
        if let Some(task) = self.web_task.take() {
            task.abort();
        }
    }

    pub async fn start_playback(&self) -> Result<(), ControllerError> {
        Ok(self.control.start().await?)
    }

    pub async fn set_speed(&self, speed: f64) -> Result<(), ControllerError> {
        let speed = PlaybackSpeed::new(speed)?;
        Ok(self.control.set_speed(speed).await?)
    }

    fn start_web_interface(&mut self) {
        let server = WebServer::new(self.dashboard.clone(), self.control.clone());
        let bind_address = self.config.bind_address.clone();
        let port = self.config.web_ui_port;
        let id = self.id;

        self.web_task = Some(tokio::spawn(async move {
            if let Err(e) = server.start(&bind_address, port).await {
                error!("[{}] Web interface stopped: {}", id, e);
            }
        }));
    }

    async fn run_batch(&mut self) -> Result<(), ControllerError> {
        let source = self.config.batch_source.clone().ok_or_else(|| {
            ConfigError::MissingValue("batch_source is required in batch mode".to_string())
        })?;

        let snapshot = match load_batch(&source).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("[{}] Failed to load batch data: {}", self.id, e);
                return Err(e.into());
            }
        };

        let mut dashboard = self.dashboard.lock();
        dashboard.load_batch(snapshot);
        let stats = dashboard.snapshot();
        info!(
            "[{}] Batch loaded: {} records, {} interfaces, {} prefixes, {} discarded",
            self.id,
            stats.total,
            stats.distinct_interfaces(),
            stats.distinct_prefixes(),
            stats.discard
        );
        Ok(())
    }

    async fn run_live(&mut self) -> Result<(), ControllerError> {
        let transport = HttpTransport::new(&self.config.backend_url);
        info!("[{}] Subscribing to {}", self.id, transport.url());
        let mut subscription = FeedSubscription::open(transport, self.config.reconnect.policy());

        // playback requests are best effort: the feed is useful without them
        if let Some(speed) = self.config.initial_speed {
            if let Err(e) = self.set_speed(speed).await {
                warn!("[{}] Unable to set initial speed: {}", self.id, e);
            }
        }
        if self.config.autostart {
            if let Err(e) = self.start_playback().await {
                warn!("[{}] Unable to start playback: {}", self.id, e);
            }
        }

        while let Some(event) = subscription.next_event().await {
            if let FeedEvent::Unknown { event, .. } = &event {
                debug!("[{}] Unhandled '{}' event", self.id, event);
                continue;
            }
            self.dashboard.apply(event);
        }

        warn!(
            "[{}] Feed subscription {} ended",
            self.id,
            subscription.id()
        );
        Ok(())
    }
}
