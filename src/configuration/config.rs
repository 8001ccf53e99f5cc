use super::types::*;
use crate::aggregation::DedupPolicy;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::debug;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Command-line arguments.
///
/// Everything except the configuration file path is an override of a value
/// read from that file.
#[derive(Parser, Debug, Clone)]
#[command(name = "savview")]
#[command(version)]
#[command(about = "SAV IPFIX record dashboard core")]
pub struct CliArgs {
    /// TOML configuration file. Built-in defaults are used when omitted.
    pub config_file: Option<PathBuf>,

    /// Live feed or static batch.
    ///
    /// # Command Line
    /// Use `--mode <live|batch>` to set this value from the CLI
    #[arg(long, value_enum)]
    pub mode: Option<ViewMode>,

    /// Base URL of the SAV backend.
    ///
    /// # Command Line
    /// Use `--backend-url <URL>` or the `SAVVIEW_BACKEND_URL` variable
    #[arg(long, env = "SAVVIEW_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Batch snapshot location, URL or file path.
    ///
    /// # Command Line
    /// Use `--batch-source <URL|PATH>` to set this value from the CLI
    #[arg(long)]
    pub batch_source: Option<String>,

    /// Port of the JSON API served to the rendering layer.
    ///
    /// # Command Line
    /// Use `--web-ui-port <PORT>` to set this value from the CLI
    #[arg(long)]
    pub web_ui_port: Option<u16>,

    /// Ask the backend to start playback once subscribed.
    ///
    /// # Command Line
    /// Use `--autostart` flag. Its presence enables the feature
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub autostart: bool,
}

/// Application configuration.
///
/// # Fields Overview
///
/// - `mode`: `live` subscribes to the backend feed, `batch` loads a snapshot
/// - `backend_url`: base URL for the feed, control and status endpoints
/// - `batch_source`: snapshot URL or path, required in batch mode
/// - `dedup`: replay handling for records redelivered after a reconnect
/// - `recent_records`: number of record cards kept in the view
/// - `ranking_size`: default length of the interface and prefix leaderboards
/// - `web_ui_enabled` / `bind_address` / `web_ui_port`: the JSON API
/// - `autostart`: send a start request after subscribing
/// - `initial_speed`: playback speed requested on startup, if any
/// - `reconnect`: feed reconnect delay and attempt budget
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub mode: ViewMode,
    pub backend_url: String,
    pub batch_source: Option<String>,
    pub dedup: DedupPolicy,
    pub recent_records: usize,
    pub ranking_size: usize,
    pub web_ui_enabled: bool,
    pub bind_address: String,
    pub web_ui_port: u16,
    pub autostart: bool,
    pub initial_speed: Option<f64>,
    pub reconnect: ReconnectSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: ViewMode::Live,
            backend_url: String::from("http://localhost:8080"),
            batch_source: None,
            dedup: DedupPolicy::Disabled,
            recent_records: 10,
            ranking_size: 5,
            web_ui_enabled: true,
            bind_address: String::from("127.0.0.1"),
            web_ui_port: 9090,
            autostart: false,
            initial_speed: None,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the effective configuration: file (or defaults), then CLI overrides.
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        if let Some(mode) = args.mode {
            config.mode = mode;
        }
        if let Some(url) = &args.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(source) = &args.batch_source {
            config.batch_source = Some(source.clone());
        }
        if let Some(port) = args.web_ui_port {
            config.web_ui_port = port;
        }
        if args.autostart {
            config.autostart = true;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let needs_backend = self.mode == ViewMode::Live || self.autostart;
        if needs_backend && !is_http_url(&self.backend_url) {
            return Err(ConfigError::BadUrl(format!(
                "backend_url must be an http(s) URL, got '{}'",
                self.backend_url
            )));
        }

        if self.mode == ViewMode::Batch {
            match self.batch_source.as_deref() {
                None | Some("") => {
                    return Err(ConfigError::MissingValue(
                        "batch_source is required in batch mode".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }

        if self.web_ui_enabled {
            self.bind_address.parse::<IpAddr>().map_err(|_| {
                ConfigError::BadIPFormatting(format!(
                    "bind_address '{}' is not an IP address",
                    self.bind_address
                ))
            })?;

            if self.web_ui_port < 1024 {
                return Err(ConfigError::NotInRange(format!(
                    "web_ui_port {} must be within 1024-65535",
                    self.web_ui_port
                )));
            }
        }

        if self.recent_records == 0 || self.ranking_size == 0 {
            return Err(ConfigError::NotInRange(
                "recent_records and ranking_size must be at least 1".to_string(),
            ));
        }

        if self.reconnect.delay_ms == 0 {
            return Err(ConfigError::NotInRange(
                "reconnect.delay_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(speed) = self.initial_speed {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::NotInRange(format!(
                    "initial_speed {} must be a positive number",
                    speed
                )));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}
