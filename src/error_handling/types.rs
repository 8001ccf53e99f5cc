use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadUrl(String),
    BadIPFormatting(String),
    NotInRange(String),
    MissingValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadUrl(e) => write!(f, "URL error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::MissingValue(e) => write!(f, "Missing value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures of the live event feed transport.
///
/// None of these are fatal to a subscription: they end the current
/// connection and trigger the reconnect policy.
#[derive(Debug)]
pub enum FeedError {
    ConnectionFailed(String),
    UnexpectedStatus(u16),
    StreamInterrupted(String),
    StreamClosed,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::ConnectionFailed(e) => write!(f, "Feed connection failed: {}", e),
            FeedError::UnexpectedStatus(code) => {
                write!(f, "Feed endpoint answered with HTTP status {}", code)
            }
            FeedError::StreamInterrupted(e) => write!(f, "Feed stream interrupted: {}", e),
            FeedError::StreamClosed => write!(f, "Feed stream closed by the server"),
        }
    }
}

impl std::error::Error for FeedError {}

#[derive(Debug)]
pub enum ControlError {
    RequestFailed(String),
    UnexpectedStatus(u16),
    InvalidSpeed(f64),
    DecodeFailed(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::RequestFailed(e) => write!(f, "Control request failed: {}", e),
            ControlError::UnexpectedStatus(code) => {
                write!(f, "Control endpoint answered with HTTP status {}", code)
            }
            ControlError::InvalidSpeed(speed) => write!(f, "Invalid playback speed: {}", speed),
            ControlError::DecodeFailed(e) => write!(f, "Control response decoding failed: {}", e),
        }
    }
}

impl std::error::Error for ControlError {}

/// Failures of the one-shot batch load. Any of these aborts the batch render.
#[derive(Debug)]
pub enum BatchError {
    FetchFailed(String),
    UnexpectedStatus(u16),
    IoError(std::io::Error),
    ParseError(String),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::FetchFailed(e) => write!(f, "Batch fetch failed: {}", e),
            BatchError::UnexpectedStatus(code) => write!(f, "HTTP error! status: {}", code),
            BatchError::IoError(e) => write!(f, "Batch IO error: {}", e),
            BatchError::ParseError(e) => write!(f, "Batch parsing error: {}", e),
        }
    }
}

impl std::error::Error for BatchError {}

impl From<std::io::Error> for BatchError {
    fn from(err: std::io::Error) -> Self {
        BatchError::IoError(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    BatchError(BatchError),
    ControlError(ControlError),
    WebError(WebError),
    InitializationFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::BatchError(e) => write!(f, "Batch error: {}", e),
            ControllerError::ControlError(e) => write!(f, "Control error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
            ControllerError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<BatchError> for ControllerError {
    fn from(err: BatchError) -> Self {
        ControllerError::BatchError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}

impl From<ControlError> for ControllerError {
    fn from(err: ControlError) -> Self {
        ControllerError::ControlError(err)
    }
}
