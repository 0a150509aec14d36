use thiserror::Error;

/// Main error type for the bridge event watcher
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Bad log encoding: {0}")]
    BadEncoding(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("Event consumer closed")]
    ConsumerClosed,
}

/// Transport-level failures talking to the node
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {code}")]
    Status { code: u16 },

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Invalid contract address for {side}: {address}")]
    InvalidAddress { side: String, address: String },
}

/// Contract ABI loading errors
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("ABI parsing failed: {0}")]
    Parsing(String),

    #[error("Event not found in ABI: {0}")]
    MissingEvent(String),

    #[error("Invalid topic hash for {name}: {hash}")]
    InvalidTopicHash { name: String, hash: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Errors that stop the watcher from starting
    Critical,
    /// Errors that abort a whole poll cycle
    High,
    /// Errors that drop a single log entry
    Medium,
    /// Mostly informational
    Low,
}

impl WatcherError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WatcherError::Config(_) => ErrorSeverity::Critical,
            WatcherError::Abi(_) => ErrorSeverity::Critical,

            WatcherError::Network(NetworkError::Connection(_)) => ErrorSeverity::High,
            WatcherError::Network(NetworkError::Http(_)) => ErrorSeverity::High,
            WatcherError::Malformed(_) => ErrorSeverity::High,

            WatcherError::Network(NetworkError::Timeout { .. }) => ErrorSeverity::Medium,
            WatcherError::Network(NetworkError::Status { .. }) => ErrorSeverity::Medium,
            WatcherError::BadEncoding(_) => ErrorSeverity::Medium,

            WatcherError::ConsumerClosed => ErrorSeverity::Low,
        }
    }

    /// Whether the next poll tick can be expected to clear the error
    pub fn is_recoverable(&self) -> bool {
        match self {
            WatcherError::Network(_) => true,
            WatcherError::Malformed(_) => true,
            WatcherError::BadEncoding(_) => true,

            WatcherError::Config(_) => false,
            WatcherError::Abi(_) => false,
            WatcherError::ConsumerClosed => false,
        }
    }

    /// Short stable code used in structured log lines
    pub fn code(&self) -> &'static str {
        match self {
            WatcherError::Network(_) => "network",
            WatcherError::Malformed(_) => "malformed",
            WatcherError::BadEncoding(_) => "bad_encoding",
            WatcherError::Config(_) => "config",
            WatcherError::Abi(_) => "abi",
            WatcherError::ConsumerClosed => "consumer_closed",
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        WatcherError::Malformed(message.into())
    }

    pub(crate) fn bad_encoding(message: impl Into<String>) -> Self {
        WatcherError::BadEncoding(message.into())
    }
}
