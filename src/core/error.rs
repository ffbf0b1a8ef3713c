use thiserror::Error;

/// Errors surfaced by the exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Only POST is allowed")]
    MethodNotAllowed,

    #[error("Only application/json is allowed, got {0:?}")]
    UnsupportedContentType(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Not gzipped: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("cannot decode JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Sample store is closed")]
    StoreClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Async task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExporterError>;

impl ExporterError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Returns true if the error was caused by the client's request
    /// rather than by the exporter itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MethodNotAllowed
                | Self::UnsupportedContentType(_)
                | Self::PayloadTooLarge(_)
                | Self::Decompress(_)
                | Self::Decode(_)
        )
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::MethodNotAllowed | Self::UnsupportedContentType(_) | Self::PayloadTooLarge(_) => {
                "request"
            },
            Self::Decompress(_) | Self::Decode(_) => "decode",
            Self::Network(_) => "network",
            Self::StoreClosed => "store",
            Self::Io(_) => "io",
            Self::Join(_) => "async",
        }
    }
}
