use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by the board model when a move or snapshot cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} board")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("board snapshot has no cells")]
    EmptySnapshot,

    #[error("board snapshot row {row} has {found} cells, expected {expected}")]
    RaggedSnapshot {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the connection manager and its transports.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection is not open")]
    NotOpen,

    #[error("a username is required to open a session")]
    MissingUsername,

    #[error("invalid session endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("could not connect: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    TimedOut(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors raised by the account and ranking HTTP services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid service url: {0}")]
    InvalidUrl(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors raised while setting up logging or exporting the debug log.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to open log file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Errors that stop the terminal app from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}
