use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Where the match server lives.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Session channel endpoint; the username is appended as a query parameter.
    pub websocket_url: String,
    /// Base URL for the account and rankings API.
    pub api_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            websocket_url: "ws://localhost:8080/ws/game".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Session timing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub connect_timeout_secs: u64,
    /// How long to wait for an opponent before giving up. 0 waits forever.
    pub matchmaking_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connect_timeout_secs: 10,
            matchmaking_timeout_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_secs(self.matchmaking_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    /// Optional plain-text log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Where the debug log is exported, and loaded from at startup.
    pub capture_path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
            file: None,
            capture_path: PathBuf::from("client_logs.json"),
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist. The second value reports whether a file was read.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool), ConfigError> {
        if path.exists() {
            Ok((Self::load(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ws = self.websocket_url()?;
        if ws.scheme() != "ws" {
            return Err(ConfigError::Validation(format!(
                "server.websocket_url must use ws://, got {}://",
                ws.scheme()
            )));
        }

        let api = Url::parse(&self.server.api_base_url).map_err(|e| {
            ConfigError::Validation(format!("server.api_base_url is not a URL: {e}"))
        })?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "server.api_base_url must use http:// or https://, got {}://",
                api.scheme()
            )));
        }

        if self.session.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "session.connect_timeout_secs must be > 0".into(),
            ));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.filter must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Parsed session channel endpoint.
    pub fn websocket_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server.websocket_url).map_err(|e| {
            ConfigError::Validation(format!("server.websocket_url is not a URL: {e}"))
        })
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}
