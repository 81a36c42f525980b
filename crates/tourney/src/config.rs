//! Server configuration file.
//!
//! A flat JSON object read once at startup:
//!
//! ```json
//! {
//!   "port": 10156,
//!   "serverName": "Default Server Name",
//!   "teamsEnabled": false,
//!   "tournamentModeEnabled": false
//! }
//! ```
//!
//! Missing keys take their defaults, and the completed object is written
//! back so the file always lists every setting.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tourney_protocol::ServerSettings;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 10156;

/// Default display name sent to clients on connect.
pub const DEFAULT_SERVER_NAME: &str = "Default Server Name";

/// Errors from reading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read, or could not be written.
    #[error("config file i/o: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid configuration object.
    #[error("config file is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Startup settings for a [`TourneyServer`](crate::TourneyServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub port: u16,
    pub server_name: String,
    pub teams_enabled: bool,
    pub tournament_mode_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            teams_enabled: false,
            tournament_mode_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Reads `path`, filling in defaults for anything missing, and writes
    /// the completed configuration back.
    ///
    /// A file that does not exist yet is created with all defaults.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Self::default(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        let text = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, text)?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    /// Address to listen on: every interface, at the configured port.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Feature flags pushed to clients in the connect response.
    pub fn settings(&self) -> ServerSettings {
        ServerSettings {
            teams: self.teams_enabled,
            tournament_mode: self.tournament_mode_enabled,
        }
    }
}
