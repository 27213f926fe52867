//! Receiver configuration, fixed for the lifetime of a tracker.
//!
//! The configuration can be written by hand in [ron]:
//!
//! ```text
//! (body_id: 2, port: 5000, bind_address: "0.0.0.0", poll_interval_ms: 100)
//! ```
//!
//! Every field is optional, missing ones take their defaults.

use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    fs,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    time::Duration,
};

/// The port the rig sends to unless told otherwise.
pub const DEFAULT_PORT: u16 = 5000;

/// How often a blocked receive wakes up to check for a stop request.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Which body to follow and where to listen for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// The body to follow, counting from 1 as the tracking software's
    /// operator does. The wire counts from 0.
    pub body_id: u32,
    /// UDP port to listen on, 0 lets the OS pick one
    pub port: u16,
    /// Local address to bind
    pub bind_address: IpAddr,
    /// Read timeout of the socket, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            body_id: 1,
            port: DEFAULT_PORT,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Things that can go wrong while loading or checking a [`TrackerConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    IoError(std::io::Error),

    /// The configuration file is not valid ron.
    RonSpannedError(ron::de::SpannedError),

    /// Body ids start at 1.
    InvalidBodyId,

    /// The socket needs a non-zero read timeout.
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConfigError as CE;
        let msg = match self {
            CE::IoError(error) => Cow::from(format!("io error: {}", error)),
            CE::RonSpannedError(error) => Cow::from(format!("ron error: {}", error)),
            CE::InvalidBodyId => Cow::from("body id must be at least 1"),
            CE::InvalidPollInterval => Cow::from("poll interval must be at least 1 ms"),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

impl From<ron::de::SpannedError> for ConfigError {
    fn from(value: ron::de::SpannedError) -> Self {
        Self::RonSpannedError(value)
    }
}

impl TrackerConfig {
    /// Reads and validates a configuration from a ron file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parses and validates a configuration from ron text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text)?;
        config.validate()
    }

    /// Checks the invariants that serde cannot.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.body_id == 0 {
            return Err(ConfigError::InvalidBodyId);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        Ok(self)
    }

    /// The body id as it appears on the wire.
    pub fn wire_id(&self) -> u32 {
        self.body_id.saturating_sub(1)
    }

    /// The address the receiver binds.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    #[allow(missing_docs)]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
