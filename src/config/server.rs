//! Server configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bind address
fn default_listen() -> String {
    "0.0.0.0".to_string()
}

/// Default listener port
fn default_port() -> u16 {
    1080
}

/// Root configuration structure.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Proxy server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// SOCKS5 listener configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address for the listener
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listener port (0 binds an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream connect deadline in seconds; absent means no deadline
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// Relay read deadline in seconds; absent means no deadline
    #[serde(default)]
    pub io_timeout: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: default_listen(),
            port: default_port(),
            connect_timeout: None,
            io_timeout: None,
        }
    }
}

impl ServerConfig {
    /// Address string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }

    /// Connect deadline as a [`Duration`], if configured.
    pub fn connect_deadline(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }

    /// Relay read deadline as a [`Duration`], if configured.
    pub fn io_deadline(&self) -> Option<Duration> {
        self.io_timeout.map(Duration::from_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.is_empty() {
            return Err("listen address must not be empty".to_string());
        }
        if self.connect_timeout == Some(0) {
            return Err("connect_timeout must be positive when set".to_string());
        }
        if self.io_timeout == Some(0) {
            return Err("io_timeout must be positive when set".to_string());
        }
        Ok(())
    }
}
