//! # Socksd - Lightweight SOCKS5 Proxy Server
//!
//! Socksd accepts TCP connections, negotiates the SOCKS5 handshake
//! with "no authentication" as the only method, dials the requested
//! destination, and relays bytes in both directions until either side
//! closes.
//!
//! ## Features
//!
//! - **CONNECT support**: IPv4, IPv6 and domain-name destinations
//! - **Coded failure replies**: unsupported commands, unresolvable
//!   hosts and refused dials answer with the matching RFC 1928 code
//! - **Clean teardown**: half-close lets in-flight data drain before
//!   either socket is fully closed
//! - **Per-connection isolation**: one task per session, two per relay,
//!   no shared state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksd::{Config, Server};
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     Server::bind(config).await?.serve(shutdown_rx).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod server;
pub mod socks;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ProtocolError, SessionError};
pub use server::Server;

/// Version of the socksd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
