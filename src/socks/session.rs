//! Per-connection orchestration
//!
//! One [`Session`] per accepted socket: handshake, relay, teardown.
//! Sessions are fully independent of each other; nothing is shared.

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::socks::handshake::{self, TcpDialer};
use crate::socks::relay;
use tokio::net::TcpStream;
use tracing::debug;

/// One accepted client connection.
///
/// The session owns the client socket for its whole lifetime and the
/// upstream socket from the moment the dial succeeds. Both are owned
/// values, so every exit path of [`Session::start`] drops and thereby
/// closes them exactly once.
pub struct Session {
    client: TcpStream,
    config: ServerConfig,
}

impl Session {
    /// Wrap an accepted socket in a new session.
    pub fn new(client: TcpStream, config: ServerConfig) -> Self {
        Session { client, config }
    }

    /// Run the session to completion.
    ///
    /// Any stage failure is returned wrapped with its stage context;
    /// relay errors are never reported back to the client, only to the
    /// caller.
    pub async fn start(mut self) -> Result<(), SessionError> {
        let dialer = TcpDialer {
            connect_timeout: self.config.connect_deadline(),
        };

        let upstream = handshake::negotiate(&mut self.client, &dialer).await?;

        let (sent, received) = relay::relay(self.client, upstream, self.config.io_deadline())
            .await
            .map_err(SessionError::Relay)?;

        debug!("session closed: {sent} bytes out, {received} bytes in");
        Ok(())
    }
}
