//! TCP accept loop
//!
//! Binds the configured listener and spawns one task per accepted
//! connection. Accept failures and session failures only affect their
//! own connection; the loop keeps serving.

use crate::config::Config;
use crate::socks::Session;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Listening SOCKS5 server.
pub struct Server {
    listener: TcpListener,
    config: Config,
}

impl Server {
    /// Bind the configured listen address.
    pub async fn bind(config: Config) -> Result<Server> {
        config
            .server
            .validate()
            .map_err(|err| anyhow::anyhow!("Invalid configuration: {err}"))?;

        let addr = config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Server { listener, config })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    /// Accept connections until the shutdown signal fires.
    pub async fn serve(&self, mut shutdown: broadcast::Receiver<bool>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!("Failed to accept connection: {err}");
                            continue;
                        }
                    };

                    debug!("Accepted connection from {peer}");
                    let session = Session::new(socket, self.config.server.clone());
                    tokio::spawn(async move {
                        if let Err(err) = session.start().await {
                            warn!("Session with {peer} failed: {err}");
                        }
                    });
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping listener");
                    return Ok(());
                }
            }
        }
    }
}
