//! SOCKS5 handshake
//!
//! Drives one connection from method negotiation through the connect
//! request to an established upstream socket. Each step reads the bytes
//! available on the client socket, decodes them with the pure codec,
//! and answers per the propagation policy: negotiation-stage failures
//! close without a reply, request-stage failures send a best-effort
//! coded reply first.

use crate::error::SessionError;
use crate::socks::consts::*;
use crate::socks::frame::{ConnectReply, ConnectRequest, MethodNegotiation, MethodSelection};
use crate::socks::types::{unspecified_addr, Command, ReplyCode};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Largest request frame: 4-byte header, 1-byte length, 255-byte domain, 2-byte port.
const MAX_FRAME: usize = 262;

/// Capability for opening the upstream connection.
///
/// The handshake is generic over this seam so tests can observe dial
/// behavior without touching the network path they exercise.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a TCP stream to the resolved destination.
    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream>;
}

/// Dials a plain TCP stream, with an optional connect deadline.
#[derive(Debug, Clone, Default)]
pub struct TcpDialer {
    /// Deadline for the connect attempt; `None` means wait indefinitely
    pub connect_timeout: Option<Duration>,
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, TcpStream::connect(addr))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect deadline elapsed"))?,
            None => TcpStream::connect(addr).await,
        }
    }
}

/// Run the handshake on `stream` and return the connected upstream socket.
///
/// On any error the client socket is left for the caller to drop; the
/// upstream socket only exists once this function has returned `Ok`.
pub async fn negotiate<S, D>(stream: &mut S, dialer: &D) -> Result<TcpStream, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Dialer,
{
    let mut buf = [0u8; MAX_FRAME];

    // AwaitMethods: a malformed greeting gets no response at all.
    let n = stream.read(&mut buf).await.map_err(SessionError::Handshake)?;
    let negotiation =
        MethodNegotiation::from_bytes(&buf[..n]).map_err(SessionError::Negotiate)?;

    if !negotiation.offers(AUTH_NONE) {
        let selection = MethodSelection {
            method: AUTH_NO_ACCEPTABLE,
        };
        let _ = stream.write_all(&selection.to_bytes()).await;
        let _ = stream.flush().await;
        return Err(SessionError::NoAcceptableAuth);
    }

    let selection = MethodSelection { method: AUTH_NONE };
    stream
        .write_all(&selection.to_bytes())
        .await
        .map_err(SessionError::Handshake)?;
    stream.flush().await.map_err(SessionError::Handshake)?;

    // AwaitRequest
    let n = stream.read(&mut buf).await.map_err(SessionError::Handshake)?;
    let request = match ConnectRequest::from_bytes(&buf[..n]) {
        Ok(request) => request,
        Err(err) => {
            if let Some(code) = err.reply_code() {
                send_failure(stream, code).await;
            }
            return Err(SessionError::Request(err));
        }
    };

    debug!("{} request for {}", request.command, request.target);

    if request.command != Command::Connect {
        send_failure(stream, ReplyCode::CommandNotSupported).await;
        return Err(SessionError::Unsupported(request.command));
    }

    // Resolving
    let addr = match request.target.resolve().await {
        Ok(addr) => addr,
        Err(err) => {
            send_failure(stream, ReplyCode::HostUnreachable).await;
            return Err(SessionError::Resolve {
                host: request.target.to_string(),
                source: err,
            });
        }
    };

    // Dialing: always a TCP stream to the resolved address and port.
    let upstream = match dialer.dial(addr).await {
        Ok(upstream) => upstream,
        Err(err) => {
            send_failure(stream, ReplyCode::from(&err)).await;
            return Err(SessionError::Dial {
                target: addr.to_string(),
                source: err,
            });
        }
    };

    // Connected: report the local end of the upstream socket, or the
    // zero-filled address if the OS will not say.
    let bind = upstream.local_addr().unwrap_or_else(|_| unspecified_addr());
    let reply = ConnectReply::success(bind);
    stream
        .write_all(&reply.to_bytes())
        .await
        .map_err(SessionError::Handshake)?;
    stream.flush().await.map_err(SessionError::Handshake)?;

    debug!("established tunnel to {addr}");

    Ok(upstream)
}

/// Best-effort failure reply; the connection is closing either way.
async fn send_failure<S>(stream: &mut S, code: ReplyCode)
where
    S: AsyncWrite + Unpin,
{
    let reply = ConnectReply::failure(code);
    let _ = stream.write_all(&reply.to_bytes()).await;
    let _ = stream.flush().await;
}
