//! SOCKS5 protocol implementation
//!
//! The pure frame codec, the handshake that drives a connection from
//! greeting to an established upstream socket, the bidirectional relay,
//! and the per-connection session tying them together.

mod consts;
mod frame;
mod handshake;
mod relay;
mod session;
mod types;

pub use consts::*;
pub use frame::{ConnectReply, ConnectRequest, MethodNegotiation, MethodSelection};
pub use handshake::{negotiate, Dialer, TcpDialer};
pub use relay::relay;
pub use session::Session;
pub use types::{Command, ReplyCode, TargetAddr};
