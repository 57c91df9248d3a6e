//! Error types for socksd
//!
//! This module defines the error taxonomy used throughout the server:
//! frame-level decode failures and the per-session error that wraps
//! every failure with the stage it occurred in.

use crate::socks::{Command, ReplyCode};
use std::io;
use thiserror::Error;

/// Frame-level decode failure.
///
/// Produced by the pure codec in [`crate::socks`] when a raw buffer
/// cannot be interpreted as a valid SOCKS5 message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the frame it claims to contain
    #[error("truncated frame: need {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum number of bytes the frame requires
        expected: usize,
        /// Number of bytes actually available
        actual: usize,
    },

    /// Version field is not 5
    #[error("unsupported SOCKS version: {0}")]
    BadVersion(u8),

    /// Method negotiation offered zero methods
    #[error("no authentication methods offered")]
    NoMethods,

    /// Reserved field is not zero
    #[error("nonzero reserved byte: {0:#04x}")]
    BadReserved(u8),

    /// Command byte outside the enumerated set
    #[error("unknown command: {0:#04x}")]
    UnknownCommand(u8),

    /// Address type byte outside the enumerated set
    #[error("unknown address type: {0:#04x}")]
    UnknownAddrType(u8),

    /// Domain name length byte is invalid
    #[error("invalid domain length: {0}")]
    BadDomainLength(u8),

    /// Domain name bytes are not valid UTF-8
    #[error("domain name is not valid UTF-8")]
    BadDomainEncoding,

    /// Reply code byte outside the enumerated set
    #[error("unknown reply code: {0:#04x}")]
    UnknownReplyCode(u8),
}

impl ProtocolError {
    /// Reply code to send back before closing, when the failure has one.
    ///
    /// `None` means the connection is dropped without a reply: version,
    /// reserved-byte and truncation errors leave no trustworthy framing
    /// to answer on.
    pub fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            ProtocolError::UnknownCommand(_) => Some(ReplyCode::CommandNotSupported),
            ProtocolError::UnknownAddrType(_) => Some(ReplyCode::AddressTypeNotSupported),
            _ => None,
        }
    }
}

/// Per-session failure, tagged with the stage that produced it.
///
/// Every failure is terminal for its session; the listener and other
/// sessions are unaffected.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Method negotiation frame could not be decoded
    #[error("method negotiation failed: {0}")]
    Negotiate(#[source] ProtocolError),

    /// Client did not offer the no-authentication method
    #[error("no acceptable authentication method")]
    NoAcceptableAuth,

    /// Connect request frame could not be decoded
    #[error("connect request rejected: {0}")]
    Request(#[source] ProtocolError),

    /// Request carried a command the server does not implement
    #[error("command {0} not supported")]
    Unsupported(Command),

    /// Domain name resolution failed
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        /// Host name that could not be resolved
        host: String,
        /// Underlying lookup error
        #[source]
        source: io::Error,
    },

    /// Upstream connection could not be established
    #[error("failed to dial {target}: {source}")]
    Dial {
        /// Resolved destination address
        target: String,
        /// Underlying connect error
        #[source]
        source: io::Error,
    },

    /// Read or write on the client socket failed during the handshake
    #[error("handshake I/O failed: {0}")]
    Handshake(#[source] io::Error),

    /// Read or write failed while relaying established traffic
    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),
}
