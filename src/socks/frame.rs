//! Pure (de)serialization of the four SOCKS5 message types
//!
//! No I/O happens here. The handshake owns the sockets and hands raw
//! buffers to this module; every decode is bounds-checked against the
//! bytes actually received before anything is copied.

use crate::error::ProtocolError;
use crate::socks::consts::*;
use crate::socks::types::{unspecified_addr, Command, ReplyCode, TargetAddr};
use bytes::{BufMut, BytesMut};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Bounds check shared by the decoders.
fn need(buf: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if buf.len() < expected {
        return Err(ProtocolError::Truncated {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Client greeting: `VER | NMETHODS | METHODS...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodNegotiation {
    /// Method identifiers in the order the client offered them
    pub methods: Vec<u8>,
}

impl MethodNegotiation {
    /// Decode a greeting from a raw buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ProtocolError> {
        need(buf, 3)?;
        if buf[0] != SOCKS_VERSION {
            return Err(ProtocolError::BadVersion(buf[0]));
        }
        let nmethods = buf[1] as usize;
        if nmethods == 0 {
            return Err(ProtocolError::NoMethods);
        }
        // The declared count must fit inside the received frame; copying
        // on trust would read past the end of a short buffer.
        need(buf, 2 + nmethods)?;
        Ok(MethodNegotiation {
            methods: buf[2..2 + nmethods].to_vec(),
        })
    }

    /// Whether the client offered the given method identifier.
    pub fn offers(&self, method: u8) -> bool {
        self.methods.contains(&method)
    }
}

/// Server method choice: `VER | METHOD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSelection {
    /// Selected method identifier
    pub method: u8,
}

impl MethodSelection {
    /// Encode to the 2-byte wire form.
    pub fn to_bytes(self) -> [u8; 2] {
        [SOCKS_VERSION, self.method]
    }

    /// Decode a method selection from a raw buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ProtocolError> {
        need(buf, 2)?;
        if buf[0] != SOCKS_VERSION {
            return Err(ProtocolError::BadVersion(buf[0]));
        }
        Ok(MethodSelection { method: buf[1] })
    }
}

/// Client request: `VER | CMD | RSV | ATYP | DST.ADDR | DST.PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Requested command
    pub command: Command,
    /// Requested destination
    pub target: TargetAddr,
}

impl ConnectRequest {
    /// Decode a request from a raw buffer.
    ///
    /// The address span is sized by the ATYP tag: 4 bytes for IPv4,
    /// 16 for IPv6, a 1-byte length plus that many bytes for a domain
    /// name. The port is the big-endian u16 immediately after the
    /// address. Trailing bytes are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ProtocolError> {
        need(buf, 6)?;
        if buf[0] != SOCKS_VERSION {
            return Err(ProtocolError::BadVersion(buf[0]));
        }
        let command = Command::try_from(buf[1]).map_err(ProtocolError::UnknownCommand)?;
        if buf[2] != RSV {
            return Err(ProtocolError::BadReserved(buf[2]));
        }

        let target = match buf[3] {
            ATYP_IPV4 => {
                need(buf, 4 + 4 + 2)?;
                let ip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
                let port = u16::from_be_bytes([buf[8], buf[9]]);
                TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
            }
            ATYP_IPV6 => {
                need(buf, 4 + 16 + 2)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[4..20]);
                let port = u16::from_be_bytes([buf[20], buf[21]]);
                TargetAddr::Ip(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
            }
            ATYP_DOMAIN => {
                need(buf, 5)?;
                let len = buf[4] as usize;
                if len == 0 {
                    return Err(ProtocolError::BadDomainLength(0));
                }
                need(buf, 5 + len + 2)?;
                let host = std::str::from_utf8(&buf[5..5 + len])
                    .map_err(|_| ProtocolError::BadDomainEncoding)?
                    .to_string();
                let port = u16::from_be_bytes([buf[5 + len], buf[6 + len]]);
                TargetAddr::Domain(host, port)
            }
            other => return Err(ProtocolError::UnknownAddrType(other)),
        };

        Ok(ConnectRequest { command, target })
    }
}

/// Server reply: `VER | REP | RSV | ATYP | BND.ADDR | BND.PORT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectReply {
    /// Outcome of the request
    pub code: ReplyCode,
    /// Address the server bound to reach the destination
    pub bind: SocketAddr,
}

impl ConnectReply {
    /// Success reply carrying the local end of the upstream connection.
    pub fn success(bind: SocketAddr) -> Self {
        ConnectReply {
            code: ReplyCode::Succeeded,
            bind,
        }
    }

    /// Failure reply; the bound address is zero-filled per RFC 1928.
    pub fn failure(code: ReplyCode) -> Self {
        ConnectReply {
            code,
            bind: unspecified_addr(),
        }
    }

    /// Encode to the wire form; length depends on the address family.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(22);
        buf.put_u8(SOCKS_VERSION);
        buf.put_u8(self.code.as_byte());
        buf.put_u8(RSV);
        match self.bind {
            SocketAddr::V4(addr) => {
                buf.put_u8(ATYP_IPV4);
                buf.put_slice(&addr.ip().octets());
            }
            SocketAddr::V6(addr) => {
                buf.put_u8(ATYP_IPV6);
                buf.put_slice(&addr.ip().octets());
            }
        }
        buf.put_u16(self.bind.port());
        buf
    }

    /// Decode a reply from a raw buffer.
    ///
    /// The server only ever emits IPv4 and IPv6 bind addresses, so a
    /// domain-tagged reply is rejected here.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ProtocolError> {
        need(buf, 6)?;
        if buf[0] != SOCKS_VERSION {
            return Err(ProtocolError::BadVersion(buf[0]));
        }
        let code = ReplyCode::try_from(buf[1]).map_err(ProtocolError::UnknownReplyCode)?;
        if buf[2] != RSV {
            return Err(ProtocolError::BadReserved(buf[2]));
        }
        let bind = match buf[3] {
            ATYP_IPV4 => {
                need(buf, 10)?;
                let ip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
                let port = u16::from_be_bytes([buf[8], buf[9]]);
                SocketAddr::new(IpAddr::V4(ip), port)
            }
            ATYP_IPV6 => {
                need(buf, 22)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[4..20]);
                let port = u16::from_be_bytes([buf[20], buf[21]]);
                SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port)
            }
            other => return Err(ProtocolError::UnknownAddrType(other)),
        };
        Ok(ConnectReply { code, bind })
    }
}
