//! Test utilities for socksd integration tests

use socksd::config::{Config, ServerConfig};
use socksd::Server;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Start a proxy on an ephemeral loopback port.
///
/// Returns the proxy address and the shutdown sender keeping it alive.
pub async fn start_proxy() -> (SocketAddr, broadcast::Sender<bool>) {
    start_proxy_with(ServerConfig {
        listen: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    })
    .await
}

/// Start a proxy with a specific server configuration.
pub async fn start_proxy_with(server: ServerConfig) -> (SocketAddr, broadcast::Sender<bool>) {
    let server = Server::bind(Config { server }).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (tx, rx) = broadcast::channel(1);
    tokio::spawn(async move { server.serve(rx).await });

    (addr, tx)
}

/// Start an echo server that mirrors every byte back, half-closing
/// after the client side reaches EOF.
pub async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let (mut read, mut write) = socket.split();
                let _ = tokio::io::copy(&mut read, &mut write).await;
                let _ = write.shutdown().await;
            });
        }
    });

    addr
}

/// An address that is bound and immediately released, so connecting to
/// it is refused with very high likelihood.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Negotiate methods with the proxy, expecting the no-auth selection.
pub async fn negotiate_no_auth(stream: &mut TcpStream) {
    stream.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
    let mut selection = [0u8; 2];
    stream.read_exact(&mut selection).await.unwrap();
    assert_eq!(selection, [0x05, 0x00]);
}

/// Encode a CONNECT request for an IPv4 target.
pub fn connect_request(target: SocketAddr) -> Vec<u8> {
    let mut request = vec![0x05, 0x01, 0x00];
    match target {
        SocketAddr::V4(v4) => {
            request.push(0x01);
            request.extend_from_slice(&v4.ip().octets());
        }
        SocketAddr::V6(v6) => {
            request.push(0x04);
            request.extend_from_slice(&v6.ip().octets());
        }
    }
    request.extend_from_slice(&target.port().to_be_bytes());
    request
}

/// Encode a CONNECT request for a domain-name target.
pub fn connect_request_domain(host: &str, port: u16) -> Vec<u8> {
    let mut request = vec![0x05, 0x01, 0x00, 0x03, host.len() as u8];
    request.extend_from_slice(host.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    request
}

/// Read a connect reply and return its code byte.
pub async fn read_reply_code(stream: &mut TcpStream) -> u8 {
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).await.unwrap();
    assert_eq!(head[0], 0x05);
    assert_eq!(head[2], 0x00);

    let addr_len = match head[3] {
        0x01 => 4,
        0x04 => 16,
        other => panic!("unexpected reply address type: {other}"),
    };
    let mut rest = vec![0u8; addr_len + 2];
    stream.read_exact(&mut rest).await.unwrap();

    head[1]
}

/// Connect through the proxy to `target`, asserting a success reply.
pub async fn open_tunnel(proxy: SocketAddr, target: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    negotiate_no_auth(&mut stream).await;

    stream.write_all(&connect_request(target)).await.unwrap();
    let code = read_reply_code(&mut stream).await;
    assert_eq!(code, 0x00);

    stream
}
