//! Bidirectional relay
//!
//! Once a session is established, two spawned tasks copy bytes between
//! the client and upstream sockets, one per direction. Each task owns
//! its own buffer and the write half of the peer socket. A direction
//! that reaches EOF or fails half-closes the peer's write side so the
//! other direction can flush what is still in transit; teardown waits
//! until both directions have terminated.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinError;
use tracing::trace;

/// Chunk size for each direction's private buffer.
const RELAY_BUFFER_SIZE: usize = 8192;

/// Copy both directions until each has reached a terminal state.
///
/// Returns the byte counts (client-to-upstream, upstream-to-client)
/// once both directions are done. `idle_timeout` bounds each read when
/// set; `None` reproduces the undeadlined baseline behavior.
pub async fn relay<A, B>(
    client: A,
    upstream: B,
    idle_timeout: Option<Duration>,
) -> io::Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    let outbound = tokio::spawn(copy_direction(client_read, upstream_write, idle_timeout));
    let inbound = tokio::spawn(copy_direction(upstream_read, client_write, idle_timeout));

    // Both directions must terminate before any result is reported; a
    // session normally ends with EOF on one direction while the other
    // is still draining.
    let (outbound, inbound) = tokio::join!(outbound, inbound);

    let sent = flatten(outbound)?;
    let received = flatten(inbound)?;
    trace!("relay done: {sent} bytes out, {received} bytes in");
    Ok((sent, received))
}

/// Copy one direction, then half-close the peer's write side.
async fn copy_direction<A, B>(
    mut reader: ReadHalf<A>,
    mut writer: WriteHalf<B>,
    idle_timeout: Option<Duration>,
) -> io::Result<u64>
where
    A: AsyncRead,
    B: AsyncWrite,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    let result = loop {
        let read = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, reader.read(&mut buf)).await {
                Ok(read) => read,
                Err(_) => {
                    break Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "relay read deadline elapsed",
                    ))
                }
            },
            None => reader.read(&mut buf).await,
        };

        match read {
            Ok(0) => break Ok(()),
            Ok(n) => {
                if let Err(err) = writer.write_all(&buf[..n]).await {
                    break Err(err);
                }
                total += n as u64;
            }
            Err(err) => break Err(err),
        }
    };

    // Propagate FIN so the peer can finish draining the other direction.
    let _ = writer.shutdown().await;

    match result {
        Ok(()) => Ok(total),
        // The peer hanging up mid-stream is an ordinary end of session.
        Err(err)
            if err.kind() == io::ErrorKind::ConnectionReset
                || err.kind() == io::ErrorKind::BrokenPipe =>
        {
            Ok(total)
        }
        Err(err) => Err(err),
    }
}

fn flatten(joined: Result<io::Result<u64>, JoinError>) -> io::Result<u64> {
    match joined {
        Ok(result) => result,
        Err(err) => Err(io::Error::new(io::ErrorKind::Other, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_relay_forwards_both_directions() {
        let (mut client, proxy_client_side) = duplex(1024);
        let (mut upstream, proxy_upstream_side) = duplex(1024);

        let task = tokio::spawn(relay(proxy_client_side, proxy_upstream_side, None));

        client.write_all(b"ping from client").await.unwrap();
        let mut buf = [0u8; 16];
        upstream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping from client");

        upstream.write_all(b"pong from server").await.unwrap();
        let mut buf = [0u8; 16];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong from server");

        drop(client);
        drop(upstream);

        let (sent, received) = task.await.unwrap().unwrap();
        assert_eq!(sent, 16);
        assert_eq!(received, 16);
    }

    #[tokio::test]
    async fn test_relay_preserves_bytes_across_chunk_boundaries() {
        let (mut client, proxy_client_side) = duplex(64);
        let (mut upstream, proxy_upstream_side) = duplex(64);

        let task = tokio::spawn(relay(proxy_client_side, proxy_upstream_side, None));

        // Much larger than both the duplex capacity and one chunk.
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let writer = tokio::spawn(async move {
            for piece in payload.chunks(striped_len()) {
                client.write_all(piece).await.unwrap();
            }
            client.shutdown().await.unwrap();
        });

        let mut received = Vec::new();
        upstream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, expected);

        writer.await.unwrap();
        drop(upstream);
        let (sent, _) = task.await.unwrap().unwrap();
        assert_eq!(sent, expected.len() as u64);
    }

    // Uneven chunk size so writes straddle buffer boundaries.
    fn striped_len() -> usize {
        977
    }

    #[tokio::test]
    async fn test_relay_half_close_lets_other_direction_drain() {
        let (mut client, proxy_client_side) = duplex(1024);
        let (mut upstream, proxy_upstream_side) = duplex(1024);

        let task = tokio::spawn(relay(proxy_client_side, proxy_upstream_side, None));

        // Client sends its request and closes its write side.
        client.write_all(b"request").await.unwrap();
        client.shutdown().await.unwrap();

        // Upstream sees the request then EOF, answers afterwards.
        let mut buf = [0u8; 7];
        upstream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"request");
        let mut rest = Vec::new();
        upstream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        upstream.write_all(b"late response").await.unwrap();
        upstream.shutdown().await.unwrap();

        // The response still arrives even though the client hung up first.
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(&response, b"late response");

        let (sent, received) = task.await.unwrap().unwrap();
        assert_eq!(sent, 7);
        assert_eq!(received, 13);
    }

    #[tokio::test]
    async fn test_relay_finishes_with_no_traffic() {
        let (client, proxy_client_side) = duplex(1024);
        let (upstream, proxy_upstream_side) = duplex(1024);

        let task = tokio::spawn(relay(proxy_client_side, proxy_upstream_side, None));

        drop(client);
        drop(upstream);

        let (sent, received) = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(received, 0);
    }

    #[tokio::test]
    async fn test_relay_idle_deadline_terminates_stalled_session() {
        let (_client, proxy_client_side) = duplex(1024);
        let (_upstream, proxy_upstream_side) = duplex(1024);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            relay(
                proxy_client_side,
                proxy_upstream_side,
                Some(Duration::from_millis(50)),
            ),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
