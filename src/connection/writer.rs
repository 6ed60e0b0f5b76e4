//! Connection writer loop
//!
//! Drains the outbound queue and keeps the peer alive with periodic pings.
//! Exiting closes the sink, which closes the socket; unregistration is
//! left to the reader, whose next read fails once the socket is gone.

use bytes::Bytes;
use futures::stream::SplitSink;
use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::WebSocketStream;

use crate::hub::ConnId;
use crate::server::ServerConfig;

pub(crate) async fn write_loop<S>(
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbound: mpsc::Receiver<Utf8Bytes>,
    id: ConnId,
    config: ServerConfig,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Probes fire inside the peer's read-deadline window, so a healthy
    // peer always has a pong in flight before it would time us out.
    let interval = config.query_interval();
    let mut probe = interval_at(Instant::now() + interval, interval);

    loop {
        tokio::select! {
            delivery = outbound.recv() => {
                let Some(payload) = delivery else {
                    // Queue closed by the hub: forced unregister. Tell the
                    // peer before winding down.
                    let _ = timeout(config.message_timeout, sink.send(Message::Close(None))).await;
                    break;
                };

                let frame = coalesce(payload, &mut outbound);
                match timeout(config.message_timeout, sink.send(frame)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::debug!(conn = %id, error = %e, "write failed");
                        break;
                    }
                    Err(_) => {
                        tracing::debug!(conn = %id, "write deadline expired");
                        break;
                    }
                }
            }
            _ = probe.tick() => {
                match timeout(config.message_timeout, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    _ => {
                        tracing::debug!(conn = %id, "liveness probe failed");
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
    tracing::trace!(conn = %id, "writer closed");
}

/// Fold every payload already queued at this instant into a single
/// newline-separated frame, so a burst costs one write instead of one
/// write per message.
fn coalesce(first: Utf8Bytes, outbound: &mut mpsc::Receiver<Utf8Bytes>) -> Message {
    let Ok(second) = outbound.try_recv() else {
        return Message::Text(first);
    };

    let mut batch = String::with_capacity(first.len() + second.len() + 1);
    batch.push_str(first.as_str());
    batch.push('\n');
    batch.push_str(second.as_str());
    while let Ok(next) = outbound.try_recv() {
        batch.push('\n');
        batch.push_str(next.as_str());
    }
    Message::text(batch)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::io::DuplexStream;
    use tokio_test::assert_ok;
    use tokio_tungstenite::tungstenite::protocol::Role;

    use super::*;

    #[test]
    fn test_coalesce_single_payload_passes_through() {
        let (_tx, mut rx) = mpsc::channel::<Utf8Bytes>(8);

        let frame = coalesce(Utf8Bytes::from("solo"), &mut rx);
        match frame {
            Message::Text(text) => assert_eq!(text.as_str(), "solo"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_coalesce_joins_queued_burst() {
        let (tx, mut rx) = mpsc::channel::<Utf8Bytes>(8);
        assert_ok!(tx.try_send(Utf8Bytes::from("two")));
        assert_ok!(tx.try_send(Utf8Bytes::from("three")));

        let frame = coalesce(Utf8Bytes::from("one"), &mut rx);
        match frame {
            Message::Text(text) => assert_eq!(text.as_str(), "one\ntwo\nthree"),
            other => panic!("expected text frame, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    async fn ws_pair() -> (
        WebSocketStream<DuplexStream>,
        WebSocketStream<DuplexStream>,
    ) {
        let (a, b) = tokio::io::duplex(4096);
        let server = WebSocketStream::from_raw_socket(a, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(b, Role::Client, None).await;
        (server, client)
    }

    async fn next_frame(client: &mut WebSocketStream<DuplexStream>) -> Message {
        tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read failed")
    }

    #[tokio::test]
    async fn test_writer_delivers_and_closes_on_queue_drop() {
        let (server, mut client) = ws_pair().await;
        let (sink, _stream) = server.split();
        let (tx, rx) = mpsc::channel(8);

        let task = tokio::spawn(write_loop(sink, rx, ConnId(1), ServerConfig::default()));

        tx.send(Utf8Bytes::from("hello")).await.unwrap();
        match next_frame(&mut client).await {
            Message::Text(text) => assert_eq!(text.as_str(), "hello"),
            other => panic!("expected text frame, got {:?}", other),
        }

        // Hub dropping the sender is the forced-unregister signal.
        drop(tx);
        match next_frame(&mut client).await {
            Message::Close(_) => {}
            other => panic!("expected close frame, got {:?}", other),
        }

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("writer should terminate after queue close")
            .unwrap();
    }

    #[tokio::test]
    async fn test_writer_coalesces_preloaded_burst() {
        let (server, mut client) = ws_pair().await;
        let (sink, _stream) = server.split();
        let (tx, rx) = mpsc::channel(8);

        // Queue a burst before the writer starts so the first delivery
        // finds the rest already buffered.
        for payload in ["one", "two", "three"] {
            assert_ok!(tx.try_send(Utf8Bytes::from(payload)));
        }

        let _task = tokio::spawn(write_loop(sink, rx, ConnId(2), ServerConfig::default()));

        match next_frame(&mut client).await {
            Message::Text(text) => assert_eq!(text.as_str(), "one\ntwo\nthree"),
            other => panic!("expected coalesced text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writer_pings_when_idle() {
        let (server, mut client) = ws_pair().await;
        let (sink, _stream) = server.split();
        let (_tx, rx) = mpsc::channel::<Utf8Bytes>(8);

        // 200ms response timeout puts the probe interval at 180ms.
        let config = ServerConfig::default().response_timeout(Duration::from_millis(200));
        let _task = tokio::spawn(write_loop(sink, rx, ConnId(3), config));

        match next_frame(&mut client).await {
            Message::Ping(_) => {}
            other => panic!("expected ping frame, got {:?}", other),
        }
    }
}
