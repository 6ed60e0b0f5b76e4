//! Connection reader loop
//!
//! Consumes inbound frames until the peer goes away, a deadline expires,
//! or the transport errors. Every inbound payload is normalized and handed
//! to the hub as a broadcast event; the loop's exit always produces the
//! connection's single unregister event.

use futures::stream::SplitStream;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::{Error, Result};
use crate::hub::{ConnId, HubHandle};
use crate::server::ServerConfig;

/// Sends the connection's unregister event when dropped.
///
/// Held by the reader task for its whole lifetime, so every exit path
/// reaches the hub exactly once. Unregistration is the reader's job alone;
/// the writer only ever closes the socket.
pub(crate) struct UnregisterGuard {
    hub: HubHandle,
    id: ConnId,
}

impl UnregisterGuard {
    pub(crate) fn new(hub: HubHandle, id: ConnId) -> Self {
        Self { hub, id }
    }
}

impl Drop for UnregisterGuard {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

/// Collapse newlines to spaces, then trim surrounding whitespace.
///
/// Applied once, before broadcast, so every recipient sees the same bytes.
pub(crate) fn normalize(raw: &str) -> String {
    raw.replace('\n', " ").trim().to_string()
}

/// Read frames until the connection dies.
///
/// The read deadline is re-armed only by pongs: a peer that stops
/// answering liveness probes is reaped within `response_timeout` of its
/// last response, no matter how much data it sends. The broadcast send can
/// block while the hub channel is at capacity, which is the intended
/// throttle for a producer outrunning the hub; it cannot deadlock because
/// the hub loop never blocks on fanout.
pub(crate) async fn read_loop<S>(
    mut stream: SplitStream<WebSocketStream<S>>,
    hub: &HubHandle,
    id: ConnId,
    config: &ServerConfig,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut deadline = Instant::now() + config.response_timeout;

    loop {
        let frame = match timeout_at(deadline, stream.next()).await {
            Err(_) => return Err(Error::DeadlineExpired),
            Ok(None) => return Ok(()),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Pong(_) => {
                deadline = Instant::now() + config.response_timeout;
            }
            // Answered by the transport while we poll.
            Message::Ping(_) => {}
            Message::Close(_) => return Ok(()),
            Message::Text(text) => {
                if text.len() > config.max_message_size {
                    return Err(Error::MessageTooLarge {
                        size: text.len(),
                        limit: config.max_message_size,
                    });
                }
                hub.broadcast(Some(id), normalize(text.as_str())).await?;
            }
            Message::Binary(data) => {
                if data.len() > config.max_message_size {
                    return Err(Error::MessageTooLarge {
                        size: data.len(),
                        limit: config.max_message_size,
                    });
                }
                // Normalization is line-oriented; only UTF-8 payloads can
                // be relayed.
                match std::str::from_utf8(&data) {
                    Ok(text) => hub.broadcast(Some(id), normalize(text)).await?,
                    Err(_) => tracing::debug!(conn = %id, "dropping non-utf8 binary payload"),
                }
            }
            // Raw frames never surface on read.
            Message::Frame(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_newlines_and_trims() {
        assert_eq!(normalize("  hello\nworld  "), "hello world");
        assert_eq!(normalize("one\ntwo\nthree"), "one two three");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("  hello\nworld  ");
        assert_eq!(normalize(&once), once);
        assert_eq!(normalize("hello world"), "hello world");
    }

    #[test]
    fn test_normalize_replaces_each_newline_with_one_space() {
        assert_eq!(normalize("a\n\nb"), "a  b");
    }

    #[test]
    fn test_normalize_whitespace_only_becomes_empty() {
        assert_eq!(normalize("   \n  "), "");
        assert_eq!(normalize(""), "");
    }
}
