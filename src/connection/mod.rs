//! Per-client connection
//!
//! One [`Connection`] per accepted socket: an inbound reader task and an
//! outbound writer task joined by a bounded queue that only the hub loop
//! writes to. Termination is driven entirely by I/O errors, deadline
//! expiry, or the hub closing the queue; there is no cancellation token.
//!
//! Teardown is asymmetric on purpose. The reader owns unregistration and
//! always sends exactly one unregister event. The writer owns the socket's
//! fate: it closes the sink on every exit path, which fails the reader's
//! next read if the reader is still alive. Either way both tasks wind down
//! and the socket is released.

pub(crate) mod reader;
pub(crate) mod writer;

use std::net::SocketAddr;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;

use crate::error::Error;
use crate::hub::event::Register;
use crate::hub::{ConnId, HubHandle};
use crate::server::ServerConfig;

use self::reader::{read_loop, UnregisterGuard};
use self::writer::write_loop;

/// A live client connection attached to the hub
pub struct Connection {
    id: ConnId,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    /// Attach an upgraded WebSocket to the hub.
    ///
    /// Registers the connection (the registration event is enqueued before
    /// either loop starts) and launches the reader and writer as
    /// independent tasks, returning immediately so the caller's per-accept
    /// resources can be released.
    ///
    /// The upgrade is expected to enforce `config.max_message_size` at the
    /// transport level, as [`HubServer`](crate::HubServer) does; the reader
    /// re-checks payload lengths for sockets upgraded elsewhere.
    pub fn spawn<S>(
        hub: HubHandle,
        socket: WebSocketStream<S>,
        peer: SocketAddr,
        config: ServerConfig,
    ) -> Connection
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let id = hub.next_id();
        let (outbound_tx, outbound_rx) = mpsc::channel(hub.outbound_capacity());
        hub.register(Register { id, peer, outbound: outbound_tx });

        let (sink, stream) = socket.split();

        let writer = tokio::spawn(write_loop(sink, outbound_rx, id, config.clone()));

        let reader = tokio::spawn(async move {
            let _guard = UnregisterGuard::new(hub.clone(), id);
            match read_loop(stream, &hub, id, &config).await {
                Ok(()) => tracing::debug!(conn = %id, "peer closed connection"),
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(conn = %id, "peer disconnected");
                }
                Err(Error::HubClosed) => tracing::debug!(conn = %id, "hub shut down"),
                Err(e) => {
                    tracing::warn!(conn = %id, peer = %peer, error = %e, "connection error");
                }
            }
        });

        Connection { id, reader, writer }
    }

    /// Identity of this connection in the hub registry
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Wait until both loops have exited and the socket is released
    pub async fn closed(self) {
        let _ = tokio::join!(self.reader, self.writer);
    }
}
