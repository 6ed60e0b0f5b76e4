//! Hub event types
//!
//! The three event kinds fed to the hub loop, plus the connection identity
//! used as the registry key.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Unique identifier for a live connection
///
/// Allocated from a process-wide counter; identity, not content, is what
/// distinguishes two connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registration request: a new connection's identity, peer address, and the
/// sending side of its outbound queue. The hub loop holds the only sender;
/// dropping it at unregister time is the writer's termination signal.
#[derive(Debug)]
pub(crate) struct Register {
    pub id: ConnId,
    pub peer: SocketAddr,
    pub outbound: mpsc::Sender<Utf8Bytes>,
}

/// A payload to fan out to registered connections.
///
/// `origin` is the submitting connection, or `None` for server-originated
/// messages, which are always delivered to every client.
#[derive(Debug)]
pub(crate) struct Broadcast {
    pub origin: Option<ConnId>,
    pub payload: Utf8Bytes,
}
