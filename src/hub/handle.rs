//! Hub handle
//!
//! Cheap-to-clone handle over the hub's event channels. Every task that
//! talks to the hub does so through one of these; the hub loop itself is
//! the only code that touches the registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::error::{Error, Result};
use crate::stats::HubStats;

use super::event::{Broadcast, ConnId, Register};

/// State shared between the hub loop and all handles
pub(crate) struct HubShared {
    pub next_id: AtomicU64,
    pub stats: HubStats,
    pub outbound_capacity: usize,
}

/// Handle to a running [`Hub`](super::Hub)
///
/// Registration and unregistration never block; broadcasts await capacity
/// on the hub's bounded event channel, which is the deliberate throttle for
/// a producer outrunning the loop. The hub loop exits once every handle
/// has been dropped.
#[derive(Clone)]
pub struct HubHandle {
    pub(crate) register_tx: mpsc::UnboundedSender<Register>,
    pub(crate) unregister_tx: mpsc::UnboundedSender<ConnId>,
    pub(crate) broadcast_tx: mpsc::Sender<Broadcast>,
    pub(crate) shared: Arc<HubShared>,
}

impl HubHandle {
    /// Allocate the next connection id
    pub(crate) fn next_id(&self) -> ConnId {
        ConnId(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn outbound_capacity(&self) -> usize {
        self.shared.outbound_capacity
    }

    /// Enqueue a registration. Send failure means the hub is gone, in which
    /// case the connection's writer sees a closed queue and winds down on
    /// its own.
    pub(crate) fn register(&self, client: Register) {
        let _ = self.register_tx.send(client);
    }

    /// Enqueue an unregistration. Safe to call for an id the hub already
    /// evicted; the loop treats unknown ids as a no-op.
    pub(crate) fn unregister(&self, id: ConnId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Submit a payload for fanout to every registered connection.
    ///
    /// `origin` marks the submitting connection so the sender-echo policy
    /// can be applied; pass `None` for server-originated messages, which
    /// are delivered to all clients. Blocks while the broadcast channel is
    /// at capacity.
    pub async fn broadcast(
        &self,
        origin: Option<ConnId>,
        payload: impl Into<Utf8Bytes>,
    ) -> Result<()> {
        self.broadcast_tx
            .send(Broadcast { origin, payload: payload.into() })
            .await
            .map_err(|_| Error::HubClosed)
    }

    /// Hub activity counters
    pub fn stats(&self) -> &HubStats {
        &self.shared.stats
    }
}
