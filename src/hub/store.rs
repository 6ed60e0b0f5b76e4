//! Hub event loop
//!
//! The single task that owns the registry of live connections. All three
//! event kinds (register, unregister, broadcast) funnel into one `select!`
//! loop, so registry mutations are strictly serialized and need no locks.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::stats::HubStats;

use super::config::HubConfig;
use super::event::{Broadcast, ConnId, Register};
use super::handle::{HubHandle, HubShared};

/// Registry entry for one registered connection
struct ClientEntry {
    outbound: mpsc::Sender<Utf8Bytes>,
    peer: SocketAddr,
}

/// The broadcast hub
///
/// Owns the authoritative set of registered connections. Created together
/// with a [`HubHandle`]; call [`run`](Hub::run) on a dedicated task and use
/// handles everywhere else.
pub struct Hub {
    registry: HashMap<ConnId, ClientEntry>,
    register_rx: mpsc::UnboundedReceiver<Register>,
    unregister_rx: mpsc::UnboundedReceiver<ConnId>,
    broadcast_rx: mpsc::Receiver<Broadcast>,
    config: HubConfig,
    shared: Arc<HubShared>,
}

impl Hub {
    /// Create a hub and a first handle to it
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.broadcast_capacity);

        let shared = Arc::new(HubShared {
            next_id: AtomicU64::new(1),
            stats: HubStats::new(),
            outbound_capacity: config.outbound_capacity,
        });

        let hub = Self {
            registry: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            config,
            shared: Arc::clone(&shared),
        };

        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            shared,
        };

        (hub, handle)
    }

    /// Run the event loop.
    ///
    /// Membership events are polled before broadcasts, so a registration
    /// enqueued before a payload is always visible to that payload's
    /// fanout. Returns once every [`HubHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("hub loop started");

        loop {
            tokio::select! {
                biased;
                event = self.register_rx.recv() => match event {
                    Some(client) => self.register(client),
                    None => break,
                },
                event = self.unregister_rx.recv() => match event {
                    Some(id) => self.unregister(id),
                    None => break,
                },
                event = self.broadcast_rx.recv() => match event {
                    Some(broadcast) => self.broadcast(broadcast),
                    None => break,
                },
            }
        }

        tracing::debug!(clients = self.registry.len(), "hub loop stopped");
    }

    fn register(&mut self, client: Register) {
        let id = client.id;
        let peer = client.peer;

        let entry = ClientEntry { outbound: client.outbound, peer };
        if self.registry.insert(id, entry).is_none() {
            self.shared.stats.record_registered();
        }

        tracing::debug!(conn = %id, peer = %peer, clients = self.registry.len(), "client registered");
    }

    fn unregister(&mut self, id: ConnId) {
        // Dropping the entry drops the only outbound sender, which closes
        // the queue and terminates the connection's writer loop.
        if self.registry.remove(&id).is_some() {
            self.shared.stats.record_unregistered();
            tracing::debug!(conn = %id, clients = self.registry.len(), "client unregistered");
        } else {
            // Duplicate: the connection was already evicted by a failed
            // broadcast delivery.
            tracing::trace!(conn = %id, "unregister for unknown client");
        }
    }

    fn broadcast(&mut self, broadcast: Broadcast) {
        self.shared.stats.record_broadcast();

        let mut evicted: Vec<ConnId> = Vec::new();

        for (&id, entry) in &self.registry {
            if !self.config.echo_to_sender && broadcast.origin == Some(id) {
                continue;
            }

            match entry.outbound.try_send(broadcast.payload.clone()) {
                Ok(()) => self.shared.stats.record_delivery(),
                // A full queue means a slow or stuck consumer, a closed one
                // a writer that already died. Either way the client is not
                // draining; disconnect it rather than block or buffer.
                Err(_) => evicted.push(id),
            }
        }

        for id in evicted {
            if let Some(entry) = self.registry.remove(&id) {
                self.shared.stats.record_eviction();
                tracing::debug!(
                    conn = %id,
                    peer = %entry.peer,
                    clients = self.registry.len(),
                    "evicting unresponsive client"
                );
            }
        }
    }
}
