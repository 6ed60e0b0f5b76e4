//! Hub server listener
//!
//! Handles the TCP accept loop, the WebSocket upgrade, and attaching each
//! upgraded socket to the hub.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::connection::Connection;
use crate::error::Result;
use crate::hub::{Hub, HubConfig, HubHandle};
use crate::server::config::ServerConfig;

/// WebSocket broadcast hub server
pub struct HubServer {
    config: ServerConfig,
    hub: Hub,
    handle: HubHandle,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl HubServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hub_config(config, HubConfig::default())
    }

    /// Create a new server with custom hub configuration
    pub fn with_hub_config(config: ServerConfig, hub_config: HubConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let (hub, handle) = Hub::new(hub_config);

        Self {
            config,
            hub,
            handle,
            connection_semaphore,
        }
    }

    /// Get a handle to the hub, for server-originated broadcasts and stats
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server.
    ///
    /// Spawns the hub event loop and accepts connections until the process
    /// ends.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "hub server listening");

        let HubServer { config, hub, handle, connection_semaphore } = self;
        let _hub_task = tokio::spawn(hub.run());

        Self::accept_loop(&listener, &config, &handle, connection_semaphore.as_ref()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "hub server listening");

        let HubServer { config, hub, handle, connection_semaphore } = self;
        let hub_task = tokio::spawn(hub.run());

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("shutdown signal received");
                Ok(())
            }
            result = Self::accept_loop(&listener, &config, &handle, connection_semaphore.as_ref()) => result,
        };

        hub_task.abort();

        result
    }

    async fn accept_loop(
        listener: &TcpListener,
        config: &ServerConfig,
        handle: &HubHandle,
        limit: Option<&Arc<Semaphore>>,
    ) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer)) => Self::attach(socket, peer, config, handle, limit),
                Err(e) => {
                    tracing::error!(error = %e, "failed to accept connection");
                }
            }
        }
    }

    /// Upgrade an accepted socket and hand it to the hub.
    ///
    /// The handshake runs on its own task so a stalling client cannot hold
    /// up the accept loop. The connection-limit permit, if any, is held
    /// until both connection loops have finished.
    fn attach(
        socket: TcpStream,
        peer: SocketAddr,
        config: &ServerConfig,
        handle: &HubHandle,
        limit: Option<&Arc<Semaphore>>,
    ) {
        let permit = match limit {
            Some(semaphore) => match Arc::clone(semaphore).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer, "connection rejected: limit reached");
                    return;
                }
            },
            None => None,
        };

        if config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
            }
        }

        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(config.max_message_size);
        ws_config.max_frame_size = Some(config.max_message_size);

        let config = config.clone();
        let handle = handle.clone();

        tokio::spawn(async move {
            let socket = match timeout(
                config.handshake_timeout,
                accept_async_with_config(socket, Some(ws_config)),
            )
            .await
            {
                Ok(Ok(socket)) => socket,
                Ok(Err(e)) => {
                    tracing::debug!(peer = %peer, error = %e, "websocket handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(peer = %peer, "websocket handshake timed out");
                    return;
                }
            };

            let connection = Connection::spawn(handle, socket, peer, config);
            let id = connection.id();
            tracing::debug!(conn = %id, peer = %peer, "connection attached");

            connection.closed().await;
            drop(permit);
            tracing::debug!(conn = %id, peer = %peer, "connection closed");
        });
    }
}
