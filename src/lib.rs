//! Real-time WebSocket broadcast hub
//!
//! Every message a connected client sends is relayed to all connected
//! clients. One hub task owns the registry and serializes registration,
//! unregistration, and fanout; each connection runs a reader task and a
//! writer task joined by a bounded outbound queue. A client that stops
//! draining its queue is evicted instead of stalling the others, and idle
//! peers are kept alive with periodic pings and reaped when they stop
//! answering.
//!
//! # Quick start
//!
//! ```no_run
//! use wshub_rs::{HubServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> wshub_rs::Result<()> {
//!     let config = ServerConfig::default().max_connections(1024);
//!     HubServer::new(config).run().await
//! }
//! ```
//!
//! To serve sockets upgraded elsewhere (for example behind an existing
//! HTTP stack), run the [`Hub`] loop yourself and attach each upgraded
//! stream with [`Connection::spawn`].

pub mod connection;
pub mod error;
pub mod hub;
pub mod server;
pub mod stats;

pub use connection::Connection;
pub use error::{Error, Result};
pub use hub::{ConnId, Hub, HubConfig, HubHandle};
pub use server::{HubServer, ServerConfig};
pub use stats::{HubStats, StatsSnapshot};
