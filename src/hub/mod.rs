//! Broadcast hub
//!
//! The hub owns the authoritative registry of live connections and a single
//! event-loop task that serializes every registry mutation. Other tasks
//! talk to it exclusively through [`HubHandle`] message passing; there is
//! no shared mutable state and no locking discipline beyond channel sends.
//!
//! # Architecture
//!
//! ```text
//!   [reader task]──register/unregister/broadcast──┐
//!   [reader task]──────────────────────────────┐  │
//!                                              ▼  ▼
//!                                       ┌─────────────────┐
//!                                       │  Hub event loop │
//!                                       │  registry:      │
//!                                       │   ConnId → tx   │
//!                                       └───┬──────┬──────┘
//!                            try_send       │      │      try_send
//!                          ┌────────────────┘      └──────────────┐
//!                          ▼                                      ▼
//!                  [writer task]                          [writer task]
//!                  bounded queue ── drain ── TCP          bounded queue
//! ```
//!
//! Fanout is non-blocking: a connection whose bounded queue is full is
//! evicted on the spot instead of stalling delivery to everyone else.

pub mod config;
pub mod event;
pub mod handle;
pub mod store;

pub use config::HubConfig;
pub use event::ConnId;
pub use handle::HubHandle;
pub use store::Hub;
