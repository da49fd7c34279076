//! The lock / status / pub-sub coordination broker.
//!
//! A single-instance service that lets cooperating processes on one host —
//! builder, viewer, CLI — share one source-of-truth safely. It provides
//! three primitives over persistent TCP connections: a global FIFO lock that
//! fail-opens when a holder disconnects, a last-write-wins key/value status
//! store, and best-effort topic broadcast with no backlog.
//!
//! The broker holds no domain knowledge of nodes or builds; clients give it
//! meaning by convention (e.g. the builder publishes failures under the
//! `build_error` key).

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{BrokerClient, LockChannel, StoreChannel, TopicChannel};
pub use error::BrokerError;
pub use protocol::{Channel, DEFAULT_ADDR};
pub use server::BrokerServer;
