//! Async Rust client for SADIS-style subscriber information directories.
//!
//! A SADIS ("Subscriber and Device Information Service") directory maps a
//! subscriber key, usually the serial number of the ONU attached to an OLT
//! port, to the service attributes needed to provision that subscriber:
//! VLAN tags, line identifiers, and bandwidth profile names.
//!
//! This crate only speaks the wire protocol. Turning entries into
//! provisioning decisions is the job of `olt-core`.
//!
//! - **[`SadisClient`]**: `GET {base}/subscribers/{id}` with `404` mapped to
//!   `Ok(None)` so callers can tell "no such subscriber" from a failure.
//! - **[`TransportConfig`]**: shared timeout and TLS settings used to build
//!   the underlying `reqwest::Client`.
//! - **[`SubscriberEntry`]**: the entry as the directory serves it, with
//!   every service field optional.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::SadisClient;
pub use error::Error;
pub use models::SubscriberEntry;
pub use transport::{TlsMode, TransportConfig};
