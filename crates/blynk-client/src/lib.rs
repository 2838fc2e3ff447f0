//! Blynk device session over a single broker connection.
//!
//! [`Client`] dials (or adopts) a stream, logs in, announces itself and then
//! runs three cooperating loops over the one socket:
//! - a receiver that copies raw chunks off the read half,
//! - a processor that splits chunks into frames and dispatches them,
//! - a keepalive that pings on a fixed interval.
//!
//! All writers share one serialised write half. A single cancellation token
//! per session stops every loop.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod handshake;
pub mod keepalive;
pub mod processor;
pub mod receiver;
pub mod registry;

pub use client::{Client, ConnectionState};
pub use config::{AnnouncePolicy, ClientConfig, EofPolicy, DEFAULT_BUFFER_IN, DEFAULT_SERVER};
pub use connection::{Connection, READ_BUFFER_SIZE};
pub use error::{ClientError, Result};
pub use handshake::{announce, authenticate, await_response};
pub use processor::Dispatcher;
pub use registry::{HardwareHandler, PinRegistry, ReadHandler, WriteHandler};
