//! Broker transport: plain TCP or TLS over TCP.
//!
//! This is the lowest layer. Everything else builds on the
//! [`BlynkStream`] type provided here.

pub mod error;
pub mod stream;
pub mod tcp;
pub mod tls;

pub use error::{Result, TransportError};
pub use stream::BlynkStream;
pub use tcp::{
    connect, connect_with_timeout, Endpoint, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT,
    DEFAULT_TLS_PORT,
};
pub use tls::TlsConfig;
