//! Blynk hardware client.
//!
//! A device-side implementation of the Blynk hardware protocol: a compact,
//! command-tagged binary framing carried over plain TCP or TLS.
//!
//! # Crate Structure
//!
//! - [`frame`]: 5-byte headers, 0x00-separated bodies, message ids, status codes
//! - [`transport`]: plain TCP and TLS broker streams
//! - [`client`]: login, keepalive, inbound dispatch and pin handlers

/// Re-export frame types.
pub mod frame {
    pub use blynk_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use blynk_transport::*;
}

/// Re-export client types.
pub mod client {
    pub use blynk_client::*;
}

pub use blynk_client::{Client, ClientConfig, ClientError, ConnectionState};
