use std::time::Duration;

use blynk_frame::{status_name, Command};

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error while connecting.
    #[error("transport error: {0}")]
    Transport(#[from] blynk_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] blynk_frame::FrameError),

    /// The broker rejected the login.
    #[error("authentication failed: {reason} (message id {message_id}, status {status})")]
    Authentication {
        message_id: u16,
        status: u16,
        reason: &'static str,
    },

    /// The broker rejected the capability announcement.
    #[error("announce rejected: {name} ({0})", name = status_name(*.0))]
    Announce(u16),

    /// The broker answered a request with a non-success status.
    #[error("{command} rejected: {name} ({status})", name = status_name(*.status))]
    Status { command: Command, status: u16 },

    /// No response arrived in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// There is no live connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called on a client that is not disconnected.
    #[error("already connected")]
    AlreadyConnected,

    /// `run` was called while the processing loops are already running.
    #[error("processing already active")]
    AlreadyProcessing,

    /// The broker closed the connection.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// Socket read or write failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_name_the_category() {
        let err = ClientError::Status {
            command: Command::Notify,
            status: 14,
        };
        assert_eq!(err.to_string(), "NOTIFY rejected: notify not authorized (14)");
        assert_eq!(
            ClientError::Announce(3).to_string(),
            "announce rejected: not registered (3)"
        );
    }
}
