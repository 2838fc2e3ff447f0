use std::net::SocketAddr;
use std::path::PathBuf;

/// Errors that can occur while establishing a broker connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The host name could not be resolved.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// No resolved address accepted the connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no addresses.
    #[error("no addresses found for {host}:{port}")]
    NoAddress { host: String, port: u16 },

    /// The TLS handshake or TLS configuration failed.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The trusted root certificate could not be loaded.
    #[error("invalid root certificate: {0}")]
    InvalidCertificate(String),

    /// The certificate file could not be read.
    #[error("failed to read certificate file {path}: {source}")]
    CertificateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The name used for certificate verification is not a valid DNS name or IP.
    #[error("invalid tls server name: {0:?}")]
    InvalidServerName(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
