use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::BlynkStream;
use crate::tls::{server_name, TlsConfig};

/// Default plain-TCP broker port.
pub const DEFAULT_PORT: u16 = 80;
/// Default TLS broker port.
pub const DEFAULT_TLS_PORT: u16 = 443;
/// Default bound on resolving, dialing and the TLS handshake together.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connect to a broker, optionally wrapping the socket in TLS.
pub async fn connect(endpoint: &Endpoint, tls: Option<&TlsConfig>) -> Result<BlynkStream> {
    connect_with_timeout(endpoint, tls, DEFAULT_CONNECT_TIMEOUT).await
}

/// Connect with an explicit bound on the whole dial.
pub async fn connect_with_timeout(
    endpoint: &Endpoint,
    tls: Option<&TlsConfig>,
    timeout: Duration,
) -> Result<BlynkStream> {
    match tokio::time::timeout(timeout, dial(endpoint, tls)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("connecting to {endpoint} timed out after {timeout:?}"),
        ))),
    }
}

async fn dial(endpoint: &Endpoint, tls: Option<&TlsConfig>) -> Result<BlynkStream> {
    // Build the TLS connector first so bad trust material fails before dialing.
    let connector = tls.map(TlsConfig::connector).transpose()?;

    let tcp = dial_tcp(endpoint).await?;
    if let Err(err) = tcp.set_nodelay(true) {
        debug!(error = %err, "failed to set TCP_NODELAY");
    }

    match (connector, tls) {
        (Some(connector), Some(tls)) => {
            let name = server_name(tls.server_name_for(&endpoint.host))?;
            let stream = connector.connect(name, tcp).await.map_err(tls_error)?;
            info!(%endpoint, "connected to broker over tls");
            Ok(BlynkStream::tls(stream))
        }
        _ => {
            info!(%endpoint, "connected to broker");
            Ok(BlynkStream::plain(tcp))
        }
    }
}

async fn dial_tcp(endpoint: &Endpoint) -> Result<TcpStream> {
    let addrs = tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|source| TransportError::Resolve {
            host: endpoint.host.clone(),
            port: endpoint.port,
            source,
        })?;

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                debug!(%addr, "tcp connection established");
                return Ok(stream);
            }
            Err(source) => {
                debug!(%addr, error = %source, "tcp connect attempt failed");
                last_err = Some(TransportError::Connect { addr, source });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| TransportError::NoAddress {
        host: endpoint.host.clone(),
        port: endpoint.port,
    }))
}

/// The handshake surfaces rustls failures wrapped in `io::Error`; unwrap them.
fn tls_error(err: std::io::Error) -> TransportError {
    let is_rustls = err
        .get_ref()
        .is_some_and(|inner| inner.is::<rustls::Error>());
    if is_rustls {
        if let Some(inner) = err.into_inner() {
            if let Ok(tls) = inner.downcast::<rustls::Error>() {
                return TransportError::Tls(*tls);
            }
        }
        return TransportError::InvalidCertificate("tls handshake rejected".to_string());
    }
    TransportError::Io(err)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustls::{HandshakeKind, ProtocolVersion, ServerConfig, SupportedProtocolVersion};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    use super::*;

    const ROOT_PEM: &[u8] = include_bytes!("../testdata/ca.pem");
    const OTHER_ROOT_PEM: &[u8] = include_bytes!("../testdata/other-ca.pem");
    const SERVER_CERT_PEM: &[u8] = include_bytes!("../testdata/server.pem");
    const SERVER_KEY_PEM: &[u8] = include_bytes!("../testdata/server-key.pem");

    fn acceptor(versions: &[&'static SupportedProtocolVersion]) -> TlsAcceptor {
        let certs = rustls_pemfile::certs(&mut &SERVER_CERT_PEM[..])
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        let key = rustls_pemfile::private_key(&mut &SERVER_KEY_PEM[..])
            .unwrap()
            .unwrap();
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(versions)
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    fn trusted() -> TlsConfig {
        TlsConfig::from_pem(ROOT_PEM).with_server_name("localhost")
    }

    #[tokio::test]
    async fn plain_connect_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf).await.unwrap();
        });

        let mut stream = connect(&Endpoint::new("127.0.0.1", port), None)
            .await
            .unwrap();
        assert!(!stream.is_tls());
        assert_eq!(stream.transport_name(), "tcp");
        assert_eq!(stream.peer_addr().unwrap().port(), port);

        stream.write_all(b"hello").await.unwrap();
        let mut echo = [0u8; 5];
        stream.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"hello");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect(&Endpoint::new("127.0.0.1", port), None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test]
    async fn bad_trust_material_fails_before_dialing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let tls = TlsConfig::from_pem(Vec::new());
        let err = connect(&Endpoint::new("127.0.0.1", port), Some(&tls))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidCertificate(_)));
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(
            Endpoint::new("blynk-cloud.com", DEFAULT_PORT).to_string(),
            "blynk-cloud.com:80"
        );
    }

    #[tokio::test]
    async fn tls_handshake_against_trusted_root() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let acceptor = acceptor(&[&rustls::version::TLS13, &rustls::version::TLS12]);

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(socket).await.unwrap();
            let mut buf = [0u8; 5];
            tls.read_exact(&mut buf).await.unwrap();
            tls.write_all(&buf).await.unwrap();
            tls.flush().await.unwrap();
        });

        let mut stream = connect(&Endpoint::new("127.0.0.1", port), Some(&trusted()))
            .await
            .unwrap();
        assert!(stream.is_tls());
        assert_eq!(stream.transport_name(), "tls");
        assert_eq!(stream.tls_version(), Some(ProtocolVersion::TLSv1_3));

        stream.write_all(b"hello").await.unwrap();
        stream.flush().await.unwrap();
        let mut echo = [0u8; 5];
        stream.read_exact(&mut echo).await.unwrap();
        assert_eq!(&echo, b"hello");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn tls12_only_broker_is_accepted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let acceptor = acceptor(&[&rustls::version::TLS12]);

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(socket).await.unwrap();
            tls.write_all(b"k").await.unwrap();
            tls.flush().await.unwrap();
        });

        let mut stream = connect(&Endpoint::new("127.0.0.1", port), Some(&trusted()))
            .await
            .unwrap();
        assert_eq!(stream.tls_version(), Some(ProtocolVersion::TLSv1_2));
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).await.unwrap();

        server.await.unwrap();
    }

    #[tokio::test]
    async fn sessions_are_never_resumed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let acceptor = acceptor(&[&rustls::version::TLS13, &rustls::version::TLS12]);

        let server = tokio::spawn(async move {
            let mut kinds = Vec::new();
            for _ in 0..2 {
                let (socket, _) = listener.accept().await.unwrap();
                let mut tls = acceptor.accept(socket).await.unwrap();
                kinds.push(tls.get_ref().1.handshake_kind());
                tls.write_all(b"k").await.unwrap();
                tls.flush().await.unwrap();
                let mut byte = [0u8; 1];
                tls.read_exact(&mut byte).await.unwrap();
            }
            kinds
        });

        // Both handshakes share one client config and so one session store.
        let connector = trusted().connector().unwrap();
        for _ in 0..2 {
            let tcp = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let mut stream = connector
                .connect(server_name("localhost").unwrap(), tcp)
                .await
                .unwrap();
            let mut byte = [0u8; 1];
            stream.read_exact(&mut byte).await.unwrap();
            stream.write_all(b"k").await.unwrap();
            stream.flush().await.unwrap();
        }

        let kinds = server.await.unwrap();
        assert_eq!(kinds, vec![Some(HandshakeKind::Full), Some(HandshakeKind::Full)]);
    }

    #[tokio::test]
    async fn untrusted_root_fails_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let acceptor = acceptor(&[&rustls::version::TLS13, &rustls::version::TLS12]);

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            assert!(acceptor.accept(socket).await.is_err());
        });

        let tls = TlsConfig::from_pem(OTHER_ROOT_PEM).with_server_name("localhost");
        let err = connect(&Endpoint::new("127.0.0.1", port), Some(&tls))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Tls(_)), "got {err:?}");

        server.await.unwrap();
    }
}
