use std::fmt;
use std::time::Duration;

use blynk_frame::Body;
use blynk_transport::{Endpoint, TlsConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT};

/// Default broker host.
pub const DEFAULT_SERVER: &str = "blynk-cloud.com";
/// Inbound buffer size advertised to the broker.
pub const DEFAULT_BUFFER_IN: usize = 1024;

/// What the receive loop does when the broker closes its side of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofPolicy {
    /// Treat end-of-stream as a closed connection and tear the session down.
    #[default]
    Terminate,
    /// Log it and keep polling after `eof_backoff`.
    Continue,
}

/// What `connect` does when the broker rejects the capability announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnouncePolicy {
    /// Log a warning and stay connected.
    #[default]
    Lenient,
    /// Close the connection and fail `connect`.
    Strict,
}

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Device access token sent at login.
    /// Never logged.
    pub auth_token: String,
    /// Broker address.
    pub endpoint: Endpoint,
    /// Trust material; `None` dials plain TCP.
    pub tls: Option<TlsConfig>,
    /// Bound on resolve + dial + TLS handshake.
    pub connect_timeout: Duration,
    /// Interval between keepalive pings.
    pub heartbeat: Duration,
    /// Bound on each synchronous wait for a response frame.
    pub response_timeout: Duration,
    /// How long `stop` waits for the loops to observe cancellation.
    pub stop_grace: Duration,
    pub eof_policy: EofPolicy,
    /// Pause between polls after end-of-stream under [`EofPolicy::Continue`].
    pub eof_backoff: Duration,
    pub announce_policy: AnnouncePolicy,
    /// Inbound buffer size advertised in the announcement.
    pub buffer_in: usize,
    /// Client identifier advertised in the announcement.
    pub device: String,
    /// Client version advertised in the announcement.
    pub version: String,
    /// Depth of the queue between the receive loop and the processor.
    pub queue_depth: usize,
}

impl ClientConfig {
    /// Default configuration with the given access token.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.endpoint = Endpoint::new(host, port);
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Body of the post-login capability announcement.
    pub fn announce_body(&self) -> Body {
        let heartbeat = (self.heartbeat.as_secs_f64().round() as u64).to_string();
        let buffer_in = self.buffer_in.to_string();
        Body::from_fields([
            "ver",
            self.version.as_str(),
            "buff-in",
            buffer_in.as_str(),
            "h-beat",
            heartbeat.as_str(),
            "dev",
            self.device.as_str(),
        ])
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            endpoint: Endpoint::new(DEFAULT_SERVER, DEFAULT_PORT),
            tls: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
            stop_grace: Duration::from_secs(1),
            eof_policy: EofPolicy::default(),
            eof_backoff: Duration::from_millis(50),
            announce_policy: AnnouncePolicy::default(),
            buffer_in: DEFAULT_BUFFER_IN,
            device: "rust".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            queue_depth: 64,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field(
                "auth_token",
                &format_args!("<redacted:{} bytes>", self.auth_token.len()),
            )
            .field("endpoint", &self.endpoint)
            .field("tls", &self.tls)
            .field("connect_timeout", &self.connect_timeout)
            .field("heartbeat", &self.heartbeat)
            .field("response_timeout", &self.response_timeout)
            .field("stop_grace", &self.stop_grace)
            .field("eof_policy", &self.eof_policy)
            .field("eof_backoff", &self.eof_backoff)
            .field("announce_policy", &self.announce_policy)
            .field("buffer_in", &self.buffer_in)
            .field("device", &self.device)
            .field("version", &self.version)
            .field("queue_depth", &self.queue_depth)
            .finish()
    }
}
