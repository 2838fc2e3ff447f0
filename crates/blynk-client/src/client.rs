use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use blynk_frame::{pin, split_responses, Body, Command, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::handshake::{announce, await_response, authenticate};
use crate::keepalive::keepalive_loop;
use crate::processor::{process_loop, Dispatcher};
use crate::receiver::receive_loop;
use crate::registry::PinRegistry;

/// Session lifecycle.
///
/// `Disconnected → Connecting → Authenticating → Announcing → Active →
/// Stopping → Disconnected`. A failed dial or handshake drops straight back
/// to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Announcing,
    Active,
    Stopping,
}

impl ConnectionState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Announcing => "announcing",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
struct Session {
    conn: Arc<Connection>,
    cancel: CancellationToken,
}

struct Inner {
    config: ClientConfig,
    registry: PinRegistry,
    state: watch::Sender<ConnectionState>,
    processing: watch::Sender<bool>,
    session: Mutex<Option<Session>>,
}

/// Device-side Blynk client.
///
/// Cloning is cheap; clones share one session. Typical use:
///
/// ```no_run
/// # async fn demo() -> blynk_client::Result<()> {
/// use blynk_client::{Client, ClientConfig};
///
/// let client = Client::new(ClientConfig::new("token"));
/// client.register_reader(10, |_| "21.5".to_string());
/// client.connect().await?;
/// client.virtual_write(9, "7.654").await?;
/// client.run().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (processing, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: PinRegistry::new(),
                state,
                processing,
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Handler registry shared with the processor.
    pub fn registry(&self) -> &PinRegistry {
        &self.inner.registry
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Returns true while [`Client::run`] owns the socket's read half.
    pub fn is_processing(&self) -> bool {
        *self.inner.processing.borrow()
    }

    /// Dial the configured endpoint, log in and announce.
    pub async fn connect(&self) -> Result<()> {
        self.begin_connect()?;
        let config = &self.inner.config;
        info!(endpoint = %config.endpoint, tls = config.tls.is_some(), "connecting");

        let stream = match blynk_transport::connect_with_timeout(
            &config.endpoint,
            config.tls.as_ref(),
            config.connect_timeout,
        )
        .await
        {
            Ok(stream) => stream,
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(err.into());
            }
        };
        self.establish(stream).await
    }

    /// Log in and announce over an already-open stream.
    pub async fn connect_with_stream<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.begin_connect()?;
        self.establish(stream).await
    }

    fn begin_connect(&self) -> Result<()> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if claimed {
            Ok(())
        } else {
            Err(ClientError::AlreadyConnected)
        }
    }

    async fn establish<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = &self.inner.config;
        let conn = Arc::new(Connection::new(stream));

        self.set_state(ConnectionState::Authenticating);
        if let Err(err) = authenticate(&conn, &config.auth_token, config.response_timeout).await {
            conn.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(err);
        }

        self.set_state(ConnectionState::Announcing);
        let dispatcher = Dispatcher::new(Arc::clone(&conn), self.inner.registry.clone());
        if let Err(err) = announce(&dispatcher, config).await {
            conn.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(err);
        }

        *self.lock_session() = Some(Session {
            conn,
            cancel: CancellationToken::new(),
        });
        self.set_state(ConnectionState::Active);
        info!("session active");
        Ok(())
    }

    /// Run the receive, processing and keepalive loops until [`Client::stop`]
    /// or a fatal loop error.
    ///
    /// A fatal error tears the session down before it is returned.
    pub async fn run(&self) -> Result<()> {
        let session = self.session()?;
        let claimed = self.inner.processing.send_if_modified(|active| {
            if *active {
                false
            } else {
                *active = true;
                true
            }
        });
        if !claimed {
            return Err(ClientError::AlreadyProcessing);
        }
        let guard = ProcessingGuard(&self.inner.processing);

        let Some(reader) = session.conn.take_reader().await else {
            drop(guard);
            return Err(ClientError::NotConnected);
        };

        let config = &self.inner.config;
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let dispatcher = Dispatcher::new(Arc::clone(&session.conn), self.inner.registry.clone());
        let cancel = session.cancel.clone();
        let fatal = |result: Result<()>| {
            if result.is_err() {
                cancel.cancel();
            }
            result
        };

        info!("processing started");
        let (received, processed, kept_alive) = tokio::join!(
            async {
                fatal(
                    receive_loop(
                        reader,
                        tx,
                        cancel.clone(),
                        config.eof_policy,
                        config.eof_backoff,
                    )
                    .await,
                )
            },
            async { fatal(process_loop(dispatcher, rx, cancel.clone()).await) },
            async {
                fatal(
                    keepalive_loop(Arc::clone(&session.conn), config.heartbeat, cancel.clone())
                        .await,
                )
            }
        );
        drop(guard);

        match received.and(processed).and(kept_alive) {
            Ok(()) => {
                info!("processing stopped");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "processing failed, tearing down");
                self.shutdown(Duration::ZERO).await;
                Err(err)
            }
        }
    }

    /// Cancel the loops, give them the configured grace period to finish,
    /// then close the socket. Calling it while disconnected is a no-op.
    pub async fn stop(&self) {
        self.shutdown(self.inner.config.stop_grace).await;
    }

    /// Cancel the loops and close the socket without waiting for them.
    pub async fn disconnect(&self) {
        self.shutdown(Duration::ZERO).await;
    }

    async fn shutdown(&self, grace: Duration) {
        let Some(session) = self.lock_session().take() else {
            return;
        };
        self.set_state(ConnectionState::Stopping);
        session.cancel.cancel();

        if !grace.is_zero() {
            let mut processing = self.inner.processing.subscribe();
            if tokio::time::timeout(grace, processing.wait_for(|active| !*active))
                .await
                .is_err()
            {
                warn!(?grace, "loops still running after grace period");
            }
        }

        session.conn.close().await;
        self.set_state(ConnectionState::Disconnected);
        info!("disconnected");
    }

    /// Send a value to a virtual pin.
    pub async fn virtual_write(&self, pin: u32, value: &str) -> Result<u16> {
        self.send(Command::Hardware, pin::virtual_write(pin, value).as_bytes())
            .await
    }

    /// Ask the broker for the values of virtual pins.
    pub async fn virtual_read(&self, pins: &[u32]) -> Result<u16> {
        self.send(Command::HardwareSync, pin::virtual_read(pins).as_bytes())
            .await
    }

    pub async fn digital_write(&self, pin: u32, high: bool) -> Result<u16> {
        self.send(Command::Hardware, pin::digital_write(pin, high).as_bytes())
            .await
    }

    pub async fn digital_read(&self, pin: u32) -> Result<u16> {
        self.send(Command::HardwareSync, pin::digital_read(pin).as_bytes())
            .await
    }

    /// Push notification to the project owner's phone.
    pub async fn notify(&self, text: &str) -> Result<u16> {
        self.request(Command::Notify, text.as_bytes()).await
    }

    pub async fn tweet(&self, text: &str) -> Result<u16> {
        self.request(Command::Tweet, text.as_bytes()).await
    }

    pub async fn email(&self, to: &str, subject: &str, body: &str) -> Result<u16> {
        let body = Body::from_fields([to, subject, body]);
        self.request(Command::Email, body.as_bytes()).await
    }

    /// Send one frame. Returns its message id.
    pub async fn send(&self, command: Command, body: &[u8]) -> Result<u16> {
        self.session()?.conn.send(command, body).await
    }

    /// Send one frame and, unless processing is active, wait for the
    /// broker's verdict on it.
    ///
    /// While [`Client::run`] is active the processor owns the inbound side,
    /// so this returns right after the send and rejections are only logged.
    /// Otherwise frames that arrive before the matching response are
    /// dispatched as usual.
    pub async fn request(&self, command: Command, body: &[u8]) -> Result<u16> {
        let conn = self.session()?.conn;
        let message_id = conn.send(command, body).await?;
        if self.is_processing() {
            debug!(%command, message_id, "processing active, not waiting for response");
            return Ok(message_id);
        }

        let dispatcher = Dispatcher::new(conn, self.inner.registry.clone());
        let response =
            await_response(&dispatcher, message_id, self.inner.config.response_timeout).await?;
        if !response.is_success() {
            return Err(ClientError::Status {
                command,
                status: response.status,
            });
        }
        Ok(message_id)
    }

    /// Wait for the next hardware-class frame without running the loops.
    ///
    /// Pings and other frames that arrive first are dispatched as usual.
    /// Frames that follow the hardware frame in the same read are dropped.
    pub async fn next_hardware(&self, timeout: Duration) -> Result<Response> {
        if self.is_processing() {
            return Err(ClientError::AlreadyProcessing);
        }
        let conn = self.session()?.conn;
        let dispatcher = Dispatcher::new(Arc::clone(&conn), self.inner.registry.clone());
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ClientError::Timeout(timeout));
            }
            let Some(chunk) = conn.receive_one(remaining).await? else {
                return Err(ClientError::Timeout(timeout));
            };
            for frame in split_responses(&chunk) {
                if frame.command.is_hardware() {
                    return Ok(frame);
                }
                dispatcher.dispatch(&frame).await?;
            }
        }
    }

    pub fn register_reader<F>(&self, pin: u32, producer: F)
    where
        F: Fn(u32) -> String + Send + Sync + 'static,
    {
        self.inner.registry.register_reader(pin, producer);
    }

    pub fn register_writer<F>(&self, pin: u32, consumer: F)
    where
        F: Fn(u32, &str) + Send + Sync + 'static,
    {
        self.inner.registry.register_writer(pin, consumer);
    }

    pub fn unregister_reader(&self, pin: u32) -> bool {
        self.inner.registry.unregister_reader(pin)
    }

    pub fn unregister_writer(&self, pin: u32) -> bool {
        self.inner.registry.unregister_writer(pin)
    }

    /// Callback for every inbound hardware-class frame.
    pub fn on_hardware<F>(&self, callback: F)
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.inner.registry.set_hardware_handler(callback);
    }

    fn session(&self) -> Result<Session> {
        self.lock_session().clone().ok_or(ClientError::NotConnected)
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.inner.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "state changed");
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .field("processing", &self.is_processing())
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

/// Clears the processing flag when `run` returns or is dropped.
struct ProcessingGuard<'a>(&'a watch::Sender<bool>);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}
