use std::sync::Arc;

use blynk_frame::pin::virtual_write;
use blynk_frame::status::SUCCESS;
use blynk_frame::{split_responses, Command, Message, PinRequest, Response};
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::Connection;
use crate::error::Result;
use crate::registry::PinRegistry;

/// Routes decoded inbound frames.
///
/// Pings are answered, hardware frames reach the hardware callback and the
/// pin registry, and anything else is logged.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    conn: Arc<Connection>,
    registry: PinRegistry,
}

impl Dispatcher {
    pub fn new(conn: Arc<Connection>, registry: PinRegistry) -> Self {
        Self { conn, registry }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Split one raw chunk and dispatch every frame in it, in arrival order.
    ///
    /// Returns the number of frames dispatched. Only send failures are
    /// errors; malformed pin bodies and missing handlers are logged.
    pub async fn process_chunk(&self, chunk: &[u8]) -> Result<usize> {
        let frames = split_responses(chunk);
        trace!(bytes = chunk.len(), frames = frames.len(), "chunk split");
        for frame in &frames {
            self.dispatch(frame).await?;
        }
        Ok(frames.len())
    }

    pub async fn dispatch(&self, frame: &Response) -> Result<()> {
        match frame.command {
            Command::Hardware | Command::HardwareSync => self.on_hardware(frame).await,
            Command::Ping => {
                debug!(message_id = frame.message_id, "ping received");
                self.conn
                    .send_message(&Message::response(frame.message_id, SUCCESS))
                    .await
            }
            Command::Response => {
                if frame.is_success() {
                    trace!(message_id = frame.message_id, "response absorbed");
                } else {
                    warn!(
                        message_id = frame.message_id,
                        status = frame.status,
                        reason = %frame.status(),
                        "request rejected by broker"
                    );
                }
                Ok(())
            }
            Command::Login
            | Command::Tweet
            | Command::Email
            | Command::Notify
            | Command::Internal
            | Command::HardwareLogin
            | Command::Unknown(_) => {
                debug!(command = %frame.command, message_id = frame.message_id, "unhandled frame");
                Ok(())
            }
        }
    }

    async fn on_hardware(&self, frame: &Response) -> Result<()> {
        if let Some(callback) = self.registry.hardware_handler() {
            callback(frame);
        }

        let request = match PinRequest::parse(&frame.values) {
            Ok(Some(request)) => request,
            Ok(None) => {
                trace!(message_id = frame.message_id, "hardware frame without pin request");
                return Ok(());
            }
            Err(err) => {
                warn!(message_id = frame.message_id, error = %err, "malformed pin request");
                return Ok(());
            }
        };

        match request {
            PinRequest::VirtualRead { pins } => {
                for pin in pins {
                    let Some(reader) = self.registry.reader(pin) else {
                        warn!(pin, "no reader registered");
                        continue;
                    };
                    let value = reader(pin);
                    let body = virtual_write(pin, &value);
                    let message_id = self.conn.send(Command::Hardware, body.as_bytes()).await?;
                    debug!(pin, message_id, "pin value sent");
                }
            }
            PinRequest::VirtualWrite { pin, value } => match self.registry.writer(pin) {
                Some(writer) => {
                    debug!(pin, bytes = value.len(), "pin value delivered");
                    writer(pin, &value);
                }
                None => warn!(pin, "no writer registered"),
            },
        }
        Ok(())
    }
}

/// Drain the inbound queue until cancellation or until every sender is gone.
pub async fn process_loop(
    dispatcher: Dispatcher,
    mut inbound: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
) -> Result<()> {
    info!("processor started");
    let result = loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            chunk = inbound.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            debug!("inbound queue closed");
            break Ok(());
        };
        if let Err(err) = dispatcher.process_chunk(&chunk).await {
            break Err(err);
        }
    };
    info!(ok = result.is_ok(), "processor finished");
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use blynk_frame::{Body, Header, HEADER_SIZE};
    use tokio::io::{duplex, AsyncReadExt, DuplexStream};

    use super::*;

    fn dispatcher() -> (Dispatcher, PinRegistry, DuplexStream) {
        let (client, broker) = duplex(4096);
        let registry = PinRegistry::new();
        let dispatcher = Dispatcher::new(Arc::new(Connection::new(client)), registry.clone());
        (dispatcher, registry, broker)
    }

    fn hardware_frame(command: Command, id: u16, fields: &[&str]) -> Vec<u8> {
        Message::new(command, id, Body::from_fields(fields.iter().copied()).freeze())
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    async fn read_frame(broker: &mut DuplexStream) -> (Header, Vec<u8>) {
        let mut raw = [0u8; HEADER_SIZE];
        broker.read_exact(&mut raw).await.unwrap();
        let header = Header::decode(&raw);
        let len = if header.command == Command::Response {
            0
        } else {
            usize::from(header.length_or_status)
        };
        let mut body = vec![0u8; len];
        broker.read_exact(&mut body).await.unwrap();
        (header, body)
    }

    async fn assert_silent(broker: &mut DuplexStream) {
        let mut byte = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_millis(50), broker.read(&mut byte)).await;
        assert!(read.is_err(), "unexpected outbound bytes");
    }

    #[tokio::test]
    async fn ping_is_answered_with_same_id() {
        let (dispatcher, _registry, mut broker) = dispatcher();

        let dispatched = dispatcher
            .process_chunk(&Header::new(Command::Ping, 7, 0).to_bytes())
            .await
            .unwrap();
        assert_eq!(dispatched, 1);

        let (header, _) = read_frame(&mut broker).await;
        assert_eq!(header.command, Command::Response);
        assert_eq!(header.message_id, 7);
        assert_eq!(header.length_or_status, 200);
        assert_silent(&mut broker).await;
    }

    #[tokio::test]
    async fn virtual_read_replies_with_producer_value() {
        let (dispatcher, registry, mut broker) = dispatcher();
        registry.register_reader(5, |_| "42".to_string());

        dispatcher
            .process_chunk(&hardware_frame(Command::Hardware, 3, &["vr", "5"]))
            .await
            .unwrap();

        let (header, body) = read_frame(&mut broker).await;
        assert_eq!(header.command, Command::Hardware);
        assert_eq!(body, b"vw\x005\x0042");
        assert_silent(&mut broker).await;
    }

    #[tokio::test]
    async fn virtual_read_over_hardware_sync_is_also_served() {
        let (dispatcher, registry, mut broker) = dispatcher();
        registry.register_reader(1, |_| "a".to_string());
        registry.register_reader(2, |_| "b".to_string());

        dispatcher
            .process_chunk(&hardware_frame(Command::HardwareSync, 4, &["vr", "1", "2", "3"]))
            .await
            .unwrap();

        let (_, first) = read_frame(&mut broker).await;
        let (_, second) = read_frame(&mut broker).await;
        assert_eq!(first, b"vw\x001\x00a");
        assert_eq!(second, b"vw\x002\x00b");
        assert_silent(&mut broker).await;
    }

    #[tokio::test]
    async fn virtual_write_reaches_consumer_without_reply() {
        let (dispatcher, registry, mut broker) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register_writer(12, move |pin, value| {
            sink.lock().unwrap().push((pin, value.to_string()));
        });

        dispatcher
            .process_chunk(&hardware_frame(Command::Hardware, 9, &["vw", "12", "4.567"]))
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(12, "4.567".to_string())]);
        assert_silent(&mut broker).await;
    }

    #[tokio::test]
    async fn hardware_callback_sees_every_hardware_frame() {
        let (dispatcher, registry, _broker) = dispatcher();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.set_hardware_handler(move |frame| {
            sink.lock().unwrap().push(frame.values.clone());
        });

        let mut chunk = hardware_frame(Command::Hardware, 1, &["vw", "1", "on"]);
        chunk.extend(Header::new(Command::Response, 2, 200).to_bytes());
        chunk.extend(hardware_frame(Command::HardwareSync, 3, &["dw", "4", "1"]));

        assert_eq!(dispatcher.process_chunk(&chunk).await.unwrap(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                vec!["vw".to_string(), "1".to_string(), "on".to_string()],
                vec!["dw".to_string(), "4".to_string(), "1".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn missing_handlers_and_bad_pins_are_not_fatal() {
        let (dispatcher, _registry, mut broker) = dispatcher();

        let mut chunk = hardware_frame(Command::Hardware, 1, &["vr", "5"]);
        chunk.extend(hardware_frame(Command::Hardware, 2, &["vw", "x", "1"]));
        chunk.extend(Header::new(Command::Unknown(99), 3, 0).to_bytes());

        assert_eq!(dispatcher.process_chunk(&chunk).await.unwrap(), 3);
        assert_silent(&mut broker).await;
    }

    #[tokio::test]
    async fn send_failure_is_fatal() {
        let (client, broker) = duplex(64);
        drop(broker);
        let dispatcher = Dispatcher::new(Arc::new(Connection::new(client)), PinRegistry::new());

        let err = dispatcher
            .process_chunk(&Header::new(Command::Ping, 1, 0).to_bytes())
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn loop_stops_on_cancel_and_on_closed_queue() {
        let (dispatcher, _registry, mut broker) = dispatcher();

        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(process_loop(dispatcher.clone(), rx, cancel.clone()));

        tx.send(Bytes::from_static(&[6, 0, 11, 0, 0])).await.unwrap();
        let (header, _) = read_frame(&mut broker).await;
        assert_eq!(header.message_id, 11);

        cancel.cancel();
        task.await.unwrap().unwrap();

        let (tx, rx) = mpsc::channel::<Bytes>(1);
        drop(tx);
        process_loop(dispatcher, rx, CancellationToken::new())
            .await
            .unwrap();
    }
}
