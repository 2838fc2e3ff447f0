use std::time::Duration;

use blynk_frame::{encode, Command, Message, MessageIdSequencer};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Size of the scratch buffer used for each socket read.
pub const READ_BUFFER_SIZE: usize = 1024;

pub(crate) type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Send/receive primitives over one broker stream.
///
/// Writers are serialised by a mutex so concurrent senders never interleave
/// frame bytes. The read half is owned either by the synchronous helpers
/// (through [`Connection::receive_one`]) or by the receive loop once it has
/// been taken with [`Connection::take_reader`].
pub struct Connection {
    reader: Mutex<Option<BoxReader>>,
    writer: Mutex<Option<BoxWriter>>,
    ids: MessageIdSequencer,
}

impl Connection {
    /// Split `stream` into independently owned read and write halves.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
            writer: Mutex::new(Some(Box::new(writer))),
            ids: MessageIdSequencer::new(),
        }
    }

    /// The message identifier sequencer shared by every sender.
    pub fn ids(&self) -> &MessageIdSequencer {
        &self.ids
    }

    /// Encode and send a request frame. Returns its message identifier.
    pub async fn send(&self, command: Command, body: &[u8]) -> Result<u16> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(ClientError::NotConnected)?;

        let mut buf = BytesMut::new();
        let message_id = encode(command, body, &self.ids, &mut buf)?;
        write_frame(stream, &buf).await?;

        debug!(%command, message_id, bytes = body.len(), "frame sent");
        Ok(message_id)
    }

    /// Send a pre-built message as-is (used for responses that echo an id).
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(ClientError::NotConnected)?;
        write_frame(stream, &message.to_bytes()).await?;

        debug!(
            command = %message.header.command,
            message_id = message.header.message_id,
            "message sent"
        );
        Ok(())
    }

    /// Read once with a deadline.
    ///
    /// Returns `Ok(None)` on timeout, a copy of the bytes read on success,
    /// and an error on end-of-stream or any other I/O failure.
    pub async fn receive_one(&self, timeout: Duration) -> Result<Option<Bytes>> {
        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or(ClientError::NotConnected)?;

        let mut scratch = [0u8; READ_BUFFER_SIZE];
        match tokio::time::timeout(timeout, stream.read(&mut scratch)).await {
            Err(_) => {
                debug!(?timeout, "receive timed out");
                Ok(None)
            }
            Ok(Ok(0)) => Err(ClientError::Disconnected("end of stream".to_string())),
            Ok(Ok(n)) => Ok(Some(Bytes::copy_from_slice(&scratch[..n]))),
            Ok(Err(err)) => Err(ClientError::Io(err)),
        }
    }

    /// Hand the read half to a long-running reader.
    pub(crate) async fn take_reader(&self) -> Option<BoxReader> {
        self.reader.lock().await.take()
    }

    /// Returns true while the write half is open.
    pub async fn is_open(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Shut down the write half and drop both halves.
    ///
    /// Later sends fail with [`ClientError::NotConnected`].
    pub async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "shutdown of write half failed");
            }
        }
        // The receive loop may own the read half; it is dropped when the loop exits.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }
}

async fn write_frame(stream: &mut BoxWriter, frame: &[u8]) -> Result<()> {
    stream.write_all(frame).await?;
    stream.flush().await?;
    Ok(())
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("last_message_id", &self.ids.current())
            .finish_non_exhaustive()
    }
}
