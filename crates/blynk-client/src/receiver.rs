use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EofPolicy;
use crate::connection::READ_BUFFER_SIZE;
use crate::error::{ClientError, Result};

/// Read raw chunks off the socket and queue them for the processor.
///
/// Each chunk is copied out of the scratch buffer before it is queued. The
/// loop ends cleanly on cancellation or when the processor has gone away,
/// and with an error on a read failure or, under [`EofPolicy::Terminate`],
/// on end-of-stream.
pub async fn receive_loop<R>(
    mut reader: R,
    outbound: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
    eof_policy: EofPolicy,
    eof_backoff: Duration,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    info!("receiver started");
    let mut scratch = [0u8; READ_BUFFER_SIZE];

    let result = loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            read = reader.read(&mut scratch) => read,
        };

        match read {
            Ok(0) => match eof_policy {
                EofPolicy::Terminate => {
                    warn!("broker closed the connection");
                    break Err(ClientError::Disconnected("end of stream".to_string()));
                }
                EofPolicy::Continue => {
                    debug!(?eof_backoff, "end of stream, polling again");
                    tokio::select! {
                        _ = cancel.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(eof_backoff) => {}
                    }
                }
            },
            Ok(n) => {
                let chunk = Bytes::copy_from_slice(&scratch[..n]);
                if outbound.send(chunk).await.is_err() {
                    debug!("inbound queue closed");
                    break Ok(());
                }
            }
            Err(err) => {
                error!(error = %err, "socket read failed");
                break Err(ClientError::Io(err));
            }
        }
    };

    info!(ok = result.is_ok(), "receiver finished");
    result
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncWriteExt};

    use super::*;

    const BACKOFF: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn chunks_are_forwarded_in_order() {
        let (client, mut broker) = duplex(1024);
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            client,
            tx,
            cancel.clone(),
            EofPolicy::Terminate,
            BACKOFF,
        ));

        broker.write_all(&[6, 0, 1, 0, 0]).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_ref(), &[6, 0, 1, 0, 0]);
        broker.write_all(&[6, 0, 2, 0, 0]).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_ref(), &[6, 0, 2, 0, 0]);

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn eof_terminates_by_default() {
        let (client, broker) = duplex(64);
        let (tx, _rx) = mpsc::channel(1);
        drop(broker);

        let err = receive_loop(
            client,
            tx,
            CancellationToken::new(),
            EofPolicy::Terminate,
            BACKOFF,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ClientError::Disconnected(_)));
    }

    #[tokio::test]
    async fn eof_continue_keeps_polling_until_cancelled() {
        let (client, broker) = duplex(64);
        let (tx, _rx) = mpsc::channel(1);
        drop(broker);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(receive_loop(
            client,
            tx,
            cancel.clone(),
            EofPolicy::Continue,
            BACKOFF,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_queue_ends_loop() {
        let (client, mut broker) = duplex(64);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        broker.write_all(&[6, 0, 1, 0, 0]).await.unwrap();
        receive_loop(
            client,
            tx,
            CancellationToken::new(),
            EofPolicy::Terminate,
            BACKOFF,
        )
        .await
        .unwrap();
    }
}
