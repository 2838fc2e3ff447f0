use std::time::Duration;

use blynk_frame::{split_responses, status_name, Command, Response};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AnnouncePolicy, ClientConfig};
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::processor::Dispatcher;

/// Log in with the device token.
///
/// Succeeds only when the next frame is a response echoing the login's
/// message id with the success status.
pub async fn authenticate(conn: &Connection, token: &str, timeout: Duration) -> Result<()> {
    let message_id = conn.send(Command::HardwareLogin, token.as_bytes()).await?;
    let response = first_frame(conn, timeout).await?;

    let reason = if response.command != Command::Response {
        Some("unexpected command")
    } else if response.message_id != message_id {
        Some("message id mismatch")
    } else if !response.is_success() {
        Some(status_name(response.status))
    } else {
        None
    };

    if let Some(reason) = reason {
        warn!(
            message_id = response.message_id,
            command = %response.command,
            status = response.status,
            reason,
            "login rejected"
        );
        return Err(ClientError::Authentication {
            message_id: response.message_id,
            status: response.status,
            reason,
        });
    }

    info!(message_id, "authenticated");
    Ok(())
}

/// Send the capability announcement and wait for its acknowledgment.
///
/// A rejection is an error under [`AnnouncePolicy::Strict`] and a warning
/// otherwise. A missing acknowledgment is treated the same way. Frames the
/// broker sends before the acknowledgment go through `dispatcher`.
pub async fn announce(dispatcher: &Dispatcher, config: &ClientConfig) -> Result<()> {
    let body = config.announce_body();
    let message_id = dispatcher
        .connection()
        .send(Command::Internal, body.as_bytes())
        .await?;

    let status = match await_response(dispatcher, message_id, config.response_timeout).await {
        Ok(response) if response.is_success() => {
            debug!(message_id, "announce accepted");
            return Ok(());
        }
        Ok(response) => response.status,
        Err(ClientError::Timeout(waited)) => {
            if config.announce_policy == AnnouncePolicy::Strict {
                return Err(ClientError::Timeout(waited));
            }
            warn!(message_id, ?waited, "announce not acknowledged");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    match config.announce_policy {
        AnnouncePolicy::Strict => Err(ClientError::Announce(status)),
        AnnouncePolicy::Lenient => {
            warn!(message_id, status, reason = status_name(status), "announce rejected");
            Ok(())
        }
    }
}

/// Wait for the response to `message_id`.
///
/// Everything else that arrives in the meantime is dispatched as usual, so
/// broker pings are answered while the caller waits. Responses to other
/// message ids are stale and dropped.
pub async fn await_response(
    dispatcher: &Dispatcher,
    message_id: u16,
    timeout: Duration,
) -> Result<Response> {
    let conn = dispatcher.connection();
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ClientError::Timeout(timeout));
        }
        let Some(chunk) = conn.receive_one(remaining).await? else {
            return Err(ClientError::Timeout(timeout));
        };

        let mut matched = None;
        for frame in split_responses(&chunk) {
            if frame.command != Command::Response {
                dispatcher.dispatch(&frame).await?;
            } else if frame.message_id == message_id && matched.is_none() {
                matched = Some(frame);
            } else {
                debug!(
                    expected = message_id,
                    message_id = frame.message_id,
                    status = frame.status,
                    "stale response dropped"
                );
            }
        }
        if let Some(response) = matched {
            return Ok(response);
        }
    }
}

/// First frame of the next non-empty read, preferring a response-tagged one.
async fn first_frame(conn: &Connection, timeout: Duration) -> Result<Response> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ClientError::Timeout(timeout));
        }

        let Some(chunk) = conn.receive_one(remaining).await? else {
            return Err(ClientError::Timeout(timeout));
        };

        let mut frames = split_responses(&chunk);
        if frames.is_empty() {
            debug!(bytes = chunk.len(), "short read while awaiting login response");
            continue;
        }
        let index = frames
            .iter()
            .position(|frame| frame.command == Command::Response)
            .unwrap_or(0);
        return Ok(frames.swap_remove(index));
    }
}
