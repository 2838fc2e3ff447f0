use std::sync::Arc;
use std::time::Duration;

use blynk_frame::Command;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::error::Result;

/// Send an empty ping every `heartbeat` until cancelled.
///
/// Acknowledgments are not awaited here; they arrive as ordinary response
/// frames. A zero heartbeat disables pings and the loop only waits for
/// cancellation.
pub async fn keepalive_loop(
    conn: Arc<Connection>,
    heartbeat: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    if heartbeat.is_zero() {
        debug!("keepalive disabled");
        cancel.cancelled().await;
        return Ok(());
    }

    info!(?heartbeat, "keepalive started");
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let message_id = conn.send(Command::Ping, b"").await?;
                debug!(message_id, "ping sent");
            }
        }
    }

    info!("keepalive finished");
    Ok(())
}
