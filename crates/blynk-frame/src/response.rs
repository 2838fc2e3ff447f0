//! Inbound frame splitting.
//!
//! A single socket read may hold several concatenated frames. Only
//! hardware-class frames with a status between 1 and 1023 carry a body; for
//! every other frame the length field is a status code and no body follows.

use std::fmt;

use tracing::warn;

use crate::codec::{decode_body, Header, HEADER_SIZE};
use crate::command::Command;
use crate::status::{Status, SUCCESS};

/// Upper bound (exclusive) on an inbound hardware body length.
pub const MAX_HARDWARE_BODY: u16 = 1024;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: Command,
    pub message_id: u16,
    pub status: u16,
    /// Body fields; empty unless this is a hardware-class frame with a body.
    pub values: Vec<String>,
}

impl Response {
    pub fn from_header(header: Header) -> Self {
        Self {
            command: header.command,
            message_id: header.message_id,
            status: header.length_or_status,
            values: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.status)
    }

    /// Number of body bytes that follow this frame's header.
    pub fn body_len(&self) -> usize {
        declared_body_len(self.command, self.status)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} id={} status={}",
            self.command, self.message_id, self.status
        )?;
        if !self.values.is_empty() {
            write!(f, " values={:?}", self.values)?;
        }
        Ok(())
    }
}

fn declared_body_len(command: Command, status: u16) -> usize {
    if command.is_hardware() && status > 0 && status < MAX_HARDWARE_BODY {
        usize::from(status)
    } else {
        0
    }
}

/// Split one raw chunk into the frames it contains, in arrival order.
///
/// A trailing fragment shorter than a header is ignored. A hardware frame
/// whose declared body runs past the end of the chunk is still returned,
/// with empty `values`.
pub fn split_responses(chunk: &[u8]) -> Vec<Response> {
    let mut out = Vec::new();
    let mut cursor = 0usize;

    while chunk.len() - cursor >= HEADER_SIZE {
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&chunk[cursor..cursor + HEADER_SIZE]);
        let mut response = Response::from_header(Header::decode(&raw));

        let body_len = response.body_len();
        let body_start = cursor + HEADER_SIZE;
        if body_len > 0 {
            match chunk.get(body_start..body_start + body_len) {
                Some(body) => response.values = decode_body(body),
                None => warn!(
                    command = %response.command,
                    message_id = response.message_id,
                    declared = body_len,
                    available = chunk.len() - body_start,
                    "body underrun, dropping body"
                ),
            }
        }

        out.push(response);
        cursor = body_start.saturating_add(body_len).min(chunk.len());
    }

    if cursor < chunk.len() {
        warn!(
            bytes = chunk.len() - cursor,
            "trailing partial header dropped"
        );
    }

    out
}
