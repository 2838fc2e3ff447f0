use bytes::{BufMut, Bytes, BytesMut};

use crate::command::Command;
use crate::error::{FrameError, Result};
use crate::sequencer::MessageIdSequencer;

/// Frame header: command (1) + message id (2) + length or status (2) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Separator between body fields.
pub const FIELD_SEPARATOR: u8 = 0x00;

/// Largest body the 16-bit length field can describe.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Fixed 5-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: Command,
    pub message_id: u16,
    /// Body length on outbound frames, status code on inbound responses.
    pub length_or_status: u16,
}

impl Header {
    pub fn new(command: Command, message_id: u16, length_or_status: u16) -> Self {
        Self {
            command,
            message_id,
            length_or_status,
        }
    }

    /// Append the big-endian header to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u8(self.command.as_u8());
        dst.put_u16(self.message_id);
        dst.put_u16(self.length_or_status);
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let id = self.message_id.to_be_bytes();
        let len = self.length_or_status.to_be_bytes();
        [self.command.as_u8(), id[0], id[1], len[0], len[1]]
    }

    /// Decode a header from exactly five bytes.
    pub fn decode(src: &[u8; HEADER_SIZE]) -> Self {
        Self {
            command: Command::from_u8(src[0]),
            message_id: u16::from_be_bytes([src[1], src[2]]),
            length_or_status: u16::from_be_bytes([src[3], src[4]]),
        }
    }

    /// Decode a header from the front of `src`.
    pub fn parse(src: &[u8]) -> Result<Self> {
        match src.get(..HEADER_SIZE) {
            Some(head) => {
                let mut raw = [0u8; HEADER_SIZE];
                raw.copy_from_slice(head);
                Ok(Self::decode(&raw))
            }
            None => Err(FrameError::Truncated {
                expected: HEADER_SIZE,
                available: src.len(),
            }),
        }
    }
}

/// Frame body built from 0x00-separated fields.
///
/// No separator precedes the first field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    buf: BytesMut,
    fields: usize,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a body from a sequence of fields.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut body = Self::new();
        for field in fields {
            body.push_bytes(field.as_ref());
        }
        body
    }

    pub fn push_bytes(&mut self, field: &[u8]) -> &mut Self {
        if self.fields > 0 {
            self.buf.put_u8(FIELD_SEPARATOR);
        }
        self.buf.put_slice(field);
        self.fields += 1;
        self
    }

    pub fn push_str(&mut self, field: &str) -> &mut Self {
        self.push_bytes(field.as_bytes())
    }

    pub fn push_int(&mut self, value: i64) -> &mut Self {
        self.push_str(&value.to_string())
    }

    /// Push each integer as its own field.
    pub fn push_ints(&mut self, values: &[i64]) -> &mut Self {
        for value in values {
            self.push_int(*value);
        }
        self
    }

    /// Booleans travel as ASCII `"1"` / `"0"`.
    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.push_str(if value { "1" } else { "0" })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of fields pushed so far.
    pub fn field_count(&self) -> usize {
        self.fields
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Header plus body: the only unit written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub body: Bytes,
}

impl Message {
    /// Create a request message; the header length is the body length.
    pub fn new(command: Command, message_id: u16, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        let length = body_length(body.len())?;
        Ok(Self {
            header: Header::new(command, message_id, length),
            body,
        })
    }

    /// Create a body-less response carrying `status` in the length field.
    pub fn response(message_id: u16, status: u16) -> Self {
        Self {
            header: Header::new(Command::Response, message_id, status),
            body: Bytes::new(),
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        self.header.encode(dst);
        dst.put_slice(&self.body);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// The total wire size of this message (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

/// Encode a request frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────┬────────────┬──────────────┬──────────────────┐
/// │ Command   │ Message id │ Length       │ Body             │
/// │ (1B)      │ (2B BE)    │ (2B BE)      │ (Length bytes)   │
/// └───────────┴────────────┴──────────────┴──────────────────┘
/// ```
pub fn encode_message(
    command: Command,
    message_id: u16,
    body: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = body_length(body.len())?;
    dst.reserve(HEADER_SIZE + body.len());
    Header::new(command, message_id, length).encode(dst);
    dst.put_slice(body);
    Ok(())
}

/// Encode a request frame stamped with the next identifier from `ids`.
///
/// Returns the identifier used.
pub fn encode(
    command: Command,
    body: &[u8],
    ids: &MessageIdSequencer,
    dst: &mut BytesMut,
) -> Result<u16> {
    body_length(body.len())?;
    let message_id = ids.next();
    encode_message(command, message_id, body, dst)?;
    Ok(message_id)
}

/// Split a body on 0x00 into its fields.
///
/// An empty body yields a single empty field. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn decode_body(src: &[u8]) -> Vec<String> {
    src.split(|byte| *byte == FIELD_SEPARATOR)
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn body_length(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| FrameError::BodyTooLarge {
        size: len,
        max: MAX_BODY_LEN,
    })
}
