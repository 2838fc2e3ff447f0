//! Command-tagged, length-delimited framing for the Blynk hardware protocol.
//!
//! Every message is framed with a 5-byte big-endian header:
//! - A 1-byte command tag
//! - A 2-byte message identifier
//! - A 2-byte body length (outbound) or status code (inbound responses)
//!
//! Bodies are UTF-8 fields joined by a single 0x00 byte.

pub mod codec;
pub mod command;
pub mod error;
pub mod pin;
pub mod response;
pub mod sequencer;
pub mod status;

pub use codec::{
    decode_body, encode, encode_message, Body, Header, Message, FIELD_SEPARATOR, HEADER_SIZE,
    MAX_BODY_LEN,
};
pub use command::Command;
pub use error::{FrameError, Result};
pub use pin::PinRequest;
pub use response::{split_responses, Response, MAX_HARDWARE_BODY};
pub use sequencer::MessageIdSequencer;
pub use status::{status_name, Status};
