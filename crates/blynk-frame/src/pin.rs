//! Virtual and digital pin sub-protocol carried inside hardware bodies.
//!
//! The first body field names the operation, the second the pin number,
//! and any further fields are the value.

use crate::codec::Body;
use crate::error::{FrameError, Result};

/// Virtual pin write.
pub const VIRTUAL_WRITE: &str = "vw";
/// Virtual pin read request.
pub const VIRTUAL_READ: &str = "vr";
/// Digital pin write.
pub const DIGITAL_WRITE: &str = "dw";
/// Digital pin read request.
pub const DIGITAL_READ: &str = "dr";

/// `vw <pin> <value>`
pub fn virtual_write(pin: u32, value: &str) -> Body {
    let mut body = Body::new();
    body.push_str(VIRTUAL_WRITE)
        .push_int(i64::from(pin))
        .push_str(value);
    body
}

/// `vr <pin> [<pin>...]`
pub fn virtual_read(pins: &[u32]) -> Body {
    let mut body = Body::new();
    body.push_str(VIRTUAL_READ);
    for pin in pins {
        body.push_int(i64::from(*pin));
    }
    body
}

/// `dw <pin> 1|0`
pub fn digital_write(pin: u32, high: bool) -> Body {
    let mut body = Body::new();
    body.push_str(DIGITAL_WRITE)
        .push_int(i64::from(pin))
        .push_bool(high);
    body
}

/// `dr <pin>`
pub fn digital_read(pin: u32) -> Body {
    let mut body = Body::new();
    body.push_str(DIGITAL_READ).push_int(i64::from(pin));
    body
}

/// A broker-initiated pin operation decoded from hardware body fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinRequest {
    /// The broker wants the current value of these virtual pins.
    VirtualRead { pins: Vec<u32> },
    /// The broker delivers a value for a virtual pin.
    VirtualWrite { pin: u32, value: String },
}

impl PinRequest {
    /// Parse body fields into a pin request.
    ///
    /// Returns `Ok(None)` when the first field is not a virtual pin
    /// operation. Multi-field values are rejoined with 0x00.
    pub fn parse(values: &[String]) -> Result<Option<Self>> {
        let Some((op, rest)) = values.split_first() else {
            return Ok(None);
        };

        match op.as_str() {
            VIRTUAL_READ => {
                if rest.is_empty() {
                    return Err(FrameError::InvalidPin(String::new()));
                }
                let pins = rest
                    .iter()
                    .map(|field| parse_pin(field))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Self::VirtualRead { pins }))
            }
            VIRTUAL_WRITE => {
                let (pin, value) = match rest.split_first() {
                    Some((pin, value)) => (parse_pin(pin)?, value.join("\0")),
                    None => return Err(FrameError::InvalidPin(String::new())),
                };
                Ok(Some(Self::VirtualWrite { pin, value }))
            }
            _ => Ok(None),
        }
    }
}

fn parse_pin(field: &str) -> Result<u32> {
    field
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidPin(field.to_string()))
}
