//! Command tags.
//!
//! The first header byte selects how the rest of the frame is interpreted.
//! Only the tags below are understood; anything else decodes to
//! [`Command::Unknown`] so newer brokers do not break older clients.

use std::fmt;

/// Reply to a previously sent request. The length field carries a status code.
pub const RESPONSE: u8 = 0;

/// Application login.
pub const LOGIN: u8 = 2;

/// Heartbeat request.
pub const PING: u8 = 6;

/// Publish a tweet through the broker.
pub const TWEET: u8 = 12;

/// Send an email through the broker.
pub const EMAIL: u8 = 13;

/// Push notification to the owner's devices.
pub const NOTIFY: u8 = 14;

/// Pin read requests and their replies.
pub const HARDWARE_SYNC: u8 = 16;

/// Capability / version announcement sent after login.
pub const INTERNAL: u8 = 17;

/// Pin writes and broker-initiated pin requests.
pub const HARDWARE: u8 = 20;

/// Device login with an access token.
pub const HARDWARE_LOGIN: u8 = 29;

/// A decoded command tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Response,
    Login,
    Ping,
    Tweet,
    Email,
    Notify,
    HardwareSync,
    Internal,
    Hardware,
    HardwareLogin,
    /// A tag this client does not know about.
    Unknown(u8),
}

impl Command {
    /// Map a raw tag byte to a command.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            RESPONSE => Self::Response,
            LOGIN => Self::Login,
            PING => Self::Ping,
            TWEET => Self::Tweet,
            EMAIL => Self::Email,
            NOTIFY => Self::Notify,
            HARDWARE_SYNC => Self::HardwareSync,
            INTERNAL => Self::Internal,
            HARDWARE => Self::Hardware,
            HARDWARE_LOGIN => Self::HardwareLogin,
            other => Self::Unknown(other),
        }
    }

    /// The raw tag byte written on the wire.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Response => RESPONSE,
            Self::Login => LOGIN,
            Self::Ping => PING,
            Self::Tweet => TWEET,
            Self::Email => EMAIL,
            Self::Notify => NOTIFY,
            Self::HardwareSync => HARDWARE_SYNC,
            Self::Internal => INTERNAL,
            Self::Hardware => HARDWARE,
            Self::HardwareLogin => HARDWARE_LOGIN,
            Self::Unknown(tag) => tag,
        }
    }

    /// Returns a human-readable name for the command.
    pub fn name(self) -> &'static str {
        match self {
            Self::Response => "RESPONSE",
            Self::Login => "LOGIN",
            Self::Ping => "PING",
            Self::Tweet => "TWEET",
            Self::Email => "EMAIL",
            Self::Notify => "NOTIFY",
            Self::HardwareSync => "HARDWARE_SYNC",
            Self::Internal => "INTERNAL",
            Self::Hardware => "HARDWARE",
            Self::HardwareLogin => "HARDWARE_LOGIN",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Returns true for the device-facing read/write commands whose inbound
    /// frames carry a body.
    pub fn is_hardware(self) -> bool {
        matches!(self, Self::Hardware | Self::HardwareSync)
    }
}

impl From<u8> for Command {
    fn from(tag: u8) -> Self {
        Self::from_u8(tag)
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.as_u8()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => write!(f, "UNKNOWN({tag})"),
            known => f.write_str(known.name()),
        }
    }
}
