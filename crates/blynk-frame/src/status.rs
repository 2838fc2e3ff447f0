//! Status codes carried in the length field of response frames.

use std::fmt;

pub const SUCCESS: u16 = 200;
pub const ILLEGAL_COMMAND: u16 = 2;
pub const NOT_REGISTERED: u16 = 3;
pub const NOT_AUTHENTICATED: u16 = 5;
pub const NOT_ALLOWED: u16 = 6;
pub const NO_ACTIVE_TARGET: u16 = 8;
pub const INVALID_TOKEN: u16 = 9;
pub const NOTIFY_INVALID_BODY: u16 = 13;
pub const NOTIFY_NOT_AUTHORIZED: u16 = 14;
pub const NOTIFY_EXCEPTION: u16 = 15;

/// A decoded response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    IllegalCommand,
    NotRegistered,
    NotAuthenticated,
    NotAllowed,
    NoActiveTarget,
    InvalidToken,
    NotifyInvalidBody,
    NotifyNotAuthorized,
    NotifyException,
    /// A code with no known meaning.
    Undefined(u16),
}

impl Status {
    pub fn from_code(code: u16) -> Self {
        match code {
            SUCCESS => Self::Success,
            ILLEGAL_COMMAND => Self::IllegalCommand,
            NOT_REGISTERED => Self::NotRegistered,
            NOT_AUTHENTICATED => Self::NotAuthenticated,
            NOT_ALLOWED => Self::NotAllowed,
            NO_ACTIVE_TARGET => Self::NoActiveTarget,
            INVALID_TOKEN => Self::InvalidToken,
            NOTIFY_INVALID_BODY => Self::NotifyInvalidBody,
            NOTIFY_NOT_AUTHORIZED => Self::NotifyNotAuthorized,
            NOTIFY_EXCEPTION => Self::NotifyException,
            other => Self::Undefined(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Success => SUCCESS,
            Self::IllegalCommand => ILLEGAL_COMMAND,
            Self::NotRegistered => NOT_REGISTERED,
            Self::NotAuthenticated => NOT_AUTHENTICATED,
            Self::NotAllowed => NOT_ALLOWED,
            Self::NoActiveTarget => NO_ACTIVE_TARGET,
            Self::InvalidToken => INVALID_TOKEN,
            Self::NotifyInvalidBody => NOTIFY_INVALID_BODY,
            Self::NotifyNotAuthorized => NOTIFY_NOT_AUTHORIZED,
            Self::NotifyException => NOTIFY_EXCEPTION,
            Self::Undefined(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Human-readable category used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::IllegalCommand => "illegal command",
            Self::NotRegistered => "not registered",
            Self::NotAuthenticated => "not authenticated",
            Self::NotAllowed => "not allowed",
            Self::NoActiveTarget => "no active target",
            Self::InvalidToken => "invalid token",
            Self::NotifyInvalidBody => "notify invalid body",
            Self::NotifyNotAuthorized => "notify not authorized",
            Self::NotifyException => "notify exception",
            Self::Undefined(_) => "undefined",
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Returns the human-readable category for a raw status code.
pub fn status_name(code: u16) -> &'static str {
    Status::from_code(code).name()
}
