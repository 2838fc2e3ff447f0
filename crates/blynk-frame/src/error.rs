/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The body does not fit the 16-bit length field of the header.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// Fewer bytes are available than the frame declares.
    #[error("truncated frame (expected {expected} bytes, got {available})")]
    Truncated { expected: usize, available: usize },

    /// A pin field could not be parsed as an unsigned integer.
    #[error("invalid pin field: {0:?}")]
    InvalidPin(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
