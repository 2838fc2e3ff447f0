use std::sync::{Mutex, PoisonError};

/// Thread-safe message identifier generator.
///
/// Identifiers start at 1 and wrap from `0xFFFF` back to 1; 0 is never
/// handed out.
#[derive(Debug, Default)]
pub struct MessageIdSequencer {
    current: Mutex<u16>,
}

impl MessageIdSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting after `last`, so the first `next()` returns `last + 1`.
    pub fn starting_after(last: u16) -> Self {
        Self {
            current: Mutex::new(last),
        }
    }

    /// Advance the counter and return the new identifier.
    pub fn next(&self) -> u16 {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = match current.checked_add(1) {
            Some(id) => id,
            None => 1,
        };
        *current
    }

    /// The most recently issued identifier (0 before the first call).
    pub fn current(&self) -> u16 {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
