//! Cooperative cancellation.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error raised at a cancellation checkpoint once the token has been triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled;

impl Error for Cancelled {}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cancelled")
    }
}

/// Cancellation flag shared between the sort and an external trigger.
///
/// The flag is observed cooperatively: the sort calls [`check`](Self::check) before each
/// unit of output work and unwinds with [`Cancelled`] once the flag is set. Cloning the
/// token yields another handle to the same flag, so one clone can live in a signal
/// handler while the engine polls the other.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the untriggered state.
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Requests cancellation.
    ///
    /// Idempotent. Does not allocate or block, so it is safe to call from a signal
    /// handler thread.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Checkpoint: fails with [`Cancelled`] once the token has been triggered.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_triggered() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
