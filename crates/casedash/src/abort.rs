//! Cancellation flags shared between a requester and in-flight work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owner side of a cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    flag: Arc<AtomicBool>,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal to hand to the work being started.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Request cancellation.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Read side of a cancellation flag.
///
/// The default signal is never aborted.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
