//! Flag-only sink used for intermediate waiter attempts.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::Sink;

/// Unwind payload used by [`ShadowSink::fail_now`].
///
/// Raised with `resume_unwind`, which skips the panic hook, so an aborted
/// attempt prints nothing.
#[derive(Debug)]
pub struct AttemptAborted;

/// A sink whose mutators only set a flag.
///
/// Messages go to `tracing` at debug level and never reach the outer test.
#[derive(Debug)]
pub struct ShadowSink {
    name: String,
    attempt: u32,
    failed: AtomicBool,
}

impl ShadowSink {
    pub fn new(name: impl Into<String>, attempt: u32) -> Self {
        Self {
            name: name.into(),
            attempt,
            failed: AtomicBool::new(false),
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Sink for ShadowSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, message: &str) {
        debug!(test = %self.name, attempt = self.attempt, "{}", message);
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn fail_now(&self) -> ! {
        self.fail();
        std::panic::resume_unwind(Box::new(AttemptAborted))
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}
