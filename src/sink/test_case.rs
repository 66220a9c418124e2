//! Outer sink for one test, with a LIFO cleanup registry.
//!
//! IMPORTANT: tests holding a `TestCase` must use
//! `#[tokio::test(flavor = "multi_thread")]` so that `Drop` can run async
//! cleanups via `block_in_place`. Call [`TestCase::finish`] to run them
//! explicitly instead.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info, warn};

use super::Sink;

struct Cleanup {
    description: String,
    task: BoxFuture<'static, ()>,
}

/// The real sink of a running test.
///
/// Failures are logged through `tracing` and collected. `fail_now` panics with
/// the collected summary, which fails the libtest test. Registered cleanups run
/// newest-first when the test finishes, including after a fatal assertion.
pub struct TestCase {
    name: String,
    failed: AtomicBool,
    failures: Mutex<Vec<String>>,
    cleanups: Mutex<Vec<Cleanup>>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!(test = %name, "Starting test");
        Self {
            name,
            failed: AtomicBool::new(false),
            failures: Mutex::new(Vec::new()),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    /// Create a test case named after the current libtest thread.
    pub fn current() -> Self {
        let name = std::thread::current()
            .name()
            .unwrap_or("unnamed-test")
            .to_string();
        Self::new(name)
    }

    /// Register a cleanup task. Cleanups run in reverse registration order and
    /// must tolerate state that is already gone.
    pub fn cleanup<F>(&self, description: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let description = description.into();
        debug!(test = %self.name, cleanup = %description, "Registered cleanup");
        self.cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Cleanup {
                description,
                task: task.boxed(),
            });
    }

    /// Number of cleanups not yet run.
    pub fn pending_cleanups(&self) -> usize {
        self.cleanups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run all registered cleanups now, newest first.
    pub async fn finish(&self) {
        let cleanups = std::mem::take(
            &mut *self.cleanups.lock().unwrap_or_else(PoisonError::into_inner),
        );
        run_cleanups(&self.name, cleanups).await;
    }

    /// Messages recorded by `error`/`fatal` so far.
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn summary(&self) -> String {
        let failures = self.failures();
        if failures.is_empty() {
            format!("test {} failed", self.name)
        } else {
            format!("test {} failed:\n  {}", self.name, failures.join("\n  "))
        }
    }
}

async fn run_cleanups(test: &str, mut cleanups: Vec<Cleanup>) {
    while let Some(cleanup) = cleanups.pop() {
        debug!(test = %test, cleanup = %cleanup.description, "Running cleanup");
        if AssertUnwindSafe(cleanup.task).catch_unwind().await.is_err() {
            warn!(test = %test, cleanup = %cleanup.description, "Cleanup panicked");
        }
    }
}

impl Sink for TestCase {
    fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, message: &str) {
        info!(test = %self.name, "{}", message);
    }

    fn error(&self, message: &str) {
        error!(test = %self.name, "{}", message);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        self.fail();
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    #[allow(clippy::panic)]
    fn fail_now(&self) -> ! {
        self.fail();
        panic!("{}", self.summary())
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Runs pending cleanups and reports non-fatal failures.
///
/// Uses `block_in_place`, which requires the multi-threaded runtime.
impl Drop for TestCase {
    #[allow(clippy::panic)]
    fn drop(&mut self) {
        let cleanups = std::mem::take(
            &mut *self.cleanups.lock().unwrap_or_else(PoisonError::into_inner),
        );

        if !cleanups.is_empty() {
            match Handle::try_current() {
                Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                    let name = self.name.clone();
                    tokio::task::block_in_place(|| {
                        handle.block_on(run_cleanups(&name, cleanups));
                    });
                }
                _ => {
                    warn!(
                        test = %self.name,
                        count = cleanups.len(),
                        "Cannot run cleanups outside a multi-threaded runtime; call finish()"
                    );
                }
            }
        }

        if self.failed() && !std::thread::panicking() {
            panic!("{}", self.summary());
        }
    }
}
