//! Test sink abstraction.
//!
//! Harness code reports failures through a [`Sink`] instead of panicking
//! directly, so the same assertion block can run against the real test
//! ([`TestCase`]) or against a throwaway [`ShadowSink`] inside the waiter.
//!
//! `fail_now`/`fatal` never return. On a [`TestCase`] they fail the test; on a
//! [`ShadowSink`] they abort only the current polling attempt.

mod shadow;
mod test_case;

pub use shadow::{AttemptAborted, ShadowSink};
pub use test_case::TestCase;

use std::fmt;
use std::panic::Location;

/// The surface a test framework exposes to assertion code.
pub trait Sink: Send + Sync {
    /// Marks the caller as a helper. Location attribution in Rust comes from
    /// `#[track_caller]` on [`SinkExt`], so the default is a no-op.
    fn helper(&self) {}

    /// Name of the running test.
    fn name(&self) -> &str;

    /// Record an informational message.
    fn log(&self, message: &str);

    /// Record a failure message and mark the sink failed, continuing execution.
    fn error(&self, message: &str) {
        self.log(message);
        self.fail();
    }

    /// Mark the sink failed without a message.
    fn fail(&self);

    /// Mark the sink failed and stop executing the current assertion block.
    fn fail_now(&self) -> !;

    /// `error` followed by `fail_now`.
    fn fatal(&self, message: &str) -> ! {
        self.error(message);
        self.fail_now()
    }

    /// Whether any failure has been recorded.
    fn failed(&self) -> bool;
}

/// Formatting and require/check helpers available on every [`Sink`].
///
/// `require_*` helpers abort through [`Sink::fatal`]; `check_*` helpers record
/// an error and return whether the check passed.
pub trait SinkExt: Sink {
    fn logf(&self, args: fmt::Arguments<'_>) {
        self.log(&args.to_string());
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.fatal(&args.to_string())
    }

    #[track_caller]
    fn require_ok<T, E: fmt::Display>(&self, result: Result<T, E>, context: &str) -> T {
        let location = Location::caller();
        match result {
            Ok(value) => value,
            Err(e) => self.fatal(&format!("{location}: {context}: {e}")),
        }
    }

    #[track_caller]
    fn require_some<T>(&self, value: Option<T>, context: &str) -> T {
        let location = Location::caller();
        match value {
            Some(value) => value,
            None => self.fatal(&format!("{location}: {context}: value is missing")),
        }
    }

    #[track_caller]
    fn require_true(&self, condition: bool, context: &str) {
        let location = Location::caller();
        if !condition {
            self.fatal(&format!("{location}: {context}"));
        }
    }

    #[track_caller]
    fn require_eq<T: PartialEq + fmt::Debug>(&self, expected: T, actual: T, context: &str) {
        let location = Location::caller();
        if expected != actual {
            self.fatal(&format!(
                "{location}: {context}: expected {expected:?}, got {actual:?}"
            ));
        }
    }

    #[track_caller]
    fn check_true(&self, condition: bool, context: &str) -> bool {
        let location = Location::caller();
        if !condition {
            self.error(&format!("{location}: {context}"));
        }
        condition
    }

    #[track_caller]
    fn check_eq<T: PartialEq + fmt::Debug>(&self, expected: T, actual: T, context: &str) -> bool {
        let location = Location::caller();
        let equal = expected == actual;
        if !equal {
            self.error(&format!(
                "{location}: {context}: expected {expected:?}, got {actual:?}"
            ));
        }
        equal
    }
}

impl<S: Sink + ?Sized> SinkExt for S {}
