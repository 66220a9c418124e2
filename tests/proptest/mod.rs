// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for pds-integration.
//!
//! Uses proptest to generate random inputs and verify invariants.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use proptest::prelude::*;

use pds_integration::metrics::{MatchOp, Selector};
use pds_integration::metrics::promql::escape;
use pds_integration::names::{NAME_PREFIX, generate_name, random_name, random_suffix};
use pds_integration::sink::Sink;
use pds_integration::timing::for_node_count;
use pds_integration::{DataService, eventually};

/// Strategy for Prometheus label names.
fn label_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,15}"
}

/// Strategy for arbitrary label values, including quotes and backslashes.
fn label_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ._-]{0,20}",
        any::<String>(),
        Just(r#"a"b"#.to_string()),
        Just(r"c:\tmp".to_string()),
    ]
}

fn any_op() -> impl Strategy<Value = MatchOp> {
    prop_oneof![
        Just(MatchOp::Equal),
        Just(MatchOp::NotEqual),
        Just(MatchOp::Regex),
        Just(MatchOp::NotRegex),
    ]
}

fn any_data_service() -> impl Strategy<Value = DataService> {
    proptest::sample::select(DataService::ALL.to_vec())
}

/// Undo [`escape`].
fn unescape(escaped: &str) -> String {
    let mut out = String::new();
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether every `"` in `escaped` is preceded by an odd run of backslashes.
fn quotes_are_escaped(escaped: &str) -> bool {
    let mut backslashes = 0;
    for c in escaped.chars() {
        if c == '\\' {
            backslashes += 1;
            continue;
        }
        if c == '"' && backslashes % 2 == 0 {
            return false;
        }
        backslashes = 0;
    }
    true
}

proptest! {
    /// Property: escaping never leaves a bare quote and is reversible.
    #[test]
    fn prop_escape_is_reversible(value in label_value()) {
        let escaped = escape(&value);
        prop_assert!(quotes_are_escaped(&escaped), "bare quote in {escaped:?}");
        prop_assert!(!escaped.contains('\n'));
        prop_assert_eq!(unescape(&escaped), value);
    }

    /// Property: a selector renders its metric followed by every matcher in
    /// insertion order.
    #[test]
    fn prop_selector_renders_all_matchers(
        metric in "[a-z_][a-z0-9_]{0,20}",
        matchers in prop::collection::vec((label_name(), any_op(), label_value()), 0..5),
    ) {
        let mut selector = Selector::new(metric.clone());
        for (name, op, value) in &matchers {
            selector = selector.with(name.clone(), *op, value.clone());
        }
        let rendered = selector.to_string();

        prop_assert!(rendered.starts_with(&metric));
        if matchers.is_empty() {
            prop_assert_eq!(rendered, metric);
        } else {
            let closes_with_brace = rendered.ends_with('}');
            prop_assert!(closes_with_brace);
            let mut rest = rendered.as_str();
            for (name, op, value) in &matchers {
                let fragment = format!("{name}{}\"{}\"", op.as_str(), escape(value));
                let at = rest.find(&fragment);
                prop_assert!(at.is_some(), "{fragment} missing from {rendered}");
                rest = &rest[at.unwrap() + fragment.len()..];
            }
        }
    }

    /// Property: generated names are valid DNS-1123 labels under the prefix.
    #[test]
    fn prop_random_name_shape(prefix in "[a-z]([a-z0-9-]{0,30}[a-z0-9])?") {
        let name = random_name(&prefix);
        let suffix = &name[prefix.len() + 1..];
        let expected_start = format!("{prefix}-");
        prop_assert!(name.starts_with(&expected_start));
        prop_assert_eq!(suffix.len(), 8);
        prop_assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        prop_assert!(name.len() <= 63);
    }

    /// Property: suffixes have the requested length up to 32 characters.
    #[test]
    fn prop_random_suffix_length(len in 0usize..40) {
        prop_assert_eq!(random_suffix(len).len(), len.min(32));
    }

    /// Property: multi-node timeouts never shrink below the base.
    #[test]
    fn prop_node_count_timeout_monotonic(base_secs in 1u64..3600, nodes in 1i32..10) {
        let base = Duration::from_secs(base_secs);
        let scaled = for_node_count(base, nodes);
        prop_assert!(scaled >= base);
        prop_assert!(for_node_count(base, nodes + 1) >= scaled);
    }

    /// Property: data services round-trip through both naming schemes.
    #[test]
    fn prop_data_service_names_round_trip(ds in any_data_service()) {
        prop_assert_eq!(DataService::from_name(&ds.name().to_uppercase()), Some(ds));
        prop_assert_eq!(DataService::from_name(ds.kind()), Some(ds));
    }
}

#[test]
fn test_generated_names_are_unique() {
    let names: HashSet<String> = (0..1000).map(|_| generate_name()).collect();
    assert_eq!(names.len(), 1000);
    assert!(names.iter().all(|n| n.starts_with(NAME_PREFIX)));
}

/// Outer sink double that records annotations.
#[derive(Default)]
struct Recorder {
    errors: Mutex<Vec<String>>,
    failed: AtomicBool,
}

impl Sink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn log(&self, _message: &str) {}

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
        self.fail();
    }

    fn fail(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    fn fail_now(&self) -> ! {
        self.fail();
        std::panic::resume_unwind(Box::new("recorder fail_now"))
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

fn run_paused<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a predicate that passes on attempt `k` within the deadline
    /// runs exactly `k` times and leaves the outer sink clean.
    #[test]
    fn prop_waiter_passes_on_kth_attempt(k in 1u32..20) {
        let period = Duration::from_secs(1);
        let timeout = Duration::from_secs(60);
        let outer = Recorder::default();
        let mut calls = 0u32;
        run_paused(eventually(&outer, timeout, period, async |t: &dyn Sink| {
            calls += 1;
            if calls < k {
                t.error("not yet");
            }
        }));
        prop_assert_eq!(calls, k);
        prop_assert!(!outer.failed());
        prop_assert!(outer.errors.lock().unwrap().is_empty());
    }

    /// Property: a predicate that never passes records exactly one failure on
    /// the outer sink, whatever the timeout.
    #[test]
    fn prop_waiter_never_passing_fails_once(timeout_secs in 1u64..120, period_secs in 1u64..10) {
        let outer = Recorder::default();
        run_paused(eventually(
            &outer,
            Duration::from_secs(timeout_secs),
            Duration::from_secs(period_secs),
            async |t: &dyn Sink| {
                t.error("never");
            },
        ));
        prop_assert!(outer.failed());
        prop_assert_eq!(outer.errors.lock().unwrap().clone(), vec!["never".to_string()]);
    }
}
