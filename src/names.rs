//! Random resource names.
//!
//! Names draw from `uuid` v4, which is backed by the OS random source and safe
//! to use from parallel tests.

use uuid::Uuid;

/// Prefix of every name the harness generates.
pub const NAME_PREFIX: &str = "integration-test";

/// Random lowercase alphanumeric suffix of `len` characters (at most 32).
pub fn random_suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string().chars().take(len).collect()
}

/// `{prefix}-{8 random chars}`, valid as a Kubernetes DNS-1123 label when the
/// prefix is.
pub fn random_name(prefix: &str) -> String {
    format!("{}-{}", prefix, random_suffix(8))
}

/// `integration-test-{8 random chars}`.
pub fn generate_name() -> String {
    random_name(NAME_PREFIX)
}
