//! Foundational low-level utilities shared across Aria crates.
//!
//! Provides atomic file-write helpers and unix-millisecond time utilities
//! used by breaker cooldowns, dedup retention, session expiry, and handoff
//! timeout calculations.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp_ms, elapsed_ms, is_expired_unix_ms};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn unit_time_utils_monotonic_within_call() {
        let first = current_unix_timestamp_ms();
        let second = current_unix_timestamp_ms();
        assert!(second >= first);
    }

    #[test]
    fn unit_is_expired_unix_ms_respects_none_and_bounds() {
        let now = current_unix_timestamp_ms();
        assert!(!is_expired_unix_ms(None, now));
        assert!(is_expired_unix_ms(Some(now), now));
        assert!(is_expired_unix_ms(Some(now.saturating_sub(1)), now));
        assert!(!is_expired_unix_ms(Some(now.saturating_add(1)), now));
    }

    #[test]
    fn unit_elapsed_ms_saturates_on_clock_skew() {
        assert_eq!(elapsed_ms(10, 25), 15);
        assert_eq!(elapsed_ms(25, 10), 0);
    }

    #[test]
    fn functional_write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state").join("records.json");
        write_text_atomic(&path, "{\"schema_version\":1}").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "{\"schema_version\":1}");
    }

    #[test]
    fn regression_write_text_atomic_rejects_directory_target() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let error = write_text_atomic(tempdir.path(), "oops").expect_err("directory target");
        assert!(error.to_string().contains("is a directory"));
    }
}
