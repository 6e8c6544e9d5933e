#![deny(missing_docs)]
//! Shared logging utilities for the preload workspace.
//!
//! This crate provides the `preload_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every line is prefixed
//! with the sequence number of the inbound event the coordinator is handling,
//! so log output from the engine threads can be lined up with state transitions.

use std::sync::atomic::{AtomicU64, Ordering};

#[doc(hidden)]
pub use log;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sets the sequence number of the inbound event currently being handled.
/// This should be called by the coordinator loop once per dequeued message.
pub fn set_event_seq(seq: u64) {
    EVENT_SEQ.store(seq, Ordering::Relaxed);
}

/// Retrieves the sequence number of the inbound event currently being handled.
/// Returns 0 before the first event has been dequeued.
pub fn event_seq() -> u64 {
    EVENT_SEQ.load(Ordering::Relaxed)
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! preload_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[#{}] {}", $crate::event_seq(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! preload_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[#{}] {}", $crate::event_seq(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! preload_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[#{}] {}", $crate::event_seq(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! preload_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[#{}] {}", $crate::event_seq(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! preload_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[#{}] {}", $crate::event_seq(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_seq_round_trips() {
        set_event_seq(42);
        assert_eq!(event_seq(), 42);
        preload_debug!("seq is {}", event_seq());
        set_event_seq(0);
    }
}
