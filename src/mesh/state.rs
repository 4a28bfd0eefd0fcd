//! Read-only mode state for version-consistency safety.
//!
//! This module provides a type-safe wrapper around the atomic flags tracking
//! cluster read-only status. Read-only mode is entered when any connected
//! peer's version comparison key differs from the local node's, and all
//! mutating operations are rejected until every remaining peer agrees again.
//!
//! # Safety Properties
//!
//! 1. **Atomic transitions**: All state changes use `SeqCst` ordering for
//!    visibility, and the hot-path read is a single atomic load.
//! 2. **Edge-triggered**: `enter`/`exit` report whether this call performed
//!    the transition, so callers emit exactly one event per flip.
//! 3. **Metrics integration**: Transitions and episode durations are recorded
//!    automatically.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metrics;

/// Type-safe wrapper for the cluster read-only flag.
#[derive(Debug)]
pub struct ReadOnlyState {
    /// Whether the cluster is currently read-only.
    active: AtomicBool,
    /// Timestamp (epoch millis) when read-only mode was entered.
    entered_at_millis: AtomicU64,
}

impl Default for ReadOnlyState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyState {
    /// Create a new state (read-write).
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            entered_at_millis: AtomicU64::new(0),
        }
    }

    /// Check if the cluster is currently read-only.
    ///
    /// A cheap atomic load with `SeqCst` ordering; intended for hot paths
    /// gating every write request.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Get the timestamp (epoch millis) when read-only mode was entered.
    ///
    /// Returns 0 when read-write.
    pub fn entered_at(&self) -> u64 {
        self.entered_at_millis.load(Ordering::SeqCst)
    }

    /// Enter read-only mode.
    ///
    /// # Returns
    ///
    /// `true` if this call transitioned into read-only mode (first entry),
    /// `false` if already read-only.
    pub fn enter(&self) -> bool {
        // swap returns the previous value; if it was false, we just entered
        if !self.active.swap(true, Ordering::SeqCst) {
            let now_millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            self.entered_at_millis.store(now_millis, Ordering::SeqCst);
            metrics::enter_read_only();
            true
        } else {
            false
        }
    }

    /// Exit read-only mode.
    ///
    /// # Arguments
    ///
    /// * `exit_reason` - Reason label for metrics ("versions_aligned",
    ///   "manual", "shutdown")
    ///
    /// # Returns
    ///
    /// `true` if this call transitioned out of read-only mode,
    /// `false` if already read-write.
    pub fn exit(&self, exit_reason: &str) -> bool {
        if self.active.swap(false, Ordering::SeqCst) {
            let entered_at = self.entered_at_millis.swap(0, Ordering::SeqCst);
            let duration_secs = if entered_at > 0 {
                let now_millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                (now_millis.saturating_sub(entered_at)) as f64 / 1000.0
            } else {
                0.0
            };
            metrics::exit_read_only(duration_secs, exit_reason);
            true
        } else {
            false
        }
    }

    /// Set the flag to `read_only`, reporting whether a transition happened.
    ///
    /// Convenience for recompute paths that derive the target state and only
    /// want to know whether to emit a transition event.
    pub fn transition_to(&self, read_only: bool, exit_reason: &str) -> bool {
        if read_only {
            self.enter()
        } else {
            self.exit(exit_reason)
        }
    }
}
