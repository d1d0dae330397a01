//! Backpressure gate — per-source admission control.
//!
//! Two rules: never two overlapping attempts against the same source, and
//! after failures, wait out an exponential backoff window before retrying.
//! `record_start`/`record_complete` must bracket every executor call as a
//! matched pair; a missed complete leaves the source unreachable forever.
//!
//! Backoff reads the source's persisted health fields, so it survives
//! restarts; only the in-flight counter is process-local.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use clipwatch_core::types::{RunStatus, Source};

/// Why a source was denied admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// An attempt against this source is already in flight.
    InFlight,
    /// Inside the exponential backoff window after failures.
    Backoff { retry_at: DateTime<Utc> },
}

/// Admission decision for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(DenyReason),
}

impl Admission {
    pub fn allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Per-source admission control: in-flight serialization + failure backoff.
pub struct BackpressureGate {
    base: Duration,
    max: Duration,
    in_flight: Mutex<HashMap<String, u32>>,
}

impl BackpressureGate {
    /// `base_secs` is the delay after the first failure; the window doubles
    /// per consecutive failure up to `max_secs`.
    pub fn new(base_secs: u64, max_secs: u64) -> Self {
        Self {
            base: Duration::seconds(base_secs as i64),
            max: Duration::seconds(max_secs as i64),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether `source` may start a new attempt at `now`.
    pub fn can_start(&self, source: &Source, now: DateTime<Utc>) -> Admission {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap()
            .get(&source.id)
            .copied()
            .unwrap_or(0);
        if in_flight >= 1 {
            return Admission::Denied(DenyReason::InFlight);
        }

        if source.consecutive_failures > 0 && source.last_status == Some(RunStatus::Failed) {
            if let Some(last_failure) = source.last_run_at {
                let retry_at = last_failure + self.backoff_window(source.consecutive_failures);
                if now < retry_at {
                    return Admission::Denied(DenyReason::Backoff { retry_at });
                }
            }
        }
        Admission::Allowed
    }

    /// `min(base * 2^failures, max)`.
    fn backoff_window(&self, failures: u32) -> Duration {
        let shift = failures.min(16);
        let window = self.base * 2i32.pow(shift);
        window.min(self.max)
    }

    /// Mark an attempt started. Must be paired with [`record_complete`]
    /// on every path, including executor errors.
    ///
    /// [`record_complete`]: BackpressureGate::record_complete
    pub fn record_start(&self, source_id: &str) {
        *self
            .in_flight
            .lock()
            .unwrap()
            .entry(source_id.to_string())
            .or_insert(0) += 1;
    }

    /// Mark an attempt finished, freeing the source's slot.
    pub fn record_complete(&self, source_id: &str) {
        let mut in_flight = self.in_flight.lock().unwrap();
        if let Some(count) = in_flight.get_mut(source_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(source_id);
            }
        }
    }
}
