//! Batch run guard — at most one concurrent execution per logical job.
//!
//! A concurrent invocation that finds the flag set returns immediately with
//! nothing done ("skip", never "wait"). The permit clears the flag on drop,
//! so release happens on every exit path including panics.
//!
//! In-process only: two clipwatch processes can still overlap the same job.
//! Claim atomicity in the store keeps that safe; a distributed lease would
//! be needed to prevent the duplicate crawl work itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clipwatch_core::types::Tier;

/// Identifies one logical job for reentrancy purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKey {
    /// One cadence tier's crawl cycle.
    Tier(Tier),
    /// The claim/analysis cycle.
    Claim,
    /// The expiration sweep.
    Sweep,
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKey::Tier(tier) => write!(f, "cycle-{tier}"),
            JobKey::Claim => write!(f, "claim"),
            JobKey::Sweep => write!(f, "sweep"),
        }
    }
}

/// Per-job reentrancy flags.
pub struct RunGuard {
    slots: Mutex<HashMap<JobKey, Arc<AtomicBool>>>,
}

/// Proof of exclusive entry; clears the flag when dropped.
pub struct RunPermit {
    flag: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl RunGuard {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Try to enter `key`. `None` means a prior invocation is still running
    /// and the caller must return a zero-valued result immediately.
    pub fn try_acquire(&self, key: JobKey) -> Option<RunPermit> {
        let flag = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key).or_insert_with(|| Arc::new(AtomicBool::new(false))))
        };
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(RunPermit { flag })
        } else {
            None
        }
    }

    /// Whether `key` is currently running.
    pub fn is_held(&self, key: JobKey) -> bool {
        self.slots
            .lock()
            .unwrap()
            .get(&key)
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Snapshot of every known job and whether it is running.
    pub fn status(&self) -> Vec<(JobKey, bool)> {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .map(|(key, flag)| (*key, flag.load(Ordering::Acquire)))
            .collect()
    }
}

impl Default for RunGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_skips() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire(JobKey::Tier(Tier::M15));
        assert!(permit.is_some());
        // Same job: skip.
        assert!(guard.try_acquire(JobKey::Tier(Tier::M15)).is_none());
        // Different job: independent.
        assert!(guard.try_acquire(JobKey::Tier(Tier::M30)).is_some());
        assert!(guard.try_acquire(JobKey::Sweep).is_some());
    }

    #[test]
    fn test_drop_releases() {
        let guard = RunGuard::new();
        {
            let _permit = guard.try_acquire(JobKey::Claim).unwrap();
            assert!(guard.is_held(JobKey::Claim));
        }
        assert!(!guard.is_held(JobKey::Claim));
        assert!(guard.try_acquire(JobKey::Claim).is_some());
    }

    #[test]
    fn test_release_on_panic() {
        let guard = Arc::new(RunGuard::new());
        let inner = Arc::clone(&guard);
        let result = std::panic::catch_unwind(move || {
            let _permit = inner.try_acquire(JobKey::Sweep).unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!guard.is_held(JobKey::Sweep));
    }

    #[test]
    fn test_status_snapshot() {
        let guard = RunGuard::new();
        let _permit = guard.try_acquire(JobKey::Tier(Tier::M5)).unwrap();
        let status = guard.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0], (JobKey::Tier(Tier::M5), true));
    }
}
