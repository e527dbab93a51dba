//! Sliding-window admission control for batch processing.
//!
//! Each session context owns one limiter; there is no cross-session state.
//! The check-then-push sequence runs under the limiter's own mutex, so two
//! tasks sharing a context cannot both slip through the last slot.

use crate::error::{PipelineError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default admissions allowed per window.
pub const DEFAULT_QUOTA: usize = 10;

/// Default trailing window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter over admission instants.
pub struct SlidingWindowLimiter {
    quota: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(quota: usize, window: Duration) -> Self {
        Self {
            quota,
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Try to admit one operation now.
    ///
    /// Prunes admissions older than the trailing window, then admits only if
    /// fewer than `quota` remain. A denied call does not mutate the window.
    pub fn try_admit(&self) -> Result<bool> {
        self.try_admit_at(Instant::now())
    }

    /// Clock-injected variant of [`try_admit`](Self::try_admit).
    pub fn try_admit_at(&self, now: Instant) -> Result<bool> {
        let mut admissions = self
            .admissions
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("rate limiter mutex poisoned: {}", e)))?;

        while let Some(&oldest) = admissions.front() {
            if now.duration_since(oldest) > self.window {
                admissions.pop_front();
            } else {
                break;
            }
        }

        if admissions.len() < self.quota {
            admissions.push_back(now);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Admissions currently inside the window (after pruning).
    pub fn in_flight(&self) -> Result<usize> {
        self.in_flight_at(Instant::now())
    }

    fn in_flight_at(&self, now: Instant) -> Result<usize> {
        let admissions = self
            .admissions
            .lock()
            .map_err(|e| PipelineError::LockPoisoned(format!("rate limiter mutex poisoned: {}", e)))?;
        Ok(admissions
            .iter()
            .filter(|&&t| now.duration_since(t) <= self.window)
            .count())
    }

    pub fn quota(&self) -> usize {
        self.quota
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_exhaustion_denies_eleventh() {
        let limiter = SlidingWindowLimiter::default();
        let start = Instant::now();

        for i in 0..10 {
            let t = start + Duration::from_millis(i * 100);
            assert!(limiter.try_admit_at(t).unwrap(), "admission {} should pass", i);
        }
        // All ten admissions landed within one second.
        assert!(!limiter.try_admit_at(start + Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_denied_call_does_not_mutate_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.try_admit_at(start).unwrap());
        assert!(!limiter.try_admit_at(start + Duration::from_secs(1)).unwrap());
        assert_eq!(limiter.in_flight_at(start + Duration::from_secs(2)).unwrap(), 1);
    }

    #[test]
    fn test_window_expiry_readmits() {
        let limiter = SlidingWindowLimiter::default();
        let start = Instant::now();

        for _ in 0..10 {
            assert!(limiter.try_admit_at(start).unwrap());
        }
        assert!(!limiter.try_admit_at(start + Duration::from_secs(30)).unwrap());
        // 61 seconds after the first admission the window has drained.
        assert!(limiter.try_admit_at(start + Duration::from_secs(61)).unwrap());
    }

    #[test]
    fn test_partial_expiry() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.try_admit_at(start).unwrap());
        assert!(limiter.try_admit_at(start + Duration::from_secs(30)).unwrap());
        assert!(!limiter.try_admit_at(start + Duration::from_secs(45)).unwrap());
        // First admission ages out, second is still inside the window.
        assert!(limiter.try_admit_at(start + Duration::from_secs(61)).unwrap());
        assert!(!limiter.try_admit_at(start + Duration::from_secs(62)).unwrap());
    }

    #[test]
    fn test_zero_quota_denies_everything() {
        let limiter = SlidingWindowLimiter::new(0, Duration::from_secs(60));
        assert!(!limiter.try_admit().unwrap());
    }
}
