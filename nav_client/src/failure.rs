//! Consecutive-failure bookkeeping for one client (or one explicitly shared
//! group of clients).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Failures 1..=this each get their own warning line.
pub const INDIVIDUAL_WARNING_LIMIT: u32 = 3;

/// Streak length at which the client announces degraded mode.
pub const DEGRADED_MODE_THRESHOLD: u32 = INDIVIDUAL_WARNING_LIMIT + 1;

/// Counter of back-to-back failed round trips.
///
/// A client owns its own state by default. Call sites that want one breaker
/// for several clients wrap a single instance in an `Arc` and inject it.
#[derive(Debug, Default)]
pub struct FailureState {
    consecutive: AtomicU32,
    degraded_announced: AtomicBool,
}

/// What the physics-step path should log for a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureNotice {
    Individual { consecutive: u32 },
    EnteringDegradedMode { consecutive: u32 },
    Suppressed,
}

impl FailureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive.load(Ordering::Acquire)
    }

    pub fn is_available(&self) -> bool {
        self.consecutive_failures() == 0
    }

    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures() >= DEGRADED_MODE_THRESHOLD
    }

    /// Reset the streak. Returns the length of the streak that just ended.
    pub fn record_success(&self) -> u32 {
        self.degraded_announced.store(false, Ordering::Release);
        self.consecutive.swap(0, Ordering::AcqRel)
    }

    /// Extend the streak. Returns the new streak length.
    pub fn record_failure(&self) -> u32 {
        self.consecutive
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }

    /// Decide how loudly to report a physics-step transport failure given
    /// the streak length after recording it. The degraded-mode notice fires
    /// at most once per streak.
    pub fn notice_for(&self, consecutive: u32) -> FailureNotice {
        if consecutive <= INDIVIDUAL_WARNING_LIMIT {
            return FailureNotice::Individual { consecutive };
        }
        if self.degraded_announced.swap(true, Ordering::AcqRel) {
            FailureNotice::Suppressed
        } else {
            FailureNotice::EnteringDegradedMode { consecutive }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_available() {
        let state = FailureState::new();
        assert!(state.is_available());
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn escalation_sequence() {
        let state = FailureState::new();
        let notices: Vec<_> = (0..7)
            .map(|_| {
                let count = state.record_failure();
                state.notice_for(count)
            })
            .collect();

        assert_eq!(
            notices,
            vec![
                FailureNotice::Individual { consecutive: 1 },
                FailureNotice::Individual { consecutive: 2 },
                FailureNotice::Individual { consecutive: 3 },
                FailureNotice::EnteringDegradedMode { consecutive: 4 },
                FailureNotice::Suppressed,
                FailureNotice::Suppressed,
                FailureNotice::Suppressed,
            ]
        );
        assert!(state.is_degraded());
        assert!(!state.is_available());
    }

    #[test]
    fn success_resets_streak_and_announcement() {
        let state = FailureState::new();
        for _ in 0..5 {
            let count = state.record_failure();
            state.notice_for(count);
        }
        assert_eq!(state.record_success(), 5);
        assert!(state.is_available());

        for _ in 0..3 {
            state.record_failure();
        }
        let count = state.record_failure();
        assert_eq!(
            state.notice_for(count),
            FailureNotice::EnteringDegradedMode { consecutive: 4 }
        );
    }
}
