//! Cooperative cancellation (`spec.md` §5): a wall-clock deadline
//! checked at natural loop boundaries — per hierarchy level, per
//! training batch, per scored capability — rather than preempted.
//! Expiry never leaves partial state: every checkpoint returns
//! `CoreError::Cancelled` before mutating anything for that iteration,
//! the same way the teacher's retry loop only ever re-runs a whole
//! operation, never resumes mid-attempt.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; `is_expired` is always `false`.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_expires() {
        assert!(!Deadline::none().is_expired());
    }

    #[test]
    fn zero_duration_deadline_is_immediately_expired() {
        let deadline = Deadline::after(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(deadline.is_expired());
    }

    #[test]
    fn future_deadline_has_not_expired_yet() {
        let deadline = Deadline::after(Duration::from_secs(60));
        assert!(!deadline.is_expired());
    }
}
