//! Bounded polling.
//!
//! Every wait on a peripheral goes through [`RetryBudget`] so that a device
//! that never answers produces an error value instead of a hung task. Budgets
//! are counted in attempts, not time, which keeps the exhaustion path testable
//! without a clock.

/// Maximum number of attempts a polling loop may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryBudget(u32);

impl RetryBudget {
    /// Budget allowing at most `max_attempts` polls.
    pub const fn new(max_attempts: u32) -> Self {
        Self(max_attempts)
    }

    /// Attempt limit.
    pub const fn max_attempts(self) -> u32 {
        self.0
    }

    /// Call `attempt` until it yields `Some`, propagates an error, or the
    /// budget runs out (`Ok(None)`).
    ///
    /// The caller maps `Ok(None)` to whatever timeout error is meaningful at
    /// its layer.
    pub fn poll<T, E>(
        self,
        mut attempt: impl FnMut() -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        for _ in 0..self.0 {
            if let Some(value) = attempt()? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}
