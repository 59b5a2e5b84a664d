//! Logical time for the scheduler.
//!
//! Time in the kernel is a plain round counter. It starts at the configured
//! initial time and advances by exactly one at the end of every round;
//! nothing in the kernel ever consults the wall clock.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic round counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalClock {
    /// Current logical time.
    tick: u64,
}

impl LogicalClock {
    /// Create a clock reading `initial`.
    pub const fn new(initial: u64) -> Self {
        Self { tick: initial }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_initial_time() {
        assert_eq!(LogicalClock::new(0).tick(), 0);
        assert_eq!(LogicalClock::new(250).tick(), 250);
    }

    #[test]
    fn clock_advances() {
        let mut clock = LogicalClock::new(0);
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.advance().unwrap(), 2);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = LogicalClock::new(u64::MAX);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }
}
