//! Execution limits for script runs
//!
//! Two budgets bound every script run: a wall-clock deadline enforced from
//! outside the engine, and in-engine limits (loop iterations, recursion
//! depth) that stop runaway scripts the watchdog cannot interrupt from
//! within a single blocking call.

use std::time::Duration;

use scriptserve_common::error::{EngineError, Result};

/// Default wall-clock deadline per script run.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default loop iteration budget per script run.
pub const DEFAULT_LOOP_ITERATION_LIMIT: u64 = 10_000_000;

/// Default recursion depth budget per script run.
pub const DEFAULT_RECURSION_LIMIT: usize = 512;

/// Maximum allowed execution timeout (1 hour).
pub const MAX_EXECUTION_TIMEOUT: Duration = Duration::from_secs(3600);

/// Budgets applied to each script execution.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Wall-clock deadline for one run.
    pub execution_timeout: Duration,
    /// Engine-level loop iteration budget.
    pub loop_iteration_limit: u64,
    /// Engine-level recursion depth budget.
    pub recursion_limit: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            loop_iteration_limit: DEFAULT_LOOP_ITERATION_LIMIT,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl ResourceLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Wall-clock deadline in milliseconds, for error reporting.
    pub fn timeout_ms(&self) -> u64 {
        self.execution_timeout.as_millis() as u64
    }

    /// Checks that the limits make sense before the server starts.
    pub fn validate(&self) -> Result<()> {
        if self.execution_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "execution timeout must be greater than zero".to_string(),
            ));
        }
        if self.execution_timeout > MAX_EXECUTION_TIMEOUT {
            return Err(EngineError::InvalidConfig(format!(
                "execution timeout {:?} exceeds maximum of {:?}",
                self.execution_timeout, MAX_EXECUTION_TIMEOUT
            )));
        }
        if self.loop_iteration_limit == 0 {
            return Err(EngineError::InvalidConfig(
                "loop iteration limit must be greater than zero".to_string(),
            ));
        }
        if self.recursion_limit == 0 {
            return Err(EngineError::InvalidConfig(
                "recursion limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let limits = ResourceLimits::default();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.execution_timeout, DEFAULT_EXECUTION_TIMEOUT);
        assert_eq!(limits.loop_iteration_limit, DEFAULT_LOOP_ITERATION_LIMIT);
        assert_eq!(limits.recursion_limit, DEFAULT_RECURSION_LIMIT);
    }

    #[test]
    fn test_builder_chain() {
        let limits = ResourceLimits::new()
            .with_execution_timeout(Duration::from_millis(250))
            .with_loop_iteration_limit(1_000)
            .with_recursion_limit(64);
        assert_eq!(limits.execution_timeout, Duration::from_millis(250));
        assert_eq!(limits.loop_iteration_limit, 1_000);
        assert_eq!(limits.recursion_limit, 64);
        assert_eq!(limits.timeout_ms(), 250);
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let limits = ResourceLimits::new().with_execution_timeout(Duration::ZERO);
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_excessive_timeout_rejected() {
        let limits = ResourceLimits::new()
            .with_execution_timeout(MAX_EXECUTION_TIMEOUT + Duration::from_secs(1));
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_zero_loop_limit_rejected() {
        let limits = ResourceLimits::new().with_loop_iteration_limit(0);
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_zero_recursion_limit_rejected() {
        let limits = ResourceLimits::new().with_recursion_limit(0);
        assert!(limits.validate().is_err());
    }
}
