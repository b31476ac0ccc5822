//! Solver configuration

use crate::error::ConfigError;
use crate::natural::NaturalResources;

/// Shared epsilon for every "near zero" and "sufficient" comparison
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub tolerance: f64,
    pub natural: NaturalResources,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            natural: NaturalResources::standard(),
        }
    }
}

/// Reject tolerances that would silently break every comparison
pub fn check_tolerance(tolerance: f64) -> Result<f64, ConfigError> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(tolerance)
    } else {
        Err(ConfigError::Tolerance(tolerance))
    }
}

impl SolverConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_natural(mut self, natural: NaturalResources) -> Self {
        self.natural = natural;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_tolerance(self.tolerance).map(|_| ())
    }

    pub fn is_zero(&self, amount: f64) -> bool {
        amount <= self.tolerance
    }

    /// `have` covers `need` within tolerance
    pub fn covers(&self, have: f64, need: f64) -> bool {
        have >= need - self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_must_be_finite_and_non_negative() {
        assert_eq!(check_tolerance(0.0), Ok(0.0));
        assert_eq!(check_tolerance(0.1), Ok(0.1));
        assert!(matches!(check_tolerance(f64::NAN), Err(ConfigError::Tolerance(_))));
        assert_eq!(check_tolerance(-0.5), Err(ConfigError::Tolerance(-0.5)));
        assert_eq!(check_tolerance(f64::INFINITY), Err(ConfigError::Tolerance(f64::INFINITY)));
    }

    #[test]
    fn validate_checks_the_configured_tolerance() {
        assert!(SolverConfig::default().validate().is_ok());
        assert!(SolverConfig::default().with_tolerance(f64::NAN).validate().is_err());
    }
}
