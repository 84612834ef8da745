//! Configuration validation
//!
//! Every stage config implements [`Validatable`]; [`EngineConfig::validate`]
//! runs them all and then checks cross-stage consistency.
//!
//! [`EngineConfig::validate`]: super::EngineConfig::validate

use super::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration objects
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Range check helper used by stage configs
pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T, hint: &str) -> ConfigResult<()>
where
    T: PartialOrd + ToString + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::range_with_hint(field, value, min, max, hint));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_inclusive() {
        assert!(check_range("x", 1, 1, 10, "").is_ok());
        assert!(check_range("x", 10, 1, 10, "").is_ok());
        let err = check_range("x", 11, 1, 10, "lower it").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'x'"));
        assert!(msg.contains("lower it"));
    }
}
