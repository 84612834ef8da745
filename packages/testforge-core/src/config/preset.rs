//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// CI: quick feedback
    ///
    /// - Paths: 64 per function, loop bound 1
    /// - Solver: 20k search nodes, 250 ms per solve
    /// - Synthesis: 1 path tried per branch
    Fast,

    /// Development default
    ///
    /// - Paths: 256 per function, loop bound 2
    /// - Solver: 200k search nodes, 1 s per solve
    /// - Synthesis: 4 paths tried per branch
    Balanced,

    /// Release qualification
    ///
    /// - Paths: 2048 per function, loop bound 3
    /// - Solver: 2M search nodes, 10 s per solve
    /// - Synthesis: 16 paths tried per branch
    Thorough,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_from_str() {
        assert_eq!(Preset::from_str("fast").unwrap(), Preset::Fast);
        assert_eq!(Preset::from_str("BALANCED").unwrap(), Preset::Balanced);
        assert!(matches!(
            Preset::from_str("custom"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Thorough.to_string(), "thorough");
        assert_eq!(Preset::default(), Preset::Balanced);
    }
}
