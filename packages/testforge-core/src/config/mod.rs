//! Configuration System
//!
//! Two levels:
//! - Preset: complete defaults in one line
//! - Stage override / YAML: adjust individual stages
//!
//! # Examples
//!
//! ```rust
//! use testforge_core::config::{EngineConfig, Preset};
//!
//! let config = EngineConfig::preset(Preset::Fast)
//!     .solver(|c| c.timeout_ms(500))
//!     .synthesis(|c| c.target_coverage(0.8));
//! assert!(config.validate().is_ok());
//! ```

pub mod engine_config;
pub mod error;
pub mod io;
pub mod preset;
pub mod stage_configs;
pub mod validation;

// Re-exports
pub use engine_config::EngineConfig;
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use preset::Preset;
pub use stage_configs::{
    AbiConfig, AnalysisConfig, ConstraintConfig, SolverBackendKind, SolverConfig, SynthesisConfig,
};
pub use validation::Validatable;
