//! Stage-specific configuration types
//!
//! Each analysis stage has its own configuration struct with validation.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::{check_range, Validatable};
use crate::shared::models::{DataModel, TargetAbi};
use serde::{Deserialize, Serialize};

// ============================================================================
// Target ABI
// ============================================================================

/// Target ABI used for sizes, alignment and integer ranges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AbiConfig {
    /// `ilp32`, `lp64` or `llp64`
    pub data_model: DataModel,

    /// Largest alignment any scalar may require (power of two, 1..=16)
    pub max_alignment: u64,
}

impl AbiConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        check_range(
            "abi.max_alignment",
            self.max_alignment,
            1,
            16,
            "Alignment must be a small power of two",
        )?;
        if !self.max_alignment.is_power_of_two() {
            return Err(ConfigError::range_with_hint(
                "abi.max_alignment",
                self.max_alignment,
                1,
                16,
                "Alignment must be a power of two",
            ));
        }
        Ok(())
    }

    pub fn target_abi(&self) -> TargetAbi {
        TargetAbi::new(self.data_model, self.max_alignment)
    }

    /// Builder: Set data model
    pub fn data_model(mut self, v: DataModel) -> Self {
        self.data_model = v;
        self
    }

    /// Builder: Set max alignment
    pub fn max_alignment(mut self, v: u64) -> Self {
        self.max_alignment = v;
        self
    }
}

impl Default for AbiConfig {
    fn default() -> Self {
        Self {
            data_model: DataModel::Lp64,
            max_alignment: 8,
        }
    }
}

// ============================================================================
// Control-flow analysis
// ============================================================================

/// Path enumeration and graph traversal bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum paths enumerated per function (1..=100000)
    pub max_paths_per_function: usize,

    /// Times a single CFG edge may repeat on one path (1..=16)
    pub loop_unroll_bound: usize,

    /// Maximum edges on one path (8..=100000)
    pub max_path_length: usize,

    /// Call-graph depth used when the caller passes none (1..=256)
    pub default_call_graph_depth: usize,
}

impl AnalysisConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                max_paths_per_function: 64,
                loop_unroll_bound: 1,
                max_path_length: 256,
                default_call_graph_depth: 4,
            },
            Preset::Balanced => Self {
                max_paths_per_function: 256,
                loop_unroll_bound: 2,
                max_path_length: 512,
                default_call_graph_depth: 8,
            },
            Preset::Thorough => Self {
                max_paths_per_function: 2048,
                loop_unroll_bound: 3,
                max_path_length: 2048,
                default_call_graph_depth: 16,
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_range(
            "analysis.max_paths_per_function",
            self.max_paths_per_function,
            1,
            100_000,
            "Path enumeration must be bounded",
        )?;
        check_range(
            "analysis.loop_unroll_bound",
            self.loop_unroll_bound,
            1,
            16,
            "Each edge must be usable at least once",
        )?;
        check_range(
            "analysis.max_path_length",
            self.max_path_length,
            8,
            100_000,
            "Paths shorter than 8 edges cannot cover nested branches",
        )?;
        check_range(
            "analysis.default_call_graph_depth",
            self.default_call_graph_depth,
            1,
            256,
            "Depth 1 means direct callees only",
        )
    }

    /// Builder: Set max paths per function
    pub fn max_paths_per_function(mut self, v: usize) -> Self {
        self.max_paths_per_function = v;
        self
    }

    /// Builder: Set loop unroll bound
    pub fn loop_unroll_bound(mut self, v: usize) -> Self {
        self.loop_unroll_bound = v;
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Constraint extraction
// ============================================================================

/// Which usage-derived constraint sources are honoured
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConstraintConfig {
    /// Intersect comparisons found in the analysed function's own guards
    /// into its input ranges. Off by default: a guard such as `x < 0`
    /// would otherwise exclude the inputs that reach its false edge.
    pub use_guard_bounds: bool,

    /// Honour `// Range:` and `// Valid values:` comment annotations
    pub use_annotations: bool,

    /// Derive `[0, N-1]` for variables used as an index into `T[N]`
    pub derive_array_index_bounds: bool,

    /// Derive upper bounds from loop conditions (`i < 10`)
    pub derive_loop_bounds: bool,
}

impl ConstraintConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }

    /// Builder: Set use_guard_bounds
    pub fn use_guard_bounds(mut self, v: bool) -> Self {
        self.use_guard_bounds = v;
        self
    }

    /// Builder: Set use_annotations
    pub fn use_annotations(mut self, v: bool) -> Self {
        self.use_annotations = v;
        self
    }
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            use_guard_bounds: false,
            use_annotations: true,
            derive_array_index_bounds: true,
            derive_loop_bounds: true,
        }
    }
}

// ============================================================================
// SMT backend
// ============================================================================

/// Solver backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackendKind {
    /// Pure-Rust bounded search (always available)
    Bounded,
    /// Z3 (requires the `z3` cargo feature)
    Z3,
}

impl SolverBackendKind {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "bounded" => Ok(Self::Bounded),
            "z3" => Ok(Self::Z3),
            _ => Err(ConfigError::unknown_value(
                "solver.backend",
                s,
                &["bounded", "z3"],
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bounded => "bounded",
            Self::Z3 => "z3",
        }
    }
}

/// Per-solve limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackendKind,

    /// Wall-clock limit for a single solve in milliseconds (1..=600000)
    pub timeout_ms: u64,

    /// Search nodes the bounded solver may visit per solve (1..=100000000)
    pub node_budget: u64,
}

impl SolverConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                backend: SolverBackendKind::Bounded,
                timeout_ms: 250,
                node_budget: 20_000,
            },
            Preset::Balanced => Self {
                backend: SolverBackendKind::Bounded,
                timeout_ms: 1_000,
                node_budget: 200_000,
            },
            Preset::Thorough => Self {
                backend: SolverBackendKind::Bounded,
                timeout_ms: 10_000,
                node_budget: 2_000_000,
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        check_range(
            "solver.timeout_ms",
            self.timeout_ms,
            1,
            600_000,
            "A solve may take at most 10 minutes",
        )?;
        check_range(
            "solver.node_budget",
            self.node_budget,
            1,
            100_000_000,
            "Search must be bounded",
        )
    }

    /// Builder: Set backend
    pub fn backend(mut self, v: SolverBackendKind) -> Self {
        self.backend = v;
        self
    }

    /// Builder: Set timeout
    pub fn timeout_ms(mut self, v: u64) -> Self {
        self.timeout_ms = v;
        self
    }

    /// Builder: Set node budget
    pub fn node_budget(mut self, v: u64) -> Self {
        self.node_budget = v;
        self
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Synthesis loop
// ============================================================================

/// Coverage-guided synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Coverage fraction used when the caller gives none, in (0, 1]
    pub target_coverage: f64,

    /// Solve attempts allowed per branch; budget = branches × factor (1..=1000)
    pub attempts_per_branch: usize,

    /// Distinct paths tried for one branch before it is given up (1..=1024)
    pub max_paths_per_branch: usize,

    /// Evaluate the path's return expression under the found assignment
    pub compute_expected_returns: bool,
}

impl SynthesisConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                target_coverage: 1.0,
                attempts_per_branch: 2,
                max_paths_per_branch: 1,
                compute_expected_returns: false,
            },
            Preset::Balanced => Self {
                target_coverage: 1.0,
                attempts_per_branch: 4,
                max_paths_per_branch: 4,
                compute_expected_returns: true,
            },
            Preset::Thorough => Self {
                target_coverage: 1.0,
                attempts_per_branch: 16,
                max_paths_per_branch: 16,
                compute_expected_returns: true,
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.target_coverage > 0.0 && self.target_coverage <= 1.0) {
            return Err(ConfigError::range_with_hint(
                "synthesis.target_coverage",
                self.target_coverage,
                "0 (exclusive)",
                1.0,
                "Coverage is a fraction of branches",
            ));
        }
        check_range(
            "synthesis.attempts_per_branch",
            self.attempts_per_branch,
            1,
            1000,
            "Every branch needs at least one attempt",
        )?;
        check_range(
            "synthesis.max_paths_per_branch",
            self.max_paths_per_branch,
            1,
            1024,
            "Every branch needs at least one candidate path",
        )
    }

    /// Builder: Set target coverage
    pub fn target_coverage(mut self, v: f64) -> Self {
        self.target_coverage = v;
        self
    }

    /// Builder: Set max paths per branch
    pub fn max_paths_per_branch(mut self, v: usize) -> Self {
        self.max_paths_per_branch = v;
        self
    }

    /// Builder: Set attempts per branch
    pub fn attempts_per_branch(mut self, v: usize) -> Self {
        self.attempts_per_branch = v;
        self
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Validatable impls
// ============================================================================

impl Validatable for AbiConfig {
    fn validate(&self) -> ConfigResult<()> {
        AbiConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "AbiConfig"
    }
}

impl Validatable for AnalysisConfig {
    fn validate(&self) -> ConfigResult<()> {
        AnalysisConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "AnalysisConfig"
    }
}

impl Validatable for ConstraintConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConstraintConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "ConstraintConfig"
    }
}

impl Validatable for SolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        SolverConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "SolverConfig"
    }
}

impl Validatable for SynthesisConfig {
    fn validate(&self) -> ConfigResult<()> {
        SynthesisConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "SynthesisConfig"
    }
}
