//! Engine configuration root

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, ConfigOverrides};
use super::preset::Preset;
use super::stage_configs::*;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub preset: Preset,
    pub abi: AbiConfig,
    pub analysis: AnalysisConfig,
    pub constraints: ConstraintConfig,
    pub solver: SolverConfig,
    pub synthesis: SynthesisConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl EngineConfig {
    /// Complete defaults for a preset
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            abi: AbiConfig::default(),
            analysis: AnalysisConfig::from_preset(preset),
            constraints: ConstraintConfig::default(),
            solver: SolverConfig::from_preset(preset),
            synthesis: SynthesisConfig::from_preset(preset),
        }
    }

    /// Override the ABI stage
    pub fn abi(mut self, f: impl FnOnce(AbiConfig) -> AbiConfig) -> Self {
        self.abi = f(self.abi);
        self
    }

    /// Override the analysis stage
    pub fn analysis(mut self, f: impl FnOnce(AnalysisConfig) -> AnalysisConfig) -> Self {
        self.analysis = f(self.analysis);
        self
    }

    /// Override the constraint stage
    pub fn constraints(mut self, f: impl FnOnce(ConstraintConfig) -> ConstraintConfig) -> Self {
        self.constraints = f(self.constraints);
        self
    }

    /// Override the solver stage
    pub fn solver(mut self, f: impl FnOnce(SolverConfig) -> SolverConfig) -> Self {
        self.solver = f(self.solver);
        self
    }

    /// Override the synthesis stage
    pub fn synthesis(mut self, f: impl FnOnce(SynthesisConfig) -> SynthesisConfig) -> Self {
        self.synthesis = f(self.synthesis);
        self
    }

    /// Validate every stage, then cross-stage consistency
    pub fn validate(&self) -> ConfigResult<()> {
        let stages: [&dyn Validatable; 5] = [
            &self.abi,
            &self.analysis,
            &self.constraints,
            &self.solver,
            &self.synthesis,
        ];
        for stage in stages {
            stage.validate()?;
        }

        if self.synthesis.max_paths_per_branch > self.analysis.max_paths_per_function {
            return Err(ConfigError::range_with_hint(
                "synthesis.max_paths_per_branch",
                self.synthesis.max_paths_per_branch,
                1,
                self.analysis.max_paths_per_function,
                "Cannot try more paths per branch than are enumerated per function",
            ));
        }
        Ok(())
    }

    /// Load and validate a YAML v1 file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        if !SUPPORTED_VERSIONS.contains(&export.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)?;
        let mut config = Self::preset(preset);

        if let Some(overrides) = export.overrides {
            if let Some(abi) = overrides.abi {
                config.abi = abi;
            }
            if let Some(analysis) = overrides.analysis {
                config.analysis = analysis;
            }
            if let Some(constraints) = overrides.constraints {
                config.constraints = constraints;
            }
            if let Some(solver) = overrides.solver {
                config.solver = solver;
            }
            if let Some(synthesis) = overrides.synthesis {
                config.synthesis = synthesis;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Serialize as YAML v1 (every stage written out)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: self.preset.as_str().to_string(),
            overrides: Some(ConfigOverrides {
                abi: Some(self.abi.clone()),
                analysis: Some(self.analysis.clone()),
                constraints: Some(self.constraints.clone()),
                solver: Some(self.solver.clone()),
                synthesis: Some(self.synthesis.clone()),
            }),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}
