/*
 * TestForge Core - Semantic Model + Constraint-Based Test Synthesis
 *
 * Feature-First Architecture:
 * - shared/      : Common models (AST arena, C types, scalar values)
 * - features/    : Vertical slices (entity model → graphs → flow → constraints → smt → synthesis)
 * - config/      : Engine configuration (presets, YAML, validation)
 * - usecases/    : Query surface (AnalysisSession)
 * - adapters/    : External boundaries (AST provider)
 *
 * The analysis and solver core is synchronous. The only async boundary is
 * the AST provider, which reads translation units from disk.
 */

#![allow(clippy::too_many_arguments)] // Analysis entry points thread several handles
#![allow(clippy::type_complexity)] // Graph index maps
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::upper_case_acronyms)] // CFG, SMT, ABI naming

/// Shared models and utilities
#[macro_use]
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

/// Usecase layer (AnalysisSession)
pub mod usecases;

/// External adapters (AST provider)
pub mod adapters;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{EngineConfig, Preset};
pub use errors::{EngineError, Result};
pub use features::entity_model::{EntityModel, Function, Variable};
pub use features::synthesis::{SynthesisReport, SynthesizedTestCase};
pub use features::type_resolution::TypedefRegistry;
pub use usecases::AnalysisSession;
