//! Analysis Session - query surface over one translation unit
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    AnalysisSession                       │
//! │  open():  registry ← headers, typedefs                   │
//! │           model.finalize() → call graph (is_recursive)   │
//! │                                                          │
//! │  per request (synchronous, own solver state):            │
//! │    BranchAnalyzer ─▶ ConstraintExtractor ─▶ SolverService│
//! │                         └──────▶ CoverageSynthesizer     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown function names fail with [`EngineError::FunctionNotFound`]
//! before any analysis runs. Per-branch failures never escalate; they are
//! part of the returned report.
//!
//! Cancellation belongs to a run, not to the session: the `_with_cancellation`
//! variants take a flag owned by the caller, and a cancelled run leaves the
//! session usable for the next request.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use testforge_core::adapters::{AstProvider, JsonAstProvider};
//! use testforge_core::{AnalysisSession, EngineConfig};
//!
//! let unit = JsonAstProvider::new("build/ast").load("motor.json").await?;
//! let session = AnalysisSession::open(unit, EngineConfig::default())?;
//! let report = session.synthesize_for_coverage("clamp_speed", Some(1.0))?;
//! println!("{} test cases, {:.0}% covered", report.test_cases.len(), report.achieved_coverage * 100.0);
//! ```

use crate::adapters::TranslationUnit;
use crate::config::{ConfigError, EngineConfig};
use crate::errors::{EngineError, Result};
use crate::features::constraints::{ConstraintExtractor, ConstraintSet};
use crate::features::entity_model::{EntityModel, Function, Issue};
use crate::features::flow_graph::{
    BranchAnalyzer, BranchId, ControlFlowPath, FunctionAnalysis, FunctionComplexity,
};
use crate::features::graph_builder::{
    build_type_graph, CallGraph, CallGraphBuilder, TypeDependencyGraph,
};
use crate::features::smt::{BranchFeasibility, SolverService};
use crate::features::synthesis::{CoverageSynthesizer, ExpressionSynthesis, SynthesisReport};
use crate::features::type_resolution::TypedefRegistry;
use crate::shared::macros::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// One entry of a batch synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub function: String,
    /// Falls back to the configured target coverage
    #[serde(default)]
    pub target_coverage: Option<f64>,
}

impl SynthesisRequest {
    pub fn new(function: impl Into<String>, target_coverage: Option<f64>) -> Self {
        Self {
            function: function.into(),
            target_coverage,
        }
    }
}

pub struct AnalysisSession {
    config: EngineConfig,
    registry: TypedefRegistry,
    model: EntityModel,
    call_graph: CallGraph,
    analyzer: BranchAnalyzer,
}

impl AnalysisSession {
    /// Build the semantic graph for `unit`.
    ///
    /// Validation issues do not stop the session; use
    /// [`open_validated`](Self::open_validated) to reject malformed models.
    pub fn open(unit: TranslationUnit, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = TypedefRegistry::with_defaults(config.abi.target_abi());
        for header in &unit.headers {
            registry.import_header(&header.text, &header.file);
        }

        let mut model = unit.model;
        model.finalize(&registry);
        BranchAnalyzer::annotate_complexity(&mut model);
        let call_graph = CallGraphBuilder::build_and_annotate(&mut model);
        let analyzer = BranchAnalyzer::new(&config.analysis);

        info!(
            file = %model.source_file,
            functions = model.functions().len(),
            typedefs = registry.len(),
            recursive = call_graph.recursive_functions().len(),
            "analysis session opened"
        );

        Ok(Self {
            config,
            registry,
            model,
            call_graph,
            analyzer,
        })
    }

    /// [`open`](Self::open), failing with `MalformedModel` on any
    /// error-level validation issue
    pub fn open_validated(unit: TranslationUnit, config: EngineConfig) -> Result<Self> {
        let session = Self::open(unit, config)?;
        let errors: Vec<Issue> = session.validate().into_iter().filter(Issue::is_error).collect();
        if !errors.is_empty() {
            return Err(EngineError::MalformedModel { issues: errors });
        }
        Ok(session)
    }

    pub fn model(&self) -> &EntityModel {
        &self.model
    }

    pub fn registry(&self) -> &TypedefRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn validate(&self) -> Vec<Issue> {
        self.model.validate(&self.registry)
    }

    pub fn type_dependencies(&self) -> TypeDependencyGraph {
        build_type_graph(&self.model)
    }

    fn function(&self, name: &str) -> Result<&Function> {
        self.model
            .function(name)
            .ok_or_else(|| EngineError::function_not_found(name))
    }

    pub fn analyze_function(&self, name: &str) -> Result<FunctionAnalysis> {
        Ok(self.analyzer.analyze(self.function(name)?))
    }

    pub fn analyze_function_complexity(&self, name: &str) -> Result<FunctionComplexity> {
        Ok(self.analyze_function(name)?.complexity)
    }

    /// Functions reachable from `root` within `max_depth` calls
    /// (configured default when `None`)
    pub fn build_call_graph(&self, root: &str, max_depth: Option<usize>) -> Result<CallGraph> {
        let depth = max_depth.unwrap_or(self.config.analysis.default_call_graph_depth);
        self.call_graph
            .reachable_from(root, depth)
            .ok_or_else(|| EngineError::function_not_found(root))
    }

    pub fn find_paths_covering_branches(
        &self,
        function: &str,
        branches: &[BranchId],
    ) -> Result<Vec<ControlFlowPath>> {
        let analysis = self.analyze_function(function)?;
        Ok(analysis.paths_covering(branches).into_iter().cloned().collect())
    }

    /// Inputs, types and aggregated constraints of `function`
    pub fn constraints_for(&self, function: &str) -> Result<ConstraintSet> {
        let f = self.function(function)?;
        Ok(self.extractor().extract_for_function(f))
    }

    pub fn is_branch_feasible(&self, function: &str, branch: BranchId) -> Result<BranchFeasibility> {
        let analysis = self.analyze_function(function)?;
        let constraints = self.constraints_for(function)?;
        let solver = self.solver()?;
        Ok(solver.is_branch_feasible(
            &analysis,
            branch,
            &constraints,
            self.config.synthesis.max_paths_per_branch,
        )?)
    }

    pub fn synthesize_for_coverage(&self, function: &str, target: Option<f64>) -> Result<SynthesisReport> {
        self.synthesize_for_coverage_with_cancellation(function, target, Arc::new(AtomicBool::new(false)))
    }

    /// Like [`synthesize_for_coverage`](Self::synthesize_for_coverage); the run
    /// stops at its next branch selection once `cancel` is set.
    pub fn synthesize_for_coverage_with_cancellation(
        &self,
        function: &str,
        target: Option<f64>,
        cancel: Arc<AtomicBool>,
    ) -> Result<SynthesisReport> {
        let target = target.unwrap_or(self.config.synthesis.target_coverage);
        if !(target > 0.0 && target <= 1.0) {
            return Err(ConfigError::range_with_hint(
                "target_coverage",
                target,
                "0 (exclusive)",
                1.0,
                "Coverage is a fraction of branches",
            )
            .into());
        }
        let analysis = self.analyze_function(function)?;
        let constraints = self.constraints_for(function)?;
        let solver = self.solver()?;
        let report = CoverageSynthesizer::new(&solver, &self.config.synthesis)
            .with_cancellation(cancel)
            .synthesize(&analysis, &constraints, target)?;
        Ok(report)
    }

    pub fn synthesize_for_expression(&self, expression: &str, function: &str) -> Result<ExpressionSynthesis> {
        let constraints = self.constraints_for(function)?;
        let solver = self.solver()?;
        Ok(CoverageSynthesizer::new(&solver, &self.config.synthesis)
            .synthesize_for_expression(function, expression, &constraints)?)
    }

    /// Independent requests in parallel; each owns its solver
    pub fn synthesize_batch(&self, requests: &[SynthesisRequest]) -> Vec<Result<SynthesisReport>> {
        self.synthesize_batch_with_cancellation(requests, &Arc::new(AtomicBool::new(false)))
    }

    /// Batch whose runs all stop at their next branch selection once
    /// `cancel` is set
    pub fn synthesize_batch_with_cancellation(
        &self,
        requests: &[SynthesisRequest],
        cancel: &Arc<AtomicBool>,
    ) -> Vec<Result<SynthesisReport>> {
        requests
            .par_iter()
            .map(|r| {
                let result = self.synthesize_for_coverage_with_cancellation(
                    &r.function,
                    r.target_coverage,
                    Arc::clone(cancel),
                );
                if let Err(err) = &result {
                    warn!(function = %r.function, %err, "synthesis request failed");
                }
                result
            })
            .collect()
    }

    /// Every function with a body, at the given target
    pub fn synthesize_all(&self, target: Option<f64>) -> Vec<Result<SynthesisReport>> {
        let requests: Vec<SynthesisRequest> = self
            .model
            .functions()
            .iter()
            .filter(|f| f.is_definition())
            .map(|f| SynthesisRequest::new(f.name.clone(), target))
            .collect();
        self.synthesize_batch(&requests)
    }

    fn extractor(&self) -> ConstraintExtractor<'_> {
        ConstraintExtractor::new(&self.model, &self.registry, &self.config.constraints)
    }

    fn solver(&self) -> Result<SolverService<'_>> {
        let constants = self.extractor().constants().clone();
        Ok(SolverService::new(&self.config.solver, &self.registry)?.with_constants(constants))
    }
}
