use crate::config::AnalysisConfig;
use crate::features::entity_model::{EntityModel, Function};
use crate::features::flow_graph::domain::{
    Branch, BranchId, CfgEdge, CfgNode, CfgNodeKind, ClassifiedParameter, ControlFlowGraph, ControlFlowPath,
    FunctionComplexity, ParameterDirectionClassifier, PointerConstHeuristic,
};
use crate::features::flow_graph::infrastructure::{
    find_paths_covering_branches, CfgBuilder, ComplexityCalculator, LoweredBody, PathEnumerator,
    PathLimits,
};
use crate::shared::macros::debug;
use petgraph::graph::DiGraph;
use std::sync::Arc;

/// Everything the branch analyzer derives for one function
#[derive(Debug, Clone)]
pub struct FunctionAnalysis {
    pub function: String,
    pub cfg: ControlFlowGraph,
    /// Declaration order
    pub branches: Vec<Branch>,
    pub paths: Vec<ControlFlowPath>,
    pub complexity: FunctionComplexity,
    /// Heuristic directions; see [`ParameterDirectionClassifier`]
    pub parameters: Vec<ClassifiedParameter>,
}

impl FunctionAnalysis {
    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// Branches whose decision is reachable from the entry
    pub fn feasible_branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(|b| b.is_feasible)
    }

    pub fn paths_covering(&self, branches: &[BranchId]) -> Vec<&ControlFlowPath> {
        find_paths_covering_branches(&self.paths, branches)
    }

    /// Enumerated paths through `branch`, in enumeration order
    pub fn paths_through(&self, branch: BranchId) -> impl Iterator<Item = &ControlFlowPath> {
        self.paths.iter().filter(move |p| p.covers(branch))
    }
}

#[derive(Clone)]
pub struct BranchAnalyzer {
    limits: PathLimits,
    classifier: Arc<dyn ParameterDirectionClassifier>,
}

impl BranchAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            limits: PathLimits::from(config),
            classifier: Arc::new(PointerConstHeuristic),
        }
    }

    /// Replace the parameter direction strategy
    pub fn with_classifier(mut self, classifier: Arc<dyn ParameterDirectionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn limits(&self) -> PathLimits {
        self.limits
    }

    pub fn analyze(&self, function: &Function) -> FunctionAnalysis {
        let LoweredBody { cfg, branches } = match &function.body {
            Some(body) => CfgBuilder::new(body).build(),
            None => straight_line(),
        };
        let paths =
            PathEnumerator::new(&cfg, branches.iter().map(|b| (b.id, b.condition.as_str())), self.limits)
                .enumerate();
        let complexity = ComplexityCalculator::calculate(function);

        debug!(
            function = %function.name,
            branches = branches.len(),
            paths = paths.len(),
            cyclomatic = complexity.cyclomatic_complexity,
            "function analysed"
        );

        FunctionAnalysis {
            function: function.name.clone(),
            cfg,
            branches,
            paths,
            complexity,
            parameters: self.classify_parameters(function),
        }
    }

    pub fn classify_parameters(&self, function: &Function) -> Vec<ClassifiedParameter> {
        function
            .parameters
            .iter()
            .map(|p| ClassifiedParameter {
                name: p.name.clone(),
                type_name: p.type_name.clone(),
                direction: self.classifier.classify(p),
                classifier: self.classifier.name().to_string(),
            })
            .collect()
    }

    /// Store each function's cyclomatic complexity on the model
    pub fn annotate_complexity(model: &mut EntityModel) {
        for f in model.functions_mut() {
            let c = ComplexityCalculator::calculate(f);
            f.set_cyclomatic_complexity(c.cyclomatic_complexity);
        }
    }
}

impl Default for BranchAnalyzer {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

/// Entry straight to exit, for functions known only by declaration
fn straight_line() -> LoweredBody {
    let mut graph = DiGraph::new();
    let entry = graph.add_node(CfgNode::new(CfgNodeKind::Entry, None, 0));
    let exit = graph.add_node(CfgNode::new(CfgNodeKind::Exit, None, 0));
    graph.add_edge(entry, exit, CfgEdge::Flow);
    LoweredBody {
        cfg: ControlFlowGraph { graph, entry, exit },
        branches: Vec::new(),
    }
}
