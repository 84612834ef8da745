mod analyze_function;

pub use analyze_function::{BranchAnalyzer, FunctionAnalysis};
