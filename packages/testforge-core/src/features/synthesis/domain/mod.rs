mod report;
mod state;

pub use report::{ExpressionSynthesis, SynthesisReport, SynthesizedTestCase};
pub use state::{StopReason, SynthesisState};
