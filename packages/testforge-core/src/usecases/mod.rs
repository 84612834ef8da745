//! Usecase Layer - the query surface callers use
//!
//! Synchronous by construction; the only async step is loading a
//! translation unit through an [`AstProvider`](crate::adapters::AstProvider).

pub mod analysis_session;

pub use analysis_session::{AnalysisSession, SynthesisRequest};
