//! Coverage-guided synthesis loop
//!
//! Drives the branch analyzer, constraint extractor and solver for one
//! `(function, target coverage)` request and collects abstract test data.
//! A run that misses its target still returns everything it found.

pub mod application;
pub mod domain;

pub use application::{coverage, CoverageSynthesizer};
pub use domain::{ExpressionSynthesis, StopReason, SynthesisReport, SynthesisState, SynthesizedTestCase};
