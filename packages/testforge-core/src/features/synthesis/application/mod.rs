mod coverage_loop;

pub use coverage_loop::{coverage, CoverageSynthesizer};
