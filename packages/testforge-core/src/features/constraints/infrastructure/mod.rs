mod extractor;

pub use extractor::ConstraintExtractor;
