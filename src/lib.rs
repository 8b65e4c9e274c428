pub mod config;
pub mod dataset;
pub mod pipeline;
pub mod recorder;
pub mod storage;

// Re-export engine types for convenience
pub use rankface_engine::{
    clock, cohort, distance, evaluator, rank, sample, similarity, Category, ComparisonMethod,
    EngineError, Protocol, RecognitionTally, Sample,
};
