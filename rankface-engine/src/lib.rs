pub mod clock;
pub mod cohort;
pub mod distance;
pub mod error;
pub mod evaluator;
pub mod rank;
pub mod sample;
pub mod similarity;

// Re-export commonly used types
pub use cohort::{CohortSet, Prepared, Preprocessor, StandardizationMethod};
pub use error::{EngineError, Result};
pub use evaluator::{Evaluator, RecognitionTally, ScoreRecord, ScoreSink};
pub use sample::{Capture, CohortSample, Derived, Protocol, RankList, Sample};
pub use similarity::{Category, ComparisonMethod, MethodScorer, Scorer, SimilarityParams};
