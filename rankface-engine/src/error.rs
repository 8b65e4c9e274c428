use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("cohort has no entry for subject {subject}")]
    CohortCoverage { subject: String },

    #[error("no cohort probes captured at distance {protocol}")]
    EmptyCohort { protocol: String },

    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("rank lists differ in length: probe {probe}, candidate {candidate}")]
    LengthMismatch { probe: usize, candidate: usize },

    #[error("sample {reference_id} has no {needed}")]
    MissingDerivation {
        reference_id: String,
        needed: &'static str,
    },

    #[error("sample {reference_id} was already preprocessed")]
    AlreadyPreprocessed { reference_id: String },

    #[error("not a permutation of 0..{0}")]
    InvalidRankList(usize),

    #[error("probe set is empty")]
    EmptyProbeSet,

    #[error("gallery is empty")]
    EmptyGallery,

    #[error("unknown comparison method: {0}")]
    UnknownMethod(String),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("unknown standardization method: {0}")]
    UnknownStandardization(String),

    #[error("writing score record: {0}")]
    Sink(#[from] std::io::Error),
}
