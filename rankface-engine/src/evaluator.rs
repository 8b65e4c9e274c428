//! Closed-set recognition: every probe against every gallery candidate.

use std::io;
use std::time::Duration;

use log::warn;

use crate::clock::{format_millis, CpuTimer};
use crate::error::{EngineError, Result};
use crate::sample::Sample;
use crate::similarity::Scorer;

/// One pairwise comparison, emitted for every probe/candidate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord<'a> {
    pub probe_reference_id: &'a str,
    pub probe_subject_id: &'a str,
    pub candidate_reference_id: &'a str,
    pub candidate_subject_id: &'a str,
    pub score: f64,
}

/// Receives score records as they are produced.
pub trait ScoreSink {
    fn record(&mut self, record: &ScoreRecord<'_>) -> io::Result<()>;
}

/// Drops every record; used when output recording is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ScoreSink for Discard {
    fn record(&mut self, _record: &ScoreRecord<'_>) -> io::Result<()> {
        Ok(())
    }
}

/// Time spent deriving rank lists or standardized distances.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessing {
    pub method: &'static str,
    pub time: Duration,
}

/// Outcome of one evaluation run over a probe set.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionTally {
    pub positive_matches: usize,
    pub total_probes: usize,
    /// CPU time of the scoring phase.
    pub runtime: Duration,
    pub preprocessing: Option<Preprocessing>,
}

impl RecognitionTally {
    /// Fraction of probes whose best candidate has the same subject, in `[0, 1]`.
    pub fn rate(&self) -> f64 {
        self.positive_matches as f64 / self.total_probes as f64
    }

    /// Percentage with two decimals, e.g. `66.67`.
    pub fn rate_percent(&self) -> String {
        format!("{:.2}", self.rate() * 100.0)
    }

    pub fn runtime_ms(&self) -> String {
        format_millis(self.runtime)
    }
}

/// Index of the highest score. Ties go to the earliest candidate and NaN
/// loses to any number; if every score is NaN the first candidate wins.
pub fn best_candidate(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if s > b || (b.is_nan() && !s.is_nan()) => Some((i, s)),
            None => Some((i, s)),
            keep => keep,
        })
        .map(|(i, _)| i)
}

pub struct Evaluator<S> {
    scorer: S,
}

impl<S: Scorer> Evaluator<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    /// Scores probes in input order against candidates in input order and
    /// counts the probes whose winning candidate shares their subject id.
    pub fn evaluate(
        &self,
        probes: &[Sample],
        gallery: &[Sample],
        sink: &mut dyn ScoreSink,
    ) -> Result<RecognitionTally> {
        if probes.is_empty() {
            return Err(EngineError::EmptyProbeSet);
        }
        if gallery.is_empty() {
            return Err(EngineError::EmptyGallery);
        }

        let timer = CpuTimer::start();
        let mut positive_matches = 0;
        let mut nan_scores = 0usize;
        let mut scores = Vec::with_capacity(gallery.len());

        for probe in probes {
            scores.clear();
            for candidate in gallery {
                let score = self.scorer.score(probe, candidate)?;
                if score.is_nan() {
                    nan_scores += 1;
                }
                sink.record(&ScoreRecord {
                    probe_reference_id: &probe.reference_id,
                    probe_subject_id: &probe.subject_id,
                    candidate_reference_id: &candidate.reference_id,
                    candidate_subject_id: &candidate.subject_id,
                    score,
                })?;
                scores.push(score);
            }

            if let Some(winner) = best_candidate(&scores) {
                if gallery[winner].subject_id == probe.subject_id {
                    positive_matches += 1;
                }
            }
        }
        let runtime = timer.elapsed();

        if nan_scores > 0 {
            warn!(
                "{} of {} scores are NaN, the cohort may be degenerate",
                nan_scores,
                probes.len() * gallery.len()
            );
        }

        Ok(RecognitionTally {
            positive_matches,
            total_probes: probes.len(),
            runtime,
            preprocessing: None,
        })
    }
}
