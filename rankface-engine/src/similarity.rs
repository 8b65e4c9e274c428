//! Similarity scoring between a probe and a gallery candidate.
//!
//! Higher is always better: distances are negated before they are returned.

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::distance;
use crate::error::{EngineError, Result};
use crate::rank;
use crate::sample::Sample;

/// Which representation a comparison method consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Raw feature vectors, no cohort.
    Baseline,
    RankList,
    Standardization,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Baseline => "baseline",
            Category::RankList => "rank-list",
            Category::Standardization => "standardization",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMethod {
    Baseline,
    Mueller2010,
    Mueller2013,
    Schroff,
    Kendall,
    ScipyKendall,
    WeightedKendall,
    Spearman,
    #[serde(alias = "wartmann_parametric")]
    Wartmann,
    Braycurtis,
    Canberra,
    Chebyshev,
    Cityblock,
    Correlation,
    Cosine,
    Euclidean,
    Minkowski,
    Sqeuclidean,
}

impl ComparisonMethod {
    pub const ALL: [ComparisonMethod; 18] = [
        ComparisonMethod::Baseline,
        ComparisonMethod::Mueller2010,
        ComparisonMethod::Mueller2013,
        ComparisonMethod::Schroff,
        ComparisonMethod::Kendall,
        ComparisonMethod::ScipyKendall,
        ComparisonMethod::WeightedKendall,
        ComparisonMethod::Spearman,
        ComparisonMethod::Wartmann,
        ComparisonMethod::Braycurtis,
        ComparisonMethod::Canberra,
        ComparisonMethod::Chebyshev,
        ComparisonMethod::Cityblock,
        ComparisonMethod::Correlation,
        ComparisonMethod::Cosine,
        ComparisonMethod::Euclidean,
        ComparisonMethod::Minkowski,
        ComparisonMethod::Sqeuclidean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonMethod::Baseline => "baseline",
            ComparisonMethod::Mueller2010 => "mueller2010",
            ComparisonMethod::Mueller2013 => "mueller2013",
            ComparisonMethod::Schroff => "schroff",
            ComparisonMethod::Kendall => "kendall",
            ComparisonMethod::ScipyKendall => "scipy_kendall",
            ComparisonMethod::WeightedKendall => "weighted_kendall",
            ComparisonMethod::Spearman => "spearman",
            ComparisonMethod::Wartmann => "wartmann",
            ComparisonMethod::Braycurtis => "braycurtis",
            ComparisonMethod::Canberra => "canberra",
            ComparisonMethod::Chebyshev => "chebyshev",
            ComparisonMethod::Cityblock => "cityblock",
            ComparisonMethod::Correlation => "correlation",
            ComparisonMethod::Cosine => "cosine",
            ComparisonMethod::Euclidean => "euclidean",
            ComparisonMethod::Minkowski => "minkowski",
            ComparisonMethod::Sqeuclidean => "sqeuclidean",
        }
    }

    pub fn category(self) -> Category {
        use ComparisonMethod::*;
        match self {
            Baseline => Category::Baseline,
            Mueller2010 | Mueller2013 | Schroff | Kendall | ScipyKendall | WeightedKendall
            | Spearman | Wartmann => Category::RankList,
            Braycurtis | Canberra | Chebyshev | Cityblock | Correlation | Cosine | Euclidean
            | Minkowski | Sqeuclidean => Category::Standardization,
        }
    }
}

impl fmt::Display for ComparisonMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "wartmann_parametric" {
            return Ok(ComparisonMethod::Wartmann);
        }
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| EngineError::UnknownMethod(s.to_string()))
    }
}

/// Tunable constants of the parametric formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    pub mueller2013_lambda: f64,
    pub schroff_k: usize,
    pub wartmann_alpha: f64,
    pub wartmann_beta: f64,
    pub minkowski_p: f64,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            mueller2013_lambda: 0.99,
            schroff_k: 43,
            wartmann_alpha: 1.0,
            wartmann_beta: 1.0,
            minkowski_p: 2.0,
        }
    }
}

/// Pairwise similarity, higher is more similar.
pub trait Scorer {
    fn score(&self, probe: &Sample, candidate: &Sample) -> Result<f64>;
}

/// Scores with one of the closed set of comparison methods.
#[derive(Debug, Clone)]
pub struct MethodScorer {
    method: ComparisonMethod,
    params: SimilarityParams,
}

impl MethodScorer {
    pub fn new(method: ComparisonMethod, params: SimilarityParams) -> Self {
        Self { method, params }
    }

    fn rank_score(&self, p: &[usize], c: &[usize]) -> f64 {
        let params = &self.params;
        match self.method {
            ComparisonMethod::Mueller2010 => mueller2010(p, c),
            ComparisonMethod::Mueller2013 => mueller2013(p, c, params.mueller2013_lambda),
            ComparisonMethod::Schroff => schroff(p, c, params.schroff_k),
            ComparisonMethod::Kendall => rank::kendall_pivot(p, c),
            ComparisonMethod::ScipyKendall => {
                rank::kendall_tau_b(&rank::as_f64(p), &rank::as_f64(c))
            }
            ComparisonMethod::WeightedKendall => {
                rank::weighted_tau(&rank::as_f64(p), &rank::as_f64(c))
            }
            ComparisonMethod::Spearman => rank::spearman(&rank::as_f64(p), &rank::as_f64(c)),
            ComparisonMethod::Wartmann => {
                wartmann(p, c, params.wartmann_alpha, params.wartmann_beta)
            }
            _ => f64::NAN,
        }
    }

    fn distance(&self, u: &Array1<f64>, v: &Array1<f64>) -> f64 {
        match self.method {
            ComparisonMethod::Braycurtis => distance::braycurtis(u, v),
            ComparisonMethod::Canberra => distance::canberra(u, v),
            ComparisonMethod::Chebyshev => distance::chebyshev(u, v),
            ComparisonMethod::Cityblock => distance::cityblock(u, v),
            ComparisonMethod::Correlation => distance::correlation(u, v),
            ComparisonMethod::Cosine => distance::cosine(u, v),
            ComparisonMethod::Euclidean => distance::euclidean(u, v),
            ComparisonMethod::Minkowski => distance::minkowski(u, v, self.params.minkowski_p),
            ComparisonMethod::Sqeuclidean => distance::sqeuclidean(u, v),
            _ => f64::NAN,
        }
    }
}

impl Scorer for MethodScorer {
    fn score(&self, probe: &Sample, candidate: &Sample) -> Result<f64> {
        match self.method.category() {
            Category::Baseline => {
                let (u, v) = (&probe.features, &candidate.features);
                if u.len() != v.len() {
                    return Err(EngineError::DimensionMismatch {
                        expected: u.len(),
                        actual: v.len(),
                    });
                }
                Ok(-distance::cosine(u, v))
            }
            Category::RankList => {
                let p = probe.rank_list().ok_or_else(|| missing(probe, "rank list"))?;
                let c = candidate
                    .rank_list()
                    .ok_or_else(|| missing(candidate, "rank list"))?;
                check_lengths(p.len(), c.len())?;
                Ok(self.rank_score(p.as_slice(), c.as_slice()))
            }
            Category::Standardization => {
                let u = probe
                    .standardized_distances()
                    .ok_or_else(|| missing(probe, "standardized distances"))?;
                let v = candidate
                    .standardized_distances()
                    .ok_or_else(|| missing(candidate, "standardized distances"))?;
                check_lengths(u.len(), v.len())?;
                Ok(-self.distance(u, v))
            }
        }
    }
}

fn missing(sample: &Sample, needed: &'static str) -> EngineError {
    EngineError::MissingDerivation {
        reference_id: sample.reference_id.clone(),
        needed,
    }
}

fn check_lengths(probe: usize, candidate: usize) -> Result<()> {
    if probe != candidate {
        return Err(EngineError::LengthMismatch { probe, candidate });
    }
    Ok(())
}

pub fn mueller2010(p: &[usize], c: &[usize]) -> f64 {
    p.iter()
        .zip(c)
        .map(|(&rp, &rc)| 1.0 / ((rp + rc + 1) as f64).sqrt())
        .sum()
}

pub fn mueller2013(p: &[usize], c: &[usize], lambda: f64) -> f64 {
    p.iter()
        .zip(c)
        .map(|(&rp, &rc)| lambda.powi((rp + rc) as i32))
        .sum()
}

/// Only ranks within the top `k` contribute.
pub fn schroff(p: &[usize], c: &[usize], k: usize) -> f64 {
    let top = k as i64 + 1;
    p.iter()
        .zip(c)
        .map(|(&rp, &rc)| {
            let a = (top - rp as i64).max(0);
            let b = (top - rc as i64).max(0);
            (a * b) as f64
        })
        .sum()
}

/// Penalises rank displacement, weighted towards both ends of the list.
pub fn wartmann(p: &[usize], c: &[usize], alpha: f64, beta: f64) -> f64 {
    let n = p.len() as f64;
    let half = n * 0.5;
    let penalty: f64 = p
        .iter()
        .zip(c)
        .map(|(&rp, &rc)| {
            let (rp, rc) = (rp as f64, rc as f64);
            ((rp - rc).abs() / n).powf(alpha)
                * ((rp / half - 1.0).abs().powf(beta) + (rc / half - 1.0).abs().powf(beta))
        })
        .sum();
    -penalty
}
