use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Capture distance of a surveillance image; one evaluation condition each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Close,
    Medium,
    Far,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Close, Protocol::Medium, Protocol::Far];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Close => "close",
            Protocol::Medium => "medium",
            Protocol::Far => "far",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "close" => Ok(Protocol::Close),
            "medium" => Ok(Protocol::Medium),
            "far" => Ok(Protocol::Far),
            other => Err(EngineError::UnknownProtocol(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capture {
    Surveillance,
    Mugshot,
}

/// Ordinal position of every cohort entry relative to one sample, 0 = closest.
///
/// Always a permutation of `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankList(Vec<usize>);

impl RankList {
    /// Double argsort of the distances: the smallest distance gets rank 0.
    ///
    /// The sort is stable, so equal distances keep cohort order. NaN
    /// distances, whatever their sign bit, rank after every number and keep
    /// cohort order among themselves.
    pub fn from_distances(distances: &Array1<f64>) -> Self {
        let mut order: Vec<usize> = (0..distances.len()).collect();
        order.sort_by(|&a, &b| {
            let (da, db) = (distances[a], distances[b]);
            match (da.is_nan(), db.is_nan()) {
                (false, false) => da.total_cmp(&db),
                (nan_a, nan_b) => nan_a.cmp(&nan_b),
            }
        });

        let mut ranks = vec![0; order.len()];
        for (rank, &idx) in order.iter().enumerate() {
            ranks[idx] = rank;
        }
        RankList(ranks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for RankList {
    type Error = EngineError;

    fn try_from(ranks: Vec<usize>) -> Result<Self> {
        let n = ranks.len();
        let mut seen = vec![false; n];
        for &r in &ranks {
            if r >= n || seen[r] {
                return Err(EngineError::InvalidRankList(n));
            }
            seen[r] = true;
        }
        Ok(RankList(ranks))
    }
}

/// Cohort-relative representation attached to a sample by the preprocessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Derived {
    Raw,
    RankList(RankList),
    Standardized(Array1<f64>),
}

/// A probe or gallery sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub reference_id: String,
    pub subject_id: String,
    pub features: Array1<f64>,
    derived: Derived,
}

impl Sample {
    pub fn new(
        reference_id: impl Into<String>,
        subject_id: impl Into<String>,
        features: Array1<f64>,
    ) -> Self {
        Self {
            reference_id: reference_id.into(),
            subject_id: subject_id.into(),
            features,
            derived: Derived::Raw,
        }
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn rank_list(&self) -> Option<&RankList> {
        match &self.derived {
            Derived::RankList(r) => Some(r),
            _ => None,
        }
    }

    pub fn standardized_distances(&self) -> Option<&Array1<f64>> {
        match &self.derived {
            Derived::Standardized(d) => Some(d),
            _ => None,
        }
    }

    /// Attach the derived field. A sample is preprocessed at most once.
    pub fn assign(&mut self, derived: Derived) -> Result<()> {
        if self.derived != Derived::Raw {
            return Err(EngineError::AlreadyPreprocessed {
                reference_id: self.reference_id.clone(),
            });
        }
        self.derived = derived;
        Ok(())
    }
}

/// Background population entry used to build the cohort reference sets.
#[derive(Debug, Clone)]
pub struct CohortSample {
    pub subject_id: String,
    pub capture: Capture,
    pub distance: Option<Protocol>,
    pub features: Array1<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rank_list_from_distances() {
        let ranks = RankList::from_distances(&array![0.4, 0.1, 0.9, 0.2]);
        assert_eq!(ranks.as_slice(), &[2, 0, 3, 1]);
    }

    #[test]
    fn test_rank_list_ties_keep_cohort_order() {
        let ranks = RankList::from_distances(&array![0.5, 0.5, 0.1]);
        assert_eq!(ranks.as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn test_rank_list_nan_ranks_last() {
        // a zero-norm cohort entry yields a NaN cosine distance, possibly sign-negative
        let ranks = RankList::from_distances(&array![0.1, -f64::NAN, 0.5]);
        assert_eq!(ranks.as_slice(), &[0, 2, 1]);
        let ranks = RankList::from_distances(&array![f64::NAN, 0.3, -f64::NAN, 0.2]);
        assert_eq!(ranks.as_slice(), &[2, 1, 3, 0]);
    }

    #[test]
    fn test_rank_list_rejects_non_permutation() {
        assert!(RankList::try_from(vec![0, 2, 1]).is_ok());
        assert!(RankList::try_from(vec![0, 0, 1]).is_err());
        assert!(RankList::try_from(vec![0, 3, 1]).is_err());
    }

    #[test]
    fn test_assign_once() {
        let mut s = Sample::new("r1", "s1", array![1.0, 0.0]);
        s.assign(Derived::Standardized(array![0.0])).unwrap();
        assert!(s.standardized_distances().is_some());
        assert!(s.rank_list().is_none());
        assert!(s.assign(Derived::Standardized(array![1.0])).is_err());
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!("far".parse::<Protocol>().unwrap(), Protocol::Far);
        assert!("all".parse::<Protocol>().is_err());
    }
}
