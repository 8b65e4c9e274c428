//! Cohort reference sets and the preprocessing that turns raw features into
//! rank lists or standardized distance vectors.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::distance;
use crate::error::{EngineError, Result};
use crate::sample::{Capture, CohortSample, Derived, Protocol, RankList, Sample};
use crate::similarity::Category;

/// Transform applied to a cohort distance vector in the standardization category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardizationMethod {
    /// Subtract the mean, divide by the population standard deviation.
    Standardize,
    #[default]
    SubtractMean,
    Omitted,
}

impl StandardizationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            StandardizationMethod::Standardize => "standardize",
            StandardizationMethod::SubtractMean => "subtract_mean",
            StandardizationMethod::Omitted => "omitted",
        }
    }

    pub fn apply(self, distances: Array1<f64>) -> Array1<f64> {
        match self {
            StandardizationMethod::Omitted => distances,
            StandardizationMethod::SubtractMean => {
                let mean = distances.mean().unwrap_or(f64::NAN);
                distances - mean
            }
            StandardizationMethod::Standardize => {
                let mean = distances.mean().unwrap_or(f64::NAN);
                let std = distances.std(0.0);
                (distances - mean) / std
            }
        }
    }
}

impl fmt::Display for StandardizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardizationMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standardize" => Ok(StandardizationMethod::Standardize),
            "subtract_mean" => Ok(StandardizationMethod::SubtractMean),
            "omitted" => Ok(StandardizationMethod::Omitted),
            other => Err(EngineError::UnknownStandardization(other.to_string())),
        }
    }
}

/// One representative feature vector per cohort subject, in ascending
/// subject order. Distance vectors and rank lists index into this order.
#[derive(Debug, Clone, Default)]
pub struct CohortSet {
    subjects: Vec<String>,
    vectors: Vec<Array1<f64>>,
}

impl CohortSet {
    /// Builds the set, sorting entries by subject id.
    pub fn from_entries(mut entries: Vec<(String, Array1<f64>)>) -> Result<Self> {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(dim) = entries.first().map(|(_, v)| v.len()) {
            if let Some((_, v)) = entries.iter().find(|(_, v)| v.len() != dim) {
                return Err(EngineError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }
        let (subjects, vectors) = entries.into_iter().unzip();
        Ok(Self { subjects, vectors })
    }

    /// Component-wise mean of all feature vectors sharing a subject id.
    pub fn averaged<'a>(samples: impl IntoIterator<Item = &'a CohortSample>) -> Result<Self> {
        let mut sums: HashMap<&str, (Array1<f64>, usize)> = HashMap::new();
        for sample in samples {
            match sums.get_mut(sample.subject_id.as_str()) {
                Some((sum, count)) => {
                    if sum.len() != sample.features.len() {
                        return Err(EngineError::DimensionMismatch {
                            expected: sum.len(),
                            actual: sample.features.len(),
                        });
                    }
                    *sum += &sample.features;
                    *count += 1;
                }
                None => {
                    sums.insert(&sample.subject_id, (sample.features.clone(), 1));
                }
            }
        }
        let entries = sums
            .into_iter()
            .map(|(subject, (sum, count))| (subject.to_string(), sum / count as f64))
            .collect();
        Self::from_entries(entries)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn get(&self, subject: &str) -> Option<&Array1<f64>> {
        self.subjects
            .binary_search_by(|s| s.as_str().cmp(subject))
            .ok()
            .map(|i| &self.vectors[i])
    }

    /// Cosine distance from `features` to every entry, in subject order.
    pub fn distances(&self, features: &Array1<f64>) -> Result<Array1<f64>> {
        if let Some(first) = self.vectors.first() {
            if first.len() != features.len() {
                return Err(EngineError::DimensionMismatch {
                    expected: first.len(),
                    actual: features.len(),
                });
            }
        }
        Ok(self
            .vectors
            .iter()
            .map(|c| distance::cosine(features, c))
            .collect())
    }
}

/// The two cohort partitions, aligned on the same subject order.
#[derive(Debug, Clone)]
pub struct Cohorts {
    /// Averaged surveillance captures at the active protocol's distance.
    pub probe_side: CohortSet,
    /// Mugshots, one per subject of `probe_side`.
    pub reference_side: CohortSet,
}

/// Splits cohort samples by capture type and aligns the mugshot partition to
/// the subjects of the surveillance partition.
pub fn split_cohort(samples: &[CohortSample], protocol: Protocol) -> Result<Cohorts> {
    let surveillance = samples
        .iter()
        .filter(|s| s.capture == Capture::Surveillance && s.distance == Some(protocol));
    let probe_side = CohortSet::averaged(surveillance)?;
    if probe_side.is_empty() {
        return Err(EngineError::EmptyCohort {
            protocol: protocol.to_string(),
        });
    }

    let mut mugshots: HashMap<&str, &Array1<f64>> = HashMap::new();
    for sample in samples.iter().filter(|s| s.capture == Capture::Mugshot) {
        if mugshots
            .insert(&sample.subject_id, &sample.features)
            .is_some()
        {
            debug!(
                "duplicate cohort mugshot for subject {}, keeping the last",
                sample.subject_id
            );
        }
    }

    let mut entries = Vec::with_capacity(probe_side.len());
    for subject in probe_side.subjects() {
        let features = mugshots
            .remove(subject.as_str())
            .ok_or_else(|| EngineError::CohortCoverage {
                subject: subject.clone(),
            })?;
        entries.push((subject.clone(), features.clone()));
    }
    if !mugshots.is_empty() {
        debug!(
            "{} cohort mugshot subject(s) have no {} surveillance capture and are unused",
            mugshots.len(),
            protocol
        );
    }
    let reference_side = CohortSet::from_entries(entries)?;

    debug!(
        "cohort for {}: {} subject(s) on each side",
        protocol,
        probe_side.len()
    );
    Ok(Cohorts {
        probe_side,
        reference_side,
    })
}

/// Probes and gallery after preprocessing.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub probes: Vec<Sample>,
    pub references: Vec<Sample>,
    /// Realized probe-side cohort size; `None` when no cohort was used.
    pub cohort_size: Option<usize>,
}

/// Derives the cohort-relative field each comparison category consumes.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    category: Category,
    standardization: StandardizationMethod,
}

impl Preprocessor {
    pub fn new(category: Category, standardization: StandardizationMethod) -> Self {
        Self {
            category,
            standardization,
        }
    }

    /// Name reported next to the preprocessing time.
    pub fn method_name(&self) -> Option<&'static str> {
        match self.category {
            Category::Baseline => None,
            Category::RankList => Some("rank-list"),
            Category::Standardization => Some(self.standardization.as_str()),
        }
    }

    pub fn needs_cohort(&self) -> bool {
        self.category != Category::Baseline
    }

    pub fn prepare(
        &self,
        mut probes: Vec<Sample>,
        mut references: Vec<Sample>,
        cohort: &[CohortSample],
        protocol: Protocol,
    ) -> Result<Prepared> {
        if !self.needs_cohort() {
            return Ok(Prepared {
                probes,
                references,
                cohort_size: None,
            });
        }

        let cohorts = split_cohort(cohort, protocol)?;
        match self.category {
            Category::RankList => {
                let rank = |d: Array1<f64>| Derived::RankList(RankList::from_distances(&d));
                derive_all(&mut probes, &cohorts.probe_side, rank)?;
                derive_all(&mut references, &cohorts.reference_side, rank)?;
            }
            _ => {
                let method = self.standardization;
                let standardize = |d: Array1<f64>| Derived::Standardized(method.apply(d));
                derive_all(&mut probes, &cohorts.probe_side, standardize)?;
                derive_all(&mut references, &cohorts.reference_side, standardize)?;
            }
        }

        Ok(Prepared {
            probes,
            references,
            cohort_size: Some(cohorts.probe_side.len()),
        })
    }
}

fn derive_all(
    samples: &mut [Sample],
    cohort: &CohortSet,
    derive: impl Fn(Array1<f64>) -> Derived,
) -> Result<()> {
    for sample in samples {
        let distances = cohort.distances(&sample.features)?;
        sample.assign(derive(distances))?;
    }
    Ok(())
}
