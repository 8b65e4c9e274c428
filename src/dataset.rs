use anyhow::{Context, Result};
use log::{debug, warn};
use rankface_engine::{Capture, CohortSample, Protocol, Sample};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::FeatureStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Probe,
    Reference,
    Cohort,
}

/// One image of the dataset. `key` locates its features in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    pub key: String,
    pub reference_id: String,
    pub subject_id: String,
    pub role: Role,
    pub capture: Capture,
    #[serde(default)]
    pub distance: Option<Protocol>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub samples: Vec<SampleEntry>,
}

/// Samples one protocol run works on, features not yet loaded.
#[derive(Debug, Clone)]
pub struct Extraction<'a> {
    pub probes: Vec<&'a SampleEntry>,
    pub references: Vec<&'a SampleEntry>,
    pub cohort: Vec<&'a SampleEntry>,
}

pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest at {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing manifest {}", path.display()))
}

impl Manifest {
    /// Probes captured at the protocol's distance, every reference, the whole cohort.
    pub fn extract(&self, protocol: Protocol) -> Extraction<'_> {
        let of_role = |role: Role| self.samples.iter().filter(move |s| s.role == role);
        let extraction = Extraction {
            probes: of_role(Role::Probe)
                .filter(|s| s.distance == Some(protocol))
                .collect(),
            references: of_role(Role::Reference).collect(),
            cohort: of_role(Role::Cohort).collect(),
        };
        debug!(
            "{}: {} probe(s), {} reference(s), {} cohort sample(s)",
            protocol,
            extraction.probes.len(),
            extraction.references.len(),
            extraction.cohort.len()
        );
        extraction
    }
}

/// Loads features for probe or reference entries. Fails on the first missing key.
pub fn load_samples(entries: &[&SampleEntry], store: &dyn FeatureStore) -> Result<Vec<Sample>> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .map(|e| -> Result<Sample> {
            if !seen.insert(e.reference_id.as_str()) {
                warn!("more than one sample for reference {}", e.reference_id);
            }
            let features = store
                .load(&e.key)
                .with_context(|| format!("loading features of {}", e.reference_id))?;
            Ok(Sample::new(&e.reference_id, &e.subject_id, features))
        })
        .collect()
}

pub fn load_cohort(
    entries: &[&SampleEntry],
    store: &dyn FeatureStore,
) -> Result<Vec<CohortSample>> {
    entries
        .iter()
        .map(|e| -> Result<CohortSample> {
            Ok(CohortSample {
                subject_id: e.subject_id.clone(),
                capture: e.capture,
                distance: e.distance,
                features: store
                    .load(&e.key)
                    .with_context(|| format!("loading cohort features of {}", e.reference_id))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use ndarray::array;

    const MANIFEST: &str = r#"{
        "samples": [
            {"key": "p1", "reference_id": "001_close", "subject_id": "001",
             "role": "probe", "capture": "surveillance", "distance": "close"},
            {"key": "p2", "reference_id": "001_far", "subject_id": "001",
             "role": "probe", "capture": "surveillance", "distance": "far"},
            {"key": "g1", "reference_id": "001", "subject_id": "001",
             "role": "reference", "capture": "mugshot"},
            {"key": "c1", "reference_id": "090_close", "subject_id": "090",
             "role": "cohort", "capture": "surveillance", "distance": "close"},
            {"key": "c2", "reference_id": "090", "subject_id": "090",
             "role": "cohort", "capture": "mugshot"}
        ]
    }"#;

    #[test]
    fn test_extract_filters_probes_by_distance() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let close = manifest.extract(Protocol::Close);
        assert_eq!(close.probes.len(), 1);
        assert_eq!(close.probes[0].key, "p1");
        assert_eq!(close.references.len(), 1);
        assert_eq!(close.cohort.len(), 2);
        assert!(manifest.extract(Protocol::Medium).probes.is_empty());
    }

    #[test]
    fn test_unknown_capture_is_rejected() {
        let bad = MANIFEST.replace("mugshot", "selfie");
        assert!(serde_json::from_str::<Manifest>(&bad).is_err());
    }

    #[test]
    fn test_load_samples_fails_on_missing_features() {
        let manifest: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let mut store = MemoryStore::default();
        store.insert("c1", array![1.0, 0.0]);
        let extraction = manifest.extract(Protocol::Close);
        assert!(load_samples(&extraction.probes, &store).is_err());
        store.insert("c2", array![0.0, 1.0]);
        let cohort = load_cohort(&extraction.cohort, &store).unwrap();
        assert_eq!(cohort[1].capture, Capture::Mugshot);
        assert_eq!(cohort[0].distance, Some(Protocol::Close));
    }
}
