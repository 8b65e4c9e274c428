use anyhow::{Context, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One stored feature vector, keyed by the dataset's sample key.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub key: String,
    pub features: Vec<f64>,
}

/// Source of raw feature vectors. A missing key is an error, never skipped.
pub trait FeatureStore {
    fn load(&self, key: &str) -> Result<Array1<f64>>;
}

/// Directory of postcard-encoded `FeatureRecord`s, one `<key>.bin` per sample.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let mut p = self.root.join(key);
        p.as_mut_os_string().push(".bin");
        p
    }

    pub fn save(&self, record: &FeatureRecord) -> Result<()> {
        let file = self.record_path(&record.key);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let data = postcard::to_allocvec(record)?;
        std::fs::write(&file, data).with_context(|| format!("writing {}", file.display()))?;
        Ok(())
    }

    /// Writes every vector of a `{ key: [number, ...] }` JSON map into the store,
    /// keeping full `f64` precision.
    pub fn import_json(&self, json: &Path) -> Result<usize> {
        let raw =
            std::fs::read_to_string(json).with_context(|| format!("reading {}", json.display()))?;
        let features: BTreeMap<String, Vec<f64>> =
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", json.display()))?;
        let count = features.len();
        for (key, features) in features {
            self.save(&FeatureRecord { key, features })?;
        }
        Ok(count)
    }
}

impl FeatureStore for DirectoryStore {
    fn load(&self, key: &str) -> Result<Array1<f64>> {
        let file = self.record_path(key);
        if !file.exists() {
            anyhow::bail!(
                "feature file for sample '{}' not found at {}",
                key,
                file.display()
            );
        }
        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        let record: FeatureRecord = postcard::from_bytes(&data)
            .with_context(|| format!("decoding {}", file.display()))?;
        Ok(Array1::from(record.features))
    }
}

/// In-memory store, handy for tests and small synthetic datasets.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    features: HashMap<String, Array1<f64>>,
}

impl MemoryStore {
    pub fn insert(&mut self, key: impl Into<String>, features: Array1<f64>) {
        self.features.insert(key.into(), features);
    }
}

impl FeatureStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Array1<f64>> {
        self.features
            .get(key)
            .cloned()
            .with_context(|| format!("feature vector for sample '{}' not found", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_save_and_load_nested_key() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = DirectoryStore::new(dir.path());
        store.save(&FeatureRecord {
            key: "surveillance/001_cam1_1".to_string(),
            features: vec![0.5, -1.0, 2.0],
        })?;
        assert!(dir.path().join("surveillance/001_cam1_1.bin").exists());
        assert_eq!(store.load("surveillance/001_cam1_1")?, array![0.5, -1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_missing_key_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let err = DirectoryStore::new(dir.path()).load("nope").unwrap_err();
        assert!(err.to_string().contains("'nope' not found"));
        assert!(MemoryStore::default().load("nope").is_err());
        Ok(())
    }

    #[test]
    fn test_import_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let json = dir.path().join("features.json");
        std::fs::write(&json, r#"{"a": [1.0, 0.0], "mugshot/b": [0.0, 1.0]}"#)?;
        let store = DirectoryStore::new(dir.path().join("store"));
        assert_eq!(store.import_json(&json)?, 2);
        assert_eq!(store.load("mugshot/b")?, array![0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_import_keeps_f64_precision() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let json = dir.path().join("features.json");
        std::fs::write(&json, r#"{"x": [0.1, 1e-300, 123456.789012345]}"#)?;
        let store = DirectoryStore::new(dir.path().join("store"));
        store.import_json(&json)?;
        let x = store.load("x")?;
        // all three would lose digits (or underflow) as f32
        assert!((x[0] - 0.1).abs() < 1e-15);
        assert!(x[1] > 0.0 && (x[1] / 1e-300 - 1.0).abs() < 1e-12);
        assert!((x[2] - 123456.789012345).abs() < 1e-9);
        Ok(())
    }
}
