use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rankface_engine::{SimilarityParams, StandardizationMethod};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("RANKFACE_CONFIG_PATH").unwrap_or("rankface.toml")));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset manifest listing probe, gallery and cohort samples.
    pub manifest: PathBuf,
    /// Root of the feature store.
    pub features_dir: PathBuf,
    pub output_dir: PathBuf,
    pub record_output: bool,
    pub standardization: StandardizationMethod,
    /// Use the realized cohort size as Schroff's k instead of `params.schroff_k`.
    pub schroff_k_from_cohort: bool,
    pub params: SimilarityParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("manifest.json"),
            features_dir: PathBuf::from("features"),
            output_dir: PathBuf::from("output"),
            record_output: false,
            standardization: StandardizationMethod::default(),
            schroff_k_from_cohort: true,
            params: SimilarityParams::default(),
        }
    }
}

impl Config {
    /// Similarity parameters for one protocol run, given the realized cohort size.
    pub fn params_for(&self, cohort_size: Option<usize>) -> SimilarityParams {
        let mut params = self.params.clone();
        if self.schroff_k_from_cohort {
            if let Some(k) = cohort_size {
                params.schroff_k = k;
            }
        }
        params
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
