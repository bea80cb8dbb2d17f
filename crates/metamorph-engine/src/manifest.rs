//! Persisted record of the results of one run.
//!
//! The engine hands its full result list to a [`ManifestSink`] exactly once per
//! run, and never when no sink was configured. [`JsonManifestWriter`] is the
//! file-backed sink used by the CLI.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use metamorph_types::{Result, TransformationCategory, TransformationResult};

/// Receiver of the run's results.
pub trait ManifestSink: Send {
    fn write_manifest(&mut self, results: &[TransformationResult]) -> Result<()>;
}

/// Everything a manifest file contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    /// RFC 3339 timestamp of when the manifest was written.
    pub written_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Distinct transformer names that produced a result, sorted.
    pub transformation_names: BTreeSet<String>,
    /// Number of non-empty results per category.
    pub categories: BTreeMap<TransformationCategory, usize>,
    pub transformations: Vec<TransformationResult>,
}

impl Manifest {
    pub fn new(results: &[TransformationResult]) -> Self {
        let mut names = BTreeSet::new();
        let mut categories = BTreeMap::new();
        for result in results.iter().filter(|r| !r.is_empty()) {
            names.insert(result.name().to_string());
            for category in result.categories() {
                *categories.entry(category).or_insert(0) += 1;
            }
        }
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            written_at: chrono::Utc::now().to_rfc3339(),
            seed: None,
            registry: None,
            transformation_names: names,
            categories,
            transformations: results.to_vec(),
        }
    }

    /// Results that are not the empty sentinel.
    pub fn applied(&self) -> usize {
        self.transformations.iter().filter(|r| !r.is_empty()).count()
    }
}

/// Writes the manifest as pretty-printed JSON to a file.
#[derive(Debug, Clone)]
pub struct JsonManifestWriter {
    path: PathBuf,
    seed: Option<u64>,
    registry: Option<String>,
}

impl JsonManifestWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: None,
            registry: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSink for JsonManifestWriter {
    fn write_manifest(&mut self, results: &[TransformationResult]) -> Result<()> {
        let mut manifest = Manifest::new(results);
        manifest.seed = self.seed;
        manifest.registry = self.registry.clone();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&self.path, json)?;
        tracing::info!(
            path = %self.path.display(),
            run_id = %manifest.run_id,
            results = results.len(),
            "manifest written"
        );
        Ok(())
    }
}

/// Read a manifest written by [`JsonManifestWriter`].
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
