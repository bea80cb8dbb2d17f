//! Run configuration, loaded from JSON and turned into a configured [`Engine`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use metamorph_tree::{SourceLoader, DEFAULT_PATTERN};
use metamorph_types::{MetamorphError, Result, TransformationCategory};

use crate::distribution::Distribution;
use crate::engine::{Engine, DEFAULT_TRANSFORMATIONS};
use crate::exclusivity::ExclusivityPolicy;
use crate::manifest::JsonManifestWriter;
use crate::names::NameStyle;
use crate::registry::{default_registry_with_names, TransformerRegistry};
use crate::retry::RetryPolicy;
use crate::scope::TransformationScope;
use crate::transformer::DEFAULT_SEED;

/// Everything a run needs. Missing fields take their defaults, so `{}` plus a
/// source and an output is a complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub source: String,
    pub output: String,
    /// Glob selecting the source files below `source`.
    pub pattern: String,
    pub scope: TransformationScope,
    /// Signed so that a negative value reaches the engine and is rejected there.
    pub transformations: i64,
    pub seed: u64,
    pub write_output: bool,
    pub remove_all_comments: bool,
    pub manifest: Option<PathBuf>,
    pub debug: bool,
    pub retry: RetryPolicy,
    pub exclusivity: ExclusivityPolicy,
    /// Weight per transformer name. Applied after `category_weights`.
    pub weights: BTreeMap<String, i64>,
    pub category_weights: HashMap<TransformationCategory, i64>,
    pub names: NameStyle,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            output: String::new(),
            pattern: DEFAULT_PATTERN.to_string(),
            scope: TransformationScope::Global,
            transformations: DEFAULT_TRANSFORMATIONS as i64,
            seed: DEFAULT_SEED,
            write_output: true,
            remove_all_comments: false,
            manifest: None,
            debug: false,
            retry: RetryPolicy::default(),
            exclusivity: ExclusivityPolicy::default(),
            weights: BTreeMap::new(),
            category_weights: HashMap::new(),
            names: NameStyle::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn loader(&self) -> Result<SourceLoader> {
        SourceLoader::with_pattern(&self.source, &self.pattern)
    }

    /// The built-in transformers, seeded and named as configured.
    pub fn build_registry(&self) -> TransformerRegistry {
        default_registry_with_names(self.seed, self.names)
    }

    /// `None` when neither per-name nor per-category weights are set.
    pub fn distribution(&self, registry: &TransformerRegistry) -> Result<Option<Distribution>> {
        if self.weights.is_empty() && self.category_weights.is_empty() {
            return Ok(None);
        }
        let mut weights: BTreeMap<_, _> = Distribution::by_category(registry, &self.category_weights)?
            .iter()
            .collect();
        for (name, weight) in &self.weights {
            let id = registry
                .find(name)
                .ok_or_else(|| MetamorphError::UnknownTransformer(name.clone()))?;
            weights.insert(id, *weight);
        }
        Ok(Some(Distribution::new(weights)))
    }

    /// Build an engine and apply every setting. Fails on the first invalid one.
    pub fn into_engine(self) -> Result<Engine> {
        let registry = self.build_registry();
        let distribution = self.distribution(&registry)?;
        let mut engine = Engine::new(&self.source, &self.output, registry)?;
        engine.set_transformations_per_scope(self.transformations, self.scope)?;
        engine.set_random_seed(self.seed);
        if let Some(distribution) = distribution {
            engine.set_distribution(distribution)?;
        }
        engine.set_write_output(self.write_output);
        engine.set_remove_all_comments(self.remove_all_comments);
        engine.set_retry_policy(self.retry);
        engine.set_exclusivity_policy(self.exclusivity);
        engine.set_debug(self.debug);
        if let Some(path) = &self.manifest {
            let writer = JsonManifestWriter::new(path)
                .with_seed(self.seed)
                .with_registry(engine.registry().name());
            engine.set_manifest_sink(Box::new(writer));
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_takes_defaults() {
        let config = RunConfig::from_json("{}").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.transformations, 100);
        assert_eq!(config.seed, 2020);
        assert_eq!(config.pattern, "**/*.mm");
        assert!(config.write_output);
    }

    #[test]
    fn full_document_parses() {
        let json = r#"{
            "source": "src",
            "output": "out",
            "scope": "per_class_each",
            "transformations": 3,
            "seed": 7,
            "remove_all_comments": true,
            "manifest": "out/manifest.json",
            "retry": {"policy": "redraw", "max_redraws": 2},
            "exclusivity": "per_node",
            "weights": {"IfTrue": 4},
            "category_weights": {"comment": 2},
            "names": "random"
        }"#;
        let config = RunConfig::from_json(json).unwrap();
        assert_eq!(config.scope, TransformationScope::PerClassEach);
        assert_eq!(config.retry, RetryPolicy::Redraw { max_redraws: 2 });
        assert_eq!(config.exclusivity, ExclusivityPolicy::PerNode);
        assert_eq!(config.names, NameStyle::Random);
        assert_eq!(config.category_weights[&TransformationCategory::Comment], 2);
    }

    #[test]
    fn unknown_scope_fails_to_parse() {
        assert!(RunConfig::from_json(r#"{"scope": "perPackage"}"#).is_err());
    }

    #[test]
    fn into_engine_applies_every_setting() {
        let config = RunConfig {
            source: "src".into(),
            output: "out".into(),
            scope: TransformationScope::PerMethod,
            transformations: 4,
            seed: 11,
            write_output: false,
            retry: RetryPolicy::Redraw { max_redraws: 1 },
            weights: BTreeMap::from([("IfTrue".to_string(), 5)]),
            category_weights: HashMap::from([(TransformationCategory::Comment, 2)]),
            ..RunConfig::default()
        };
        let engine = config.into_engine().unwrap();
        assert_eq!(engine.transformations_per_scope(), 4);
        assert_eq!(engine.scope(), TransformationScope::PerMethod);
        assert_eq!(engine.seed(), 11);
        assert!(!engine.write_output());
        let dist = engine.distribution().unwrap();
        let registry = engine.registry();
        assert_eq!(dist.weight(registry.find("IfTrue").unwrap()), 5);
        assert_eq!(dist.weight(registry.find("RandomInlineComment").unwrap()), 2);
        assert_eq!(dist.weight(registry.find("EmptyMethod").unwrap()), 0);
    }

    #[test]
    fn into_engine_rejects_bad_settings() {
        let base = RunConfig {
            source: "src".into(),
            output: "out".into(),
            ..RunConfig::default()
        };

        let err = RunConfig {
            transformations: -3,
            ..base.clone()
        }
        .into_engine()
        .err()
        .unwrap();
        assert!(matches!(err, MetamorphError::NegativeCount(-3)));

        let err = RunConfig {
            weights: BTreeMap::from([("Nope".to_string(), 1)]),
            ..base.clone()
        }
        .into_engine()
        .err()
        .unwrap();
        assert!(matches!(err, MetamorphError::UnknownTransformer(ref n) if n == "Nope"));

        let err = RunConfig {
            weights: BTreeMap::from([("IfTrue".to_string(), -1)]),
            ..base.clone()
        }
        .into_engine()
        .err()
        .unwrap();
        assert!(matches!(err, MetamorphError::NegativeWeight { .. }));

        let err = RunConfig {
            output: "  ".into(),
            ..base
        }
        .into_engine()
        .err()
        .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn mixed_sign_category_weights_are_rejected() {
        let config = RunConfig::from_json(
            r#"{"source": "src", "output": "out", "category_weights": {"comment": -1, "nlp": 1}}"#,
        )
        .unwrap();
        let err = config.into_engine().err().unwrap();
        assert!(matches!(
            err,
            MetamorphError::NegativeWeight { ref transformer, weight: -1 } if transformer == "category comment"
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{"source": "a", "output": "b", "seed": 5}"#).unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.seed, 5);
        assert_eq!(config.source, "a");
        assert!(RunConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
