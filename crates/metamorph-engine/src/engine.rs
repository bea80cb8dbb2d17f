//! Transformation engine: the scheduling loop.
//!
//! A run goes through `Constructed → Configured → Running → Cleanup →
//! Finalized`. The class and method lists are captured once at the start of
//! [`Engine::run`]; nodes created by transformers are never targeted.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use metamorph_tree::{SubtreeMut, SyntaxTree};
use metamorph_types::{
    MetamorphError, NodeId, Result, TransformationCategory, TransformationResult,
};

use crate::distribution::{Distribution, SelectionPool};
use crate::exclusivity::{ExclusivityLedger, ExclusivityPolicy};
use crate::manifest::ManifestSink;
use crate::output::{Printer, SourcePrinter};
use crate::registry::{TransformerId, TransformerRegistry};
use crate::retry::RetryPolicy;
use crate::scope::TransformationScope;
use crate::transformer::{Transformer, DEFAULT_SEED};
use crate::transformers::RemoveAllComments;

/// Attempts per scope unit when nothing was configured.
pub const DEFAULT_TRANSFORMATIONS: usize = 100;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Constructed,
    Configured,
    Running,
    Cleanup,
    Finalized,
}

/// What a finished run hands back. The tree itself was mutated in place.
#[derive(Debug, Clone, Serialize)]
pub struct EngineOutcome {
    /// Ordered results, scheduled attempts first, then cleanup entries.
    pub results: Vec<TransformationResult>,
    /// Scheduled attempts, not counting redraws.
    pub attempts: usize,
    /// Structural failures, one per failed draw.
    pub failures: usize,
    /// Scheduled attempts that ended in an empty result.
    pub malformed: usize,
    pub write_output: bool,
}

impl EngineOutcome {
    fn empty(write_output: bool) -> Self {
        Self {
            results: Vec::new(),
            attempts: 0,
            failures: 0,
            malformed: 0,
            write_output,
        }
    }

    /// Results that are not the empty sentinel.
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| !r.is_empty()).count()
    }
}

/// Drives transformers over a tree according to a scope, a count and an
/// optional weighted distribution.
pub struct Engine {
    source_location: String,
    output_location: String,
    registry: TransformerRegistry,
    cleanup: RemoveAllComments,

    transformations: usize,
    scope: TransformationScope,
    distribution: Option<Distribution>,
    seed: u64,
    rng: ChaCha8Rng,

    write_output: bool,
    remove_all_comments: bool,
    retry: RetryPolicy,
    exclusivity: ExclusivityPolicy,
    debug: bool,

    sink: Option<Box<dyn ManifestSink>>,
    printer: Box<dyn Printer>,
    phase: EnginePhase,
}

// ---------------------------------------------------------------------------
// Construction and configuration
// ---------------------------------------------------------------------------

impl Engine {
    pub fn new(
        source_location: impl Into<String>,
        output_location: impl Into<String>,
        registry: TransformerRegistry,
    ) -> Result<Self> {
        let source_location = source_location.into();
        let output_location = output_location.into();
        if source_location.trim().is_empty() {
            return Err(MetamorphError::InvalidConfiguration(
                "source location cannot be blank".into(),
            ));
        }
        if output_location.trim().is_empty() {
            return Err(MetamorphError::InvalidConfiguration(
                "output location cannot be blank".into(),
            ));
        }
        if registry.is_empty() {
            warn!(registry = %registry.name(), "registry has no transformers");
        }
        Ok(Self {
            source_location,
            output_location,
            registry,
            cleanup: RemoveAllComments::new(DEFAULT_SEED),
            transformations: DEFAULT_TRANSFORMATIONS,
            scope: TransformationScope::Global,
            distribution: None,
            seed: DEFAULT_SEED,
            rng: ChaCha8Rng::seed_from_u64(DEFAULT_SEED),
            write_output: true,
            remove_all_comments: false,
            retry: RetryPolicy::default(),
            exclusivity: ExclusivityPolicy::default(),
            debug: false,
            sink: None,
            printer: Box::new(SourcePrinter),
            phase: EnginePhase::Constructed,
        })
    }

    /// Set how many attempts to make per scope unit. The last call wins.
    pub fn set_transformations_per_scope(
        &mut self,
        count: i64,
        scope: TransformationScope,
    ) -> Result<()> {
        if count < 0 {
            return Err(MetamorphError::NegativeCount(count));
        }
        let count = usize::try_from(count).map_err(|_| {
            MetamorphError::InvalidConfiguration(format!("{count} transformations do not fit"))
        })?;
        if count == 0 {
            warn!(%scope, "zero transformations configured, the run will not transform anything");
        }
        self.transformations = count;
        self.scope = scope;
        self.mark_configured();
        Ok(())
    }

    /// Weighted selection. Every id must be registered and no weight may be
    /// negative; on error the previous distribution stays in place.
    pub fn set_distribution(&mut self, distribution: Distribution) -> Result<()> {
        distribution.validate(&self.registry)?;
        self.distribution = Some(distribution);
        self.mark_configured();
        Ok(())
    }

    /// Build and set a distribution from per-category weights.
    pub fn set_distribution_by_category(
        &mut self,
        weights: &HashMap<TransformationCategory, i64>,
    ) -> Result<()> {
        let distribution = Distribution::by_category(&self.registry, weights)?;
        self.set_distribution(distribution)
    }

    /// Go back to uniform selection.
    pub fn clear_distribution(&mut self) {
        self.distribution = None;
    }

    /// Reseed the engine and every transformer it owns.
    pub fn set_random_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.registry.reseed_all(seed);
        self.cleanup.reseed(seed);
        self.mark_configured();
    }

    pub fn set_write_output(&mut self, write_output: bool) {
        self.write_output = write_output;
    }

    pub fn set_remove_all_comments(&mut self, remove: bool) {
        self.remove_all_comments = remove;
    }

    /// Replaces any sink set before.
    pub fn set_manifest_sink(&mut self, sink: Box<dyn ManifestSink>) {
        self.sink = Some(sink);
    }

    pub fn set_printer(&mut self, printer: Box<dyn Printer>) {
        self.printer = printer;
    }

    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    pub fn set_exclusivity_policy(&mut self, exclusivity: ExclusivityPolicy) {
        self.exclusivity = exclusivity;
    }

    /// Toggle before/after capture on every transformer.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
        self.registry.set_debug_all(debug);
        self.cleanup.set_debug(debug);
    }

    fn mark_configured(&mut self) {
        if self.phase == EnginePhase::Constructed {
            self.phase = EnginePhase::Configured;
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn output_location(&self) -> &str {
        &self.output_location
    }

    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    pub fn transformations_per_scope(&self) -> usize {
        self.transformations
    }

    pub fn scope(&self) -> TransformationScope {
        self.scope
    }

    pub fn distribution(&self) -> Option<&Distribution> {
        self.distribution.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn write_output(&self) -> bool {
        self.write_output
    }

    pub fn remove_all_comments(&self) -> bool {
        self.remove_all_comments
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn exclusivity_policy(&self) -> ExclusivityPolicy {
        self.exclusivity
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Invoke one transformer on one target through a scoped handle.
fn apply(
    registry: &mut TransformerRegistry,
    tree: &mut SyntaxTree,
    target: NodeId,
    id: TransformerId,
) -> Result<TransformationResult> {
    let transformer = registry
        .get_mut(id)
        .ok_or_else(|| MetamorphError::UnknownTransformer(id.to_string()))?;
    let mut scoped = SubtreeMut::new(tree, target)?;
    transformer.apply_at_random(&mut scoped)
}

impl Engine {
    /// Apply the configured number of transformations to `tree`, then run the
    /// cleanup pass, write output and hand the results to the manifest sink.
    ///
    /// Configuration problems are reported before the tree is touched.
    /// Structural failures of single attempts are counted, never returned.
    pub fn run(&mut self, tree: &mut SyntaxTree) -> Result<EngineOutcome> {
        if self.phase == EnginePhase::Finalized {
            return Err(MetamorphError::InvalidState(
                "engine already finished a run; build a new one".into(),
            ));
        }
        let started = Instant::now();
        info!(
            registry = %self.registry.name(),
            transformers = self.registry.len(),
            source = %self.source_location,
            output = %self.output_location,
            "starting engine"
        );

        let classes = tree.classes();
        let methods = tree.methods();
        info!(classes = classes.len(), methods = methods.len(), "captured targets");
        if classes.is_empty() || methods.is_empty() {
            error!(
                source = %self.source_location,
                "found no classes or no methods, exiting early; check that the source points at real files"
            );
            if let Some(sink) = self.sink.as_mut() {
                sink.write_manifest(&[])?;
            }
            self.phase = EnginePhase::Finalized;
            return Ok(EngineOutcome::empty(self.write_output));
        }

        let total = self
            .scope
            .target_count(self.transformations, classes.len(), methods.len());
        let pool = SelectionPool::build(&self.registry, self.distribution.as_ref());
        if pool.is_empty() && total > 0 {
            return Err(MetamorphError::InvalidConfiguration(format!(
                "{total} transformations requested but no transformer has a positive weight"
            )));
        }
        let targets = match self.scope {
            TransformationScope::PerMethodEach => methods.clone(),
            _ => classes.clone(),
        };
        info!(total, scope = %self.scope, candidates = pool.candidates(), "applying transformations");

        self.phase = EnginePhase::Running;
        let mut outcome = EngineOutcome::empty(self.write_output);
        outcome.attempts = total;
        let mut ledger = ExclusivityLedger::new();
        let mut cursor = 0usize;

        for attempt in 0..total {
            let mut node = self.next_target(&targets, &mut cursor);
            let mut redraws_left = self.retry.max_redraws();
            loop {
                let Some(id) = pool.draw(&mut self.rng) else {
                    break;
                };
                let name = self
                    .registry
                    .get(id)
                    .map(|t| t.name().to_string())
                    .unwrap_or_default();

                if self.exclusivity == ExclusivityPolicy::PerNode {
                    if let Some(previous) = ledger.conflict(&self.registry, node, id) {
                        debug!(attempt, node = %node, transformer = %name, conflicts_with = %previous, "exclusive transformer already applied");
                        outcome.results.push(TransformationResult::Empty);
                        outcome.malformed += 1;
                        break;
                    }
                }

                debug!(attempt, node = %node, transformer = %name, "applying");
                match apply(&mut self.registry, tree, node, id) {
                    Ok(result) => {
                        if result.is_empty() {
                            outcome.malformed += 1;
                        } else if self.exclusivity == ExclusivityPolicy::PerNode {
                            ledger.record(node, id);
                        }
                        outcome.results.push(result);
                        break;
                    }
                    Err(err) => {
                        outcome.failures += 1;
                        warn!(attempt, node = %node, transformer = %name, error = %err, "transformation failed");
                        if redraws_left == 0 {
                            break;
                        }
                        redraws_left -= 1;
                        if !self.scope.is_round_robin() {
                            node = self.random_target(&targets);
                        }
                    }
                }
            }
        }

        info!(
            results = outcome.results.len(),
            malformed = outcome.malformed,
            failures = outcome.failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transformations applied"
        );

        if self.remove_all_comments {
            self.phase = EnginePhase::Cleanup;
            for &class in &classes {
                let cleaned = SubtreeMut::new(tree, class)
                    .and_then(|mut scoped| self.cleanup.apply_at_random(&mut scoped));
                match cleaned {
                    Ok(result) => outcome.results.push(result),
                    Err(err) => warn!(class = %class, error = %err, "comment removal failed"),
                }
            }
        }

        let repaired: usize = classes.iter().map(|c| tree.repair_parents(*c)).sum();
        if repaired > 0 {
            debug!(repaired, "parent links repaired");
        }

        if self.write_output {
            self.printer.print(tree, Path::new(&self.output_location))?;
        } else {
            info!("writing output is disabled for this run");
        }

        match self.sink.as_mut() {
            Some(sink) => sink.write_manifest(&outcome.results)?,
            None => debug!("no manifest sink configured, skipping manifest"),
        }

        self.phase = EnginePhase::Finalized;
        info!(
            applied = outcome.applied(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine finished"
        );
        Ok(outcome)
    }

    fn random_target(&mut self, targets: &[NodeId]) -> NodeId {
        targets[self.rng.random_range(0..targets.len())]
    }

    fn next_target(&mut self, targets: &[NodeId], cursor: &mut usize) -> NodeId {
        if self.scope.is_round_robin() {
            let node = targets[*cursor];
            *cursor = (*cursor + 1) % targets.len();
            node
        } else {
            self.random_target(targets)
        }
    }
}
