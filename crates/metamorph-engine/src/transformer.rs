//! Transformer trait, applicability requirements, and the shared randomness /
//! debug-capture core used by the built-in transformers.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use metamorph_tree::{SubtreeMut, SyntaxTree};
use metamorph_types::{
    AppliedTransformation, NodeId, Result, TransformationCategory, TransformationResult,
};

/// Seed used when nothing else was configured.
pub const DEFAULT_SEED: u64 = 2020;

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

/// A named applicability predicate evaluated against the target subtree.
#[derive(Clone, Copy)]
pub struct Requirement {
    pub description: &'static str,
    pub check: fn(&SyntaxTree, NodeId) -> bool,
}

impl Requirement {
    pub const fn new(description: &'static str, check: fn(&SyntaxTree, NodeId) -> bool) -> Self {
        Self { description, check }
    }

    pub fn holds(&self, tree: &SyntaxTree, target: NodeId) -> bool {
        (self.check)(tree, target)
    }
}

impl std::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requirement")
            .field("description", &self.description)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Transformer trait
// ---------------------------------------------------------------------------

/// A unit of randomized, semantics-preserving edit logic.
pub trait Transformer: Send {
    /// Stable identifier, used for manifests, exclusivity and lookups.
    fn name(&self) -> &str;

    /// At least one tag.
    fn categories(&self) -> BTreeSet<TransformationCategory>;

    /// Predicates that all must hold on the target before any edit happens.
    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Names of transformers that must not be combined with this one on the
    /// same target.
    fn exclusive_with(&self) -> &[&'static str] {
        &[]
    }

    /// Reset the random source. Nothing else changes.
    fn reseed(&mut self, seed: u64);

    fn set_debug(&mut self, debug: bool);

    /// Perform the edit. Only called once every requirement holds.
    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult>;

    /// Apply one edit at a random valid site below the target.
    ///
    /// Returns [`TransformationResult::Empty`] without touching the tree if a
    /// requirement fails.
    fn apply_at_random(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        if let Some(failed) = self
            .requirements()
            .iter()
            .find(|r| !r.holds(target.tree(), scope))
        {
            debug!(
                transformer = %self.name(),
                scope = %scope,
                requirement = failed.description,
                "requirement not met, declining"
            );
            return Ok(TransformationResult::Empty);
        }
        self.transform(target)
    }
}

// ---------------------------------------------------------------------------
// TransformerCore
// ---------------------------------------------------------------------------

/// Randomness and debug state shared by every built-in transformer.
#[derive(Debug, Clone)]
pub struct TransformerCore {
    name: &'static str,
    categories: BTreeSet<TransformationCategory>,
    rng: ChaCha8Rng,
    debug: bool,
}

impl TransformerCore {
    pub fn new(name: &'static str, categories: &[TransformationCategory], seed: u64) -> Self {
        Self {
            name,
            categories: categories.iter().copied().collect(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            debug: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn categories(&self) -> BTreeSet<TransformationCategory> {
        self.categories.clone()
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Uniform pick from `items`.
    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[self.rng.random_range(0..items.len())])
    }

    /// Uniform index in `0..=len`, used for insert positions.
    pub fn position(&mut self, len: usize) -> usize {
        self.rng.random_range(0..=len)
    }

    /// Rendered source of `node` when debug capture is on.
    pub fn snapshot(&self, tree: &SyntaxTree, node: NodeId) -> Option<String> {
        self.debug.then(|| tree.render(node))
    }

    /// Build the result for an edit that changed `changed`.
    pub fn applied(
        &self,
        tree: &SyntaxTree,
        changed: NodeId,
        scope: NodeId,
        before: Option<String>,
    ) -> TransformationResult {
        let mut applied = AppliedTransformation::new(
            self.name,
            self.categories.clone(),
            changed,
            tree.location(changed),
        );
        if self.debug {
            let before = before.unwrap_or_default();
            let after = tree.render(changed);
            applied = applied
                .with_before_after(format!("{before}\n=>\n{after}"))
                .with_initial_scope(scope);
        }
        applied.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metamorph_tree::{parse, NodeKind};

    fn tree() -> SyntaxTree {
        SyntaxTree::from_units([parse("a.mm", "class A { fn f() { run(); } }").unwrap()])
    }

    struct Touch {
        core: TransformerCore,
    }

    impl Transformer for Touch {
        fn name(&self) -> &str {
            self.core.name()
        }
        fn categories(&self) -> BTreeSet<TransformationCategory> {
            self.core.categories()
        }
        fn requirements(&self) -> Vec<Requirement> {
            vec![Requirement::new("target is a class", |t, n| {
                t.kind(n).map(NodeKind::is_class).unwrap_or(false)
            })]
        }
        fn reseed(&mut self, seed: u64) {
            self.core.reseed(seed);
        }
        fn set_debug(&mut self, debug: bool) {
            self.core.set_debug(debug);
        }
        fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
            let scope = target.scope();
            let before = self.core.snapshot(target.tree(), scope);
            *target.kind_mut(scope)? = NodeKind::Class { name: "B".into() };
            Ok(self.core.applied(target.tree(), scope, scope, before))
        }
    }

    fn touch() -> Touch {
        Touch {
            core: TransformerCore::new("Touch", &[TransformationCategory::Naming], DEFAULT_SEED),
        }
    }

    #[test]
    fn failed_requirement_declines_without_edit() {
        let mut tree = tree();
        let method = tree.methods()[0];
        let before = tree.render(tree.root());
        let mut scoped = SubtreeMut::new(&mut tree, method).unwrap();
        let result = touch().apply_at_random(&mut scoped).unwrap();
        assert!(result.is_empty());
        assert_eq!(tree.render(tree.root()), before);
    }

    #[test]
    fn applied_result_references_changed_node() {
        let mut tree = tree();
        let class = tree.classes()[0];
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        let result = touch().apply_at_random(&mut scoped).unwrap();
        let applied = result.as_applied().unwrap();
        assert_eq!(applied.name, "Touch");
        assert_eq!(applied.changed_node, class);
        assert_eq!(applied.location, "a.mm::B");
        assert!(applied.before_after.is_none());
    }

    #[test]
    fn debug_captures_before_and_after() {
        let mut tree = tree();
        let class = tree.classes()[0];
        let mut t = touch();
        t.set_debug(true);
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        let result = t.apply_at_random(&mut scoped).unwrap();
        let applied = result.as_applied().unwrap();
        let snapshot = applied.before_after.as_deref().unwrap();
        assert!(snapshot.contains("class A {"));
        assert!(snapshot.contains("class B {"));
        assert_eq!(applied.initial_scope, Some(class));
    }

    #[test]
    fn reseed_restarts_the_random_sequence() {
        let mut core = TransformerCore::new("X", &[TransformationCategory::Smell], 7);
        let first: Vec<usize> = (0..5).map(|_| core.position(100)).collect();
        core.reseed(7);
        let second: Vec<usize> = (0..5).map(|_| core.position(100)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn pick_on_empty_slice_is_none() {
        let mut core = TransformerCore::new("X", &[TransformationCategory::Smell], 1);
        assert_eq!(core.pick::<u8>(&[]), None);
        assert_eq!(core.pick(&[3]), Some(3));
    }
}
