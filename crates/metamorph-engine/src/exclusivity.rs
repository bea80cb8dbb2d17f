//! Enforcement of the `exclusive_with` relation between transformers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use metamorph_types::NodeId;

use crate::registry::{TransformerId, TransformerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusivityPolicy {
    /// `exclusive_with` is declared but never consulted.
    #[default]
    Ignore,
    /// A transformer is not applied to a target that already received an
    /// exclusive one during the same run, in either direction.
    PerNode,
}

/// Transformers applied so far, per target node.
#[derive(Debug, Default)]
pub struct ExclusivityLedger {
    applied: HashMap<NodeId, Vec<TransformerId>>,
}

impl ExclusivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: NodeId, transformer: TransformerId) {
        let entry = self.applied.entry(target).or_default();
        if !entry.contains(&transformer) {
            entry.push(transformer);
        }
    }

    /// The first transformer already applied to `target` that conflicts with
    /// `candidate`.
    pub fn conflict(
        &self,
        registry: &TransformerRegistry,
        target: NodeId,
        candidate: TransformerId,
    ) -> Option<TransformerId> {
        let candidate_t = registry.get(candidate)?;
        let applied = self.applied.get(&target)?;
        applied.iter().copied().find(|&previous| {
            let Some(previous_t) = registry.get(previous) else {
                return false;
            };
            names_other(candidate_t.exclusive_with(), previous_t.name())
                || names_other(previous_t.exclusive_with(), candidate_t.name())
        })
    }
}

fn names_other(exclusive: &[&'static str], name: &str) -> bool {
    exclusive.iter().any(|n| *n == name)
}
