//! Shared types, errors, node handles, and transformation results for metamorph.
//!
//! This crate provides the foundational types used across all other metamorph crates:
//! - `MetamorphError`: unified error taxonomy
//! - `NodeId`: stable handle into a syntax tree arena
//! - `TransformationCategory`: tags used for registry queries and manifests
//! - `TransformationResult`: record of one edit attempt, or the empty sentinel

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Unified error type for all metamorph subsystems.
#[derive(Debug, thiserror::Error)]
pub enum MetamorphError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Number of transformations cannot be negative (got {0})")]
    NegativeCount(i64),

    #[error("Distribution assigns negative weight {weight} to transformer '{transformer}'")]
    NegativeWeight { transformer: String, weight: i64 },

    #[error("Transformer '{0}' is not part of the registry")]
    UnknownTransformer(String),

    #[error("Unknown transformation scope '{0}'")]
    UnknownScope(String),

    // === Structural Errors ===
    #[error("Structural failure: {0}")]
    Structural(String),

    #[error("Node {node} lies outside of the scope rooted at {scope}")]
    OutOfScope { node: NodeId, scope: NodeId },

    #[error("Node {0} does not exist in this tree")]
    UnknownNode(NodeId),

    // === Engine Errors ===
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    // === Parser Errors ===
    #[error("Parse error in {path} at line {line}, col {col}: {message}")]
    ParseError {
        path: String,
        line: usize,
        col: usize,
        message: String,
        source_snippet: Option<String>,
    },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl MetamorphError {
    /// Returns `true` for misconfiguration detected before any scheduling work.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MetamorphError::InvalidConfiguration(_)
                | MetamorphError::NegativeCount(_)
                | MetamorphError::NegativeWeight { .. }
                | MetamorphError::UnknownTransformer(_)
                | MetamorphError::UnknownScope(_)
        )
    }

    /// Returns `true` if an edit left (or would have left) the tree inconsistent.
    ///
    /// These are recoverable at attempt granularity.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            MetamorphError::Structural(_)
                | MetamorphError::OutOfScope { .. }
                | MetamorphError::UnknownNode(_)
        )
    }
}

/// A convenience alias for `Result<T, MetamorphError>`.
pub type Result<T> = std::result::Result<T, MetamorphError>;

// ---------------------------------------------------------------------------
// NodeId: stable handle into a syntax tree arena
// ---------------------------------------------------------------------------

/// Index of a node inside a `SyntaxTree` arena.
///
/// Ids stay valid for the lifetime of the tree, including after the node has
/// been detached from its parent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TransformationCategory
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransformationCategory {
    Structure,
    Smell,
    Naming,
    Nlp,
    Comment,
    ControlFlow,
    Bytecode,
    Lambda,
}

impl TransformationCategory {
    pub const ALL: [TransformationCategory; 8] = [
        TransformationCategory::Structure,
        TransformationCategory::Smell,
        TransformationCategory::Naming,
        TransformationCategory::Nlp,
        TransformationCategory::Comment,
        TransformationCategory::ControlFlow,
        TransformationCategory::Bytecode,
        TransformationCategory::Lambda,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformationCategory::Structure => "structure",
            TransformationCategory::Smell => "smell",
            TransformationCategory::Naming => "naming",
            TransformationCategory::Nlp => "nlp",
            TransformationCategory::Comment => "comment",
            TransformationCategory::ControlFlow => "control_flow",
            TransformationCategory::Bytecode => "bytecode",
            TransformationCategory::Lambda => "lambda",
        }
    }
}

impl fmt::Display for TransformationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransformationCategory {
    type Err = MetamorphError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        TransformationCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted || c.as_str().replace('_', "") == wanted)
            .ok_or_else(|| {
                MetamorphError::InvalidConfiguration(format!("unknown category '{s}'"))
            })
    }
}

// ---------------------------------------------------------------------------
// TransformationResult: record of one edit attempt
// ---------------------------------------------------------------------------

/// A successfully applied transformation.
///
/// Equality and hashing only consider `name`, `categories` and `changed_node`.
/// The location string and the debug snapshots are informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedTransformation {
    pub name: String,
    pub categories: BTreeSet<TransformationCategory>,
    pub changed_node: NodeId,
    /// Human readable path of the changed node, e.g. `calc.mm::Calculator::add`.
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_scope: Option<NodeId>,
}

impl AppliedTransformation {
    pub fn new(
        name: impl Into<String>,
        categories: BTreeSet<TransformationCategory>,
        changed_node: NodeId,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            categories,
            changed_node,
            location: location.into(),
            before_after: None,
            initial_scope: None,
        }
    }

    pub fn with_before_after(mut self, before_after: impl Into<String>) -> Self {
        self.before_after = Some(before_after.into());
        self
    }

    pub fn with_initial_scope(mut self, scope: NodeId) -> Self {
        self.initial_scope = Some(scope);
        self
    }
}

impl PartialEq for AppliedTransformation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.categories == other.categories
            && self.changed_node == other.changed_node
    }
}

impl Eq for AppliedTransformation {}

impl Hash for AppliedTransformation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.categories.hash(state);
        self.changed_node.hash(state);
    }
}

/// Outcome of a single `apply_at_random` call.
///
/// `Empty` means no valid edit could be made. All empty results are equal,
/// regardless of which transformer declined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformationResult {
    Applied(AppliedTransformation),
    Empty,
}

impl TransformationResult {
    pub const EMPTY_NAME: &'static str = "EmptyTransformationResult";

    pub fn is_empty(&self) -> bool {
        matches!(self, TransformationResult::Empty)
    }

    pub fn name(&self) -> &str {
        match self {
            TransformationResult::Applied(a) => &a.name,
            TransformationResult::Empty => Self::EMPTY_NAME,
        }
    }

    pub fn categories(&self) -> BTreeSet<TransformationCategory> {
        match self {
            TransformationResult::Applied(a) => a.categories.clone(),
            TransformationResult::Empty => BTreeSet::new(),
        }
    }

    pub fn changed_node(&self) -> Option<NodeId> {
        self.as_applied().map(|a| a.changed_node)
    }

    pub fn as_applied(&self) -> Option<&AppliedTransformation> {
        match self {
            TransformationResult::Applied(a) => Some(a),
            TransformationResult::Empty => None,
        }
    }
}

impl From<AppliedTransformation> for TransformationResult {
    fn from(applied: AppliedTransformation) -> Self {
        TransformationResult::Applied(applied)
    }
}
