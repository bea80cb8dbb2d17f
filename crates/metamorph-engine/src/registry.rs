//! Named, ordered collection of transformers.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use metamorph_types::{MetamorphError, Result, TransformationCategory};

use crate::names::NameStyle;
use crate::transformer::Transformer;
use crate::transformers;

/// Registration index of a transformer inside its registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransformerId(pub usize);

impl TransformerId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TransformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// TransformerRegistry
// ---------------------------------------------------------------------------

/// Append-only list of transformers. Registering the same transformer twice
/// yields two independent entries.
pub struct TransformerRegistry {
    name: String,
    transformers: Vec<Box<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MetamorphError::InvalidConfiguration(
                "registry name must not be blank".into(),
            ));
        }
        Ok(Self {
            name,
            transformers: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&mut self, transformer: impl Transformer + 'static) -> TransformerId {
        self.register_boxed(Box::new(transformer))
    }

    pub fn register_boxed(&mut self, transformer: Box<dyn Transformer>) -> TransformerId {
        let id = TransformerId(self.transformers.len());
        debug!(registry = %self.name, transformer = %transformer.name(), %id, "registered transformer");
        self.transformers.push(transformer);
        id
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TransformerId> {
        (0..self.transformers.len()).map(TransformerId)
    }

    /// Every entry in registration order.
    pub fn all(&self) -> Vec<(TransformerId, &dyn Transformer)> {
        self.transformers
            .iter()
            .enumerate()
            .map(|(i, t)| (TransformerId(i), t.as_ref()))
            .collect()
    }

    /// Entries tagged with `category`, in registration order.
    pub fn with_category(
        &self,
        category: TransformationCategory,
    ) -> Vec<(TransformerId, &dyn Transformer)> {
        self.all()
            .into_iter()
            .filter(|(_, t)| t.categories().contains(&category))
            .collect()
    }

    pub fn get(&self, id: TransformerId) -> Option<&dyn Transformer> {
        self.transformers.get(id.index()).map(|t| t.as_ref())
    }

    pub fn get_mut(&mut self, id: TransformerId) -> Option<&mut dyn Transformer> {
        match self.transformers.get_mut(id.index()) {
            Some(t) => Some(t.as_mut()),
            None => None,
        }
    }

    /// First entry with the given name.
    pub fn find(&self, name: &str) -> Option<TransformerId> {
        self.transformers
            .iter()
            .position(|t| t.name() == name)
            .map(TransformerId)
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub fn reseed_all(&mut self, seed: u64) {
        for t in &mut self.transformers {
            t.reseed(seed);
        }
    }

    pub fn set_debug_all(&mut self, debug: bool) {
        for t in &mut self.transformers {
            t.set_debug(debug);
        }
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("name", &self.name)
            .field("transformers", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Default registry factory
// ---------------------------------------------------------------------------

pub const DEFAULT_REGISTRY_NAME: &str = "default";

/// Every built-in transformer except the cleanup-only comment remover.
pub fn default_registry(seed: u64) -> TransformerRegistry {
    default_registry_with_names(seed, NameStyle::Animal)
}

pub fn default_registry_with_names(seed: u64, names: NameStyle) -> TransformerRegistry {
    let mut reg = TransformerRegistry {
        name: DEFAULT_REGISTRY_NAME.to_string(),
        transformers: Vec::new(),
    };
    reg.register(transformers::IfTrue::new(seed));
    reg.register(transformers::IfFalseElse::new(seed));
    reg.register(transformers::RandomInlineComment::new(seed).with_names(names));
    reg.register(transformers::RenameVariable::new(seed).with_names(names));
    reg.register(transformers::RandomParameterName::new(seed).with_names(names));
    reg.register(transformers::AddUnusedVariable::new(seed).with_names(names));
    reg.register(transformers::AddNeutralElement::new(seed));
    reg.register(transformers::LambdaIdentity::new(seed));
    reg.register(transformers::EmptyMethod::new(seed).with_names(names));
    reg
}
