//! Relative weighting of transformers and the weighted draw built from it.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use serde::{Deserialize, Serialize};

use metamorph_types::{MetamorphError, Result, TransformationCategory};

use crate::registry::{TransformerId, TransformerRegistry};

/// Integer weight per transformer. Transformers missing from the map get
/// weight 0, which excludes them from the draw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    weights: BTreeMap<TransformerId, i64>,
}

impl Distribution {
    pub fn new(weights: impl IntoIterator<Item = (TransformerId, i64)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Every registered transformer gets the largest weight among its
    /// categories, or 0 when none of them is listed.
    ///
    /// A negative category weight is an error even when another category of
    /// the same transformer carries a positive one.
    pub fn by_category(
        registry: &TransformerRegistry,
        weights: &HashMap<TransformationCategory, i64>,
    ) -> Result<Self> {
        if let Some((category, weight)) = weights
            .iter()
            .filter(|(_, w)| **w < 0)
            .min_by_key(|(c, _)| **c)
        {
            return Err(MetamorphError::NegativeWeight {
                transformer: format!("category {category}"),
                weight: *weight,
            });
        }
        let weights = registry
            .all()
            .into_iter()
            .map(|(id, t)| {
                let weight = t
                    .categories()
                    .iter()
                    .filter_map(|c| weights.get(c).copied())
                    .max()
                    .unwrap_or(0);
                (id, weight)
            })
            .collect();
        Ok(Self { weights })
    }

    pub fn weight(&self, id: TransformerId) -> i64 {
        self.weights.get(&id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransformerId, i64)> + '_ {
        self.weights.iter().map(|(id, w)| (*id, *w))
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Reject ids the registry does not know and negative weights.
    pub fn validate(&self, registry: &TransformerRegistry) -> Result<()> {
        for (id, weight) in self.iter() {
            let Some(transformer) = registry.get(id) else {
                return Err(MetamorphError::UnknownTransformer(id.to_string()));
            };
            if weight < 0 {
                return Err(MetamorphError::NegativeWeight {
                    transformer: transformer.name().to_string(),
                    weight,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SelectionPool
// ---------------------------------------------------------------------------

/// Cumulative weight table. Drawing from it is equivalent to drawing
/// uniformly from the multiset where every id appears `weight` times.
#[derive(Debug, Clone)]
pub struct SelectionPool {
    entries: Vec<(TransformerId, u64)>,
    total: u64,
}

impl SelectionPool {
    /// Without a distribution every registered transformer has weight 1.
    pub fn build(registry: &TransformerRegistry, distribution: Option<&Distribution>) -> Self {
        let mut entries = Vec::new();
        let mut total: u64 = 0;
        for id in registry.ids() {
            let weight = match distribution {
                Some(d) => d.weight(id).max(0) as u64,
                None => 1,
            };
            if weight == 0 {
                continue;
            }
            total = total.saturating_add(weight);
            entries.push((id, total));
        }
        Self { entries, total }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn candidates(&self) -> usize {
        self.entries.len()
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TransformerId> {
        if self.total == 0 {
            return None;
        }
        let ticket = rng.random_range(0..self.total);
        let slot = self.entries.partition_point(|(_, upper)| *upper <= ticket);
        self.entries.get(slot).map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use crate::transformers::{IfTrue, RandomInlineComment};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two() -> (TransformerRegistry, TransformerId, TransformerId) {
        let mut reg = TransformerRegistry::new("two").unwrap();
        let a = reg.register(IfTrue::new(1));
        let b = reg.register(RandomInlineComment::new(1));
        (reg, a, b)
    }

    #[test]
    fn uniform_without_distribution() {
        let (reg, a, b) = two();
        let pool = SelectionPool::build(&reg, None);
        assert_eq!(pool.total_weight(), 2);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let draws: Vec<_> = (0..200).filter_map(|_| pool.draw(&mut rng)).collect();
        assert!(draws.contains(&a));
        assert!(draws.contains(&b));
    }

    #[test]
    fn zero_weight_excludes() {
        let (reg, a, b) = two();
        let dist = Distribution::new([(a, 0), (b, 3)]);
        let pool = SelectionPool::build(&reg, Some(&dist));
        assert_eq!(pool.candidates(), 1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            assert_eq!(pool.draw(&mut rng), Some(b));
        }
    }

    #[test]
    fn all_zero_is_an_empty_pool() {
        let (reg, a, _) = two();
        let pool = SelectionPool::build(&reg, Some(&Distribution::new([(a, 0)])));
        assert!(pool.is_empty());
        assert_eq!(pool.draw(&mut ChaCha8Rng::seed_from_u64(1)), None);
    }

    #[test]
    fn weights_bias_the_draw() {
        let (reg, a, b) = two();
        let dist = Distribution::new([(a, 1), (b, 9)]);
        let pool = SelectionPool::build(&reg, Some(&dist));
        let mut rng = ChaCha8Rng::seed_from_u64(2020);
        let hits_b = (0..1000).filter(|_| pool.draw(&mut rng) == Some(b)).count();
        assert!(hits_b > 800, "{hits_b}");
    }

    #[test]
    fn validation_rejects_unknown_and_negative() {
        let (reg, a, _) = two();
        let err = Distribution::new([(TransformerId(7), 1)])
            .validate(&reg)
            .unwrap_err();
        assert!(matches!(err, MetamorphError::UnknownTransformer(_)));

        let err = Distribution::new([(a, -2)]).validate(&reg).unwrap_err();
        assert!(matches!(
            err,
            MetamorphError::NegativeWeight { ref transformer, weight: -2 } if transformer == "IfTrue"
        ));
        assert!(Distribution::new([(a, 0)]).validate(&reg).is_ok());
    }

    #[test]
    fn by_category_takes_the_largest_weight() {
        let reg = default_registry(1);
        let weights = HashMap::from([
            (TransformationCategory::Comment, 5),
            (TransformationCategory::Smell, 2),
        ]);
        let dist = Distribution::by_category(&reg, &weights).unwrap();
        let comment = reg.find("RandomInlineComment").unwrap();
        let if_true = reg.find("IfTrue").unwrap();
        let empty_method = reg.find("EmptyMethod").unwrap();
        assert_eq!(dist.weight(comment), 5);
        assert_eq!(dist.weight(if_true), 2);
        assert_eq!(dist.weight(empty_method), 0);
    }

    #[test]
    fn by_category_rejects_a_negative_weight_hidden_by_a_positive_one() {
        let reg = default_registry(1);
        let weights = HashMap::from([
            (TransformationCategory::Comment, -1),
            (TransformationCategory::Nlp, 1),
        ]);
        let err = Distribution::by_category(&reg, &weights).unwrap_err();
        assert!(matches!(
            err,
            MetamorphError::NegativeWeight { ref transformer, weight: -1 } if transformer == "category comment"
        ));
    }
}
