//! Adds an empty method to a class and calls it from an existing one.

use std::collections::HashSet;

use metamorph_tree::{NodeKind, SubtreeMut};
use metamorph_types::{MetamorphError, Result, TransformationCategory, TransformationResult};

use super::{is_class_with_method, reachable_end};
use crate::names::NameStyle;
use crate::transformer::{Requirement, Transformer, TransformerCore};

const MAX_NAME_DRAWS: usize = 16;

/// First drawn name not in `taken`, or `None` once the draws are used up.
fn fresh_name(taken: &HashSet<String>, mut draw: impl FnMut() -> String) -> Option<String> {
    (0..MAX_NAME_DRAWS).map(|_| draw()).find(|name| !taken.contains(name))
}

#[derive(Debug, Clone)]
pub struct EmptyMethod {
    core: TransformerCore,
    names: NameStyle,
}

impl EmptyMethod {
    pub const NAME: &'static str = "EmptyMethod";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(
                Self::NAME,
                &[
                    TransformationCategory::Structure,
                    TransformationCategory::ControlFlow,
                    TransformationCategory::Naming,
                    TransformationCategory::Nlp,
                ],
                seed,
            ),
            names: NameStyle::default(),
        }
    }

    pub fn with_names(mut self, names: NameStyle) -> Self {
        self.names = names;
        self
    }
}

impl Transformer for EmptyMethod {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new(
            "target is a class with at least one method",
            is_class_with_method,
        )]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let class = target.scope();
        let methods: Vec<_> = target
            .tree()
            .children(class)
            .iter()
            .copied()
            .filter(|m| target.tree().kind(*m).map(NodeKind::is_method).unwrap_or(false))
            .collect();
        let Some(caller) = self.core.pick(&methods) else {
            return Ok(TransformationResult::Empty);
        };
        let caller_body = target.tree().method_body(caller).ok_or_else(|| {
            MetamorphError::Structural(format!("method {caller} has no body"))
        })?;
        let before = self.core.snapshot(target.tree(), class);

        let taken: HashSet<String> = target
            .find_all(|k| k.name().is_some())
            .into_iter()
            .filter_map(|n| target.tree().kind(n).ok()?.name().map(str::to_string))
            .collect();
        let names = self.names;
        let rng = self.core.rng();
        let Some(name) = fresh_name(&taken, || names.identifier(true, &mut *rng)) else {
            tracing::debug!(class = %class, "no unused method name found, declining");
            return Ok(TransformationResult::Empty);
        };
        let member_index = self.core.position(target.tree().children(class).len());
        let call_index = self.core.position(reachable_end(target.tree(), caller_body));

        let method = target.insert_child(
            class,
            member_index,
            NodeKind::Method {
                name: name.clone(),
                return_type: None,
            },
        )?;
        target.add_child(method, NodeKind::Block)?;
        target.insert_child(
            caller_body,
            call_index,
            NodeKind::Expr {
                text: format!("{name}()"),
            },
        )?;
        Ok(self.core.applied(target.tree(), class, class, before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::fixtures::*;

    #[test]
    fn adds_an_empty_method_and_a_call() {
        let mut tree = shop();
        let order = class(&tree, "Order");
        let methods_before = tree.methods().len();
        let mut scoped = SubtreeMut::new(&mut tree, order).unwrap();
        let result = EmptyMethod::new(11).apply_at_random(&mut scoped).unwrap();
        assert_eq!(result.changed_node(), Some(order));
        assert_eq!(tree.methods().len(), methods_before + 1);

        let added = tree
            .find_all(order, NodeKind::is_method)
            .into_iter()
            .find(|m| {
                let name = tree.kind(*m).unwrap().name().unwrap();
                name != "total" && name != "log"
            })
            .unwrap();
        let name = tree.kind(added).unwrap().name().unwrap().to_string();
        let body = tree.method_body(added).unwrap();
        assert!(tree.children(body).is_empty());
        assert!(tree.render(order).contains(&format!("{name}();")));
        tree.validate().unwrap();
    }

    #[test]
    fn fresh_name_skips_names_already_declared() {
        let taken: HashSet<String> = ["total", "log"].map(String::from).into();
        let mut drawn = ["total", "log", "audit"].into_iter().map(String::from);
        assert_eq!(
            fresh_name(&taken, || drawn.next().unwrap_or_default()),
            Some("audit".to_string())
        );
        assert_eq!(fresh_name(&taken, || "log".to_string()), None);
    }

    #[test]
    fn added_method_name_is_new_to_the_class() {
        let mut tree = shop();
        let order = class(&tree, "Order");
        let mut scoped = SubtreeMut::new(&mut tree, order).unwrap();
        let mut transformer = EmptyMethod::new(4);
        for _ in 0..20 {
            transformer.apply_at_random(&mut scoped).unwrap();
        }
        drop(scoped);
        let names: Vec<_> = tree
            .find_all(order, NodeKind::is_method)
            .into_iter()
            .map(|m| tree.kind(m).unwrap().name().unwrap().to_string())
            .collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "{names:?}");
    }

    #[test]
    fn declines_below_class_level() {
        let mut tree = shop();
        let total = method(&tree, "total");
        let mut scoped = SubtreeMut::new(&mut tree, total).unwrap();
        assert!(EmptyMethod::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }

    #[test]
    fn declines_on_a_class_without_methods() {
        let mut tree = shop();
        let empty = class(&tree, "Empty");
        let mut scoped = SubtreeMut::new(&mut tree, empty).unwrap();
        assert!(EmptyMethod::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }
}
