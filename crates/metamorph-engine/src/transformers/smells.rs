//! Harmless noise: unused locals and neutral arithmetic.

use metamorph_tree::{NodeKind, SubtreeMut, SyntaxTree};
use metamorph_types::{
    MetamorphError, NodeId, Result, TransformationCategory, TransformationResult,
};

use super::{contains_method, enclosing_method, reachable_end};
use crate::names::NameStyle;
use crate::transformer::{Requirement, Transformer, TransformerCore};
use crate::utils::{neutral_element, random_literal, LITERAL_TYPES};

// ---------------------------------------------------------------------------
// AddUnusedVariable
// ---------------------------------------------------------------------------

/// Inserts `let <name>: <ty> = <literal>;` somewhere before the first
/// top-level `return` of a method.
#[derive(Debug, Clone)]
pub struct AddUnusedVariable {
    core: TransformerCore,
    names: NameStyle,
}

impl AddUnusedVariable {
    pub const NAME: &'static str = "AddUnusedVariable";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(
                Self::NAME,
                &[TransformationCategory::Naming, TransformationCategory::Smell],
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

impl Transformer for AddUnusedVariable {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a method", contains_method)]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let methods = target.find_all(NodeKind::is_method);
        let Some(method) = self.core.pick(&methods) else {
            return Ok(TransformationResult::Empty);
        };
        let body = target.tree().method_body(method).ok_or_else(|| {
            MetamorphError::Structural(format!("method {method} has no body"))
        })?;
        let before = self.core.snapshot(target.tree(), method);
        let index = self.core.position(reachable_end(target.tree(), body));
        let ty = self.core.pick(LITERAL_TYPES).unwrap_or("int");
        let name = self.names.identifier(false, self.core.rng());
        let init = random_literal(ty, self.names, self.core.rng());
        target.insert_child(
            body,
            index,
            NodeKind::Let {
                name,
                ty: ty.to_string(),
                init,
            },
        )?;
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

// ---------------------------------------------------------------------------
// AddNeutralElement
// ---------------------------------------------------------------------------

/// Rewrites a local initializer `e` to `(e + 0)`, `(e + 0.0)` or `(e + "")`
/// depending on the declared type.
#[derive(Debug, Clone)]
pub struct AddNeutralElement {
    core: TransformerCore,
}

impl AddNeutralElement {
    pub const NAME: &'static str = "AddNeutralElement";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(
                Self::NAME,
                &[TransformationCategory::Structure, TransformationCategory::Smell],
                seed,
            ),
        }
    }
}

fn has_neutral(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Let { ty, .. } if neutral_element(ty).is_some())
}

fn contains_numeric_local(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree.find_all(scope, has_neutral).is_empty()
}

impl Transformer for AddNeutralElement {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new(
            "a local with a neutral element",
            contains_numeric_local,
        )]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let candidates = target.find_all(has_neutral);
        let Some(local) = self.core.pick(&candidates) else {
            return Ok(TransformationResult::Empty);
        };
        let method = enclosing_method(target.tree(), local);
        let before = self.core.snapshot(target.tree(), method);
        match target.kind_mut(local)? {
            NodeKind::Let { ty, init, .. } => {
                let neutral = neutral_element(ty).ok_or_else(|| {
                    MetamorphError::Structural(format!("type {ty} has no neutral element"))
                })?;
                *init = format!("({init} + {neutral})");
            }
            other => {
                return Err(MetamorphError::Structural(format!(
                    "expected a local, found a {}",
                    other.label()
                )))
            }
        }
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::fixtures::*;
    use metamorph_tree::parse;

    #[test]
    fn unused_variable_goes_before_the_return() {
        let mut tree = shop();
        let total = method(&tree, "total");
        let body = tree.method_body(total).unwrap();
        let mut scoped = SubtreeMut::new(&mut tree, total).unwrap();
        let result = AddUnusedVariable::new(3).apply_at_random(&mut scoped).unwrap();
        assert_eq!(result.changed_node(), Some(total));
        let statements = tree.children(body);
        assert_eq!(statements.len(), 5);
        assert!(matches!(
            tree.kind(*statements.last().unwrap()).unwrap(),
            NodeKind::Return { .. }
        ));
        let added: Vec<_> = tree
            .find_all(body, |k| matches!(k, NodeKind::Let { .. }))
            .into_iter()
            .filter(|id| tree.kind(*id).unwrap().name() != Some("sum"))
            .collect();
        assert_eq!(added.len(), 1);
        let NodeKind::Let { ty, .. } = tree.kind(added[0]).unwrap() else {
            unreachable!();
        };
        assert!(LITERAL_TYPES.contains(&ty.as_str()));
    }

    #[test]
    fn unused_variable_in_empty_body() {
        let src = "class A {\n    fn f() {\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let class = tree.classes()[0];
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        AddUnusedVariable::new(3).apply_at_random(&mut scoped).unwrap();
        let body = tree.method_body(tree.methods()[0]).unwrap();
        assert_eq!(tree.children(body).len(), 1);
    }

    #[test]
    fn unused_variable_declines_without_methods() {
        let mut tree = shop();
        let empty = class(&tree, "Empty");
        let mut scoped = SubtreeMut::new(&mut tree, empty).unwrap();
        assert!(AddUnusedVariable::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }

    #[test]
    fn neutral_element_wraps_the_initializer() {
        let mut tree = shop();
        let order = class(&tree, "Order");
        let mut scoped = SubtreeMut::new(&mut tree, order).unwrap();
        AddNeutralElement::new(1).apply_at_random(&mut scoped).unwrap();
        assert!(tree.render(order).contains("let sum: int = (price * qty + 0);"));
    }

    #[test]
    fn neutral_element_uses_the_type() {
        let src = "class A {\n    fn f() {\n        let s: string = name();\n        let f: bool = true;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let class = tree.classes()[0];
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        AddNeutralElement::new(1).apply_at_random(&mut scoped).unwrap();
        let out = tree.render(class);
        assert!(out.contains("let s: string = (name() + \"\");"), "{out}");
        assert!(out.contains("let f: bool = true;"), "{out}");
    }

    #[test]
    fn neutral_element_declines_on_booleans_only() {
        let src = "class A {\n    fn f() {\n        let f: bool = true;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let class = tree.classes()[0];
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        assert!(AddNeutralElement::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }
}
