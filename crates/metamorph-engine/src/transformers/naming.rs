//! Identifier renaming for locals and parameters.

use std::collections::HashSet;

use metamorph_tree::{NodeKind, SubtreeMut};
use metamorph_types::{
    MetamorphError, NodeId, Result, TransformationCategory, TransformationResult,
};

use super::{contains_local, contains_parameter, enclosing_method, rename_uses};
use crate::names::NameStyle;
use crate::transformer::{Requirement, Transformer, TransformerCore};

const CATEGORIES: &[TransformationCategory] = &[
    TransformationCategory::Naming,
    TransformationCategory::Nlp,
    TransformationCategory::Smell,
];

/// Set the declared name of a `let` or parameter node, returning the old one.
fn set_name(target: &mut SubtreeMut<'_>, node: NodeId, new: &str) -> Result<String> {
    match target.kind_mut(node)? {
        NodeKind::Let { name, .. } | NodeKind::Parameter { name, .. } => {
            Ok(std::mem::replace(name, new.to_string()))
        }
        other => Err(MetamorphError::Structural(format!(
            "cannot rename a {} node",
            other.label()
        ))),
    }
}

// ---------------------------------------------------------------------------
// RenameVariable
// ---------------------------------------------------------------------------

/// Renames a local variable and its later uses. A local is renamed at most
/// once per instance, so repeated attempts spread over different variables.
#[derive(Debug, Clone)]
pub struct RenameVariable {
    core: TransformerCore,
    names: NameStyle,
    renamed: HashSet<NodeId>,
}

impl RenameVariable {
    pub const NAME: &'static str = "RenameVariable";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(Self::NAME, CATEGORIES, seed),
            names: NameStyle::default(),
            renamed: HashSet::new(),
        }
    }

    pub fn with_names(mut self, names: NameStyle) -> Self {
        self.names = names;
        self
    }
}

impl Transformer for RenameVariable {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a local variable", contains_local)]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let candidates: Vec<NodeId> = target
            .find_all(|k| matches!(k, NodeKind::Let { .. }))
            .into_iter()
            .filter(|id| !self.renamed.contains(id))
            .collect();
        let Some(local) = self.core.pick(&candidates) else {
            return Ok(TransformationResult::Empty);
        };
        let (block, index) = match (target.tree().parent(local), target.tree().position(local)) {
            (Some(block), Some(index)) => (block, index),
            _ => {
                return Err(MetamorphError::Structural(format!(
                    "local {local} is not inside a block"
                )))
            }
        };
        let method = enclosing_method(target.tree(), local);
        let before = self.core.snapshot(target.tree(), method);
        let new_name = self.names.identifier(false, self.core.rng());
        let old_name = set_name(target, local, &new_name)?;
        rename_uses(target, block, index + 1, &old_name, &new_name)?;
        self.renamed.insert(local);
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

// ---------------------------------------------------------------------------
// RandomParameterName
// ---------------------------------------------------------------------------

/// Renames a method parameter and its uses in the body.
#[derive(Debug, Clone)]
pub struct RandomParameterName {
    core: TransformerCore,
    names: NameStyle,
}

impl RandomParameterName {
    pub const NAME: &'static str = "RandomParameterName";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(Self::NAME, CATEGORIES, seed),
            names: NameStyle::default(),
        }
    }

    pub fn with_names(mut self, names: NameStyle) -> Self {
        self.names = names;
        self
    }
}

impl Transformer for RandomParameterName {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a method parameter", contains_parameter)]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let params = target.find_all(|k| matches!(k, NodeKind::Parameter { .. }));
        let Some(param) = self.core.pick(&params) else {
            return Ok(TransformationResult::Empty);
        };
        let method = enclosing_method(target.tree(), param);
        let body = target.tree().method_body(method).ok_or_else(|| {
            MetamorphError::Structural(format!("method {method} has no body"))
        })?;
        let before = self.core.snapshot(target.tree(), method);
        let new_name = self.names.identifier(false, self.core.rng());
        let old_name = set_name(target, param, &new_name)?;
        rename_uses(target, body, 0, &old_name, &new_name)?;
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::fixtures::*;
    use metamorph_tree::{parse, SyntaxTree};

    fn local_names(tree: &SyntaxTree, scope: NodeId) -> Vec<String> {
        tree.find_all(scope, |k| matches!(k, NodeKind::Let { .. }))
            .into_iter()
            .filter_map(|id| tree.kind(id).ok()?.name().map(str::to_string))
            .collect()
    }

    #[test]
    fn rename_variable_updates_later_uses() {
        let mut tree = shop();
        let total = method(&tree, "total");
        let mut scoped = SubtreeMut::new(&mut tree, total).unwrap();
        let result = RenameVariable::new(2020).apply_at_random(&mut scoped).unwrap();
        assert_eq!(result.changed_node(), Some(total));

        let new_name = local_names(&tree, total).remove(0);
        assert_ne!(new_name, "sum");
        let out = tree.render(total);
        assert!(out.contains(&format!("if ({new_name} > 100)")), "{out}");
        assert!(out.contains(&format!("return {new_name};")), "{out}");
        // the string literal keeps its text
        assert!(out.contains("print(\"big order: sum\");"), "{out}");
    }

    #[test]
    fn rename_variable_renames_each_local_once() {
        let src = "class A {\n    fn f() {\n        let a: int = 1;\n        let b: int = a;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let class = tree.classes()[0];
        let mut t = RenameVariable::new(9);
        for _ in 0..2 {
            let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
            assert!(!t.apply_at_random(&mut scoped).unwrap().is_empty());
        }
        let names = local_names(&tree, class);
        assert!(!names.contains(&"a".to_string()));
        assert!(!names.contains(&"b".to_string()));
        let out = tree.render(class);
        assert!(out.contains(&format!("let {}: int = {};", names[1], names[0])), "{out}");

        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        assert!(t.apply_at_random(&mut scoped).unwrap().is_empty());
    }

    #[test]
    fn rename_variable_declines_without_locals() {
        let mut tree = shop();
        let log = method(&tree, "log");
        let mut scoped = SubtreeMut::new(&mut tree, log).unwrap();
        assert!(RenameVariable::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }

    #[test]
    fn parameter_rename_reaches_the_body() {
        let mut tree = shop();
        let log = method(&tree, "log");
        let mut scoped = SubtreeMut::new(&mut tree, log).unwrap();
        RandomParameterName::new(4)
            .with_names(NameStyle::Random)
            .apply_at_random(&mut scoped)
            .unwrap();
        let param = tree.parameters(log)[0];
        let new_name = tree.kind(param).unwrap().name().unwrap().to_string();
        assert_ne!(new_name, "msg");
        assert!(new_name.chars().all(|c| c.is_ascii_lowercase()));
        assert!(tree.render(log).contains(&format!("print({new_name});")));
    }

    #[test]
    fn parameter_rename_declines_without_parameters() {
        let mut tree = shop();
        let empty = class(&tree, "Empty");
        let mut scoped = SubtreeMut::new(&mut tree, empty).unwrap();
        assert!(RandomParameterName::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
    }
}
