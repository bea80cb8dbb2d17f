//! Dead and trivially-true branches around a method body.

use metamorph_tree::{NodeKind, SubtreeMut};
use metamorph_types::{
    MetamorphError, NodeId, Result, TransformationCategory, TransformationResult,
};

use super::{contains_statement, non_empty_methods, value_type};
use crate::transformer::{Requirement, Transformer, TransformerCore};
use crate::utils::null_element;

const CATEGORIES: &[TransformationCategory] =
    &[TransformationCategory::Structure, TransformationCategory::Smell];

/// The statement that ends a dead branch of `method`.
fn dead_return(target: &SubtreeMut<'_>, method: NodeId) -> NodeKind {
    NodeKind::Return {
        value: value_type(target.tree(), method).map(|ty| null_element(&ty).to_string()),
    }
}

/// Insert `if (<condition>) {}` at the top of the body and move every
/// original statement into the child block at `keep_in`.
fn wrap_body(
    target: &mut SubtreeMut<'_>,
    method: NodeId,
    condition: &str,
    keep_in: usize,
) -> Result<NodeId> {
    let body = target
        .tree()
        .method_body(method)
        .ok_or_else(|| MetamorphError::Structural(format!("method {method} has no body")))?;
    let statements = target.tree().children(body).to_vec();
    let branch = target.insert_child(
        body,
        0,
        NodeKind::If {
            condition: condition.to_string(),
        },
    )?;
    let then_block = target.add_child(branch, NodeKind::Block)?;
    let else_block = target.add_child(branch, NodeKind::Block)?;
    let holder = if keep_in == 0 { then_block } else { else_block };
    for (i, stmt) in statements.into_iter().enumerate() {
        target.detach(stmt)?;
        target.attach(holder, i, stmt)?;
    }
    Ok(if keep_in == 0 { else_block } else { then_block })
}

// ---------------------------------------------------------------------------
// IfTrue
// ---------------------------------------------------------------------------

/// `body` becomes `if (true) { body }`, with `else { return <null>; }` for
/// methods that return a value.
#[derive(Debug, Clone)]
pub struct IfTrue {
    core: TransformerCore,
}

impl IfTrue {
    pub const NAME: &'static str = "IfTrue";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(Self::NAME, CATEGORIES, seed),
        }
    }
}

impl Transformer for IfTrue {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a method with a non-empty body", contains_statement)]
    }

    fn exclusive_with(&self) -> &[&'static str] {
        &[IfFalseElse::NAME]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let candidates = non_empty_methods(target.tree(), scope);
        let Some(method) = self.core.pick(&candidates) else {
            return Ok(TransformationResult::Empty);
        };
        let before = self.core.snapshot(target.tree(), method);
        let else_block = wrap_body(target, method, "true", 0)?;
        if value_type(target.tree(), method).is_some() {
            let ret = dead_return(target, method);
            target.add_child(else_block, ret)?;
        } else {
            target.detach(else_block)?;
        }
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

// ---------------------------------------------------------------------------
// IfFalseElse
// ---------------------------------------------------------------------------

/// `body` becomes `if (false) { return <null>; } else { body }`.
#[derive(Debug, Clone)]
pub struct IfFalseElse {
    core: TransformerCore,
}

impl IfFalseElse {
    pub const NAME: &'static str = "IfFalseElse";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(Self::NAME, CATEGORIES, seed),
        }
    }
}

impl Transformer for IfFalseElse {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a method with a non-empty body", contains_statement)]
    }

    fn exclusive_with(&self) -> &[&'static str] {
        &[IfTrue::NAME]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let candidates = non_empty_methods(target.tree(), scope);
        let Some(method) = self.core.pick(&candidates) else {
            return Ok(TransformationResult::Empty);
        };
        let before = self.core.snapshot(target.tree(), method);
        let then_block = wrap_body(target, method, "false", 1)?;
        let ret = dead_return(target, method);
        target.add_child(then_block, ret)?;
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::fixtures::*;
    use metamorph_tree::{parse, SyntaxTree};

    #[test]
    fn if_true_wraps_a_value_method_with_dead_else() {
        let mut tree = shop();
        let total = method(&tree, "total");
        let mut scoped = SubtreeMut::new(&mut tree, total).unwrap();
        let result = IfTrue::new(1).apply_at_random(&mut scoped).unwrap();
        assert_eq!(result.changed_node(), Some(total));
        let out = tree.render(total);
        assert!(out.contains("    if (true) {\n        // multiply"), "{out}");
        assert!(out.contains("} else {\n        return 0;\n    }"), "{out}");
        tree.validate().unwrap();
    }

    #[test]
    fn if_true_on_void_method_has_no_else() {
        let mut tree = shop();
        let log = method(&tree, "log");
        let mut scoped = SubtreeMut::new(&mut tree, log).unwrap();
        IfTrue::new(1).apply_at_random(&mut scoped).unwrap();
        let out = tree.render(log);
        assert_eq!(
            out,
            "fn log(msg: string) {\n    if (true) {\n        print(msg);\n    }\n}\n"
        );
    }

    #[test]
    fn if_false_else_moves_body_to_else() {
        let mut tree = shop();
        let log = method(&tree, "log");
        let mut scoped = SubtreeMut::new(&mut tree, log).unwrap();
        IfFalseElse::new(1).apply_at_random(&mut scoped).unwrap();
        assert_eq!(
            tree.render(log),
            "fn log(msg: string) {\n    if (false) {\n        return;\n    } else {\n        print(msg);\n    }\n}\n"
        );
    }

    #[test]
    fn null_element_follows_return_type() {
        let src = "class A {\n    fn f() -> bool {\n        return true;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let class = tree.classes()[0];
        let mut scoped = SubtreeMut::new(&mut tree, class).unwrap();
        IfFalseElse::new(3).apply_at_random(&mut scoped).unwrap();
        assert!(tree.render(class).contains("return false;"));
    }

    #[test]
    fn declines_on_a_class_without_statements() {
        let mut tree = shop();
        let empty = class(&tree, "Empty");
        let before = tree.render(tree.root());
        let mut scoped = SubtreeMut::new(&mut tree, empty).unwrap();
        assert!(IfTrue::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
        let mut scoped = SubtreeMut::new(&mut tree, empty).unwrap();
        assert!(IfFalseElse::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
        assert_eq!(tree.render(tree.root()), before);
    }

    #[test]
    fn declared_mutually_exclusive() {
        assert_eq!(IfTrue::new(0).exclusive_with(), &["IfFalseElse"]);
        assert_eq!(IfFalseElse::new(0).exclusive_with(), &["IfTrue"]);
    }
}
