//! Built-in transformers, plus the tree helpers they share.

/// Forwards the bookkeeping half of [`Transformer`](crate::transformer::Transformer)
/// to a `core: TransformerCore` field.
macro_rules! delegate_to_core {
    () => {
        fn name(&self) -> &str {
            self.core.name()
        }

        fn categories(
            &self,
        ) -> std::collections::BTreeSet<metamorph_types::TransformationCategory> {
            self.core.categories()
        }

        fn reseed(&mut self, seed: u64) {
            self.core.reseed(seed);
        }

        fn set_debug(&mut self, debug: bool) {
            self.core.set_debug(debug);
        }
    };
}

pub mod comments;
pub mod control_flow;
pub mod lambda;
pub mod naming;
pub mod smells;
pub mod structure;

pub use comments::{RandomInlineComment, RemoveAllComments};
pub use control_flow::{IfFalseElse, IfTrue};
pub use lambda::LambdaIdentity;
pub use naming::{RandomParameterName, RenameVariable};
pub use smells::{AddNeutralElement, AddUnusedVariable};
pub use structure::EmptyMethod;

use metamorph_tree::{NodeKind, SubtreeMut, SyntaxTree};
use metamorph_types::{NodeId, Result};

use crate::utils::rename_identifier;

// ---------------------------------------------------------------------------
// Requirement predicates
// ---------------------------------------------------------------------------

pub(crate) fn contains_method(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree.find_all(scope, NodeKind::is_method).is_empty()
}

pub(crate) fn contains_statement(tree: &SyntaxTree, scope: NodeId) -> bool {
    !non_empty_methods(tree, scope).is_empty()
}

pub(crate) fn contains_block(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree.find_all(scope, NodeKind::is_block).is_empty()
}

pub(crate) fn contains_local(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree
        .find_all(scope, |k| matches!(k, NodeKind::Let { .. }))
        .is_empty()
}

pub(crate) fn contains_parameter(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree
        .find_all(scope, |k| matches!(k, NodeKind::Parameter { .. }))
        .is_empty()
}

pub(crate) fn contains_comment(tree: &SyntaxTree, scope: NodeId) -> bool {
    tree.find_all(scope, NodeKind::is_comment)
        .into_iter()
        .any(|c| c != scope)
}

pub(crate) fn is_class_with_method(tree: &SyntaxTree, scope: NodeId) -> bool {
    tree.kind(scope).map(NodeKind::is_class).unwrap_or(false) && contains_method(tree, scope)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Methods in scope whose body holds at least one statement.
pub(crate) fn non_empty_methods(tree: &SyntaxTree, scope: NodeId) -> Vec<NodeId> {
    tree.find_all(scope, NodeKind::is_method)
        .into_iter()
        .filter(|m| {
            tree.method_body(*m)
                .map(|b| !tree.children(b).is_empty())
                .unwrap_or(false)
        })
        .collect()
}

/// Declared return type, `None` for `void` methods.
pub(crate) fn value_type(tree: &SyntaxTree, method: NodeId) -> Option<String> {
    match tree.kind(method) {
        Ok(NodeKind::Method {
            return_type: Some(ty),
            ..
        }) if ty != "void" => Some(ty.clone()),
        _ => None,
    }
}

/// Method enclosing `id`, or `id` itself when it is not inside one.
pub(crate) fn enclosing_method(tree: &SyntaxTree, id: NodeId) -> NodeId {
    tree.enclosing(id, NodeKind::is_method).unwrap_or(id)
}

/// Index of the first top-level `return` in `block`, or its length.
pub(crate) fn reachable_end(tree: &SyntaxTree, block: NodeId) -> usize {
    let children = tree.children(block);
    children
        .iter()
        .position(|c| matches!(tree.kind(*c), Ok(NodeKind::Return { .. })))
        .unwrap_or(children.len())
}

/// Rename free uses of `old` in the statements of `block` from index `from`
/// on, descending into nested blocks. A `let` that redeclares `old` ends the
/// rename for the rest of its block.
pub(crate) fn rename_uses(
    target: &mut SubtreeMut<'_>,
    block: NodeId,
    from: usize,
    old: &str,
    new: &str,
) -> Result<()> {
    let statements: Vec<NodeId> = target.tree().children(block).iter().skip(from).copied().collect();
    for stmt in statements {
        let shadowed = match target.kind_mut(stmt)? {
            NodeKind::Let { name, init, .. } => {
                *init = rename_identifier(init, old, new);
                *name == old
            }
            NodeKind::Return { value: Some(value) } => {
                *value = rename_identifier(value, old, new);
                false
            }
            NodeKind::If { condition } => {
                *condition = rename_identifier(condition, old, new);
                false
            }
            NodeKind::Expr { text } => {
                *text = rename_identifier(text, old, new);
                false
            }
            _ => false,
        };
        if shadowed {
            break;
        }
        let nested: Vec<NodeId> = target.tree().children(stmt).to_vec();
        for inner in nested {
            if target.tree().kind(inner)?.is_block() {
                rename_uses(target, inner, 0, old, new)?;
            }
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn predicates_on_fixture() {
        let tree = shop();
        let order = class(&tree, "Order");
        let empty = class(&tree, "Empty");
        assert!(is_class_with_method(&tree, order));
        assert!(!is_class_with_method(&tree, empty));
        assert!(contains_local(&tree, order));
        assert!(!contains_local(&tree, method(&tree, "log")));
        assert!(contains_comment(&tree, order));
        assert!(!contains_comment(&tree, empty));
        assert!(!contains_statement(&tree, empty));
        assert!(contains_parameter(&tree, order));
    }

    #[test]
    fn value_type_treats_void_as_none() {
        let tree = shop();
        assert_eq!(value_type(&tree, method(&tree, "total")).as_deref(), Some("int"));
        assert_eq!(value_type(&tree, method(&tree, "log")), None);
    }

    #[test]
    fn reachable_end_stops_at_return() {
        let tree = shop();
        let body = tree.method_body(method(&tree, "total")).unwrap();
        assert_eq!(reachable_end(&tree, body), 3);
        let body = tree.method_body(method(&tree, "log")).unwrap();
        assert_eq!(reachable_end(&tree, body), 1);
    }

    #[test]
    fn rename_uses_descends_and_stops_at_shadowing() {
        let src = "class A {\n    fn f(x: int) -> int {\n        let y: int = x;\n        if (x > 0) {\n            print(x);\n        }\n        let x: int = x + 1;\n        return x;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([metamorph_tree::parse("a.mm", src).unwrap()]);
        let m = tree.methods()[0];
        let body = tree.method_body(m).unwrap();
        let mut scoped = SubtreeMut::new(&mut tree, m).unwrap();
        rename_uses(&mut scoped, body, 0, "x", "z").unwrap();
        let out = tree.render(m);
        assert!(out.contains("let y: int = z;"));
        assert!(out.contains("if (z > 0) {"));
        assert!(out.contains("print(z);"));
        assert!(out.contains("let x: int = z + 1;"));
        assert!(out.contains("return x;"));
    }
}
