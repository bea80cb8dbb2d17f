//! Wraps a literal into an identity lambda.

use metamorph_tree::{NodeKind, SubtreeMut, SyntaxTree};
use metamorph_types::{MetamorphError, NodeId, Result, TransformationCategory, TransformationResult};

use super::enclosing_method;
use crate::transformer::{Requirement, Transformer, TransformerCore};
use crate::utils::{identity_lambda, literal_spans};

/// Expression text carried by a statement, if any.
fn expression(kind: &NodeKind) -> Option<&str> {
    match kind {
        NodeKind::Let { init, .. } => Some(init.as_str()),
        NodeKind::Return { value } => value.as_deref(),
        NodeKind::If { condition } => Some(condition.as_str()),
        NodeKind::Expr { text } => Some(text.as_str()),
        _ => None,
    }
}

fn expression_mut(kind: &mut NodeKind) -> Option<&mut String> {
    match kind {
        NodeKind::Let { init, .. } => Some(init),
        NodeKind::Return { value } => value.as_mut(),
        NodeKind::If { condition } => Some(condition),
        NodeKind::Expr { text } => Some(text),
        _ => None,
    }
}

fn has_literal(kind: &NodeKind) -> bool {
    expression(kind).is_some_and(|text| !literal_spans(text).is_empty())
}

fn contains_literal(tree: &SyntaxTree, scope: NodeId) -> bool {
    !tree.find_all(scope, has_literal).is_empty()
}

/// `return 1;` becomes `return ((int)((Supplier<?>)(() -> 1)).get());`.
///
/// Every literal in the scope is an equally likely site.
#[derive(Debug, Clone)]
pub struct LambdaIdentity {
    core: TransformerCore,
}

impl LambdaIdentity {
    pub const NAME: &'static str = "LambdaIdentity";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(
                Self::NAME,
                &[
                    TransformationCategory::Structure,
                    TransformationCategory::Lambda,
                    TransformationCategory::Bytecode,
                ],
                seed,
            ),
        }
    }
}

impl Transformer for LambdaIdentity {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a literal", contains_literal)]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let mut sites = Vec::new();
        for node in target.find_all(has_literal) {
            let kind = target.tree().kind(node)?;
            let count = expression(kind).map(|t| literal_spans(t).len()).unwrap_or(0);
            sites.extend((0..count).map(|i| (node, i)));
        }
        let Some((node, index)) = self.core.pick(&sites) else {
            return Ok(TransformationResult::Empty);
        };
        let method = enclosing_method(target.tree(), node);
        let before = self.core.snapshot(target.tree(), method);

        let kind = target.kind_mut(node)?;
        let label = kind.label();
        let text = expression_mut(kind).ok_or_else(|| {
            MetamorphError::Structural(format!("a {label} carries no expression"))
        })?;
        let span = literal_spans(text).get(index).copied().ok_or_else(|| {
            MetamorphError::Structural(format!("literal {index} vanished from '{text}'"))
        })?;
        let wrapped = identity_lambda(&text[span.start..span.end], span.ty);
        text.replace_range(span.start..span.end, &wrapped);

        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformers::fixtures::*;
    use metamorph_tree::parse;

    #[test]
    fn wraps_the_only_literal() {
        let src = "class A {\n    fn seven() -> int {\n        return 7;\n    }\n}\n";
        let mut tree = SyntaxTree::from_units([parse("a.mm", src).unwrap()]);
        let seven = tree.methods()[0];
        let mut scoped = SubtreeMut::new(&mut tree, seven).unwrap();
        let result = LambdaIdentity::new(3).apply_at_random(&mut scoped).unwrap();

        assert_eq!(result.changed_node(), Some(seven));
        assert_eq!(
            tree.render(seven),
            "fn seven() -> int {\n    return ((int)((Supplier<?>)(() -> 7)).get());\n}\n"
        );
        let reparsed = parse("a.mm", &tree.render(tree.root())).unwrap();
        assert_eq!(SyntaxTree::from_units([reparsed]).methods().len(), 1);
    }

    #[test]
    fn wraps_exactly_one_literal_per_application() {
        let mut tree = shop();
        let order = class(&tree, "Order");
        let mut scoped = SubtreeMut::new(&mut tree, order).unwrap();
        LambdaIdentity::new(9).apply_at_random(&mut scoped).unwrap();
        let rendered = tree.render(order);
        assert_eq!(rendered.matches("Supplier<?>").count(), 1);
        assert!(
            rendered.contains("(() -> 100)") || rendered.contains("(() -> \"big order: sum\")"),
            "{rendered}"
        );
        tree.validate().unwrap();
    }

    #[test]
    fn declines_without_literals() {
        let mut tree = shop();
        let log = method(&tree, "log");
        let before = tree.render(log);
        let mut scoped = SubtreeMut::new(&mut tree, log).unwrap();
        assert!(LambdaIdentity::new(1).apply_at_random(&mut scoped).unwrap().is_empty());
        assert_eq!(tree.render(log), before);
    }
}
