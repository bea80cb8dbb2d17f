//! Comment insertion and the cleanup-pass comment remover.

use metamorph_tree::{CommentStyle, NodeKind, SubtreeMut};
use metamorph_types::{Result, TransformationCategory, TransformationResult};

use super::{contains_block, contains_comment, enclosing_method};
use crate::names::NameStyle;
use crate::transformer::{Requirement, Transformer, TransformerCore};

// ---------------------------------------------------------------------------
// RandomInlineComment
// ---------------------------------------------------------------------------

/// Inserts `// <random words>` at a random position of a random block.
#[derive(Debug, Clone)]
pub struct RandomInlineComment {
    core: TransformerCore,
    names: NameStyle,
}

impl RandomInlineComment {
    pub const NAME: &'static str = "RandomInlineComment";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(
                Self::NAME,
                &[TransformationCategory::Comment, TransformationCategory::Nlp],
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

impl Transformer for RandomInlineComment {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("a block to comment in", contains_block)]
    }

    fn exclusive_with(&self) -> &[&'static str] {
        &[RemoveAllComments::NAME]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let blocks = target.find_all(NodeKind::is_block);
        let Some(block) = self.core.pick(&blocks) else {
            return Ok(TransformationResult::Empty);
        };
        let method = enclosing_method(target.tree(), block);
        let before = self.core.snapshot(target.tree(), method);
        let index = self.core.position(target.tree().children(block).len());
        let text = self.names.comment(self.core.rng());
        target.insert_child(
            block,
            index,
            NodeKind::Comment {
                style: CommentStyle::Line,
                text,
            },
        )?;
        Ok(self.core.applied(target.tree(), method, scope, before))
    }
}

// ---------------------------------------------------------------------------
// RemoveAllComments
// ---------------------------------------------------------------------------

/// Detaches every comment below the target. Used by the cleanup pass; not
/// part of the default registry.
#[derive(Debug, Clone)]
pub struct RemoveAllComments {
    core: TransformerCore,
}

impl RemoveAllComments {
    pub const NAME: &'static str = "RemoveAllComments";

    pub fn new(seed: u64) -> Self {
        Self {
            core: TransformerCore::new(Self::NAME, &[TransformationCategory::Comment], seed),
        }
    }
}

impl Transformer for RemoveAllComments {
    delegate_to_core!();

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new("at least one comment", contains_comment)]
    }

    fn exclusive_with(&self) -> &[&'static str] {
        &[RandomInlineComment::NAME]
    }

    fn transform(&mut self, target: &mut SubtreeMut<'_>) -> Result<TransformationResult> {
        let scope = target.scope();
        let comments: Vec<_> = target
            .find_all(NodeKind::is_comment)
            .into_iter()
            .filter(|c| *c != scope)
            .collect();
        if comments.is_empty() {
            return Ok(TransformationResult::Empty);
        }
        let before = self.core.snapshot(target.tree(), scope);
        for comment in &comments {
            target.detach(*comment)?;
        }
        tracing::debug!(scope = %scope, removed = comments.len(), "removed comments");
        Ok(self.core.applied(target.tree(), scope, scope, before))
    }
}
