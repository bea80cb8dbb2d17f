//! Scope-restricted mutable access to a [`SyntaxTree`].

use std::collections::HashSet;

use metamorph_types::{MetamorphError, NodeId, Result};

use crate::tree::{NodeKind, SyntaxTree};

/// Mutable view of a tree that only allows edits inside the subtree rooted at
/// `scope`. Reads of the whole tree stay possible through [`SubtreeMut::tree`].
///
/// Detached nodes created, cloned or detached through this handle (and their
/// descendants) may be edited and attached anywhere inside the scope. Detached
/// nodes left behind by other handles stay out of reach.
pub struct SubtreeMut<'t> {
    tree: &'t mut SyntaxTree,
    scope: NodeId,
    owned: HashSet<NodeId>,
}

impl<'t> SubtreeMut<'t> {
    pub fn new(tree: &'t mut SyntaxTree, scope: NodeId) -> Result<Self> {
        tree.node(scope)?;
        Ok(Self {
            tree,
            scope,
            owned: HashSet::new(),
        })
    }

    pub fn scope(&self) -> NodeId {
        self.scope
    }

    pub fn tree(&self) -> &SyntaxTree {
        &*self.tree
    }

    /// `true` if `id` lies inside the scope or in a detached subtree owned by
    /// this handle.
    pub fn is_editable(&self, id: NodeId) -> bool {
        self.tree.is_within(self.scope, id) || self.is_loose(id)
    }

    fn is_loose(&self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        let mut top = id;
        while let Some(parent) = self.tree.parent(top) {
            top = parent;
        }
        top != self.tree.root() && self.owned.contains(&top)
    }

    fn ensure_within(&self, id: NodeId) -> Result<()> {
        self.tree.node(id)?;
        if self.tree.is_within(self.scope, id) {
            Ok(())
        } else {
            Err(MetamorphError::OutOfScope {
                node: id,
                scope: self.scope,
            })
        }
    }

    fn ensure_editable(&self, id: NodeId) -> Result<()> {
        self.tree.node(id)?;
        if self.is_editable(id) {
            Ok(())
        } else {
            Err(MetamorphError::OutOfScope {
                node: id,
                scope: self.scope,
            })
        }
    }

    /// Nodes inside the scope (inclusive) matching `pred`, in pre-order.
    pub fn find_all<F>(&self, pred: F) -> Vec<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        self.tree.find_all(self.scope, pred)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Result<&mut NodeKind> {
        self.ensure_editable(id)?;
        self.tree.kind_mut(id)
    }

    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.tree.create(kind);
        self.owned.insert(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        self.ensure_editable(parent)?;
        self.tree.add_child(parent, kind)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> Result<NodeId> {
        self.ensure_editable(parent)?;
        self.tree.insert_child(parent, index, kind)
    }

    pub fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.ensure_editable(parent)?;
        self.ensure_editable(child)?;
        self.tree.attach(parent, index, child)
    }

    /// Detach a node strictly below the scope root.
    pub fn detach(&mut self, id: NodeId) -> Result<usize> {
        self.ensure_within(id)?;
        if id == self.scope {
            return Err(MetamorphError::Structural(format!(
                "the scope root {id} cannot be detached from inside its scope"
            )));
        }
        let index = self.tree.detach(id)?;
        self.owned.insert(id);
        Ok(index)
    }

    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        self.ensure_within(old)?;
        self.ensure_editable(new)?;
        if old == self.scope {
            return Err(MetamorphError::Structural(format!(
                "the scope root {old} cannot be replaced from inside its scope"
            )));
        }
        self.tree.replace(old, new)?;
        self.owned.remove(&new);
        self.owned.insert(old);
        Ok(())
    }

    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        self.ensure_editable(id)?;
        let copy = self.tree.deep_clone(id)?;
        self.owned.insert(copy);
        Ok(copy)
    }
}
