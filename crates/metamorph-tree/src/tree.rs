//! Arena-backed syntax tree.
//!
//! Every node lives in one `Vec<Node>` owned by [`SyntaxTree`] and is addressed
//! by a [`NodeId`]. Nodes are never freed: detaching a node only unlinks it from
//! its parent, so ids handed out earlier stay valid for the whole run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use metamorph_types::{MetamorphError, NodeId, Result};

use crate::ast::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Project,
    Unit {
        path: String,
    },
    Class {
        name: String,
    },
    Method {
        name: String,
        return_type: Option<String>,
    },
    Parameter {
        name: String,
        ty: String,
    },
    Block,
    Let {
        name: String,
        ty: String,
        init: String,
    },
    Return {
        value: Option<String>,
    },
    /// Children: the then-block, optionally followed by the else-block.
    If {
        condition: String,
    },
    Expr {
        text: String,
    },
    Comment {
        style: CommentStyle,
        text: String,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Project => "project",
            NodeKind::Unit { .. } => "unit",
            NodeKind::Class { .. } => "class",
            NodeKind::Method { .. } => "method",
            NodeKind::Parameter { .. } => "parameter",
            NodeKind::Block => "block",
            NodeKind::Let { .. } => "let",
            NodeKind::Return { .. } => "return",
            NodeKind::If { .. } => "if",
            NodeKind::Expr { .. } => "expr",
            NodeKind::Comment { .. } => "comment",
        }
    }

    /// The declared name of units, classes, methods, parameters and locals.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Unit { path } => Some(path.as_str()),
            NodeKind::Class { name }
            | NodeKind::Method { name, .. }
            | NodeKind::Parameter { name, .. }
            | NodeKind::Let { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, NodeKind::Class { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self, NodeKind::Method { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, NodeKind::Comment { .. })
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Let { .. }
                | NodeKind::Return { .. }
                | NodeKind::If { .. }
                | NodeKind::Expr { .. }
                | NodeKind::Comment { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxTree {
    /// An empty tree holding only the `Project` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Project)],
            root: NodeId(0),
        }
    }

    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = UnitDef>,
    {
        let mut tree = Self::new();
        for unit in units {
            tree.add_unit(&unit);
        }
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or(MetamorphError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind> {
        self.node(id).map(Node::kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Result<&mut NodeKind> {
        self.nodes
            .get_mut(id.index())
            .map(|n| &mut n.kind)
            .ok_or(MetamorphError::UnknownNode(id))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    /// Children of `id`; empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Index of `id` in its parent's child list.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId> {
        let index = self.node(parent)?.children.len();
        self.insert_child(parent, index, kind)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> Result<NodeId> {
        self.node(parent)?;
        let child = self.create(kind);
        self.attach(parent, index, child)?;
        Ok(child)
    }

    /// Link a detached node under `parent` at `index`.
    pub fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        let parent_len = self.node(parent)?.children.len();
        let child_node = self.node(child)?;
        if child == self.root {
            return Err(MetamorphError::Structural(
                "the project root cannot be attached".into(),
            ));
        }
        if let Some(existing) = child_node.parent {
            return Err(MetamorphError::Structural(format!(
                "node {child} is already attached to {existing}"
            )));
        }
        if child == parent || self.is_within(child, parent) {
            return Err(MetamorphError::Structural(format!(
                "attaching {child} under {parent} would create a cycle"
            )));
        }
        if index > parent_len {
            return Err(MetamorphError::Structural(format!(
                "insert position {index} out of bounds for {parent} with {parent_len} children"
            )));
        }
        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Unlink `id` from its parent and return the index it occupied.
    pub fn detach(&mut self, id: NodeId) -> Result<usize> {
        let parent = self.node(id)?.parent.ok_or_else(|| {
            MetamorphError::Structural(format!("node {id} is not attached"))
        })?;
        let index = self.children(parent).iter().position(|c| *c == id).ok_or_else(|| {
            MetamorphError::Structural(format!(
                "node {id} names {parent} as parent but is not among its children"
            ))
        })?;
        self.nodes[parent.index()].children.remove(index);
        self.nodes[id.index()].parent = None;
        Ok(index)
    }

    /// Put the detached node `new` where `old` currently is.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<()> {
        let parent = self
            .parent(old)
            .ok_or_else(|| MetamorphError::Structural(format!("node {old} is not attached")))?;
        if self.node(new)?.parent.is_some() {
            return Err(MetamorphError::Structural(format!(
                "replacement {new} is already attached"
            )));
        }
        let index = self.detach(old)?;
        self.attach(parent, index, new)
    }

    /// Copy the subtree below `id` into fresh, detached nodes.
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let kind = self.kind(id)?.clone();
        let copy = self.create(kind);
        let children = self.children(id).to_vec();
        for child in children {
            let child_copy = self.deep_clone(child)?;
            self.nodes[child_copy.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(child_copy);
        }
        Ok(copy)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All nodes below `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = self.subtree(id);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// `id` followed by all of its descendants in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if std::mem::replace(&mut seen[next.index()], true) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// `true` if `id` is `scope` or lies below it.
    pub fn is_within(&self, scope: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            match current {
                Some(node) if node == scope => return true,
                Some(node) => current = self.parent(node),
                None => return false,
            }
        }
        false
    }

    /// Closest node, starting at `id` itself and walking up, matching `pred`.
    pub fn enclosing<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            let node = current?;
            if pred(self.kind(node).ok()?) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Nodes within `scope` (inclusive) whose kind matches `pred`, in pre-order.
    pub fn find_all<F>(&self, scope: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&NodeKind) -> bool,
    {
        self.subtree(scope)
            .into_iter()
            .filter(|id| self.kind(*id).map(&pred).unwrap_or(false))
            .collect()
    }

    pub fn units(&self) -> Vec<NodeId> {
        self.find_all(self.root, |k| matches!(k, NodeKind::Unit { .. }))
    }

    /// Every attached class, in pre-order.
    pub fn classes(&self) -> Vec<NodeId> {
        self.find_all(self.root, NodeKind::is_class)
    }

    /// Every attached method, in pre-order.
    pub fn methods(&self) -> Vec<NodeId> {
        self.find_all(self.root, NodeKind::is_method)
    }

    /// The body block of a method.
    pub fn method_body(&self, method: NodeId) -> Option<NodeId> {
        self.children(method)
            .iter()
            .rev()
            .copied()
            .find(|c| self.kind(*c).map(NodeKind::is_block).unwrap_or(false))
    }

    pub fn parameters(&self, method: NodeId) -> Vec<NodeId> {
        self.children(method)
            .iter()
            .copied()
            .filter(|c| matches!(self.kind(*c), Ok(NodeKind::Parameter { .. })))
            .collect()
    }

    /// Human readable path, e.g. `src/calc.mm::Calculator::add`.
    pub fn location(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            let Some(node) = current else { break };
            match self.kind(node) {
                Ok(NodeKind::Unit { path }) => parts.push(path.as_str()),
                Ok(NodeKind::Class { name }) | Ok(NodeKind::Method { name, .. }) => {
                    parts.push(name.as_str())
                }
                _ => {}
            }
            current = self.parent(node);
        }
        if parts.is_empty() {
            return id.to_string();
        }
        parts.reverse();
        parts.join("::")
    }

    /// Render the subtree rooted at `id` as source text.
    pub fn render(&self, id: NodeId) -> String {
        crate::printer::render(self, id)
    }

    // -----------------------------------------------------------------------
    // Consistency
    // -----------------------------------------------------------------------

    /// Re-derive the parent links of everything below `id` from the child
    /// lists. Returns the number of links that had to be fixed.
    pub fn repair_parents(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        let mut fixed = 0;
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut seen[node.index()], true) {
                continue;
            }
            let children = self.nodes[node.index()].children.clone();
            for child in children {
                let Some(slot) = self.nodes.get_mut(child.index()) else {
                    continue;
                };
                if slot.parent != Some(node) {
                    slot.parent = Some(node);
                    fixed += 1;
                }
                stack.push(child);
            }
        }
        if fixed > 0 {
            debug!(node = %id, fixed, "repaired parent links");
        }
        fixed
    }

    /// Check that every child below the root points back to its parent and that
    /// no node is reachable twice.
    pub fn validate(&self) -> Result<()> {
        self.validate_below(self.root)
    }

    pub fn validate_below(&self, id: NodeId) -> Result<()> {
        self.node(id)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![id];
        seen[id.index()] = true;
        while let Some(node) = stack.pop() {
            for &child in self.children(node) {
                let child_node = self.node(child).map_err(|_| {
                    MetamorphError::Structural(format!("{node} links to missing child {child}"))
                })?;
                if std::mem::replace(&mut seen[child.index()], true) {
                    return Err(MetamorphError::Structural(format!(
                        "node {child} is reachable twice"
                    )));
                }
                if child_node.parent != Some(node) {
                    return Err(MetamorphError::Structural(format!(
                        "node {child} is a child of {node} but its parent link is {:?}",
                        child_node.parent
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // AST conversion
    // -----------------------------------------------------------------------

    /// Lower a parsed unit into the arena under the project root.
    pub fn add_unit(&mut self, unit: &UnitDef) -> NodeId {
        let unit_id = self.push_child(
            self.root,
            NodeKind::Unit {
                path: unit.path.clone(),
            },
        );
        for item in &unit.items {
            match item {
                UnitItem::Comment(c) => {
                    self.push_child(unit_id, comment_kind(c));
                }
                UnitItem::Class(class) => self.lower_class(unit_id, class),
            }
        }
        unit_id
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.nodes[id.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(id);
        id
    }

    fn lower_class(&mut self, parent: NodeId, class: &ClassDef) {
        let class_id = self.push_child(
            parent,
            NodeKind::Class {
                name: class.name.clone(),
            },
        );
        for member in &class.members {
            match member {
                MemberDef::Comment(c) => {
                    self.push_child(class_id, comment_kind(c));
                }
                MemberDef::Method(m) => self.lower_method(class_id, m),
            }
        }
    }

    fn lower_method(&mut self, parent: NodeId, method: &MethodDef) {
        let method_id = self.push_child(
            parent,
            NodeKind::Method {
                name: method.name.clone(),
                return_type: method.return_type.clone(),
            },
        );
        for p in &method.params {
            self.push_child(
                method_id,
                NodeKind::Parameter {
                    name: p.name.clone(),
                    ty: p.ty.clone(),
                },
            );
        }
        self.lower_block(method_id, &method.body);
    }

    fn lower_block(&mut self, parent: NodeId, body: &[StmtDef]) {
        let block = self.push_child(parent, NodeKind::Block);
        for stmt in body {
            self.lower_stmt(block, stmt);
        }
    }

    fn lower_stmt(&mut self, block: NodeId, stmt: &StmtDef) {
        match stmt {
            StmtDef::Comment(c) => {
                self.push_child(block, comment_kind(c));
            }
            StmtDef::Let { name, ty, init } => {
                self.push_child(
                    block,
                    NodeKind::Let {
                        name: name.clone(),
                        ty: ty.clone(),
                        init: init.clone(),
                    },
                );
            }
            StmtDef::Return(value) => {
                self.push_child(
                    block,
                    NodeKind::Return {
                        value: value.clone(),
                    },
                );
            }
            StmtDef::Expr(text) => {
                self.push_child(block, NodeKind::Expr { text: text.clone() });
            }
            StmtDef::If {
                condition,
                then_body,
                else_body,
            } => {
                let if_id = self.push_child(
                    block,
                    NodeKind::If {
                        condition: condition.clone(),
                    },
                );
                self.lower_block(if_id, then_body);
                if let Some(else_body) = else_body {
                    self.lower_block(if_id, else_body);
                }
            }
        }
    }

    /// Raise an attached unit back into its AST form.
    pub fn to_unit_def(&self, unit: NodeId) -> Result<UnitDef> {
        let NodeKind::Unit { path } = self.kind(unit)? else {
            return Err(MetamorphError::Structural(format!("{unit} is not a unit")));
        };
        let mut items = Vec::new();
        for &child in self.children(unit) {
            match self.kind(child)? {
                NodeKind::Comment { style, text } => {
                    items.push(UnitItem::Comment(CommentDef::new(*style, text.clone())))
                }
                NodeKind::Class { .. } => items.push(UnitItem::Class(self.raise_class(child)?)),
                other => {
                    return Err(MetamorphError::Structural(format!(
                        "unexpected {} directly inside unit {path}",
                        other.label()
                    )))
                }
            }
        }
        Ok(UnitDef {
            path: path.clone(),
            items,
        })
    }

    fn raise_class(&self, class: NodeId) -> Result<ClassDef> {
        let NodeKind::Class { name } = self.kind(class)? else {
            return Err(MetamorphError::Structural(format!("{class} is not a class")));
        };
        let mut members = Vec::new();
        for &child in self.children(class) {
            match self.kind(child)? {
                NodeKind::Comment { style, text } => {
                    members.push(MemberDef::Comment(CommentDef::new(*style, text.clone())))
                }
                NodeKind::Method { name, return_type } => {
                    let params = self
                        .parameters(child)
                        .into_iter()
                        .filter_map(|p| match self.kind(p) {
                            Ok(NodeKind::Parameter { name, ty }) => Some(ParamDef {
                                name: name.clone(),
                                ty: ty.clone(),
                            }),
                            _ => None,
                        })
                        .collect();
                    let body = match self.method_body(child) {
                        Some(block) => self.raise_block(block)?,
                        None => Vec::new(),
                    };
                    members.push(MemberDef::Method(MethodDef {
                        name: name.clone(),
                        params,
                        return_type: return_type.clone(),
                        body,
                    }));
                }
                other => {
                    return Err(MetamorphError::Structural(format!(
                        "unexpected {} directly inside class {name}",
                        other.label()
                    )))
                }
            }
        }
        Ok(ClassDef {
            name: name.clone(),
            members,
        })
    }

    fn raise_block(&self, block: NodeId) -> Result<Vec<StmtDef>> {
        let mut body = Vec::new();
        for &child in self.children(block) {
            let stmt = match self.kind(child)? {
                NodeKind::Comment { style, text } => {
                    StmtDef::Comment(CommentDef::new(*style, text.clone()))
                }
                NodeKind::Let { name, ty, init } => StmtDef::Let {
                    name: name.clone(),
                    ty: ty.clone(),
                    init: init.clone(),
                },
                NodeKind::Return { value } => StmtDef::Return(value.clone()),
                NodeKind::Expr { text } => StmtDef::Expr(text.clone()),
                NodeKind::If { condition } => {
                    let blocks = self.children(child);
                    let then_body = match blocks.first() {
                        Some(b) => self.raise_block(*b)?,
                        None => Vec::new(),
                    };
                    let else_body = match blocks.get(1) {
                        Some(b) => Some(self.raise_block(*b)?),
                        None => None,
                    };
                    StmtDef::If {
                        condition: condition.clone(),
                        then_body,
                        else_body,
                    }
                }
                other => {
                    return Err(MetamorphError::Structural(format!(
                        "unexpected {} inside a block",
                        other.label()
                    )))
                }
            };
            body.push(stmt);
        }
        Ok(body)
    }
}

fn comment_kind(c: &CommentDef) -> NodeKind {
    NodeKind::Comment {
        style: c.style,
        text: c.text.clone(),
    }
}
