//! Renders tree nodes back to outline source text.

use metamorph_types::NodeId;

use crate::ast::CommentStyle;
use crate::tree::{NodeKind, SyntaxTree};

const INDENT: &str = "    ";

/// Render the subtree rooted at `id`. Unknown ids render as an empty string.
pub fn render(tree: &SyntaxTree, id: NodeId) -> String {
    let mut writer = Writer {
        tree,
        out: String::new(),
    };
    writer.node(id, 0);
    writer.out
}

struct Writer<'a> {
    tree: &'a SyntaxTree,
    out: String,
}

impl<'a> Writer<'a> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn kind(&self, id: NodeId) -> Option<&'a NodeKind> {
        let tree: &'a SyntaxTree = self.tree;
        tree.kind(id).ok()
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let tree = self.tree;
        let Some(kind) = self.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Project => {
                for (i, &unit) in tree.children(id).iter().enumerate() {
                    if i > 0 {
                        self.out.push('\n');
                    }
                    self.node(unit, depth);
                }
            }
            NodeKind::Unit { .. } | NodeKind::Class { .. } => self.container(id, depth),
            NodeKind::Method { name, return_type } => {
                let params = tree
                    .parameters(id)
                    .into_iter()
                    .filter_map(|p| match self.kind(p) {
                        Some(NodeKind::Parameter { name, ty }) => Some(format!("{name}: {ty}")),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let header = match return_type {
                    Some(ty) => format!("fn {name}({params}) -> {ty} {{"),
                    None => format!("fn {name}({params}) {{"),
                };
                self.line(depth, &header);
                if let Some(body) = tree.method_body(id) {
                    self.statements(body, depth + 1);
                }
                self.line(depth, "}");
            }
            NodeKind::Parameter { name, ty } => {
                let text = format!("{name}: {ty}");
                self.line(depth, &text);
            }
            NodeKind::Block => {
                self.line(depth, "{");
                self.statements(id, depth + 1);
                self.line(depth, "}");
            }
            NodeKind::Let { name, ty, init } => {
                let text = format!("let {name}: {ty} = {init};");
                self.line(depth, &text);
            }
            NodeKind::Return { value } => {
                let text = match value {
                    Some(v) => format!("return {v};"),
                    None => "return;".to_string(),
                };
                self.line(depth, &text);
            }
            NodeKind::If { condition } => {
                let text = format!("if ({condition}) {{");
                self.line(depth, &text);
                let blocks = tree.children(id);
                if let Some(&then_block) = blocks.first() {
                    self.statements(then_block, depth + 1);
                }
                if let Some(&else_block) = blocks.get(1) {
                    self.line(depth, "} else {");
                    self.statements(else_block, depth + 1);
                }
                self.line(depth, "}");
            }
            NodeKind::Expr { text } => {
                let text = format!("{text};");
                self.line(depth, &text);
            }
            NodeKind::Comment { style, text } => {
                let text = comment_text(*style, text);
                self.line(depth, &text);
            }
        }
    }

    /// Units and classes: members separated by a blank line, except that a
    /// comment stays glued to the member that follows it.
    fn container(&mut self, id: NodeId, depth: usize) {
        let is_class = self.kind(id).is_some_and(NodeKind::is_class);
        let inner = if is_class {
            if let Some(NodeKind::Class { name }) = self.kind(id) {
                let header = format!("class {name} {{");
                self.line(depth, &header);
            }
            depth + 1
        } else {
            depth
        };

        let tree = self.tree;
        let mut previous_was_comment = true;
        for &child in tree.children(id) {
            let is_comment = self.kind(child).is_some_and(NodeKind::is_comment);
            if !is_comment && !previous_was_comment {
                self.out.push('\n');
            }
            self.node(child, inner);
            previous_was_comment = is_comment;
        }

        if is_class {
            self.line(depth, "}");
        }
    }

    fn statements(&mut self, block: NodeId, depth: usize) {
        let tree = self.tree;
        for &stmt in tree.children(block) {
            self.node(stmt, depth);
        }
    }
}

fn comment_text(style: CommentStyle, text: &str) -> String {
    match style {
        CommentStyle::Line if text.is_empty() => "//".to_string(),
        CommentStyle::Line => format!("// {text}"),
        CommentStyle::Doc if text.is_empty() => "///".to_string(),
        CommentStyle::Doc => format!("/// {text}"),
        CommentStyle::Block => format!("/* {text} */"),
    }
}
