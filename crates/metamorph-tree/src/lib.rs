//! Program trees for metamorph.
//!
//! Source files are written in a small outline language (classes, methods,
//! `let`/`return`/`if`/expression statements and comments). [`parse`] turns one
//! file into an AST ([`UnitDef`]), [`SyntaxTree`] lowers units into an arena of
//! nodes addressed by [`NodeId`](metamorph_types::NodeId), and [`render`]
//! prints a subtree back to source text.
//!
//! Edits made by transformers go through [`SubtreeMut`], which refuses to touch
//! nodes outside of the subtree it was created for.
//!
//! # Example
//! ```
//! let src = "class Greeter { fn hello() { print(\"hi\"); } }";
//! let unit = metamorph_tree::parse("greeter.mm", src).unwrap();
//! let tree = metamorph_tree::SyntaxTree::from_units([unit]);
//! assert_eq!(tree.classes().len(), 1);
//! assert_eq!(tree.location(tree.methods()[0]), "greeter.mm::Greeter::hello");
//! ```

pub mod ast;
mod loader;
mod parser;
mod printer;
mod scoped;
mod tree;

pub use ast::*;
pub use loader::{SourceLoader, DEFAULT_PATTERN};
pub use parser::parse;
pub use printer::render;
pub use scoped::SubtreeMut;
pub use tree::{Node, NodeKind, SyntaxTree};
