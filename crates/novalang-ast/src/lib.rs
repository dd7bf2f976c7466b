//! AST node definitions handed off by the (out-of-scope) lexer/parser.
//!
//! This crate has no parsing logic of its own — it is the named interface
//! the parser and `AstToHir` agree on. Tests elsewhere in the workspace
//! construct trees directly, the way a parser would hand them off.

mod ast;

pub use ast::*;
