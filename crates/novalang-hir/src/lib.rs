//! AST-to-HIR resolution and desugaring (spec §4.1–§4.2): the `TypeTable`/
//! `DescriptorResolver` registries and the `AstToHir` pass that produces a
//! resolved, desugared `HirModule` for `novalang-mir::HirToMir` to lower.

pub mod ast_to_hir;
pub mod hir;
pub mod scope;
pub mod type_table;
pub mod types;

pub use ast_to_hir::AstToHir;
pub use hir::*;
pub use scope::{Rib, RibId, RibKind, ScopeTree};
pub use type_table::{DescriptorResolver, TypeTable};
pub use types::{method_descriptor, FunctionType, Primitive, Type};
