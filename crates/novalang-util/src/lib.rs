//! Ambient infrastructure shared by every stage of the lowering pipeline:
//! source spans, an interned `Symbol` type, typed index vectors, global
//! definition ids, and the diagnostic reporting API.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Span};
pub use symbol::Symbol;
