//! relspec AST
//!
//! The immutable expression algebra of the relational specification
//! language: relational types, expression nodes and their smart
//! constructors, declarations, macros and surface-text rendering.

pub mod span;
pub mod error;
pub mod types;
pub mod ast;
pub mod combinators;
pub mod decl;
pub mod macros;
pub mod formatter;

pub use ast::*;
pub use decl::{find_duplicate_label, Decl};
pub use error::{Error, Result, Warning};
pub use formatter::{format_expr, Layout};
pub use macros::{Macro, ModuleId};
pub use span::Span;
pub use types::{Atom, Shape, Type};
