//! relspec type checker
//!
//! Two-pass checking of relational expressions: bottom-up inference with
//! macro inlining, then top-down resolution of overloaded names.

pub mod checker;
pub mod env;
pub mod expand;
pub mod inference;
pub mod resolve;

pub use checker::{CheckOptions, Checked, Checker, DEFAULT_UNROLLS};
pub use env::{Context, Env, Module};
pub use expand::instantiate;
pub use inference::{check, infer};
pub use resolve::{resolve, resolve_as_formula, resolve_as_int, resolve_as_set, resolve_natural};
