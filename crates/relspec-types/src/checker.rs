//! Entry points for checking expressions against an environment.

use std::sync::Arc;

use relspec_ast::{Expr, ModuleId, Result, Type, Warning};
use rustc_hash::FxHashSet;
use tracing::debug_span;

use crate::env::{Context, Env};
use crate::inference::check;
use crate::resolve::{resolve, resolve_as_formula, resolve_as_int, resolve_as_set, resolve_natural};

/// Default bound on nested macro instantiations.
pub const DEFAULT_UNROLLS: u32 = 20;

/// Knobs for one checking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// How many macro instantiations may nest before checking gives up.
    pub unrolls: u32,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            unrolls: DEFAULT_UNROLLS,
        }
    }
}

impl CheckOptions {
    pub fn with_unrolls(mut self, unrolls: u32) -> Self {
        self.unrolls = unrolls;
        self
    }
}

/// A fully resolved expression and the warnings raised while checking it.
#[derive(Debug, Clone)]
pub struct Checked {
    pub expr: Expr,
    pub warnings: Vec<Warning>,
}

/// Checks expressions in the scope of one module.
///
/// A checker holds no mutable state; independent calls may run on
/// different threads against the same environment.
#[derive(Debug, Clone)]
pub struct Checker {
    env: Arc<Env>,
    module: ModuleId,
    options: CheckOptions,
}

impl Checker {
    pub fn new(env: Arc<Env>, module: ModuleId) -> Self {
        Self {
            env,
            module,
            options: CheckOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    /// A fresh context with the full unroll budget.
    pub fn context(&self) -> Context {
        Context::new(self.env.clone(), self.module, self.options.unrolls)
    }

    /// Check a formula.
    pub fn check_formula(&self, expr: &Expr) -> Result<Checked> {
        let _span = debug_span!("check_formula").entered();
        self.run(expr, resolve_as_formula)
    }

    /// Check an integer expression.
    pub fn check_int(&self, expr: &Expr) -> Result<Checked> {
        let _span = debug_span!("check_int").entered();
        self.run(expr, resolve_as_int)
    }

    /// Check a set or relation.
    pub fn check_set(&self, expr: &Expr) -> Result<Checked> {
        let _span = debug_span!("check_set").entered();
        self.run(expr, resolve_as_set)
    }

    /// Check an expression at whatever type it naturally has.
    pub fn check_expr(&self, expr: &Expr) -> Result<Checked> {
        let _span = debug_span!("check_expr").entered();
        self.run(expr, resolve_natural)
    }

    /// Check an expression against an explicit expected type.
    pub fn check_against(&self, expr: &Expr, target: &Type) -> Result<Checked> {
        let _span = debug_span!("check_against", %target).entered();
        self.run(expr, |e, w| resolve(e, target, w))
    }

    fn run(
        &self,
        expr: &Expr,
        finish: impl FnOnce(&Expr, &mut Vec<Warning>) -> Result<Expr>,
    ) -> Result<Checked> {
        let mut warnings = Vec::new();
        let inferred = check(expr, &self.context(), &mut warnings)?;
        let expr = finish(&inferred, &mut warnings)?;
        // Macro arguments are resolved once on substitution and again with the
        // enclosing expression.
        let mut seen = FxHashSet::default();
        warnings.retain(|w| seen.insert(w.clone()));
        Ok(Checked { expr, warnings })
    }
}
