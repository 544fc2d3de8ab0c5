//! Macro instantiation.

use relspec_ast::{Error, Expr, Macro, Result, Warning};
use tracing::debug;

use crate::env::Context;
use crate::inference::check;
use crate::resolve::resolve;

const TOO_DEEP: &str = "Macro substitution too deep; possibly indicating an infinite recursion.";

/// Inline a saturated macro.
///
/// The body is checked in the macro's defining module, with each parameter
/// bound to its argument and without the call site's local names. Every
/// instantiation spends one unit of the context's unroll budget. An
/// unsaturated macro is returned unchanged.
pub fn instantiate(mac: &Macro, cx: &Context, warnings: &mut Vec<Warning>) -> Result<Expr> {
    if cx.unrolls() == 0 {
        return Err(Error::type_error(mac.span(), TOO_DEEP));
    }
    if !mac.is_saturated() {
        return Ok(Expr::from_macro(mac.clone()));
    }
    debug!(name = mac.name(), unrolls = cx.unrolls(), "instantiating macro");

    let mut bindings = Vec::with_capacity(mac.params().len());
    for (param, arg) in mac.params().iter().zip(mac.args()) {
        // Curried macros are passed through as values; anything else is
        // resolved against its own type before substitution.
        let value = match arg.as_macro() {
            Some(_) => arg.clone(),
            None => {
                let ty = arg.typed()?.clone();
                resolve(arg, &ty, warnings)?
            }
        };
        bindings.push((param.name.clone(), value));
    }
    let inner = cx.for_macro(mac.module()).bind_all(bindings);
    check(mac.body(), &inner, warnings)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relspec_ast::{Atom, BinaryOp, Ident, Span, Type};

    use super::*;
    use crate::env::Env;

    fn name(label: &str) -> Expr {
        Expr::name(Span::UNKNOWN, label)
    }

    /// `m[x] = x.x` and a relation `r: A->A`.
    fn setup(unrolls: u32) -> (Context, Macro, Expr) {
        let mut env = Env::new();
        let main = env.add_module("main");
        let a = Atom::top_level("A");
        let r = env.define_relation(main, "r", Type::relation([a.clone(), a])).unwrap();
        let body = Expr::binary(BinaryOp::Join, Span::UNKNOWN, &name("x"), &name("x")).unwrap();
        let mac = env
            .define_macro(main, "m", vec![Ident::new("x", Span::UNKNOWN)], body)
            .unwrap();
        (Context::new(Arc::new(env), main, unrolls), mac, r)
    }

    #[test]
    fn test_instantiate_substitutes_arguments() {
        let (cx, mac, r) = setup(3);
        let call = mac.add_arg(r.clone()).unwrap();
        let out = instantiate(&call, &cx, &mut Vec::new()).unwrap();
        assert_eq!(out.ty(), r.join(&r).unwrap().ty());
        assert_eq!(out.to_string(), "r.r");
    }

    #[test]
    fn test_unsaturated_macro_is_returned_as_is() {
        let (cx, mac, _) = setup(3);
        let out = instantiate(&mac, &cx, &mut Vec::new()).unwrap();
        assert_eq!(out.as_macro().map(Macro::gap), Some(1));
    }

    #[test]
    fn test_zero_budget_fails() {
        let (cx, mac, r) = setup(0);
        let call = mac.add_arg(r).unwrap();
        let err = instantiate(&call, &cx, &mut Vec::new()).unwrap_err();
        assert!(err.is_type());
        assert_eq!(err.message(), TOO_DEEP);
    }

    #[test]
    fn test_call_site_locals_are_hidden() {
        let (cx, _, r) = setup(3);
        let mut env = Env::new();
        let main = env.add_module("main");
        let leak = env
            .define_macro(main, "leak", Vec::new(), name("y"))
            .unwrap();
        let cx = Context::new(Arc::new(env), main, cx.unrolls()).bind("y", r);
        let err = instantiate(&leak, &cx, &mut Vec::new()).unwrap_err();
        assert!(err.message().contains("\"y\""));
    }
}
