//! Bottom-up type inference (pass 1).
//!
//! Looks names up, inlines saturated macros and rebuilds every composite
//! node through its smart constructor, so that each node carries the
//! bounding type of all the values it could denote. Overloaded names become
//! `Choice` nodes; picking a candidate is left to resolution.

use relspec_ast::{find_duplicate_label, BinaryOp, Decl, Error, Expr, ExprKind, QuantOp, Result, Type, Warning};
use tracing::trace;

use crate::env::Context;
use crate::expand::instantiate;

/// Check `expr` bottom-up in `cx`.
///
/// The result is typed unless it is an unsaturated macro, which is returned
/// as a curried value for an enclosing join or call to complete.
pub fn check(expr: &Expr, cx: &Context, warnings: &mut Vec<Warning>) -> Result<Expr> {
    match expr.kind() {
        ExprKind::Constant(_) | ExprKind::Relation(_) | ExprKind::Choice(_) => Ok(expr.clone()),

        ExprKind::Var(_) => {
            expr.typed()?;
            Ok(expr.clone())
        }

        ExprKind::Name(label) => lookup(expr, label, cx, warnings),

        ExprKind::Macro(mac) => {
            let args = mac
                .args()
                .iter()
                .map(|arg| check(arg, cx, warnings))
                .collect::<Result<Vec<_>>>()?;
            let mac = mac.replace_args(args)?;
            if mac.is_saturated() {
                instantiate(&mac, cx, warnings)
            } else {
                Ok(Expr::from_macro(mac))
            }
        }

        ExprKind::Unary(op, sub) => {
            let sub = operand(check(sub, cx, warnings)?)?;
            Expr::unary(*op, expr.span(), &sub)
        }

        // `a.m` supplies `a` as the next argument of the macro `m`.
        ExprKind::Binary(BinaryOp::Join, left, right) => {
            let left = check(left, cx, warnings)?;
            let right = check(right, cx, warnings)?;
            if let Some(mac) = right.as_macro() {
                let mac = mac.add_arg(left)?.with_span(expr.span());
                trace!(name = mac.name(), gap = mac.gap(), "curried macro call");
                return if mac.is_saturated() {
                    instantiate(&mac, cx, warnings)
                } else {
                    Ok(Expr::from_macro(mac))
                };
            }
            Expr::binary(BinaryOp::Join, expr.span(), &operand(left)?, &operand(right)?)
        }

        ExprKind::Binary(op, left, right) => {
            let left = operand(check(left, cx, warnings)?)?;
            let right = operand(check(right, cx, warnings)?)?;
            Expr::binary(*op, expr.span(), &left, &right)
        }

        ExprKind::Ite(cond, then, els) => {
            let cond = operand(check(cond, cx, warnings)?)?;
            let then = operand(check(then, cx, warnings)?)?;
            let els = operand(check(els, cx, warnings)?)?;
            Expr::if_then_else(expr.span(), &cond, &then, &els)
        }

        ExprKind::Quant(op, decls, body) => check_quant(*op, expr, decls, body, cx, warnings),
    }
}

/// The bounding type of `expr`.
pub fn infer(expr: &Expr, cx: &Context, warnings: &mut Vec<Warning>) -> Result<Type> {
    Ok(check(expr, cx, warnings)?.typed()?.clone())
}

/// A checked subexpression used as an operand must have a type.
fn operand(expr: Expr) -> Result<Expr> {
    expr.typed()?;
    Ok(expr)
}

fn lookup(expr: &Expr, label: &str, cx: &Context, warnings: &mut Vec<Warning>) -> Result<Expr> {
    // A quantified variable takes the position of each use. A substituted
    // macro argument keeps its call-site position.
    if let Some(local) = cx.lookup_local(label) {
        return Ok(match local.as_var() {
            Some(_) => local.with_span(expr.span()),
            None => local.clone(),
        });
    }
    let candidates = cx.env().lookup(cx.module(), label);
    if candidates.is_empty() {
        return Err(Error::type_error(
            expr.span(),
            format!("The name \"{}\" cannot be found.", label),
        ));
    }
    let mut found = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let candidate = candidate.with_span(expr.span());
        let expanded = match candidate.as_macro() {
            Some(mac) if mac.is_saturated() => Some(instantiate(mac, cx, warnings)?),
            _ => None,
        };
        found.push(expanded.unwrap_or(candidate));
    }
    trace!(name = label, candidates = found.len(), "looked up name");
    if found.len() == 1 {
        return Ok(found.remove(0));
    }
    if found.iter().any(|c| c.ty().is_none()) {
        return Err(Error::type_error(
            expr.span(),
            format!("The name \"{}\" is ambiguous: a macro cannot be overloaded.", label),
        ));
    }
    Expr::choice(expr.span(), found)
}

/// Declarations are checked left to right: a name is visible in the domains
/// of later declarations and in the body, never in its own domain.
fn check_quant(
    op: QuantOp,
    expr: &Expr,
    decls: &[Decl],
    body: &Expr,
    cx: &Context,
    warnings: &mut Vec<Warning>,
) -> Result<Expr> {
    if let Some(dup) = find_duplicate_label(decls) {
        return Err(Error::syntax(
            dup.span,
            format!("The name \"{}\" is already bound in this declaration list.", dup.name),
        ));
    }
    trace!(op = op.keyword(), decls = decls.len(), "checking quantifier");
    let mut scope = cx.clone();
    let mut checked = Vec::with_capacity(decls.len());
    for decl in decls {
        let domain = operand(check(decl.expr(), &scope, warnings)?)?;
        let vars: Vec<(String, Expr)> = decl
            .names()
            .iter()
            .map(|name| {
                let var = Expr::var(name.span, name.name.clone(), Some(domain.clone()));
                (name.name.clone(), var)
            })
            .collect();
        scope = scope.bind_all(vars);
        checked.push(decl.with_expr(domain));
    }
    let body = operand(check(body, &scope, warnings)?)?;
    Expr::quant(op, expr.span(), checked, &body)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relspec_ast::{Atom, Ident, ModuleId, Span};

    use super::*;
    use crate::env::Env;

    fn name(label: &str) -> Expr {
        Expr::name(Span::UNKNOWN, label)
    }

    fn context() -> Context {
        let mut env = Env::new();
        let main = env.add_module("main");
        let a = Atom::top_level("A");
        let b = Atom::top_level("B");
        env.define_relation(main, "A", Type::unary(a.clone())).unwrap();
        env.define_relation(main, "B", Type::unary(b.clone())).unwrap();
        env.define_relation(main, "r", Type::relation([a.clone(), a.clone()])).unwrap();
        env.define_relation(main, "f", Type::relation([a.clone(), b.clone()])).unwrap();
        env.define_relation(main, "f", Type::relation([b, a])).unwrap();
        Context::new(Arc::new(env), main, 20)
    }

    fn decl(label: &str, domain: Expr) -> Decl {
        Decl::simple(vec![Ident::new(label, Span::UNKNOWN)], domain)
    }

    #[test]
    fn test_names_are_looked_up() {
        let cx = context();
        let mut warnings = Vec::new();
        let rr = Expr::binary(BinaryOp::Join, Span::UNKNOWN, &name("r"), &name("r")).unwrap();
        let ty = infer(&rr, &cx, &mut warnings).unwrap();
        assert_eq!(ty.arity(), Some(2));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_name() {
        let cx = context();
        let err = check(&name("nope"), &cx, &mut Vec::new()).unwrap_err();
        assert!(err.is_type());
        assert!(err.message().contains("nope"));
    }

    #[test]
    fn test_overloaded_name_becomes_choice() {
        let cx = context();
        let f = check(&name("f"), &cx, &mut Vec::new()).unwrap();
        assert!(matches!(f.kind(), ExprKind::Choice(c) if c.len() == 2));
        assert!(!f.is_resolved());
    }

    #[test]
    fn test_quantifier_binds_left_to_right() {
        let cx = context();
        let x_domain = Expr::unary(relspec_ast::UnaryOp::OneOf, Span::UNKNOWN, &name("A")).unwrap();
        let y_domain = Expr::binary(BinaryOp::Join, Span::UNKNOWN, &name("x"), &name("r")).unwrap();
        let body = Expr::binary(BinaryOp::In, Span::UNKNOWN, &name("y"), &name("A")).unwrap();
        let quant = Expr::quant(
            QuantOp::All,
            Span::UNKNOWN,
            vec![decl("x", x_domain), decl("y", y_domain)],
            &body,
        )
        .unwrap();
        let checked = check(&quant, &cx, &mut Vec::new()).unwrap();
        assert_eq!(checked.ty(), Some(&Type::FORMULA));
    }

    #[test]
    fn test_name_not_visible_in_own_domain() {
        let cx = context();
        let domain = Expr::binary(BinaryOp::Join, Span::UNKNOWN, &name("x"), &name("r")).unwrap();
        let body = Expr::unary(relspec_ast::UnaryOp::Some, Span::UNKNOWN, &name("x")).unwrap();
        let quant = Expr::quant(QuantOp::Some, Span::UNKNOWN, vec![decl("x", domain)], &body).unwrap();
        assert!(check(&quant, &cx, &mut Vec::new()).unwrap_err().is_type());
    }

    #[test]
    fn test_duplicate_label_is_syntax_error() {
        let cx = context();
        let body = Expr::constant(Span::UNKNOWN, relspec_ast::Constant::True);
        let quant = Expr::quant(
            QuantOp::All,
            Span::UNKNOWN,
            vec![decl("x", name("A")), decl("x", name("B"))],
            &body,
        )
        .unwrap();
        assert!(check(&quant, &cx, &mut Vec::new()).unwrap_err().is_syntax());
    }

    #[test]
    fn test_prebuilt_quantifier_passes_through() {
        let cx = context();
        assert_eq!(cx.module(), ModuleId(0));
        let a = check(&name("A"), &cx, &mut Vec::new()).unwrap();
        let x = a.one_of("x").unwrap();
        let all = x.in_(&a).unwrap().for_all(&[x]).unwrap();
        let checked = check(&all, &cx, &mut Vec::new()).unwrap();
        assert_eq!(checked.to_string(), "all x: one A | x in A");
    }
}
