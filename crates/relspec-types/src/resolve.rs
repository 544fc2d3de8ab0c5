//! Top-down type resolution (pass 2).
//!
//! Starting from the type the context expects, each node narrows the target
//! it hands to its children. Overloaded names are settled here: a `Choice`
//! keeps only the candidates whose type fits the target and exactly one
//! must remain. Every node is rebuilt from its resolved children, so the
//! result carries final types throughout.

use relspec_ast::{BinaryOp, Error, Expr, ExprKind, Mult, QuantOp, Result, Type, UnaryOp, Warning};
use tracing::trace;

/// Resolve `expr` against `target`. An empty target means "no constraint
/// from the context" and resolves against the node's own type.
pub fn resolve(expr: &Expr, target: &Type, warnings: &mut Vec<Warning>) -> Result<Expr> {
    let ty = expr.typed()?.clone();
    if let ExprKind::Choice(choices) = expr.kind() {
        return resolve_choice(expr, choices, target, warnings);
    }
    let t = fit(expr, &ty, target)?;
    let span = expr.span();
    match expr.kind() {
        ExprKind::Constant(_) | ExprKind::Relation(_) | ExprKind::Var(_) => Ok(expr.clone()),

        ExprKind::Unary(op, sub) => {
            let sub_ty = sub.typed()?;
            let target = match op {
                UnaryOp::Not => Type::FORMULA,
                UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf | UnaryOp::SetOf => t,
                UnaryOp::Transpose => t.transpose(),
                UnaryOp::Closure | UnaryOp::ReflexiveClosure => sub_ty.extract(2),
                UnaryOp::CastToInt => sub_ty.extract(1),
                UnaryOp::CastToSigint => Type::INT,
                UnaryOp::No | UnaryOp::Some | UnaryOp::Lone | UnaryOp::One | UnaryOp::Cardinality => {
                    sub_ty.relational()
                }
            };
            let sub = resolve(sub, &target, warnings)?;
            Expr::unary(*op, span, &sub)
        }

        ExprKind::Binary(op, left, right) => {
            trace!(op = %op.symbol(), target = %t, "resolving operands");
            let (a, b) = binary_targets(*op, expr, left, right, &t, warnings)?;
            let left = resolve(left, &a, warnings)?;
            let right = resolve(right, &b, warnings)?;
            Expr::binary(*op, span, &left, &right)
        }

        ExprKind::Ite(cond, then, els) => {
            let cond = resolve(cond, &Type::FORMULA, warnings)?;
            let (a, b) = if t.is_relational() {
                (narrow(then, &t, warnings)?, narrow(els, &t, warnings)?)
            } else {
                (t.clone(), t)
            };
            let then = resolve(then, &a, warnings)?;
            let els = resolve(els, &b, warnings)?;
            Expr::if_then_else(span, &cond, &then, &els)
        }

        ExprKind::Quant(op, decls, body) => {
            let mut resolved = Vec::with_capacity(decls.len());
            for decl in decls {
                let own = decl.expr().typed()?.clone();
                resolved.push(decl.with_expr(resolve(decl.expr(), &own, warnings)?));
            }
            let body_target = if *op == QuantOp::Sum { Type::INT } else { Type::FORMULA };
            let body = resolve(body, &body_target, warnings)?;
            Expr::quant(*op, span, resolved, &body)
        }

        ExprKind::Name(_) | ExprKind::Choice(_) | ExprKind::Macro(_) => {
            Err(Error::fatal(span, "this node should have been replaced by type inference"))
        }
    }
}

/// Resolve a formula. Fails unless the result is completely resolved.
pub fn resolve_as_formula(expr: &Expr, warnings: &mut Vec<Warning>) -> Result<Expr> {
    if !expr.typed()?.is_bool() {
        return Err(Error::type_error(expr.span(), "This must be a formula expression."));
    }
    finish(resolve(expr, &Type::FORMULA, warnings)?)
}

/// Resolve an integer expression.
pub fn resolve_as_int(expr: &Expr, warnings: &mut Vec<Warning>) -> Result<Expr> {
    if !expr.typed()?.is_int() {
        return Err(Error::type_error(expr.span(), "This must be an integer expression."));
    }
    finish(resolve(expr, &Type::INT, warnings)?)
}

/// Resolve a set or relation. Multiplicity constraints are not values.
pub fn resolve_as_set(expr: &Expr, warnings: &mut Vec<Warning>) -> Result<Expr> {
    let ty = expr.typed()?;
    if !ty.is_relational() {
        return Err(Error::type_error(expr.span(), "This must be a set or relation."));
    }
    if expr.mult() != Mult::None {
        return Err(Error::type_error(expr.span(), "Multiplicity expression not allowed here."));
    }
    let target = ty.relational();
    finish(resolve(expr, &target, warnings)?)
}

/// Resolve against the expression's own type.
pub fn resolve_natural(expr: &Expr, warnings: &mut Vec<Warning>) -> Result<Expr> {
    let own = expr.typed()?.clone();
    finish(resolve(expr, &own, warnings)?)
}

fn finish(expr: Expr) -> Result<Expr> {
    if expr.is_resolved() {
        Ok(expr)
    } else {
        Err(Error::fatal(expr.span(), "expression is not fully resolved"))
    }
}

/// The part of `ty` the context can use.
fn fit(expr: &Expr, ty: &Type, target: &Type) -> Result<Type> {
    if target.is_empty() {
        return Ok(ty.clone());
    }
    let fitted = ty.intersect(target);
    if fitted.is_valid() {
        Ok(fitted)
    } else {
        Err(Error::type_error(
            expr.span(),
            format!("This expression has type {}, but {} is expected here.", ty, target),
        ))
    }
}

/// Target for one operand of a union-like operator. An operand that cannot
/// contribute is kept at its own type with a warning.
fn narrow(child: &Expr, t: &Type, warnings: &mut Vec<Warning>) -> Result<Type> {
    let ty = child.typed()?;
    let narrowed = ty.intersect(t).relational();
    if narrowed.is_relational() {
        return Ok(narrowed);
    }
    warnings.push(Warning::new(
        child.span(),
        format!("This subexpression of type {} is irrelevant to the expected {}.", ty, t),
    ));
    Ok(ty.relational())
}

fn binary_targets(
    op: BinaryOp,
    expr: &Expr,
    left: &Expr,
    right: &Expr,
    t: &Type,
    warnings: &mut Vec<Warning>,
) -> Result<(Type, Type)> {
    let l = left.typed()?;
    let r = right.typed()?;
    let targets = match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Iff => (Type::FORMULA, Type::FORMULA),
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => (Type::INT, Type::INT),
        BinaryOp::Equals | BinaryOp::In => {
            if !l.has_common_arity(r) {
                return Ok((Type::INT, Type::INT));
            }
            // Each side is narrowed by the other, so overloads on either
            // side settle on the reading the comparison can use.
            let common = l.relational().intersect(&r.relational());
            if common.is_relational() {
                return Ok((common.clone(), common));
            }
            warnings.push(Warning::new(
                expr.span(),
                format!(
                    "{} is redundant since the two subexpressions are always disjoint.",
                    op.symbol()
                ),
            ));
            let union = l.union_with_common_arity(r);
            (union.clone(), union)
        }
        BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Intersect | BinaryOp::Override
            if !t.is_relational() =>
        {
            (Type::INT, Type::INT)
        }
        BinaryOp::Plus | BinaryOp::Override => (narrow(left, t, warnings)?, narrow(right, t, warnings)?),
        BinaryOp::Minus => {
            let a = narrow(left, t, warnings)?;
            let b = narrow(right, &a, warnings)?;
            (a, b)
        }
        BinaryOp::Intersect => (narrow(left, t, warnings)?, narrow(right, t, warnings)?),
        BinaryOp::Join => pairwise(expr, l, r, t, |a, b| Type::of(a.clone()).join(&Type::of(b.clone())))?,
        BinaryOp::Domain => pairwise(expr, l, r, t, |a, b| {
            Type::of(a.clone()).domain_restrict(&Type::of(b.clone()))
        })?,
        BinaryOp::Range => pairwise(expr, l, r, t, |a, b| {
            Type::of(a.clone()).range_restrict(&Type::of(b.clone()))
        })?,
        BinaryOp::Arrow(..) | BinaryOp::IsSeqArrowLone => {
            pairwise(expr, l, r, t, |a, b| Type::of(a.product(b)))?
        }
    };
    Ok(targets)
}

/// Keep the pairs of operand shapes whose combination fits `t`.
fn pairwise(
    expr: &Expr,
    l: &Type,
    r: &Type,
    t: &Type,
    combine: impl Fn(&relspec_ast::Shape, &relspec_ast::Shape) -> Type,
) -> Result<(Type, Type)> {
    let mut a = Vec::new();
    let mut b = Vec::new();
    for ls in l.shapes() {
        for rs in r.shapes() {
            if combine(ls, rs).intersects(t) {
                a.push(ls.clone());
                b.push(rs.clone());
            }
        }
    }
    if a.is_empty() {
        return Err(Error::type_error(
            expr.span(),
            format!("No combination of the operand types yields the expected {}.", t),
        ));
    }
    Ok((Type::from_shapes(a), Type::from_shapes(b)))
}

fn resolve_choice(
    expr: &Expr,
    choices: &[Expr],
    target: &Type,
    warnings: &mut Vec<Warning>,
) -> Result<Expr> {
    let matching: Vec<&Expr> = choices
        .iter()
        .filter(|c| target.is_empty() || c.ty().is_some_and(|ty| ty.intersects(target)))
        .collect();
    trace!(candidates = choices.len(), matching = matching.len(), "resolving overload");
    match matching.as_slice() {
        [] => Err(Error::type_error(
            expr.span(),
            format!("No candidate for this name fits the expected type {}.", target),
        )),
        [one] => Ok(resolve(one, target, warnings)?.with_span(expr.span())),
        many => {
            let types: Vec<String> = many
                .iter()
                .filter_map(|c| c.ty())
                .map(ToString::to_string)
                .collect();
            Err(Error::type_error(
                expr.span(),
                format!(
                    "This name is ambiguous due to multiple matches: {}",
                    types.join(", ")
                ),
            ))
        }
    }
}
