//! Smart constructors for composite expressions.
//!
//! Each constructor checks its operator's preconditions against whatever
//! operand types are already known and computes the bounding type of the new
//! node. Operands without a type yet produce an untyped node; the checker
//! rebuilds it once the operands are typed.

use std::sync::Arc;

use crate::ast::{ArrowMult, BinaryOp, Expr, ExprKind, Ident, Mult, QuantOp, UnaryOp};
use crate::decl::Decl;
use crate::error::{Error, Result};
use crate::span::Span;
use crate::types::{Atom, Type};

const NEED_FORMULA: &str = "This must be a formula expression.";
const NEED_SET: &str = "This must be a set or relation.";
const NEED_UNARY: &str = "This must be a unary set.";
const NEED_INT: &str = "This must be an integer expression.";
const NO_VARS: &str = "You must have 1 or more variable in a quantification expression.";

impl Expr {
    /// Build `op sub`.
    pub fn unary(op: UnaryOp, span: Span, sub: &Expr) -> Result<Expr> {
        if op != UnaryOp::Not {
            reject_arrow_mult(sub)?;
        }
        let ty = match sub.ty() {
            Some(t) => Some(unary_type(op, sub, t)?),
            None => None,
        };
        let mult = if op.is_multiplicity() { Mult::Simple } else { Mult::None };
        Expr::build(
            ExprKind::Unary(op, Arc::new(sub.clone())),
            span,
            ty,
            mult,
            sub.weight(),
            sub.is_resolved(),
        )
    }

    /// Build `left op right`.
    pub fn binary(op: BinaryOp, span: Span, left: &Expr, right: &Expr) -> Result<Expr> {
        match op {
            BinaryOp::And | BinaryOp::Or | BinaryOp::Iff | BinaryOp::Equals => {}
            BinaryOp::In => reject_arrow_mult(left)?,
            _ if op.is_arrow() => {}
            _ => {
                reject_arrow_mult(left)?;
                reject_arrow_mult(right)?;
            }
        }
        let ty = match (left.ty(), right.ty()) {
            (Some(l), Some(r)) => Some(binary_type(op, left, l, right, r)?),
            _ => None,
        };
        let mult = if op.is_arrow()
            && (op != BinaryOp::PRODUCT || left.mult() == Mult::Arrow || right.mult() == Mult::Arrow)
        {
            Mult::Arrow
        } else {
            Mult::None
        };
        Expr::build(
            ExprKind::Binary(op, Arc::new(left.clone()), Arc::new(right.clone())),
            span,
            ty,
            mult,
            left.weight() + right.weight(),
            left.is_resolved() && right.is_resolved(),
        )
    }

    /// Build `cond => then else els`.
    pub fn if_then_else(span: Span, cond: &Expr, then: &Expr, els: &Expr) -> Result<Expr> {
        let ty = match (cond.ty(), then.ty(), els.ty()) {
            (Some(c), Some(a), Some(b)) => {
                if !c.is_bool() {
                    return Err(Error::type_error(cond.span(), NEED_FORMULA));
                }
                Some(branch_type(then, a, b)?)
            }
            _ => None,
        };
        Expr::build(
            ExprKind::Ite(Arc::new(cond.clone()), Arc::new(then.clone()), Arc::new(els.clone())),
            span,
            ty,
            Mult::None,
            cond.weight() + then.weight() + els.weight(),
            cond.is_resolved() && then.is_resolved() && els.is_resolved(),
        )
    }

    /// Build a quantified formula, comprehension or sum over `decls`.
    pub fn quant(op: QuantOp, span: Span, decls: Vec<Decl>, body: &Expr) -> Result<Expr> {
        if decls.iter().all(|d| d.names().is_empty()) {
            return Err(Error::syntax(span.merge(body.span()), NO_VARS));
        }
        let span = decls
            .iter()
            .fold(span.merge(body.span()), |s, d| s.merge(d.span()));
        let typed = decls.iter().all(|d| d.expr().ty().is_some());
        let ty = match body.ty() {
            Some(b) if typed => Some(quant_type(op, &decls, body, b)?),
            _ => None,
        };
        let weight = decls.iter().map(|d| d.expr().weight()).sum::<u64>() + body.weight();
        let resolved = body.is_resolved() && decls.iter().all(|d| d.expr().is_resolved());
        Expr::build(
            ExprKind::Quant(op, decls, Arc::new(body.clone())),
            span,
            ty,
            Mult::None,
            weight,
            resolved,
        )
    }

    fn join_span(&self, x: &Expr) -> Span {
        self.span().merge(x.span())
    }

    /// `self && x`. If `x` is `None`, returns `self` unchanged.
    pub fn and(&self, x: Option<&Expr>) -> Result<Expr> {
        match x {
            None => Ok(self.clone()),
            Some(x) => Expr::binary(BinaryOp::And, self.join_span(x), self, x),
        }
    }

    pub fn or(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Or, self.join_span(x), self, x)
    }

    pub fn iff(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Iff, self.join_span(x), self, x)
    }

    /// `self => x`, built as `!self || x`.
    pub fn implies(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Or, self.join_span(x), &self.not()?, x)
    }

    /// `self.x`; both are sets or relations and at most one is unary.
    pub fn join(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Join, self.join_span(x), self, x)
    }

    /// `self <: x`; `self` is a unary set.
    pub fn domain(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Domain, self.join_span(x), self, x)
    }

    /// `self :> x`; `x` is a unary set.
    pub fn range(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Range, self.join_span(x), self, x)
    }

    pub fn intersect(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Intersect, self.join_span(x), self, x)
    }

    /// `self ++ x`.
    pub fn override_with(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Override, self.join_span(x), self, x)
    }

    pub fn plus(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Plus, self.join_span(x), self, x)
    }

    pub fn minus(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Minus, self.join_span(x), self, x)
    }

    pub fn equal(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Equals, self.join_span(x), self, x)
    }

    pub fn lt(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Lt, self.join_span(x), self, x)
    }

    pub fn lte(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Lte, self.join_span(x), self, x)
    }

    pub fn gt(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Gt, self.join_span(x), self, x)
    }

    pub fn gte(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Gte, self.join_span(x), self, x)
    }

    /// `self in x`; `x` may be a multiplicity constraint.
    pub fn in_(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::In, self.join_span(x), self, x)
    }

    /// `self -> x`.
    pub fn product(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::PRODUCT, self.join_span(x), self, x)
    }

    /// `self m->n x` for any pair of end multiplicities.
    pub fn arrow(&self, left: ArrowMult, right: ArrowMult, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Arrow(left, right), self.join_span(x), self, x)
    }

    pub fn any_arrow_some(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Set, ArrowMult::Some, x)
    }

    pub fn any_arrow_one(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Set, ArrowMult::One, x)
    }

    pub fn any_arrow_lone(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Set, ArrowMult::Lone, x)
    }

    pub fn some_arrow_any(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Some, ArrowMult::Set, x)
    }

    pub fn some_arrow_some(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Some, ArrowMult::Some, x)
    }

    pub fn some_arrow_one(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Some, ArrowMult::One, x)
    }

    pub fn some_arrow_lone(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Some, ArrowMult::Lone, x)
    }

    pub fn one_arrow_any(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::One, ArrowMult::Set, x)
    }

    pub fn one_arrow_some(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::One, ArrowMult::Some, x)
    }

    pub fn one_arrow_one(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::One, ArrowMult::One, x)
    }

    pub fn one_arrow_lone(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::One, ArrowMult::Lone, x)
    }

    pub fn lone_arrow_any(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Lone, ArrowMult::Set, x)
    }

    pub fn lone_arrow_some(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Lone, ArrowMult::Some, x)
    }

    pub fn lone_arrow_one(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Lone, ArrowMult::One, x)
    }

    pub fn lone_arrow_lone(&self, x: &Expr) -> Result<Expr> {
        self.arrow(ArrowMult::Lone, ArrowMult::Lone, x)
    }

    pub fn is_seq_arrow_lone(&self, x: &Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::IsSeqArrowLone, self.join_span(x), self, x)
    }

    /// `self => x else y`.
    pub fn ite(&self, x: &Expr, y: &Expr) -> Result<Expr> {
        Expr::if_then_else(self.join_span(x).merge(y.span()), self, x, y)
    }

    pub fn not(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Not, self.span(), self)
    }

    pub fn no(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::No, self.span(), self)
    }

    pub fn some(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Some, self.span(), self)
    }

    pub fn lone(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Lone, self.span(), self)
    }

    pub fn one(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::One, self.span(), self)
    }

    /// `~self`; `self` is a binary relation.
    pub fn transpose(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Transpose, self.span(), self)
    }

    /// `*self`; `self` is a binary relation.
    pub fn reflexive_closure(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::ReflexiveClosure, self.span(), self)
    }

    /// `^self`; `self` is a binary relation.
    pub fn closure(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Closure, self.span(), self)
    }

    /// `#self`.
    pub fn cardinality(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::Cardinality, self.span(), self)
    }

    /// `int[self]`; `self` is a unary set.
    pub fn cast_to_int(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::CastToInt, self.span(), self)
    }

    /// `Int[self]`; `self` is an integer expression.
    pub fn cast_to_sigint(&self) -> Result<Expr> {
        Expr::unary(UnaryOp::CastToSigint, self.span(), self)
    }

    pub fn for_all(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::All, vars)
    }

    pub fn for_some(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::Some, vars)
    }

    pub fn for_no(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::No, vars)
    }

    pub fn for_lone(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::Lone, vars)
    }

    pub fn for_one(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::One, vars)
    }

    /// `{vars | self}`; every variable ranges over a unary set.
    pub fn comprehension_over(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::Comprehension, vars)
    }

    /// `sum vars | self`; every variable ranges over a unary set.
    pub fn sum_over(&self, vars: &[Expr]) -> Result<Expr> {
        self.quantify(QuantOp::Sum, vars)
    }

    fn quantify(&self, op: QuantOp, vars: &[Expr]) -> Result<Expr> {
        if vars.is_empty() {
            return Err(Error::syntax(self.span(), NO_VARS));
        }
        let mut decls = Vec::with_capacity(vars.len());
        let mut span = Span::UNKNOWN;
        for var in vars {
            let Some(v) = var.as_var() else {
                return Err(Error::syntax(var.span(), "Only bound variables can be quantified."));
            };
            let Some(domain) = &v.domain else {
                return Err(Error::syntax(
                    var.span(),
                    format!("The variable \"{}\" has no declared domain.", v.label),
                ));
            };
            decls.push(Decl::simple(
                vec![Ident::new(v.label.clone(), var.span())],
                Expr::clone(domain),
            ));
            span = span.merge(var.span());
        }
        Expr::quant(op, span, decls, self)
    }

    /// A variable `label: some self`. The label is only for printing.
    pub fn some_of(&self, label: &str) -> Result<Expr> {
        self.bind(UnaryOp::SomeOf, label)
    }

    /// A variable `label: lone self`.
    pub fn lone_of(&self, label: &str) -> Result<Expr> {
        self.bind(UnaryOp::LoneOf, label)
    }

    /// A variable `label: one self`.
    pub fn one_of(&self, label: &str) -> Result<Expr> {
        self.bind(UnaryOp::OneOf, label)
    }

    /// A variable `label: set self`.
    pub fn set_of(&self, label: &str) -> Result<Expr> {
        self.bind(UnaryOp::SetOf, label)
    }

    fn bind(&self, op: UnaryOp, label: &str) -> Result<Expr> {
        if !self.is_resolved() {
            return Err(Error::type_error(
                self.span(),
                "This expression must be fully typechecked before a variable can range over it.",
            ));
        }
        if self.typed()?.arity() != Some(1) {
            return Err(Error::type_error(self.span(), NEED_UNARY));
        }
        let domain = Expr::unary(op, self.span(), self)?;
        Ok(Expr::var(self.span(), label, Some(domain)))
    }
}

fn reject_arrow_mult(expr: &Expr) -> Result<()> {
    if expr.mult() == Mult::Arrow {
        return Err(Error::type_error(
            expr.span(),
            "Multiplicity expression not allowed here.",
        ));
    }
    Ok(())
}

fn relational<'a>(expr: &Expr, ty: &'a Type) -> Result<&'a Type> {
    if ty.is_relational() {
        Ok(ty)
    } else {
        Err(Error::type_error(expr.span(), NEED_SET))
    }
}

fn unary_type(op: UnaryOp, sub: &Expr, t: &Type) -> Result<Type> {
    let fail = |message: &str| Err(Error::type_error(sub.span(), message));
    match op {
        UnaryOp::Not => {
            if t.is_bool() {
                Ok(Type::FORMULA)
            } else {
                fail(NEED_FORMULA)
            }
        }
        UnaryOp::No | UnaryOp::Some | UnaryOp::Lone | UnaryOp::One => {
            relational(sub, t)?;
            Ok(Type::FORMULA)
        }
        UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf => {
            let unary = t.extract(1);
            if unary.is_relational() {
                Ok(unary)
            } else {
                fail(NEED_UNARY)
            }
        }
        UnaryOp::SetOf => Ok(relational(sub, t)?.relational()),
        UnaryOp::Transpose => {
            let swapped = t.transpose();
            if swapped.is_relational() {
                Ok(swapped)
            } else {
                fail("~ can be used only with a binary relation.")
            }
        }
        UnaryOp::Closure | UnaryOp::ReflexiveClosure => {
            if !t.has_arity(2) {
                return if op == UnaryOp::Closure {
                    fail("^ can be used only with a binary relation.")
                } else {
                    fail("* can be used only with a binary relation.")
                };
            }
            let closed = t.closure();
            if op == UnaryOp::Closure {
                Ok(closed)
            } else {
                Ok(closed.union(&Type::relation([Atom::univ(), Atom::univ()])))
            }
        }
        UnaryOp::Cardinality => {
            relational(sub, t)?;
            Ok(Type::INT)
        }
        UnaryOp::CastToInt => {
            if t.has_arity(1) {
                Ok(Type::INT)
            } else {
                fail("int[] can be used only with a unary set.")
            }
        }
        UnaryOp::CastToSigint => {
            if t.is_int() {
                Ok(Type::unary(Atom::int()))
            } else {
                fail(NEED_INT)
            }
        }
    }
}

fn same_arity_or_int(op: BinaryOp, left: &Expr, l: &Type, r: &Type) -> Result<()> {
    if (l.is_int() && r.is_int()) || l.has_common_arity(r) {
        Ok(())
    } else {
        Err(Error::type_error(
            left.span(),
            format!(
                "{} can be used only between 2 expressions of the same arity, or between 2 integer expressions.",
                op.symbol()
            ),
        ))
    }
}

fn binary_type(op: BinaryOp, left: &Expr, l: &Type, right: &Expr, r: &Type) -> Result<Type> {
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Iff => {
            if !l.is_bool() {
                return Err(Error::type_error(left.span(), NEED_FORMULA));
            }
            if !r.is_bool() {
                return Err(Error::type_error(right.span(), NEED_FORMULA));
            }
            Ok(Type::FORMULA)
        }
        BinaryOp::Join => {
            relational(left, l)?;
            relational(right, r)?;
            let joined = l.join(r);
            if joined.is_relational() {
                return Ok(joined);
            }
            let span = left.span().merge(right.span());
            if l.arity() == Some(1) && r.arity() == Some(1) {
                Err(Error::type_error(span, "You cannot join two unary sets."))
            } else {
                Err(Error::type_error(
                    span,
                    "This join always yields an empty set: no adjoining columns overlap.",
                ))
            }
        }
        BinaryOp::Domain => {
            if !l.has_arity(1) {
                return Err(Error::type_error(left.span(), NEED_UNARY));
            }
            relational(right, r)?;
            let restricted = l.domain_restrict(r);
            if restricted.is_relational() {
                Ok(restricted)
            } else {
                Err(Error::type_error(
                    left.span().merge(right.span()),
                    "<: is irrelevant because the result is always empty.",
                ))
            }
        }
        BinaryOp::Range => {
            relational(left, l)?;
            if !r.has_arity(1) {
                return Err(Error::type_error(right.span(), NEED_UNARY));
            }
            let restricted = l.range_restrict(r);
            if restricted.is_relational() {
                Ok(restricted)
            } else {
                Err(Error::type_error(
                    left.span().merge(right.span()),
                    ":> is irrelevant because the result is always empty.",
                ))
            }
        }
        BinaryOp::Intersect => {
            same_arity_or_int(op, left, l, r)?;
            if l.is_int() && r.is_int() {
                return Ok(Type::INT);
            }
            relational(left, l)?;
            relational(right, r)?;
            let common = l.intersect(r).relational();
            if common.is_relational() {
                Ok(common)
            } else {
                Err(Error::type_error(
                    left.span().merge(right.span()),
                    "& is irrelevant because the two subexpressions are always disjoint.",
                ))
            }
        }
        BinaryOp::Override => {
            same_arity_or_int(op, left, l, r)?;
            if l.is_int() && r.is_int() {
                return Ok(Type::INT);
            }
            relational(left, l)?;
            relational(right, r)?;
            Ok(l.union_with_common_arity(r))
        }
        BinaryOp::Plus | BinaryOp::Minus => {
            same_arity_or_int(op, left, l, r)?;
            if l.is_int() && r.is_int() {
                return Ok(Type::INT);
            }
            if op == BinaryOp::Plus {
                Ok(l.union_with_common_arity(r))
            } else {
                Ok(Type::from_shapes(
                    l.shapes().filter(|s| r.has_arity(s.arity())).cloned(),
                ))
            }
        }
        BinaryOp::Equals | BinaryOp::In => {
            same_arity_or_int(op, left, l, r)?;
            Ok(Type::FORMULA)
        }
        BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            if !l.is_int() {
                return Err(Error::type_error(left.span(), NEED_INT));
            }
            if !r.is_int() {
                return Err(Error::type_error(right.span(), NEED_INT));
            }
            Ok(Type::FORMULA)
        }
        BinaryOp::Arrow(..) | BinaryOp::IsSeqArrowLone => {
            relational(left, l)?;
            relational(right, r)?;
            Ok(l.product(r))
        }
    }
}

fn branch_type(then: &Expr, a: &Type, b: &Type) -> Result<Type> {
    if a.is_int() && b.is_int() {
        Ok(Type::INT)
    } else if a.is_bool() && b.is_bool() {
        Ok(Type::FORMULA)
    } else if a.has_common_arity(b) {
        Ok(a.union_with_common_arity(b))
    } else {
        Err(Error::type_error(
            then.span(),
            "The then-clause and the else-clause must both be formulas, both be integer expressions, or have the same arity.",
        ))
    }
}

fn quant_type(op: QuantOp, decls: &[Decl], body: &Expr, b: &Type) -> Result<Type> {
    for decl in decls {
        let domain = decl.expr().typed()?;
        relational(decl.expr(), domain)?;
        if matches!(op, QuantOp::Comprehension | QuantOp::Sum) && domain.arity() != Some(1) {
            return Err(Error::type_error(decl.expr().span(), NEED_UNARY));
        }
    }
    match op {
        QuantOp::Sum => {
            if b.is_int() {
                Ok(Type::INT)
            } else {
                Err(Error::type_error(body.span(), NEED_INT))
            }
        }
        _ if !b.is_bool() => Err(Error::type_error(body.span(), NEED_FORMULA)),
        QuantOp::Comprehension => {
            let mut ty: Option<Type> = None;
            for decl in decls {
                let domain = decl.expr().typed()?;
                for _ in decl.names() {
                    ty = Some(match ty {
                        None => domain.clone(),
                        Some(acc) => acc.product(domain),
                    });
                }
            }
            ty.ok_or_else(|| Error::syntax(body.span(), NO_VARS))
        }
        _ => Ok(Type::FORMULA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Model {
        a: Expr,
        b: Expr,
        r: Expr,
        f: Expr,
    }

    fn model() -> Model {
        let a = Atom::top_level("A");
        let b = Atom::top_level("B");
        Model {
            a: Expr::relation(Span::new(0, 1), "A", Type::unary(a.clone())).unwrap(),
            b: Expr::relation(Span::new(2, 3), "B", Type::unary(b.clone())).unwrap(),
            r: Expr::relation(Span::new(4, 5), "r", Type::relation([a.clone(), a.clone()])).unwrap(),
            f: Expr::relation(Span::new(6, 7), "f", Type::relation([a, b])).unwrap(),
        }
    }

    fn formula() -> Expr {
        Expr::constant(Span::new(8, 9), crate::ast::Constant::True)
    }

    #[test]
    fn test_and_none_returns_receiver() {
        let x = model().a.some().unwrap();
        let same = x.and(None).unwrap();
        assert_eq!(same.span(), x.span());
        assert_eq!(same.ty(), x.ty());
        assert_eq!(same.to_string(), x.to_string());
    }

    #[test]
    fn test_join_arity() {
        let m = model();
        let rr = m.r.join(&m.r).unwrap();
        assert_eq!(rr.ty().unwrap().arity(), Some(2));
        let ar = m.a.join(&m.r).unwrap();
        assert_eq!(ar.ty().unwrap().arity(), Some(1));
        assert_eq!(rr.span(), Span::new(4, 5));
    }

    #[test]
    fn test_join_of_unary_sets_rejected() {
        let m = model();
        let err = m.a.join(&m.a).unwrap_err();
        assert!(err.is_type());
    }

    #[test]
    fn test_transpose_needs_binary() {
        let m = model();
        assert!(m.a.transpose().unwrap_err().is_type());
        let back = m.f.transpose().unwrap().transpose().unwrap();
        assert_eq!(back.ty(), m.f.ty());
    }

    #[test]
    fn test_set_algebra_needs_same_arity() {
        let m = model();
        assert!(m.a.plus(&m.r).unwrap_err().is_type());
        assert!(m.a.plus(&m.b).is_ok());
        let n = Expr::number(Span::UNKNOWN, 1);
        assert_eq!(n.plus(&n).unwrap().ty(), Some(&Type::INT));
        assert!(m.a.intersect(&m.b).unwrap_err().is_type());
    }

    #[test]
    fn test_integer_intersect_and_override() {
        let m = model();
        let n = Expr::number(Span::UNKNOWN, 1);
        assert_eq!(n.intersect(&n).unwrap().ty(), Some(&Type::INT));
        assert_eq!(n.override_with(&n).unwrap().ty(), Some(&Type::INT));
        assert!(m.a.intersect(&n).unwrap_err().is_type());
        assert!(n.override_with(&m.r).unwrap_err().is_type());
    }

    #[test]
    fn test_comparisons() {
        let m = model();
        let n = Expr::number(Span::UNKNOWN, 1);
        assert_eq!(n.lt(&n).unwrap().ty(), Some(&Type::FORMULA));
        assert!(m.a.lt(&n).unwrap_err().is_type());
        assert!(m.a.equal(&m.b).is_ok());
        assert!(m.a.in_(&m.r).is_err());
    }

    #[test]
    fn test_arrow_mult_tags() {
        let m = model();
        let plain = m.a.product(&m.b).unwrap();
        assert_eq!(plain.mult(), Mult::None);
        let qualified = m.a.any_arrow_one(&m.b).unwrap();
        assert_eq!(qualified.mult(), Mult::Arrow);
        let nested = qualified.product(&m.a).unwrap();
        assert_eq!(nested.mult(), Mult::Arrow);
        assert_eq!(m.a.some().unwrap().mult(), Mult::Simple);
        assert_eq!(nested.ty().unwrap().arity(), Some(3));
    }

    #[test]
    fn test_arrow_mult_only_where_allowed() {
        let m = model();
        let constraint = m.a.one_arrow_one(&m.b).unwrap();
        assert!(m.f.in_(&constraint).is_ok());
        assert!(constraint.join(&m.b).unwrap_err().is_type());
    }

    #[test]
    fn test_weight_is_sum_of_children() {
        let m = model();
        let a = m.a.with_weight(2);
        let b = m.b.with_weight(3);
        assert_eq!(a.plus(&b).unwrap().weight(), 5);
    }

    #[test]
    fn test_ite_branches() {
        let m = model();
        let n = Expr::number(Span::UNKNOWN, 1);
        assert_eq!(formula().ite(&n, &n).unwrap().ty(), Some(&Type::INT));
        assert!(formula().ite(&m.a, &m.r).unwrap_err().is_type());
        assert!(m.a.ite(&m.a, &m.b).unwrap_err().is_type());
    }

    #[test]
    fn test_quantifier_needs_variables() {
        let err = formula().for_all(&[]).unwrap_err();
        assert!(err.is_syntax());
        assert!(formula().sum_over(&[]).unwrap_err().is_syntax());
    }

    #[test]
    fn test_binders_and_quantifiers() {
        let m = model();
        let x = m.a.one_of("x").unwrap();
        let y = m.a.one_of("x").unwrap();
        let body = x.join(&m.r).unwrap().in_(&y).unwrap();
        let all = body.for_all(&[x.clone(), y]).unwrap();
        assert_eq!(all.ty(), Some(&Type::FORMULA));
        assert!(all.is_resolved());
        let set = body.comprehension_over(&[x]).unwrap();
        assert_eq!(set.ty().unwrap().arity(), Some(1));
    }

    #[test]
    fn test_binder_needs_resolved_unary() {
        let m = model();
        assert!(m.r.some_of("x").unwrap_err().is_type());
        assert!(Expr::name(Span::UNKNOWN, "A").one_of("x").is_err());
    }

    #[test]
    fn test_untyped_operands_build_untyped_nodes() {
        let m = model();
        let node = Expr::name(Span::new(20, 21), "s").join(&m.r).unwrap();
        assert!(node.ty().is_none());
        assert!(!node.is_resolved());
        assert_eq!(node.span(), Span::new(4, 21));
    }

    #[test]
    fn test_casts() {
        let m = model();
        assert_eq!(m.a.cardinality().unwrap().ty(), Some(&Type::INT));
        assert_eq!(m.a.cast_to_int().unwrap().ty(), Some(&Type::INT));
        assert!(m.r.cast_to_int().unwrap_err().is_type());
        let n = Expr::number(Span::UNKNOWN, 4);
        assert_eq!(n.cast_to_sigint().unwrap().ty(), Some(&Type::unary(Atom::int())));
    }
}
