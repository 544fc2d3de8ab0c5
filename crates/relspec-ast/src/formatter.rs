//! Surface-text rendering.
//!
//! Prints expressions back to source text, either on one line or with
//! quantifier bodies and conjunctions laid out on indented lines.

use std::fmt;

use crate::ast::*;
use crate::decl::Decl;

/// How to lay out rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    SingleLine,
    /// Multi-line output starting at the given indentation.
    Indented(usize),
}

/// Format an expression to a string.
pub fn format_expr(expr: &Expr, layout: Layout) -> String {
    let indent = match layout {
        Layout::SingleLine => None,
        Layout::Indented(n) => Some(n),
    };
    let mut out = String::new();
    if let Some(n) = indent {
        out.push_str(&pad(n));
    }
    write_expr(&mut out, expr, indent);
    out
}

impl Expr {
    pub fn render(&self, layout: Layout) -> String {
        format_expr(self, layout)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_expr(self, Layout::SingleLine))
    }
}

fn pad(n: usize) -> String {
    " ".repeat(n)
}

fn is_atomic(expr: &Expr) -> bool {
    match expr.kind() {
        ExprKind::Constant(_)
        | ExprKind::Name(_)
        | ExprKind::Relation(_)
        | ExprKind::Var(_)
        | ExprKind::Choice(_)
        | ExprKind::Macro(_) => true,
        ExprKind::Unary(op, _) => matches!(op, UnaryOp::CastToInt | UnaryOp::CastToSigint),
        ExprKind::Quant(QuantOp::Comprehension, _, _) => true,
        _ => false,
    }
}

fn write_child(out: &mut String, expr: &Expr, indent: Option<usize>) {
    if is_atomic(expr) {
        write_expr(out, expr, indent);
    } else {
        out.push('(');
        write_expr(out, expr, indent);
        out.push(')');
    }
}

fn write_expr(out: &mut String, expr: &Expr, indent: Option<usize>) {
    match expr.kind() {
        ExprKind::Constant(c) => match c {
            Constant::True => out.push_str("true"),
            Constant::False => out.push_str("false"),
            Constant::Number(n) => out.push_str(&n.to_string()),
            Constant::Univ => out.push_str("univ"),
            Constant::Iden => out.push_str("iden"),
            Constant::None => out.push_str("none"),
        },
        ExprKind::Name(label) | ExprKind::Relation(label) => out.push_str(label),
        ExprKind::Var(var) => out.push_str(&var.label),
        ExprKind::Choice(choices) => {
            if let Some(first) = choices.first() {
                write_expr(out, first, indent);
            }
        }
        ExprKind::Macro(mac) => {
            out.push_str(mac.name());
            if !mac.args().is_empty() {
                out.push('[');
                for (i, arg) in mac.args().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_expr(out, arg, None);
                }
                out.push(']');
            }
        }
        ExprKind::Unary(op, sub) => write_unary(out, *op, sub, indent),
        ExprKind::Binary(BinaryOp::And, _, _) if indent.is_some() => {
            let n = indent.unwrap_or(0);
            let mut conjuncts = Vec::new();
            flatten_and(expr, &mut conjuncts);
            for (i, conjunct) in conjuncts.iter().enumerate() {
                if i > 0 {
                    out.push_str(" &&\n");
                    out.push_str(&pad(n));
                }
                write_child(out, conjunct, indent);
            }
        }
        ExprKind::Binary(BinaryOp::Join, left, right) => {
            write_child(out, left, indent);
            out.push('.');
            write_child(out, right, indent);
        }
        ExprKind::Binary(op, left, right) => {
            write_child(out, left, indent);
            out.push_str(&format!(" {} ", op.symbol()));
            write_child(out, right, indent);
        }
        ExprKind::Ite(cond, then, els) => {
            write_child(out, cond, indent);
            out.push_str(" => ");
            write_child(out, then, indent);
            out.push_str(" else ");
            write_child(out, els, indent);
        }
        ExprKind::Quant(op, decls, body) => write_quant(out, *op, decls, body, indent),
    }
}

fn flatten_and<'a>(expr: &'a Expr, acc: &mut Vec<&'a Expr>) {
    match expr.kind() {
        ExprKind::Binary(BinaryOp::And, left, right) => {
            flatten_and(left, acc);
            flatten_and(right, acc);
        }
        _ => acc.push(expr),
    }
}

fn write_unary(out: &mut String, op: UnaryOp, sub: &Expr, indent: Option<usize>) {
    let prefix = match op {
        UnaryOp::Not => "!",
        UnaryOp::No => "no ",
        UnaryOp::Some | UnaryOp::SomeOf => "some ",
        UnaryOp::Lone | UnaryOp::LoneOf => "lone ",
        UnaryOp::One | UnaryOp::OneOf => "one ",
        UnaryOp::SetOf => "set ",
        UnaryOp::Transpose => "~",
        UnaryOp::ReflexiveClosure => "*",
        UnaryOp::Closure => "^",
        UnaryOp::Cardinality => "#",
        UnaryOp::CastToInt | UnaryOp::CastToSigint => {
            out.push_str(if op == UnaryOp::CastToInt { "int[" } else { "Int[" });
            write_expr(out, sub, indent);
            out.push(']');
            return;
        }
    };
    out.push_str(prefix);
    write_child(out, sub, indent);
}

fn write_decl(out: &mut String, decl: &Decl) {
    if decl.is_private().is_some() {
        out.push_str("private ");
    }
    if decl.disjoint().is_some() {
        out.push_str("disj ");
    }
    let names: Vec<&str> = decl.names().iter().map(|n| n.name.as_str()).collect();
    out.push_str(&names.join(", "));
    out.push_str(": ");
    if decl.disjoint2().is_some() {
        out.push_str("disj ");
    }
    write_expr(out, decl.expr(), None);
}

fn write_quant(out: &mut String, op: QuantOp, decls: &[Decl], body: &Expr, indent: Option<usize>) {
    let comprehension = op == QuantOp::Comprehension;
    if comprehension {
        out.push('{');
    } else {
        out.push_str(op.keyword());
        out.push(' ');
    }
    for (i, decl) in decls.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_decl(out, decl);
    }
    match indent {
        Some(n) if !comprehension => {
            out.push_str(" |\n");
            out.push_str(&pad(n + 2));
            write_expr(out, body, Some(n + 2));
        }
        _ => {
            out.push_str(" | ");
            write_expr(out, body, indent);
        }
    }
    if comprehension {
        out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;
    use crate::types::{Atom, Type};

    fn relations() -> (Expr, Expr) {
        let a = Atom::top_level("A");
        let set = Expr::relation(Span::UNKNOWN, "A", Type::unary(a.clone())).unwrap();
        let r = Expr::relation(Span::UNKNOWN, "r", Type::relation([a.clone(), a])).unwrap();
        (set, r)
    }

    #[test]
    fn test_format_join_and_cardinality() {
        let (_, r) = relations();
        let rr = r.join(&r).unwrap();
        assert_eq!(rr.to_string(), "r.r");
        assert_eq!(rr.cardinality().unwrap().to_string(), "#(r.r)");
    }

    #[test]
    fn test_format_quantifier_single_line() {
        let (a, r) = relations();
        let x = a.one_of("x").unwrap();
        let body = x.join(&r).unwrap().some().unwrap();
        let all = body.for_all(&[x]).unwrap();
        assert_eq!(all.to_string(), "all x: one A | some (x.r)");
    }

    #[test]
    fn test_format_indented() {
        let (a, r) = relations();
        let x = a.one_of("x").unwrap();
        let left = x.join(&r).unwrap().some().unwrap();
        let right = x.in_(&a).unwrap();
        let body = left.and(Some(&right)).unwrap();
        let all = body.for_all(&[x]).unwrap();
        assert_eq!(
            all.render(Layout::Indented(0)),
            "all x: one A |\n  (some (x.r)) &&\n  (x in A)"
        );
    }

    #[test]
    fn test_format_arrows_and_casts() {
        let (a, r) = relations();
        let arrow = a.one_arrow_lone(&a).unwrap();
        assert_eq!(r.in_(&arrow).unwrap().to_string(), "r in (A one->lone A)");
        let n = a.cast_to_int().unwrap();
        assert_eq!(n.to_string(), "int[A]");
    }

    #[test]
    fn test_format_comprehension() {
        let (a, r) = relations();
        let x = a.one_of("x").unwrap();
        let set = x.join(&r).unwrap().some().unwrap().comprehension_over(&[x]).unwrap();
        assert_eq!(set.to_string(), "{x: one A | some (x.r)}");
    }
}
