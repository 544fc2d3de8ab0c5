//! Declarations binding variables to a domain expression.

use std::sync::{Arc, OnceLock};

use crate::ast::{Expr, Ident};
use crate::span::Span;

/// Binds a list of variable names to one expression.
#[derive(Debug, Clone)]
pub struct Decl {
    is_private: Option<Span>,
    /// Location of the `disj` keyword making each name disjoint.
    disjoint: Option<Span>,
    /// Location of the `disj` keyword making field values disjoint per atom.
    disjoint2: Option<Span>,
    names: Vec<Ident>,
    expr: Arc<Expr>,
    span: OnceLock<Span>,
}

impl Decl {
    pub fn new(
        is_private: Option<Span>,
        disjoint: Option<Span>,
        disjoint2: Option<Span>,
        names: Vec<Ident>,
        expr: Expr,
    ) -> Self {
        Self {
            is_private,
            disjoint,
            disjoint2,
            names,
            expr: Arc::new(expr),
            span: OnceLock::new(),
        }
    }

    /// A plain declaration `names: expr`.
    pub fn simple(names: Vec<Ident>, expr: Expr) -> Self {
        Self::new(None, None, None, names, expr)
    }

    /// Same qualifiers and names over a different domain.
    pub fn with_expr(&self, expr: Expr) -> Self {
        Self::new(self.is_private, self.disjoint, self.disjoint2, self.names.clone(), expr)
    }

    pub fn is_private(&self) -> Option<Span> {
        self.is_private
    }

    pub fn disjoint(&self) -> Option<Span> {
        self.disjoint
    }

    pub fn disjoint2(&self) -> Option<Span> {
        self.disjoint2
    }

    pub fn names(&self) -> &[Ident] {
        &self.names
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The span of the whole declaration, computed once.
    pub fn span(&self) -> Span {
        *self.span.get_or_init(|| {
            let mut span = self
                .expr
                .span()
                .merge_opt(self.disjoint)
                .merge_opt(self.disjoint2);
            for name in &self.names {
                span = span.merge(name.span);
            }
            span
        })
    }

    pub fn has_name(&self, label: &str) -> bool {
        self.names.iter().any(|n| n.name == label)
    }
}

/// Returns a name that occurs twice in one declaration, or in two
/// declarations of the list, if there is one.
pub fn find_duplicate_label(list: &[Decl]) -> Option<&Ident> {
    for (i, decl) in list.iter().enumerate() {
        for (j, name) in decl.names.iter().enumerate() {
            if decl.names[j + 1..].iter().any(|other| other.name == name.name) {
                return Some(name);
            }
            if list[i + 1..].iter().any(|later| later.has_name(&name.name)) {
                return Some(name);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(names: &[&str]) -> Decl {
        let names = names
            .iter()
            .enumerate()
            .map(|(i, n)| Ident::new(*n, Span::new(i, i + 1)))
            .collect();
        Decl::simple(names, Expr::name(Span::new(10, 11), "D"))
    }

    #[test]
    fn test_distinct_labels() {
        let list = vec![decl(&["x", "y"]), decl(&["z"])];
        assert!(find_duplicate_label(&list).is_none());
    }

    #[test]
    fn test_cross_declaration_collision() {
        let list = vec![decl(&["x", "y"]), decl(&["x"])];
        assert_eq!(find_duplicate_label(&list).map(|n| n.name.as_str()), Some("x"));
    }

    #[test]
    fn test_within_declaration_collision() {
        let list = vec![decl(&["x", "x"])];
        let dup = find_duplicate_label(&list).unwrap();
        assert_eq!(dup.name, "x");
        assert_eq!(dup.span, Span::new(0, 1));
    }

    #[test]
    fn test_span_covers_names_and_keywords() {
        let d = Decl::new(
            None,
            Some(Span::new(20, 24)),
            None,
            vec![Ident::new("x", Span::new(2, 3))],
            Expr::name(Span::new(10, 11), "D"),
        );
        assert_eq!(d.span(), Span::new(2, 24));
        assert_eq!(d.span(), Span::new(2, 24));
    }
}
