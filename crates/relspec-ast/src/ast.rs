//! Expression node definitions.
//!
//! Nodes are immutable. Every derived node is built through a smart
//! constructor (see `combinators`) that validates its operands and computes
//! the node's bounding type, multiplicity tag and weight.

use std::sync::Arc;

use crate::decl::Decl;
use crate::error::{Error, Result};
use crate::macros::Macro;
use crate::span::Span;
use crate::types::{Atom, Type};

/// An identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Whether a node itself denotes a multiplicity constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mult {
    #[default]
    None,
    /// A constraint of the form `some X`, `one X`, ...
    Simple,
    /// An arrow constraint `X m->n Y`, or a product containing one.
    Arrow,
}

/// A constant leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    True,
    False,
    Number(i64),
    Univ,
    Iden,
    None,
}

impl Constant {
    pub fn ty(self) -> Type {
        match self {
            Constant::True | Constant::False => Type::FORMULA,
            Constant::Number(_) => Type::INT,
            Constant::Univ => Type::unary(Atom::univ()),
            Constant::Iden => Type::relation([Atom::univ(), Atom::univ()]),
            Constant::None => Type::unary(Atom::none()),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    No,
    Some,
    Lone,
    One,
    SomeOf,
    LoneOf,
    OneOf,
    SetOf,
    Transpose,
    ReflexiveClosure,
    Closure,
    Cardinality,
    CastToInt,
    CastToSigint,
}

impl UnaryOp {
    /// Multiplicity formulas and declaration multiplicities.
    pub fn is_multiplicity(self) -> bool {
        matches!(
            self,
            UnaryOp::No
                | UnaryOp::Some
                | UnaryOp::Lone
                | UnaryOp::One
                | UnaryOp::SomeOf
                | UnaryOp::LoneOf
                | UnaryOp::OneOf
                | UnaryOp::SetOf
        )
    }
}

/// Multiplicity on one end of an arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowMult {
    Set,
    Some,
    One,
    Lone,
}

impl ArrowMult {
    pub fn keyword(self) -> &'static str {
        match self {
            ArrowMult::Set => "set",
            ArrowMult::Some => "some",
            ArrowMult::One => "one",
            ArrowMult::Lone => "lone",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Iff,
    Join,
    Domain,
    Range,
    Intersect,
    Override,
    Plus,
    Minus,
    Equals,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    /// `left m->n right`; `Arrow(Set, Set)` is the plain product.
    Arrow(ArrowMult, ArrowMult),
    IsSeqArrowLone,
}

impl BinaryOp {
    pub const PRODUCT: BinaryOp = BinaryOp::Arrow(ArrowMult::Set, ArrowMult::Set);

    pub fn is_arrow(self) -> bool {
        matches!(self, BinaryOp::Arrow(..) | BinaryOp::IsSeqArrowLone)
    }

    pub fn symbol(self) -> String {
        match self {
            BinaryOp::And => "&&".into(),
            BinaryOp::Or => "||".into(),
            BinaryOp::Iff => "<=>".into(),
            BinaryOp::Join => ".".into(),
            BinaryOp::Domain => "<:".into(),
            BinaryOp::Range => ":>".into(),
            BinaryOp::Intersect => "&".into(),
            BinaryOp::Override => "++".into(),
            BinaryOp::Plus => "+".into(),
            BinaryOp::Minus => "-".into(),
            BinaryOp::Equals => "=".into(),
            BinaryOp::Lt => "<".into(),
            BinaryOp::Lte => "=<".into(),
            BinaryOp::Gt => ">".into(),
            BinaryOp::Gte => ">=".into(),
            BinaryOp::In => "in".into(),
            BinaryOp::Arrow(ArrowMult::Set, ArrowMult::Set) => "->".into(),
            BinaryOp::Arrow(left, right) => {
                let left = if left == ArrowMult::Set { "" } else { left.keyword() };
                let right = if right == ArrowMult::Set { "" } else { right.keyword() };
                format!("{}->{}", left, right)
            }
            BinaryOp::IsSeqArrowLone => "isSeq->lone".into(),
        }
    }
}

/// Quantifiers and binders over declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantOp {
    All,
    No,
    Lone,
    One,
    Some,
    Comprehension,
    Sum,
}

impl QuantOp {
    pub fn keyword(self) -> &'static str {
        match self {
            QuantOp::All => "all",
            QuantOp::No => "no",
            QuantOp::Lone => "lone",
            QuantOp::One => "one",
            QuantOp::Some => "some",
            QuantOp::Comprehension => "",
            QuantOp::Sum => "sum",
        }
    }
}

/// A bound variable. The domain is kept for rebuilding declarations and
/// is not a child for checking purposes.
#[derive(Debug, Clone)]
pub struct Var {
    pub label: String,
    pub domain: Option<Arc<Expr>>,
}

/// The closed family of expression kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(Constant),
    /// An identifier not yet looked up in the environment.
    Name(String),
    /// A named leaf with a type fixed by the environment (signature or field).
    Relation(String),
    Var(Var),
    Unary(UnaryOp, Arc<Expr>),
    Binary(BinaryOp, Arc<Expr>, Arc<Expr>),
    Ite(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    Quant(QuantOp, Vec<Decl>, Arc<Expr>),
    /// Candidates for an overloaded name; removed by resolution.
    Choice(Vec<Expr>),
    Macro(Macro),
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    kind: ExprKind,
    span: Span,
    ty: Option<Type>,
    mult: Mult,
    weight: u64,
    resolved: bool,
}

impl Expr {
    /// Shared constructor; rejects the degenerate empty type.
    pub(crate) fn build(
        kind: ExprKind,
        span: Span,
        ty: Option<Type>,
        mult: Mult,
        weight: u64,
        resolved: bool,
    ) -> Result<Expr> {
        if let Some(ty) = &ty {
            if !ty.is_valid() {
                return Err(Error::type_error(span, "This expression failed to be typechecked"));
            }
        }
        let resolved = resolved && ty.is_some();
        Ok(Expr {
            kind,
            span,
            ty,
            mult,
            weight,
            resolved,
        })
    }

    pub fn constant(span: Span, constant: Constant) -> Expr {
        Expr {
            kind: ExprKind::Constant(constant),
            span,
            ty: Some(constant.ty()),
            mult: Mult::None,
            weight: 0,
            resolved: true,
        }
    }

    pub fn number(span: Span, value: i64) -> Expr {
        Expr::constant(span, Constant::Number(value))
    }

    /// An unresolved identifier from the front end.
    pub fn name(span: Span, label: impl Into<String>) -> Expr {
        Expr {
            kind: ExprKind::Name(label.into()),
            span,
            ty: None,
            mult: Mult::None,
            weight: 0,
            resolved: false,
        }
    }

    /// A typed leaf supplied by the environment.
    pub fn relation(span: Span, label: impl Into<String>, ty: Type) -> Result<Expr> {
        Expr::build(ExprKind::Relation(label.into()), span, Some(ty), Mult::None, 0, true)
    }

    /// A bound variable; it takes the type of its domain, if that is known.
    pub fn var(span: Span, label: impl Into<String>, domain: Option<Expr>) -> Expr {
        let ty = domain.as_ref().and_then(|d| d.ty.clone());
        let resolved = ty.is_some();
        Expr {
            kind: ExprKind::Var(Var {
                label: label.into(),
                domain: domain.map(Arc::new),
            }),
            span,
            ty,
            mult: Mult::None,
            weight: 0,
            resolved,
        }
    }

    /// The candidates an overloaded name stands for.
    pub fn choice(span: Span, mut choices: Vec<Expr>) -> Result<Expr> {
        match choices.len() {
            0 => Err(Error::fatal(span, "a choice needs at least one candidate")),
            1 => Ok(choices.remove(0)),
            _ => {
                let mut ty = Type::EMPTY;
                for choice in &choices {
                    match &choice.ty {
                        Some(t) => ty = ty.union(t),
                        None => return Err(Error::fatal(choice.span, "untyped overload candidate")),
                    }
                }
                let weight = choices.iter().map(|c| c.weight).max().unwrap_or(0);
                Expr::build(ExprKind::Choice(choices), span, Some(ty), Mult::None, weight, false)
            }
        }
    }

    pub fn from_macro(mac: Macro) -> Expr {
        Expr {
            span: mac.span(),
            kind: ExprKind::Macro(mac),
            ty: None,
            mult: Mult::None,
            weight: 0,
            resolved: false,
        }
    }

    /// Same node at another position.
    pub fn with_span(&self, span: Span) -> Expr {
        let kind = match &self.kind {
            ExprKind::Macro(mac) => ExprKind::Macro(mac.with_span(span)),
            other => other.clone(),
        };
        Expr {
            kind,
            span,
            ..self.clone()
        }
    }

    /// Same leaf with a different cost estimate. Composite weights are sums.
    pub fn with_weight(&self, weight: u64) -> Expr {
        Expr {
            weight,
            ..self.clone()
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The bounding type after pass 1, or the final type once resolved.
    pub fn ty(&self) -> Option<&Type> {
        self.ty.as_ref()
    }

    pub fn mult(&self) -> Mult {
        self.mult
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    /// True if this node and every descendant carry a final type.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn as_macro(&self) -> Option<&Macro> {
        match &self.kind {
            ExprKind::Macro(mac) => Some(mac),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match &self.kind {
            ExprKind::Var(var) => Some(var),
            _ => None,
        }
    }

    /// The type, or the deferred failure of a node that has none.
    pub fn typed(&self) -> Result<&Type> {
        match (&self.ty, &self.kind) {
            (Some(ty), _) => Ok(ty),
            (None, ExprKind::Macro(mac)) => Err(mac.deferred().clone()),
            (None, ExprKind::Name(label)) => Err(Error::fatal(
                self.span,
                format!("the name \"{}\" has not been looked up", label),
            )),
            (None, _) => Err(Error::fatal(self.span, "expression has not been typechecked")),
        }
    }
}
