//! Relational types.
//!
//! A [`Type`] is either the formula type, the integer type, or a set of
//! possible tuple shapes. Each [`Shape`] is a fixed-arity sequence of
//! [`Atom`] column types. Types are plain values and form a join-semilattice
//! under [`Type::union`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An atomic element type, i.e. the type of a single column.
///
/// Atoms form a tree rooted at `univ`. The special `none` atom is below
/// every other atom.
#[derive(Clone)]
pub struct Atom(Arc<AtomData>);

#[derive(Debug)]
struct AtomData {
    name: String,
    parent: Option<Atom>,
}

const UNIV: &str = "univ";
const INT: &str = "Int";
const NONE: &str = "none";

impl Atom {
    /// The root of the atom hierarchy.
    pub fn univ() -> Self {
        Atom(Arc::new(AtomData {
            name: UNIV.to_string(),
            parent: None,
        }))
    }

    /// The built-in integer atom.
    pub fn int() -> Self {
        Atom::new(INT, &Atom::univ())
    }

    /// The empty atom.
    pub fn none() -> Self {
        Atom(Arc::new(AtomData {
            name: NONE.to_string(),
            parent: None,
        }))
    }

    /// A new atom nested under `parent`. Names are assumed unique.
    pub fn new(name: impl Into<String>, parent: &Atom) -> Self {
        Atom(Arc::new(AtomData {
            name: name.into(),
            parent: Some(parent.clone()),
        }))
    }

    /// A new atom directly under `univ`.
    pub fn top_level(name: impl Into<String>) -> Self {
        Atom::new(name, &Atom::univ())
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Atom> {
        self.0.parent.as_ref()
    }

    pub fn is_univ(&self) -> bool {
        self.0.parent.is_none() && self.0.name == UNIV
    }

    pub fn is_none(&self) -> bool {
        self.0.parent.is_none() && self.0.name == NONE
    }

    /// True if `self` is `other` or one of its descendants.
    pub fn is_same_or_descendant_of(&self, other: &Atom) -> bool {
        if self.is_none() || other.is_univ() {
            return true;
        }
        let mut current = Some(self);
        while let Some(atom) = current {
            if atom == other {
                return true;
            }
            current = atom.parent();
        }
        false
    }

    /// The most general atom contained in both, if the two overlap.
    pub fn intersect(&self, other: &Atom) -> Option<Atom> {
        if self.is_same_or_descendant_of(other) {
            Some(self.clone())
        } else if other.is_same_or_descendant_of(self) {
            Some(other.clone())
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &Atom) -> bool {
        self.intersect(other).is_some()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for Atom {}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.name.cmp(&other.0.name)
    }
}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One candidate tuple shape: a column type per position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shape(Vec<Atom>);

impl Shape {
    pub fn new(columns: Vec<Atom>) -> Self {
        Self(columns)
    }

    pub fn unary(atom: Atom) -> Self {
        Self(vec![atom])
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn columns(&self) -> &[Atom] {
        &self.0
    }

    pub fn first(&self) -> Option<&Atom> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Atom> {
        self.0.last()
    }

    /// Relational join: drops the adjoining columns, which must overlap.
    pub fn join(&self, other: &Shape) -> Option<Shape> {
        if self.arity() + other.arity() <= 2 {
            return None;
        }
        let (last, first) = (self.last()?, other.first()?);
        if !last.overlaps(first) {
            return None;
        }
        let columns = self.0[..self.arity() - 1]
            .iter()
            .chain(other.0[1..].iter())
            .cloned()
            .collect();
        Some(Shape(columns))
    }

    pub fn product(&self, other: &Shape) -> Shape {
        Shape(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    pub fn transpose(&self) -> Option<Shape> {
        match self.0.as_slice() {
            [a, b] => Some(Shape(vec![b.clone(), a.clone()])),
            _ => None,
        }
    }

    /// Column-wise intersection; `None` if the arities differ or any column is disjoint.
    pub fn intersect(&self, other: &Shape) -> Option<Shape> {
        if self.arity() != other.arity() {
            return None;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.intersect(b))
            .collect::<Option<Vec<_>>>()
            .map(Shape)
    }

    fn with_column(&self, index: usize, atom: Atom) -> Shape {
        let mut columns = self.0.clone();
        columns[index] = atom;
        Shape(columns)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{}", atom)?;
        }
        Ok(())
    }
}

/// The type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Type {
    shapes: BTreeSet<Shape>,
    is_int: bool,
    is_bool: bool,
}

impl Type {
    /// No shapes and neither flag. Never a legal expression type.
    pub const EMPTY: Type = Type {
        shapes: BTreeSet::new(),
        is_int: false,
        is_bool: false,
    };

    pub const FORMULA: Type = Type {
        shapes: BTreeSet::new(),
        is_int: false,
        is_bool: true,
    };

    pub const INT: Type = Type {
        shapes: BTreeSet::new(),
        is_int: true,
        is_bool: false,
    };

    pub fn of(shape: Shape) -> Self {
        Self::from_shapes([shape])
    }

    pub fn unary(atom: Atom) -> Self {
        Self::of(Shape::unary(atom))
    }

    /// A relation type with a single shape, e.g. `A -> B`.
    pub fn relation(columns: impl IntoIterator<Item = Atom>) -> Self {
        Self::of(Shape::new(columns.into_iter().collect()))
    }

    pub fn from_shapes(shapes: impl IntoIterator<Item = Shape>) -> Self {
        Self {
            shapes: shapes.into_iter().filter(|s| s.arity() > 0).collect(),
            is_int: false,
            is_bool: false,
        }
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    /// Number of relational shapes.
    pub fn size(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_int(&self) -> bool {
        self.is_int
    }

    pub fn is_bool(&self) -> bool {
        self.is_bool
    }

    /// True if the type has at least one relational shape.
    pub fn is_relational(&self) -> bool {
        !self.shapes.is_empty()
    }

    /// True unless this is the degenerate empty type.
    pub fn is_valid(&self) -> bool {
        self.size() > 0 || self.is_int || self.is_bool
    }

    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    pub fn arities(&self) -> BTreeSet<usize> {
        self.shapes.iter().map(Shape::arity).collect()
    }

    pub fn has_arity(&self, arity: usize) -> bool {
        self.shapes.iter().any(|s| s.arity() == arity)
    }

    /// The common arity, if every shape has the same one.
    pub fn arity(&self) -> Option<usize> {
        let arities = self.arities();
        match arities.len() {
            1 => arities.into_iter().next(),
            _ => None,
        }
    }

    /// Only the relational part of this type.
    pub fn relational(&self) -> Type {
        Type::from_shapes(self.shapes.iter().cloned())
    }

    /// Only the shapes of the given arity.
    pub fn extract(&self, arity: usize) -> Type {
        Type::from_shapes(self.shapes.iter().filter(|s| s.arity() == arity).cloned())
    }

    pub fn has_common_arity(&self, other: &Type) -> bool {
        !self.arities().is_disjoint(&other.arities())
    }

    pub fn union(&self, other: &Type) -> Type {
        Type {
            shapes: self.shapes.union(&other.shapes).cloned().collect(),
            is_int: self.is_int || other.is_int,
            is_bool: self.is_bool || other.is_bool,
        }
    }

    /// Union of both sides, restricted to arities present on both.
    pub fn union_with_common_arity(&self, other: &Type) -> Type {
        let common: BTreeSet<usize> = self.arities().intersection(&other.arities()).copied().collect();
        Type::from_shapes(
            self.shapes
                .iter()
                .chain(other.shapes.iter())
                .filter(|s| common.contains(&s.arity()))
                .cloned(),
        )
    }

    pub fn intersect(&self, other: &Type) -> Type {
        let shapes = self
            .shapes
            .iter()
            .flat_map(|a| other.shapes.iter().filter_map(move |b| a.intersect(b)))
            .collect();
        Type {
            shapes,
            is_int: self.is_int && other.is_int,
            is_bool: self.is_bool && other.is_bool,
        }
    }

    pub fn intersects(&self, other: &Type) -> bool {
        self.intersect(other).is_valid()
    }

    /// Every pairwise shape join whose adjoining columns overlap.
    pub fn join(&self, other: &Type) -> Type {
        Type::from_shapes(
            self.shapes
                .iter()
                .flat_map(|a| other.shapes.iter().filter_map(move |b| a.join(b))),
        )
    }

    pub fn product(&self, other: &Type) -> Type {
        Type::from_shapes(
            self.shapes
                .iter()
                .flat_map(|a| other.shapes.iter().map(move |b| a.product(b))),
        )
    }

    pub fn transpose(&self) -> Type {
        Type::from_shapes(self.shapes.iter().filter_map(Shape::transpose))
    }

    /// `self <: rel`, where `self` is a unary set.
    pub fn domain_restrict(&self, rel: &Type) -> Type {
        let sets: Vec<&Atom> = self.unary_atoms().collect();
        Type::from_shapes(rel.shapes.iter().flat_map(|shape| {
            sets.iter().filter_map(move |set| {
                let first = shape.first()?;
                first.intersect(set).map(|atom| shape.with_column(0, atom))
            })
        }))
    }

    /// `self :> set`, where `set` is a unary set.
    pub fn range_restrict(&self, set: &Type) -> Type {
        let sets: Vec<&Atom> = set.unary_atoms().collect();
        Type::from_shapes(self.shapes.iter().flat_map(|shape| {
            sets.iter().filter_map(move |set| {
                let last = shape.last()?;
                let index = shape.arity() - 1;
                last.intersect(set).map(|atom| shape.with_column(index, atom))
            })
        }))
    }

    /// Transitive closure of the binary part of this type.
    pub fn closure(&self) -> Type {
        let base = self.extract(2);
        let mut result = base.clone();
        loop {
            let next = result.union(&result.join(&base));
            if next == result {
                return result;
            }
            result = next;
        }
    }

    fn unary_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.shapes
            .iter()
            .filter(|s| s.arity() == 1)
            .filter_map(Shape::first)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.is_bool {
            parts.push("formula".to_string());
        }
        if self.is_int {
            parts.push("Int".to_string());
        }
        if !self.shapes.is_empty() {
            let shapes: Vec<String> = self.shapes.iter().map(|s| s.to_string()).collect();
            parts.push(format!("{{{}}}", shapes.join(", ")));
        }
        if parts.is_empty() {
            return f.write_str("{}");
        }
        f.write_str(&parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms() -> (Atom, Atom, Atom) {
        let a = Atom::top_level("A");
        let b = Atom::top_level("B");
        let a1 = Atom::new("A1", &a);
        (a, b, a1)
    }

    #[test]
    fn test_atom_hierarchy() {
        let (a, b, a1) = atoms();
        assert!(a1.is_same_or_descendant_of(&a));
        assert!(a.is_same_or_descendant_of(&Atom::univ()));
        assert!(!a.is_same_or_descendant_of(&a1));
        assert_eq!(a.intersect(&a1), Some(a1.clone()));
        assert_eq!(a.intersect(&b), None);
        assert_eq!(Atom::none().intersect(&b), Some(Atom::none()));
    }

    #[test]
    fn test_join_drops_adjoining_columns() {
        let (a, b, _) = atoms();
        let r = Type::relation([a.clone(), b.clone()]);
        let s = Type::relation([b.clone(), a.clone(), a.clone()]);
        let joined = r.join(&s);
        assert_eq!(joined, Type::relation([a.clone(), a.clone(), a]));
    }

    #[test]
    fn test_join_of_unary_sets_is_empty() {
        let (a, _, _) = atoms();
        let set = Type::unary(a);
        assert!(set.join(&set).is_empty());
    }

    #[test]
    fn test_join_requires_overlapping_columns() {
        let (a, b, _) = atoms();
        let r = Type::relation([a.clone(), a.clone()]);
        assert!(r.join(&Type::relation([b.clone(), b])).is_empty());
        assert_eq!(r.join(&Type::unary(a.clone())), Type::unary(a));
    }

    #[test]
    fn test_transpose_swaps_columns() {
        let (a, b, _) = atoms();
        let r = Type::relation([a.clone(), b.clone()]);
        assert_eq!(r.transpose(), Type::relation([b, a]));
        assert_eq!(r.transpose().transpose(), r);
    }

    #[test]
    fn test_intersect_picks_specific_atom() {
        let (a, b, a1) = atoms();
        let left = Type::unary(a.clone()).union(&Type::unary(b));
        let right = Type::unary(a1.clone());
        assert_eq!(left.intersect(&right), Type::unary(a1));
        assert!(Type::INT.intersect(&Type::INT).is_int());
    }

    #[test]
    fn test_union_with_common_arity() {
        let (a, b, _) = atoms();
        let left = Type::unary(a.clone()).union(&Type::relation([a.clone(), b.clone()]));
        let right = Type::unary(b.clone());
        assert_eq!(
            left.union_with_common_arity(&right),
            Type::unary(a).union(&Type::unary(b))
        );
    }

    #[test]
    fn test_closure_reaches_fixpoint() {
        let (a, b, _) = atoms();
        let r = Type::relation([a.clone(), b.clone()]).union(&Type::relation([b.clone(), a.clone()]));
        let closed = r.closure();
        assert!(closed.shapes().any(|s| s == &Shape::new(vec![a.clone(), a.clone()])));
        assert!(closed.shapes().any(|s| s == &Shape::new(vec![b.clone(), b.clone()])));
        assert_eq!(closed.size(), 4);
    }

    #[test]
    fn test_domain_and_range_restrict() {
        let (a, b, a1) = atoms();
        let r = Type::relation([a.clone(), b.clone()]);
        assert_eq!(Type::unary(a1.clone()).domain_restrict(&r), Type::relation([a1, b.clone()]));
        assert!(r.range_restrict(&Type::unary(a)).is_empty());
        assert_eq!(r.range_restrict(&Type::unary(b)), r);
    }

    #[test]
    fn test_display() {
        let (a, b, _) = atoms();
        assert_eq!(Type::relation([a, b]).to_string(), "{A->B}");
        assert_eq!(Type::INT.to_string(), "Int");
        assert_eq!(Type::FORMULA.to_string(), "formula");
        assert_eq!(Type::EMPTY.to_string(), "{}");
    }
}
