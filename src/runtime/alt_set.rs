//! Alternative-number sets
//!
//! Prediction tracks sets of alternative numbers (1-based) everywhere:
//! conflicting alts, viable alts, ambiguous alts. Iteration is ascending,
//! which is what makes "lowest alternative wins" fall out of `min()`.

use bit_set::BitSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A set of alternative numbers
#[derive(Clone, Default)]
pub struct AltSet(BitSet);

impl AltSet {
    /// Create an empty set
    pub fn new() -> Self {
        AltSet(BitSet::new())
    }

    /// Set holding one alternative
    pub fn of(alt: usize) -> Self {
        let mut set = Self::new();
        set.insert(alt);
        set
    }

    /// Add an alternative, returning `true` if it was not present
    #[inline]
    pub fn insert(&mut self, alt: usize) -> bool {
        self.0.insert(alt)
    }

    /// Membership test
    #[inline]
    pub fn contains(&self, alt: usize) -> bool {
        self.0.contains(alt)
    }

    /// Number of alternatives in the set
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest alternative in the set
    #[inline]
    pub fn min(&self) -> Option<usize> {
        self.0.iter().next()
    }

    /// Iterate ascending
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter()
    }

    /// In-place union
    pub fn union_with(&mut self, other: &AltSet) {
        self.0.union_with(&other.0);
    }
}

impl PartialEq for AltSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.iter().eq(other.0.iter())
    }
}

impl Eq for AltSet {}

impl Hash for AltSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for alt in self.0.iter() {
            alt.hash(state);
        }
    }
}

impl FromIterator<usize> for AltSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = AltSet::new();
        for alt in iter {
            set.insert(alt);
        }
        set
    }
}

impl fmt::Debug for AltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for AltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, alt) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", alt)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_and_iter_order() {
        let set: AltSet = [5, 2, 9].into_iter().collect();
        assert_eq!(set.min(), Some(2));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![2, 5, 9]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut a = AltSet::new();
        a.insert(100);
        let mut b = AltSet::new();
        b.insert(1);
        b.insert(100);
        assert_ne!(a, b);
        a.insert(1);
        assert_eq!(a, b);
        assert_eq!(AltSet::of(3), [3].into_iter().collect::<AltSet>());
    }

    #[test]
    fn test_union() {
        let mut a = AltSet::of(1);
        a.union_with(&AltSet::of(4));
        assert_eq!(a.to_string(), "{1, 4}");
        assert!(AltSet::new().min().is_none());
    }
}
