//! Sets of symbols stored as sorted, coalesced inclusive ranges
//!
//! Used by set and not-set transitions. Symbols are `i32` so that EOF (-1)
//! can be a member.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sorted list of disjoint, non-adjacent inclusive ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalSet {
    ranges: Vec<(i32, i32)>,
}

impl IntervalSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Set containing a single symbol
    pub fn of(symbol: i32) -> Self {
        Self::of_range(symbol, symbol)
    }

    /// Set containing `from..=to`
    pub fn of_range(from: i32, to: i32) -> Self {
        let mut set = Self::new();
        set.add_range(from, to);
        set
    }

    /// Add a single symbol
    pub fn add(&mut self, symbol: i32) {
        self.add_range(symbol, symbol);
    }

    /// Add `from..=to`, merging with overlapping or adjacent ranges
    pub fn add_range(&mut self, from: i32, to: i32) {
        if from > to {
            return;
        }
        // first range that could touch the new one
        let pos = self
            .ranges
            .partition_point(|&(_, hi)| (hi as i64) + 1 < from as i64);
        let mut lo = from;
        let mut hi = to;
        let mut end = pos;
        while end < self.ranges.len() && (self.ranges[end].0 as i64) <= (hi as i64) + 1 {
            lo = lo.min(self.ranges[end].0);
            hi = hi.max(self.ranges[end].1);
            end += 1;
        }
        self.ranges.splice(pos..end, std::iter::once((lo, hi)));
    }

    /// Add every range of `other`
    pub fn add_set(&mut self, other: &IntervalSet) {
        for &(lo, hi) in &other.ranges {
            self.add_range(lo, hi);
        }
    }

    /// Membership test
    #[inline]
    pub fn contains(&self, symbol: i32) -> bool {
        let idx = self.ranges.partition_point(|&(_, hi)| hi < symbol);
        idx < self.ranges.len() && self.ranges[idx].0 <= symbol
    }

    /// Number of symbols in the set
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(lo, hi)| (hi as i64 - lo as i64 + 1) as usize)
            .sum()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Smallest member
    pub fn min_element(&self) -> Option<i32> {
        self.ranges.first().map(|&(lo, _)| lo)
    }

    /// The ranges, ascending
    pub fn ranges(&self) -> &[(i32, i32)] {
        &self.ranges
    }

    /// Iterate over every member, ascending
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..=hi)
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut set = IntervalSet::new();
        for symbol in iter {
            set.add(symbol);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, &(lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}..{}", lo, hi)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_coalesces_adjacent() {
        let mut set = IntervalSet::new();
        set.add_range(1, 3);
        set.add_range(4, 6);
        set.add(10);
        assert_eq!(set.ranges(), &[(1, 6), (10, 10)]);
        set.add_range(7, 9);
        assert_eq!(set.ranges(), &[(1, 10)]);
    }

    #[test]
    fn test_add_out_of_order() {
        let mut set = IntervalSet::new();
        set.add(20);
        set.add_range(5, 8);
        set.add(-1);
        assert_eq!(set.ranges(), &[(-1, -1), (5, 8), (20, 20)]);
        assert_eq!(set.min_element(), Some(-1));
    }

    #[test]
    fn test_contains() {
        let set = IntervalSet::of_range('a' as i32, 'z' as i32);
        assert!(set.contains('a' as i32));
        assert!(set.contains('m' as i32));
        assert!(set.contains('z' as i32));
        assert!(!set.contains('A' as i32));
        assert!(!set.contains(-1));
    }

    #[test]
    fn test_len_and_iter() {
        let set: IntervalSet = [3, 1, 2, 9].into_iter().collect();
        assert_eq!(set.len(), 4);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3, 9]);
        assert_eq!(set.to_string(), "{1..3, 9}");
    }

    #[test]
    fn test_empty_range_ignored() {
        let mut set = IntervalSet::new();
        set.add_range(5, 4);
        assert!(set.is_empty());
    }
}
