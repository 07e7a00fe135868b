//! # Interval Sets
//!
//! An [`IntervalSet`] is an ordered set of integers stored as inclusive
//! ranges. Lookahead queries accumulate their results into one, and set
//! transitions in the automaton carry one as their label.
//!
//! The representation keeps the ranges sorted, disjoint, and non-adjacent,
//! so membership is a binary search and union/complement are linear merges.

use crate::token::TokenType;
use smallvec::SmallVec;
use std::fmt;

/// An inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub start: TokenType,
    pub stop: TokenType,
}

impl Interval {
    /// Create an inclusive interval. `start` must be <= `stop`.
    #[must_use]
    pub const fn new(start: TokenType, stop: TokenType) -> Self {
        Self { start, stop }
    }

    fn touches(&self, other: &Self) -> bool {
        // Widen so adjacency checks cannot overflow at the i32 bounds.
        i64::from(self.start) <= i64::from(other.stop) + 1
            && i64::from(other.start) <= i64::from(self.stop) + 1
    }

    fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }
}

/// Ordered set of integers stored as inclusive ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSet {
    intervals: SmallVec<[Interval; 4]>,
}

impl IntervalSet {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing a single value.
    #[must_use]
    pub fn of(value: TokenType) -> Self {
        let mut set = Self::new();
        set.add(value);
        set
    }

    /// Set containing the inclusive range `start..=stop`.
    #[must_use]
    pub fn range(start: TokenType, stop: TokenType) -> Self {
        let mut set = Self::new();
        set.add_range(start, stop);
        set
    }

    /// Insert a single value.
    pub fn add(&mut self, value: TokenType) {
        self.add_range(value, value);
    }

    /// Insert the inclusive range `start..=stop`, coalescing with any
    /// overlapping or adjacent ranges already present.
    ///
    /// # Panics
    ///
    /// Panics if `start > stop`.
    pub fn add_range(&mut self, start: TokenType, stop: TokenType) {
        assert!(start <= stop, "inverted interval {start}..{stop}");
        let mut merged = Interval::new(start, stop);
        let mut out: SmallVec<[Interval; 4]> = SmallVec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;
        for iv in self.intervals.drain(..) {
            if placed {
                out.push(iv);
            } else if iv.touches(&merged) {
                merged = merged.merge(iv);
            } else if iv.stop < merged.start {
                out.push(iv);
            } else {
                out.push(merged);
                placed = true;
                out.push(iv);
            }
        }
        if !placed {
            out.push(merged);
        }
        self.intervals = out;
    }

    /// Insert every value of `other`.
    pub fn add_set(&mut self, other: &Self) {
        for iv in &other.intervals {
            self.add_range(iv.start, iv.stop);
        }
    }

    /// Remove a single value, splitting its containing range if needed.
    pub fn remove(&mut self, value: TokenType) {
        let Ok(idx) = self.search(value) else { return };
        let iv = self.intervals[idx];
        match (iv.start == value, iv.stop == value) {
            (true, true) => {
                self.intervals.remove(idx);
            }
            (true, false) => self.intervals[idx].start = value + 1,
            (false, true) => self.intervals[idx].stop = value - 1,
            (false, false) => {
                self.intervals[idx].stop = value - 1;
                self.intervals
                    .insert(idx + 1, Interval::new(value + 1, iv.stop));
            }
        }
    }

    /// Every value of `self` not in `other`.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        let mut result = Self::new();
        for iv in &self.intervals {
            let mut start = i64::from(iv.start);
            let stop = i64::from(iv.stop);
            for o in &other.intervals {
                if i64::from(o.stop) < start {
                    continue;
                }
                if i64::from(o.start) > stop {
                    break;
                }
                if i64::from(o.start) > start {
                    result.add_range(start as TokenType, o.start - 1);
                }
                start = i64::from(o.stop) + 1;
                if start > stop {
                    break;
                }
            }
            if start <= stop {
                result.add_range(start as TokenType, stop as TokenType);
            }
        }
        result
    }

    /// Every value of `universe` not in `self`.
    #[must_use]
    pub fn complement(&self, universe: &Self) -> Self {
        universe.subtract(self)
    }

    /// Whether `value` is in the set.
    #[must_use]
    pub fn contains(&self, value: TokenType) -> bool {
        self.search(value).is_ok()
    }

    fn search(&self, value: TokenType) -> Result<usize, usize> {
        self.intervals.binary_search_by(|iv| {
            if value < iv.start {
                std::cmp::Ordering::Greater
            } else if value > iv.stop {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals
            .iter()
            .map(|iv| (i64::from(iv.stop) - i64::from(iv.start) + 1) as usize)
            .sum()
    }

    /// Whether the set has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The underlying sorted, disjoint ranges.
    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Iterate the values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TokenType> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.stop)
    }
}

impl FromIterator<TokenType> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = TokenType>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if iv.start == iv.stop {
                write!(f, "{}", iv.start)?;
            } else {
                write!(f, "{}..{}", iv.start, iv.stop)?;
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
        set.add(1);
        set.add(3);
        set.add(2);
        assert_eq!(set.intervals(), &[Interval::new(1, 3)]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_add_range_merges_overlap() {
        let mut set = IntervalSet::range(1, 4);
        set.add_range(3, 8);
        set.add_range(20, 22);
        assert_eq!(set.intervals(), &[Interval::new(1, 8), Interval::new(20, 22)]);
    }

    #[test]
    fn test_add_range_keeps_disjoint_order() {
        let mut set = IntervalSet::range(10, 12);
        set.add_range(1, 2);
        set.add_range(5, 6);
        assert_eq!(
            set.intervals(),
            &[
                Interval::new(1, 2),
                Interval::new(5, 6),
                Interval::new(10, 12)
            ]
        );
    }

    #[test]
    fn test_contains() {
        let mut set = IntervalSet::range(1, 3);
        set.add_range(7, 9);
        assert!(set.contains(1));
        assert!(set.contains(8));
        assert!(!set.contains(4));
        assert!(!set.contains(10));
        assert!(!set.contains(-1));
    }

    #[test]
    fn test_remove_splits_range() {
        let mut set = IntervalSet::range(1, 5);
        set.remove(3);
        assert_eq!(set.intervals(), &[Interval::new(1, 2), Interval::new(4, 5)]);
        set.remove(1);
        set.remove(5);
        assert_eq!(set.intervals(), &[Interval::new(2, 2), Interval::new(4, 4)]);
        set.remove(100); // not present, no-op
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_subtract_and_complement() {
        let universe = IntervalSet::range(1, 5);
        let excluded = IntervalSet::of(3);
        let complement = excluded.complement(&universe);
        assert_eq!(complement.iter().collect::<Vec<_>>(), vec![1, 2, 4, 5]);

        let empty = IntervalSet::new();
        assert_eq!(empty.complement(&universe), universe);
    }

    #[test]
    fn test_union() {
        let mut a = IntervalSet::range(1, 3);
        let b = IntervalSet::range(2, 6);
        a.add_set(&b);
        assert_eq!(a, IntervalSet::range(1, 6));
    }

    #[test]
    fn test_display() {
        let mut set = IntervalSet::range(1, 3);
        set.add(7);
        assert_eq!(set.to_string(), "{1..3, 7}");
        assert_eq!(IntervalSet::new().to_string(), "{}");
    }

    #[test]
    fn test_from_iterator() {
        let set: IntervalSet = [5, 1, 2, 9].into_iter().collect();
        assert_eq!(set.to_string(), "{1..2, 5, 9}");
    }
}
