//! Ordered, duplicate-free set of `u64` values.
//!
//! Backed by a sorted `Vec<u64>`:
//! - membership: O(log n) binary search
//! - union: O(n + m) merge, O(m) append when the other set lies above `max`
//! - `range` / `truncate_to`: O(log n)

use std::ops::RangeInclusive;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimeSet {
    values: Vec<u64>,
}

impl PrimeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a vector that is already ascending and duplicate-free
    pub fn from_sorted(values: Vec<u64>) -> Self {
        debug_assert!(is_strictly_ascending(&values));
        Self { values }
    }

    /// Build from arbitrary values, sorting and removing duplicates
    pub fn from_unsorted(mut values: Vec<u64>) -> Self {
        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, n: u64) -> bool {
        self.values.binary_search(&n).is_ok()
    }

    pub fn max(&self) -> Option<u64> {
        self.values.last().copied()
    }

    pub fn min(&self) -> Option<u64> {
        self.values.first().copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.values
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = u64> + '_ {
        self.values.iter().copied()
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.values
    }

    /// Values within `range`, as a borrowed slice
    pub fn range(&self, range: RangeInclusive<u64>) -> &[u64] {
        let lo = self.values.partition_point(|&v| v < *range.start());
        let hi = self.values.partition_point(|&v| v <= *range.end());
        &self.values[lo..hi.max(lo)]
    }

    /// Number of values `<= bound`
    pub fn count_up_to(&self, bound: u64) -> usize {
        self.values.partition_point(|&v| v <= bound)
    }

    /// Drop every value above `bound`
    pub fn truncate_to(&mut self, bound: u64) {
        let keep = self.count_up_to(bound);
        self.values.truncate(keep);
    }

    /// Append ascending values that all lie above the current maximum
    pub fn extend_above(&mut self, values: &[u64]) {
        debug_assert!(is_strictly_ascending(values));
        debug_assert!(match (self.max(), values.first()) {
            (Some(max), Some(&first)) => first > max,
            _ => true,
        });
        self.values.extend_from_slice(values);
    }

    /// Merge `other` into `self`
    pub fn union_with(&mut self, other: &PrimeSet) {
        if other.is_empty() {
            return;
        }
        match (self.max(), other.min()) {
            (None, _) => self.values = other.values.clone(),
            (Some(max), Some(min)) if min > max => self.values.extend_from_slice(&other.values),
            _ => self.values = merge_sorted(&self.values, &other.values),
        }
    }

    /// Values present in `self` but not in `other`, ascending
    pub fn difference(&self, other: &PrimeSet) -> Vec<u64> {
        self.iter().filter(|&v| !other.contains(v)).collect()
    }
}

impl FromIterator<u64> for PrimeSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

impl From<Vec<u64>> for PrimeSet {
    fn from(values: Vec<u64>) -> Self {
        Self::from_unsorted(values)
    }
}

pub(crate) fn is_strictly_ascending(values: &[u64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

fn merge_sorted(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
