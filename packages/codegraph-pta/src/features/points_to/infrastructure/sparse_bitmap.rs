//! Sparse bitmap for points-to sets
//!
//! Sorted `Vec<u32>` plus a small unsorted pending buffer:
//! - Insert: O(log n) membership check, O(1) append to the buffer
//! - Contains: O(log n + pending)
//! - Union: O(n + m) merge of sorted runs
//!
//! The buffer is merged into the sorted run once it reaches
//! `PENDING_BUFFER_THRESHOLD` or before any whole-set operation.
//!
//! # References
//! - Briggs & Torczon "An Efficient Representation for Sparse Sets"
//! - Hardekopf & Lin "Semi-sparse Flow-Sensitive Pointer Analysis" (POPL 2009)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const PENDING_BUFFER_THRESHOLD: usize = 16;

/// Sorted set of `u32` with deferred insertion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseBitmap {
    /// Sorted, deduplicated elements
    elements: Vec<u32>,

    /// Inserted since the last merge; disjoint from `elements`
    #[serde(skip)]
    pending: Vec<u32>,
}

impl SparseBitmap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn singleton(element: u32) -> Self {
        Self {
            elements: vec![element],
            pending: Vec::new(),
        }
    }

    pub fn from_sorted_iter(iter: impl IntoIterator<Item = u32>) -> Self {
        let mut elements: Vec<u32> = iter.into_iter().collect();
        elements.sort_unstable();
        elements.dedup();
        Self {
            elements,
            pending: Vec::new(),
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.sort_unstable();
        let pending = std::mem::take(&mut self.pending);
        self.elements = merge_sorted(&self.elements, &pending);
    }

    /// Insert; returns true if the element was absent
    #[inline]
    pub fn insert(&mut self, element: u32) -> bool {
        if self.elements.binary_search(&element).is_ok() || self.pending.contains(&element) {
            return false;
        }
        self.pending.push(element);
        if self.pending.len() >= PENDING_BUFFER_THRESHOLD {
            self.flush();
        }
        true
    }

    #[inline]
    pub fn contains(&self, element: u32) -> bool {
        self.pending.contains(&element) || self.elements.binary_search(&element).is_ok()
    }

    /// Number of elements (pending and sorted are disjoint)
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len() + self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.pending.is_empty()
    }

    /// Elements in ascending order
    pub fn to_sorted_vec(&self) -> Vec<u32> {
        if self.pending.is_empty() {
            return self.elements.clone();
        }
        let mut pending = self.pending.clone();
        pending.sort_unstable();
        merge_sorted(&self.elements, &pending)
    }

    /// Iterate without ordering guarantees
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.elements.iter().chain(self.pending.iter()).copied()
    }

    /// self = self ∪ other; returns true if self grew
    pub fn union_with(&mut self, other: &SparseBitmap) -> bool {
        if other.is_empty() {
            return false;
        }
        self.flush();
        let before = self.elements.len();
        let theirs = other.to_sorted_vec();
        if self.elements.is_empty() {
            self.elements = theirs;
        } else {
            self.elements = merge_sorted(&self.elements, &theirs);
        }
        self.elements.len() != before
    }

    /// Whether the two sets share an element
    pub fn intersects(&self, other: &SparseBitmap) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.pending.iter().any(|p| other.contains(*p))
            || other.pending.iter().any(|p| self.contains(*p))
        {
            return true;
        }

        let (mut i, mut j) = (0, 0);
        while i < self.elements.len() && j < other.elements.len() {
            match self.elements[i].cmp(&other.elements[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => return true,
            }
        }
        false
    }
}

impl PartialEq for SparseBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|e| other.contains(e))
    }
}

impl Eq for SparseBitmap {}

/// Merge two sorted, deduplicated runs
fn merge_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut set = SparseBitmap::new();
        assert!(set.is_empty());

        assert!(set.insert(5));
        assert!(set.insert(3));
        assert!(set.insert(7));
        assert!(!set.insert(5));

        assert_eq!(set.len(), 3);
        assert!(set.contains(3));
        assert!(!set.contains(4));
        assert_eq!(set.to_sorted_vec(), vec![3, 5, 7]);
    }

    #[test]
    fn test_insert_after_flush_is_deduplicated() {
        let mut set = SparseBitmap::new();
        for i in 0..PENDING_BUFFER_THRESHOLD as u32 {
            set.insert(i);
        }
        // 0 now lives in the sorted run while a new element sits in pending
        assert!(set.insert(100));
        assert!(!set.insert(0));
        assert_eq!(set.len(), PENDING_BUFFER_THRESHOLD + 1);
    }

    #[test]
    fn test_union_reports_growth() {
        let mut a = SparseBitmap::from_sorted_iter([1, 3, 5]);
        let b = SparseBitmap::from_sorted_iter([3, 5]);
        let c = SparseBitmap::from_sorted_iter([2, 4]);

        assert!(!a.union_with(&b));
        assert!(a.union_with(&c));
        assert_eq!(a.to_sorted_vec(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_intersects() {
        let a = SparseBitmap::from_sorted_iter([1, 3, 5]);
        let b = SparseBitmap::from_sorted_iter([2, 4, 6]);
        let mut c = SparseBitmap::from_sorted_iter([9]);
        c.insert(6);

        assert!(!a.intersects(&b));
        assert!(b.intersects(&c));
        assert!(!a.intersects(&SparseBitmap::new()));
    }

    #[test]
    fn test_equality_ignores_layout() {
        let mut a = SparseBitmap::from_sorted_iter([1, 2]);
        a.insert(3);
        let b = SparseBitmap::from_sorted_iter([3, 2, 1]);
        assert_eq!(a, b);
    }
}
