//! Points-to sets
//!
//! [`PtsCollection`] is the interface the solver programs against;
//! [`Pts`] selects the representation at runtime from
//! [`PtsStrategy`](crate::config::PtsStrategy).

use super::NodeId;
use crate::config::PtsStrategy;
use crate::features::points_to::infrastructure::sparse_bitmap::SparseBitmap;
use rustc_hash::FxHashSet;

/// Set of abstract objects (heap-object node ids)
pub trait PtsCollection {
    /// Insert; returns true if the node was absent
    fn insert(&mut self, node: NodeId) -> bool;

    fn contains(&self, node: NodeId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in ascending id order
    fn to_vec(&self) -> Vec<NodeId>;

    /// self = self ∪ other; returns true if self grew
    fn union_with(&mut self, other: &Self) -> bool;

    fn intersects(&self, other: &Self) -> bool;
}

impl PtsCollection for SparseBitmap {
    #[inline]
    fn insert(&mut self, node: NodeId) -> bool {
        SparseBitmap::insert(self, node.0)
    }

    #[inline]
    fn contains(&self, node: NodeId) -> bool {
        SparseBitmap::contains(self, node.0)
    }

    #[inline]
    fn len(&self) -> usize {
        SparseBitmap::len(self)
    }

    fn to_vec(&self) -> Vec<NodeId> {
        self.to_sorted_vec().into_iter().map(NodeId).collect()
    }

    fn union_with(&mut self, other: &Self) -> bool {
        SparseBitmap::union_with(self, other)
    }

    fn intersects(&self, other: &Self) -> bool {
        SparseBitmap::intersects(self, other)
    }
}

/// Hash-set backed points-to set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashPts(FxHashSet<NodeId>);

impl PtsCollection for HashPts {
    #[inline]
    fn insert(&mut self, node: NodeId) -> bool {
        self.0.insert(node)
    }

    #[inline]
    fn contains(&self, node: NodeId) -> bool {
        self.0.contains(&node)
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    fn to_vec(&self) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = self.0.iter().copied().collect();
        v.sort_unstable();
        v
    }

    fn union_with(&mut self, other: &Self) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().copied());
        self.0.len() != before
    }

    fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        small.iter().any(|n| large.contains(n))
    }
}

/// Points-to set with the representation picked by configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pts {
    Bitmap(SparseBitmap),
    Hash(HashPts),
}

impl Pts {
    pub fn new(strategy: PtsStrategy) -> Self {
        match strategy {
            PtsStrategy::SparseBitmap => Pts::Bitmap(SparseBitmap::new()),
            PtsStrategy::HashSet => Pts::Hash(HashPts::default()),
        }
    }

    /// Empty set of the same representation
    pub fn empty_like(&self) -> Self {
        match self {
            Pts::Bitmap(_) => Pts::Bitmap(SparseBitmap::new()),
            Pts::Hash(_) => Pts::Hash(HashPts::default()),
        }
    }

    pub fn from_nodes(strategy: PtsStrategy, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut pts = Self::new(strategy);
        for n in nodes {
            pts.insert(n);
        }
        pts
    }
}

impl PtsCollection for Pts {
    #[inline]
    fn insert(&mut self, node: NodeId) -> bool {
        match self {
            Pts::Bitmap(b) => PtsCollection::insert(b, node),
            Pts::Hash(h) => h.insert(node),
        }
    }

    #[inline]
    fn contains(&self, node: NodeId) -> bool {
        match self {
            Pts::Bitmap(b) => PtsCollection::contains(b, node),
            Pts::Hash(h) => h.contains(node),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            Pts::Bitmap(b) => PtsCollection::len(b),
            Pts::Hash(h) => h.len(),
        }
    }

    fn to_vec(&self) -> Vec<NodeId> {
        match self {
            Pts::Bitmap(b) => PtsCollection::to_vec(b),
            Pts::Hash(h) => h.to_vec(),
        }
    }

    fn union_with(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Pts::Bitmap(a), Pts::Bitmap(b)) => PtsCollection::union_with(a, b),
            (Pts::Hash(a), Pts::Hash(b)) => a.union_with(b),
            (this, other) => {
                let mut grew = false;
                for n in other.to_vec() {
                    grew |= this.insert(n);
                }
                grew
            }
        }
    }

    fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Pts::Bitmap(a), Pts::Bitmap(b)) => PtsCollection::intersects(a, b),
            (Pts::Hash(a), Pts::Hash(b)) => a.intersects(b),
            (a, b) => a.to_vec().into_iter().any(|n| b.contains(n)),
        }
    }
}
