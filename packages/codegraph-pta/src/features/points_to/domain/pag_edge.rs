//! PAG edges

use super::{EdgeId, NodeId};
use crate::features::ir::StmtId;
use serde::{Deserialize, Serialize};

/// Pointer flow relation between two PAG nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PagEdgeKind {
    /// `dst := &src` (allocation, closure value, global object)
    Address,
    /// `dst := src`
    Copy,
    /// `dst := src.f` / `dst := src[i]`, src is the field reference node
    Load,
    /// `dst.f := src` / `dst[i] := src`, dst is the field reference node
    Write,
    /// Receiver local -> callee `this`
    This,
    /// Captured or imported variable -> using function's local
    InterProceduralCopy,
}

impl PagEdgeKind {
    pub const COUNT: usize = 6;

    pub const ALL: [PagEdgeKind; Self::COUNT] = [
        PagEdgeKind::Address,
        PagEdgeKind::Copy,
        PagEdgeKind::Load,
        PagEdgeKind::Write,
        PagEdgeKind::This,
        PagEdgeKind::InterProceduralCopy,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Edges along which points-to sets flow unchanged
    #[inline]
    pub fn is_propagating(self) -> bool {
        matches!(
            self,
            PagEdgeKind::Copy | PagEdgeKind::This | PagEdgeKind::InterProceduralCopy
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagEdge {
    pub id: EdgeId,
    pub kind: PagEdgeKind,
    pub src: NodeId,
    pub dst: NodeId,
    /// Originating statement (diagnostics only)
    pub stmt: Option<StmtId>,
}

/// Per-kind adjacency lists of edge ids
#[derive(Debug, Clone, Default)]
pub struct EdgeLists {
    lists: [Vec<EdgeId>; PagEdgeKind::COUNT],
}

impl EdgeLists {
    #[inline]
    pub fn get(&self, kind: PagEdgeKind) -> &[EdgeId] {
        &self.lists[kind.index()]
    }

    #[inline]
    pub(crate) fn push(&mut self, kind: PagEdgeKind, edge: EdgeId) {
        self.lists[kind.index()].push(edge);
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }
}
