//! k-limited call-string contexts
//!
//! A context is the most recent `k` frames of the call string, newest
//! first. Frames are call statements; entry methods (and callees reached
//! without a call statement) start from an `Entry` frame. Contexts are
//! interned so a [`ContextId`] compares in O(1).

use super::ContextId;
use crate::features::call_graph::FuncId;
use crate::features::ir::StmtId;
use rustc_hash::FxHashMap;

/// One frame of a call string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    /// Analysis entry (or a call without a statement) of the method
    Entry(FuncId),
    /// Call statement
    CallSite(StmtId),
}

impl ContextId {
    /// Empty call string: context-insensitive facts and singleton factories
    pub const DUMMY: ContextId = ContextId(0);
}

/// Interner for k-limited call strings
#[derive(Debug, Clone)]
pub struct KLimitedContext {
    k: usize,
    contexts: Vec<Vec<ContextElem>>,
    index: FxHashMap<Vec<ContextElem>, ContextId>,
}

impl KLimitedContext {
    pub fn new(k: usize) -> Self {
        let mut index = FxHashMap::default();
        index.insert(Vec::new(), ContextId::DUMMY);
        Self {
            k,
            contexts: vec![Vec::new()],
            index,
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    fn intern(&mut self, mut frames: Vec<ContextElem>) -> ContextId {
        frames.truncate(self.k);
        if let Some(cid) = self.index.get(&frames) {
            return *cid;
        }
        let cid = ContextId::new(self.contexts.len());
        self.contexts.push(frames.clone());
        self.index.insert(frames, cid);
        cid
    }

    /// Context of an analysis entry
    pub fn get_new_context_id(&mut self, func: FuncId) -> ContextId {
        if self.k == 0 {
            return ContextId::DUMMY;
        }
        self.intern(vec![ContextElem::Entry(func)])
    }

    /// Callee context: push the call frame onto the caller's call string
    pub fn get_or_new_context(
        &mut self,
        caller: ContextId,
        callee: FuncId,
        call_stmt: Option<StmtId>,
    ) -> ContextId {
        if self.k == 0 {
            return ContextId::DUMMY;
        }
        let head = match call_stmt {
            Some(stmt) => ContextElem::CallSite(stmt),
            None => ContextElem::Entry(callee),
        };
        let mut frames = Vec::with_capacity(self.k + 1);
        frames.push(head);
        frames.extend_from_slice(self.frames(caller));
        self.intern(frames)
    }

    /// Frames of a context, newest first
    pub fn frames(&self, cid: ContextId) -> &[ContextElem] {
        self.contexts
            .get(cid.index())
            .map(|f| f.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.len() <= 1
    }
}
