//! Call graph storage
//!
//! Nodes and edges are append-only: a `FuncId` is also the petgraph node
//! index of its node.

use crate::features::call_graph::domain::{
    CallGraphNode, CallGraphNodeKind, CallSite, CallSiteId, CallSiteKind, FuncId,
};
use crate::features::ir::{InvokeExpr, MethodId, MethodSignature, Program, StmtId, Value};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

/// Call graph (method nodes + call edges labelled with the call statement)
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DiGraph<FuncId, Option<StmtId>>,
    nodes: Vec<CallGraphNode>,
    by_method: FxHashMap<MethodId, FuncId>,
    by_signature: FxHashMap<MethodSignature, FuncId>,

    call_sites: Vec<CallSite>,
    direct_by_stmt: FxHashMap<StmtId, Vec<CallSiteId>>,
    dynamic_by_stmt: FxHashMap<StmtId, CallSiteId>,

    /// (caller, callee, stmt) already present as an edge
    edge_set: FxHashSet<(FuncId, FuncId, Option<StmtId>)>,
    dynamic_edge_count: usize,
    entries: Vec<FuncId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Nodes
    // ═══════════════════════════════════════════════════════════════════════

    /// Node for a declared method (created on first request)
    pub fn add_method_node(&mut self, program: &Program, method: MethodId) -> FuncId {
        if let Some(f) = self.by_method.get(&method) {
            return *f;
        }
        let m = program.method(method);
        let id = self.push_node(CallGraphNode {
            id: FuncId::new(self.nodes.len()),
            method: Some(method),
            signature: m.signature.clone(),
            kind: m.kind.into(),
            is_sdk: m.is_sdk,
        });
        self.by_method.insert(method, id);
        id
    }

    /// Node for a signature no declaration exists for
    pub fn add_unknown_node(&mut self, signature: &MethodSignature) -> FuncId {
        if let Some(f) = self.by_signature.get(signature) {
            return *f;
        }
        self.push_node(CallGraphNode {
            id: FuncId::new(self.nodes.len()),
            method: None,
            signature: signature.clone(),
            kind: CallGraphNodeKind::Unknown,
            is_sdk: false,
        })
    }

    fn push_node(&mut self, node: CallGraphNode) -> FuncId {
        let id = node.id;
        let idx = self.graph.add_node(id);
        debug_assert_eq!(idx.index(), id.index());
        self.by_signature.entry(node.signature.clone()).or_insert(id);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn node(&self, id: FuncId) -> &CallGraphNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CallGraphNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Backing method of a node
    pub fn method_of(&self, id: FuncId) -> Option<MethodId> {
        self.nodes.get(id.index()).and_then(|n| n.method)
    }

    pub fn func_of_method(&self, method: MethodId) -> Option<FuncId> {
        self.by_method.get(&method).copied()
    }

    pub fn func_by_signature(&self, signature: &MethodSignature) -> Option<FuncId> {
        self.by_signature.get(signature).copied()
    }

    pub fn is_unknown(&self, id: FuncId) -> bool {
        self.node(id).is_unknown()
    }

    pub fn set_entries(&mut self, entries: Vec<FuncId>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[FuncId] {
        &self.entries
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Call sites
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a call site with a fixed callee and add its edge
    pub fn add_direct_call_site(
        &mut self,
        caller: FuncId,
        callee: FuncId,
        stmt: StmtId,
        invoke: InvokeExpr,
        result: Option<Value>,
    ) -> CallSiteId {
        let id = self.push_call_site(CallSiteKind::Direct, caller, Some(callee), Some(stmt), invoke, result);
        self.direct_by_stmt.entry(stmt).or_default().push(id);
        self.add_edge(caller, callee, Some(stmt));
        id
    }

    /// Register a call site whose callee depends on runtime values
    pub fn add_dynamic_call_site(
        &mut self,
        caller: FuncId,
        declared_callee: Option<FuncId>,
        stmt: StmtId,
        invoke: InvokeExpr,
        result: Option<Value>,
    ) -> CallSiteId {
        let id = self.push_call_site(CallSiteKind::Dynamic, caller, declared_callee, Some(stmt), invoke, result);
        self.dynamic_by_stmt.insert(stmt, id);
        id
    }

    /// Call site with no statement behind it (callbacks passed to SDK methods)
    pub fn add_synthetic_call_site(&mut self, caller: FuncId, invoke: InvokeExpr) -> CallSiteId {
        self.push_call_site(CallSiteKind::Synthetic, caller, None, None, invoke, None)
    }

    fn push_call_site(
        &mut self,
        kind: CallSiteKind,
        caller: FuncId,
        callee: Option<FuncId>,
        stmt: Option<StmtId>,
        invoke: InvokeExpr,
        result: Option<Value>,
    ) -> CallSiteId {
        let id = CallSiteId::new(self.call_sites.len());
        self.call_sites.push(CallSite {
            id,
            kind,
            caller,
            callee,
            stmt,
            invoke,
            result,
        });
        id
    }

    #[inline]
    pub fn call_site(&self, id: CallSiteId) -> &CallSite {
        &self.call_sites[id.index()]
    }

    pub fn call_site_count(&self) -> usize {
        self.call_sites.len()
    }

    /// Direct call sites of a statement
    pub fn call_sites_by_stmt(&self, stmt: StmtId) -> &[CallSiteId] {
        self.direct_by_stmt
            .get(&stmt)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn dyn_call_site_by_stmt(&self, stmt: StmtId) -> Option<CallSiteId> {
        self.dynamic_by_stmt.get(&stmt).copied()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    fn add_edge(&mut self, caller: FuncId, callee: FuncId, stmt: Option<StmtId>) -> bool {
        if !self.edge_set.insert((caller, callee, stmt)) {
            return false;
        }
        self.graph.add_edge(
            NodeIndex::new(caller.index()),
            NodeIndex::new(callee.index()),
            stmt,
        );
        true
    }

    /// Record an edge discovered during pointer analysis
    pub fn add_dynamic_call_edge(&mut self, caller: FuncId, callee: FuncId, stmt: Option<StmtId>) -> bool {
        let added = self.add_edge(caller, callee, stmt);
        if added {
            self.dynamic_edge_count += 1;
        }
        added
    }

    /// Whether `from` transitively calls `to` (a node reaches itself)
    pub fn detect_reachable(&self, from: FuncId, to: FuncId) -> bool {
        has_path_connecting(
            &self.graph,
            NodeIndex::new(from.index()),
            NodeIndex::new(to.index()),
            None,
        )
    }

    /// Direct callees of `caller`
    pub fn callees(&self, caller: FuncId) -> Vec<FuncId> {
        let mut out: Vec<FuncId> = self
            .graph
            .neighbors(NodeIndex::new(caller.index()))
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn has_edge(&self, caller: FuncId, callee: FuncId) -> bool {
        self.graph.contains_edge(
            NodeIndex::new(caller.index()),
            NodeIndex::new(callee.index()),
        )
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn dynamic_edge_count(&self) -> usize {
        self.dynamic_edge_count
    }
}
