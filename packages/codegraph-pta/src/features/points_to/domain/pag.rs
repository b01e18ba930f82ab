//! Pointer assignment graph
//!
//! Nodes and edges live in append-only arenas. Lookups:
//! - `(value, context)` -> node for nodes created from a value
//! - `(object, field)` -> concrete field node, one per object and field
//! - `(abstract, object)` -> concrete clone, memoized
//!
//! Address edges, and Copy edges out of allocation-like nodes, are staged
//! for the solver to seed. A node whose pending diff becomes non-empty is
//! queued as dirty.

use super::pag_edge::{EdgeLists, PagEdge, PagEdgeKind};
use super::pag_node::{BoundCall, FieldKey, PagNode, PagNodeKind, PagValue};
use super::pts::{Pts, PtsCollection};
use super::{ContextId, EdgeId, NodeId};
use crate::config::PtsStrategy;
use crate::errors::{PtaError, Result};
use crate::features::call_graph::CallSiteId;
use crate::features::ir::{Program, StmtId, Value};
use crate::shared::constants::builtin::CONTAINER_CLASSES;
use crate::shared::constants::capacity::{INITIAL_EDGE_CAPACITY, INITIAL_NODE_CAPACITY};
use crate::shared::constants::names::GLOBAL_THIS_NAME;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::VecDeque;

type NodeKey = (PagValue, Option<ContextId>);

/// Node and edge counts by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PagStats {
    pub nodes: usize,
    pub edges: usize,
    pub heap_objects: usize,
    pub locals: usize,
    pub ref_vars: usize,
    pub functions: usize,
    pub cloned_nodes: usize,
    pub address_edges: usize,
    pub copy_edges: usize,
    pub load_edges: usize,
    pub write_edges: usize,
    pub this_edges: usize,
    pub inter_procedural_edges: usize,
}

#[derive(Debug, Clone)]
pub struct Pag {
    strategy: PtsStrategy,
    nodes: Vec<PagNode>,
    edges: Vec<PagEdge>,
    edge_set: FxHashSet<(PagEdgeKind, NodeId, NodeId)>,

    node_index: FxHashMap<NodeKey, NodeId>,
    nodes_by_value: FxHashMap<PagValue, Vec<NodeId>>,

    /// (object, field) -> concrete field node
    field_nodes: FxHashMap<(NodeId, FieldKey), NodeId>,
    /// (abstract, object) -> concrete field node
    clone_memo: FxHashMap<(NodeId, NodeId), NodeId>,
    clones_of: FxHashMap<NodeId, Vec<NodeId>>,
    /// base local node -> field reference nodes over it
    field_refs_by_base: FxHashMap<NodeId, Vec<NodeId>>,
    /// field reference node -> its base local node
    base_of_field_ref: FxHashMap<NodeId, NodeId>,
    /// (function, bind statement) -> bound clone
    func_clones: FxHashMap<(NodeId, Option<StmtId>), NodeId>,

    global_this: Option<NodeId>,
    staged: Vec<EdgeId>,
    /// Nodes with a non-empty diff
    dirty: VecDeque<NodeId>,
    /// Locals that gained a call site while already holding pointees
    rescan: Vec<NodeId>,
}

impl Pag {
    pub fn new(strategy: PtsStrategy) -> Self {
        Self {
            strategy,
            nodes: Vec::with_capacity(INITIAL_NODE_CAPACITY),
            edges: Vec::with_capacity(INITIAL_EDGE_CAPACITY),
            edge_set: FxHashSet::default(),
            node_index: FxHashMap::default(),
            nodes_by_value: FxHashMap::default(),
            field_nodes: FxHashMap::default(),
            clone_memo: FxHashMap::default(),
            clones_of: FxHashMap::default(),
            field_refs_by_base: FxHashMap::default(),
            base_of_field_ref: FxHashMap::default(),
            func_clones: FxHashMap::default(),
            global_this: None,
            staged: Vec::new(),
            dirty: VecDeque::new(),
            rescan: Vec::new(),
        }
    }

    #[inline]
    pub fn strategy(&self) -> PtsStrategy {
        self.strategy
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Node creation
    // ═══════════════════════════════════════════════════════════════════════

    fn key(cid: ContextId, value: &PagValue) -> NodeKey {
        match value {
            PagValue::GlobalThis => (PagValue::GlobalThis, None),
            v if v.is_context_free() => (v.clone(), Some(ContextId::DUMMY)),
            v => (v.clone(), Some(cid)),
        }
    }

    fn push_node(
        &mut self,
        kind: PagNodeKind,
        cid: Option<ContextId>,
        value: PagValue,
        stmt: Option<StmtId>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(PagNode {
            id,
            kind,
            cid,
            value,
            stmt,
            pts: Pts::new(self.strategy),
            diff: Vec::new(),
            base_pt: None,
            cloned_from: None,
            in_edges: EdgeLists::default(),
            out_edges: EdgeLists::default(),
        });
        id
    }

    fn index_node(&mut self, key: NodeKey, id: NodeId) {
        let value = key.0.clone();
        self.node_index.insert(key, id);
        let by_value = self.nodes_by_value.entry(value).or_default();
        if !by_value.contains(&id) {
            by_value.push(id);
        }
    }

    fn global_this_node(&mut self) -> NodeId {
        if let Some(id) = self.global_this {
            return id;
        }
        let id = self.push_node(PagNodeKind::GlobalThis, None, PagValue::GlobalThis, None);
        self.index_node((PagValue::GlobalThis, None), id);
        self.global_this = Some(id);
        id
    }

    /// Create the node for `value` in context `cid`
    ///
    /// The node kind follows the value shape; constants are rejected.
    pub fn add_node(
        &mut self,
        program: &Program,
        cid: ContextId,
        value: PagValue,
        stmt: Option<StmtId>,
    ) -> Result<NodeId> {
        let key = Self::key(cid, &value);
        let kind = match &value {
            PagValue::Ir(v) => match v {
                Value::New(alloc) => PagNodeKind::HeapObject {
                    container: program
                        .alloc_class_name(*alloc)
                        .is_some_and(|c| CONTAINER_CLASSES.contains(&c)),
                },
                Value::NewArray(_) => PagNodeKind::HeapObject { container: true },
                Value::Local(l) => {
                    let local = program.local(*l);
                    match (&local.declaring_stmt, &local.ty) {
                        (None, ty) if ty.is_function() => PagNodeKind::Function {
                            signature: ty.function_signature().cloned().unwrap_or_else(|| {
                                crate::features::ir::MethodSignature::unknown(&local.name)
                            }),
                            bound: None,
                        },
                        (None, _) if local.name == GLOBAL_THIS_NAME => {
                            let id = self.global_this_node();
                            self.index_node(key, id);
                            return Ok(id);
                        }
                        _ => PagNodeKind::local(),
                    }
                }
                Value::InstanceField { field, .. } | Value::StaticField(field) => {
                    match field.ty.function_signature() {
                        Some(sig) => PagNodeKind::Function {
                            signature: sig.clone(),
                            bound: None,
                        },
                        None => PagNodeKind::RefVar(FieldKey::Named(field.clone())),
                    }
                }
                Value::ArrayElement { .. } => PagNodeKind::RefVar(FieldKey::Element),
                Value::Parameter { .. } => PagNodeKind::Param,
                Value::This { .. } => PagNodeKind::ThisRef,
                Value::Constant(_) => return Err(PtaError::unsupported(v)),
            },
            PagValue::FakeObject { .. } => PagNodeKind::HeapObject { container: false },
            PagValue::SdkParam { .. } => PagNodeKind::LocalVar {
                dyn_call_sites: Vec::new(),
                unknown_call_sites: Vec::new(),
                sdk_param: true,
                storage_link: None,
            },
            PagValue::StorageProperty { .. } => PagNodeKind::local(),
            PagValue::GlobalThis => return Ok(self.global_this_node()),
            PagValue::ContainerElement(_) => PagNodeKind::RefVar(FieldKey::Element),
            PagValue::ExportHub(_) => PagNodeKind::ExportInfo,
        };

        let is_field_ref = matches!(kind, PagNodeKind::RefVar(_));
        let base = value.ir().and_then(Value::ref_base);
        let node_cid = key.1;
        let id = self.push_node(kind, node_cid, value, stmt);
        self.index_node(key, id);

        if let (true, Some(base)) = (is_field_ref, base) {
            let base_node = self.get_or_new_node(program, cid, PagValue::Ir(Value::Local(base)), stmt)?;
            self.field_refs_by_base.entry(base_node).or_default().push(id);
            self.base_of_field_ref.insert(id, base_node);
        }
        Ok(id)
    }

    /// Lookup-or-create keyed by (value, context)
    pub fn get_or_new_node(
        &mut self,
        program: &Program,
        cid: ContextId,
        value: PagValue,
        stmt: Option<StmtId>,
    ) -> Result<NodeId> {
        match self.node_index.get(&Self::key(cid, &value)) {
            Some(id) => Ok(*id),
            None => self.add_node(program, cid, value, stmt),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Cloning
    // ═══════════════════════════════════════════════════════════════════════

    /// Concrete node of field reference `abstract_node` on object `base`
    ///
    /// Returns `None` for nodes that are not abstract field references.
    pub fn get_or_clone_field_node(&mut self, abstract_node: NodeId, base: NodeId) -> Option<NodeId> {
        if let Some(id) = self.clone_memo.get(&(abstract_node, base)) {
            return Some(*id);
        }
        let src = &self.nodes[abstract_node.index()];
        if src.base_pt.is_some() {
            return None;
        }
        let key = src.field_key()?.clone();

        let id = match self.field_nodes.get(&(base, key.clone())).copied() {
            Some(existing) => existing,
            None => {
                let (kind, cid, value, stmt) = (src.kind.clone(), src.cid, src.value.clone(), src.stmt);
                let id = self.push_node(kind, cid, value, stmt);
                let node = &mut self.nodes[id.index()];
                node.base_pt = Some(base);
                node.cloned_from = Some(abstract_node);
                self.field_nodes.insert((base, key), id);
                id
            }
        };
        self.clone_memo.insert((abstract_node, base), id);
        self.clones_of.entry(abstract_node).or_default().push(id);
        Some(id)
    }

    /// The single element node of container object `base`
    pub fn get_or_clone_container_field_node(&mut self, base: NodeId) -> NodeId {
        if let Some(id) = self.field_nodes.get(&(base, FieldKey::Element)) {
            return *id;
        }
        let cid = self.nodes[base.index()].cid;
        let id = self.push_node(
            PagNodeKind::RefVar(FieldKey::Element),
            cid,
            PagValue::ContainerElement(base),
            None,
        );
        self.nodes[id.index()].base_pt = Some(base);
        self.field_nodes.insert((base, FieldKey::Element), id);
        id
    }

    /// Element node of `base` if one was created
    pub fn container_field_node(&self, base: NodeId) -> Option<NodeId> {
        self.field_nodes.get(&(base, FieldKey::Element)).copied()
    }

    /// Clone of function node `func` for the `bind` call at `stmt`
    ///
    /// Returns `None` when `func` is not a function node.
    pub fn get_or_clone_func_node(&mut self, func: NodeId, stmt: Option<StmtId>) -> Option<NodeId> {
        if let Some(id) = self.func_clones.get(&(func, stmt)) {
            return Some(*id);
        }
        let src = &self.nodes[func.index()];
        let PagNodeKind::Function { signature, .. } = &src.kind else {
            return None;
        };
        let kind = PagNodeKind::Function {
            signature: signature.clone(),
            bound: None,
        };
        let (cid, value) = (src.cid, src.value.clone());
        let id = self.push_node(kind, cid, value, stmt);
        self.nodes[id.index()].cloned_from = Some(func);
        self.func_clones.insert((func, stmt), id);
        Some(id)
    }

    /// Attach `Function.bind` replay data to a function clone
    pub fn set_bound_call(&mut self, func: NodeId, call: BoundCall) {
        if let PagNodeKind::Function { bound, .. } = &mut self.nodes[func.index()].kind {
            *bound = Some(call);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    /// Add an edge; `None` if the same (kind, src, dst) edge exists
    pub fn add_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        kind: PagEdgeKind,
        stmt: Option<StmtId>,
    ) -> Option<EdgeId> {
        if !self.edge_set.insert((kind, src, dst)) {
            return None;
        }
        let id = EdgeId::new(self.edges.len());
        self.edges.push(PagEdge {
            id,
            kind,
            src,
            dst,
            stmt,
        });
        self.nodes[src.index()].out_edges.push(kind, id);
        self.nodes[dst.index()].in_edges.push(kind, id);

        let stage = match kind {
            PagEdgeKind::Address => true,
            PagEdgeKind::Copy => self.nodes[src.index()].is_allocation_like(),
            _ => false,
        };
        if stage {
            self.staged.push(id);
        }
        Some(id)
    }

    /// Drain edges waiting to be seeded
    pub fn take_staged_edges(&mut self) -> Vec<EdgeId> {
        std::mem::take(&mut self.staged)
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &PagEdge {
        &self.edges[id.index()]
    }

    pub fn edges(&self) -> &[PagEdge] {
        &self.edges
    }

    pub fn has_edge(&self, kind: PagEdgeKind, src: NodeId, dst: NodeId) -> bool {
        self.edge_set.contains(&(kind, src, dst))
    }

    /// Destinations of `node`'s outgoing edges of `kind`
    pub fn successors(&self, node: NodeId, kind: PagEdgeKind) -> Vec<NodeId> {
        self.nodes[node.index()]
            .out_edges
            .get(kind)
            .iter()
            .map(|e| self.edges[e.index()].dst)
            .collect()
    }

    /// Sources of `node`'s incoming edges of `kind`
    pub fn predecessors(&self, node: NodeId, kind: PagEdgeKind) -> Vec<NodeId> {
        self.nodes[node.index()]
            .in_edges
            .get(kind)
            .iter()
            .map(|e| self.edges[e.index()].src)
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Points-to sets
    // ═══════════════════════════════════════════════════════════════════════

    /// Add `obj` to `node`'s points-to set; true if new
    pub fn add_pts(&mut self, node: NodeId, obj: NodeId) -> bool {
        let n = &mut self.nodes[node.index()];
        if !n.pts.insert(obj) {
            return false;
        }
        if n.diff.is_empty() {
            self.dirty.push_back(node);
        }
        n.diff.push(obj);
        true
    }

    /// Add every node of `objs`; true if any was new
    pub fn add_pts_all(&mut self, node: NodeId, objs: &[NodeId]) -> bool {
        let mut grew = false;
        for obj in objs {
            grew |= self.add_pts(node, *obj);
        }
        grew
    }

    /// Take the pointees added since the last call
    pub fn take_diff(&mut self, node: NodeId) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes[node.index()].diff)
    }

    /// Next node with pending pointees
    pub fn pop_dirty(&mut self) -> Option<NodeId> {
        self.dirty.pop_front()
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn take_rescan(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.rescan)
    }

    pub fn pts(&self, node: NodeId) -> &Pts {
        &self.nodes[node.index()].pts
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lookups
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn node(&self, id: NodeId) -> &PagNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut PagNode {
        &mut self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[PagNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, cid: ContextId, value: &PagValue) -> Option<NodeId> {
        self.node_index.get(&Self::key(cid, value)).copied()
    }

    /// Nodes of `value` in every context (clones excluded)
    pub fn nodes_by_value(&self, value: &PagValue) -> &[NodeId] {
        self.nodes_by_value
            .get(value)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn field_refs_by_base(&self, base: NodeId) -> &[NodeId] {
        self.field_refs_by_base
            .get(&base)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Base local node of an abstract field reference
    pub fn base_of_field_ref(&self, field_ref: NodeId) -> Option<NodeId> {
        self.base_of_field_ref.get(&field_ref).copied()
    }

    pub fn clones_of(&self, abstract_node: NodeId) -> &[NodeId] {
        self.clones_of
            .get(&abstract_node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn field_node(&self, base: NodeId, key: &FieldKey) -> Option<NodeId> {
        self.field_nodes.get(&(base, key.clone())).copied()
    }

    pub fn global_this(&self) -> Option<NodeId> {
        self.global_this
    }

    /// Create the global object node if it does not exist yet
    pub fn get_or_new_global_this(&mut self) -> NodeId {
        self.global_this_node()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Local payload
    // ═══════════════════════════════════════════════════════════════════════

    /// Attach a dynamic call site to a local; false for non-locals or repeats
    pub fn add_related_dyn_call_site(&mut self, node: NodeId, cs: CallSiteId) -> bool {
        let n = &mut self.nodes[node.index()];
        let added = match &mut n.kind {
            PagNodeKind::LocalVar { dyn_call_sites, .. } if !dyn_call_sites.contains(&cs) => {
                dyn_call_sites.push(cs);
                true
            }
            _ => false,
        };
        if added && !n.pts.is_empty() {
            self.rescan.push(node);
        }
        added
    }

    pub fn add_related_unknown_call_site(&mut self, node: NodeId, cs: CallSiteId) -> bool {
        let n = &mut self.nodes[node.index()];
        let added = match &mut n.kind {
            PagNodeKind::LocalVar {
                unknown_call_sites, ..
            } if !unknown_call_sites.contains(&cs) => {
                unknown_call_sites.push(cs);
                true
            }
            _ => false,
        };
        if added && !n.pts.is_empty() {
            self.rescan.push(node);
        }
        added
    }

    /// Flag a local as the parameter stand-in of an SDK method
    pub fn set_sdk_param(&mut self, node: NodeId) {
        if let PagNodeKind::LocalVar { sdk_param, .. } = &mut self.nodes[node.index()].kind {
            *sdk_param = true;
        }
    }

    pub fn set_storage_link(&mut self, node: NodeId, property: NodeId) {
        if let PagNodeKind::LocalVar { storage_link, .. } = &mut self.nodes[node.index()].kind {
            *storage_link = Some(property);
        }
    }

    pub fn stats(&self) -> PagStats {
        let mut stats = PagStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            ..Default::default()
        };
        for n in &self.nodes {
            match n.kind {
                PagNodeKind::HeapObject { .. } => stats.heap_objects += 1,
                PagNodeKind::LocalVar { .. } => stats.locals += 1,
                PagNodeKind::RefVar(_) => stats.ref_vars += 1,
                PagNodeKind::Function { .. } => stats.functions += 1,
                _ => {}
            }
            if n.base_pt.is_some() || n.cloned_from.is_some() {
                stats.cloned_nodes += 1;
            }
        }
        for e in &self.edges {
            match e.kind {
                PagEdgeKind::Address => stats.address_edges += 1,
                PagEdgeKind::Copy => stats.copy_edges += 1,
                PagEdgeKind::Load => stats.load_edges += 1,
                PagEdgeKind::Write => stats.write_edges += 1,
                PagEdgeKind::This => stats.this_edges += 1,
                PagEdgeKind::InterProceduralCopy => stats.inter_procedural_edges += 1,
            }
        }
        stats
    }
}
