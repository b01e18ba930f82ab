//! PAG construction
//!
//! The builder turns reachable functions into [`FuncPag`] summaries once,
//! then instantiates a summary per (context, function) pair popped from its
//! worklist. Call edges to statically known callees are wired while a
//! function is instantiated; dynamic call sites are attached to the locals
//! they dispatch through and resolved by the solver as pointees arrive.
//!
//! Submodules split the work by concern:
//! - `calls`: parameter / return / receiver wiring and dynamic resolution
//! - `builtins`: containers and `Function.prototype.{call,apply,bind}`
//! - `storage`: the application storage API
//! - `scope`: captured and imported variables

mod builtins;
mod calls;
mod scope;
mod storage;

use crate::config::{PtaAnalysisScale, PtaConfig};
use crate::errors::{PtaError, Result};
use crate::features::call_graph::{CallGraph, CallSiteId, FuncId};
use crate::features::ir::{InvokeExpr, InvokeKind, MethodId, Program, Rhs, StmtId, StmtKind, Type, Value};
use crate::features::points_to::domain::{
    classify_assign, ContextId, FakeSlot, FuncPag, InterFuncPag, KLimitedContext, NodeId, Pag,
    PagEdgeKind, PagValue,
};
use crate::features::points_to::infrastructure::singleton;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// A function paired with the context it is analysed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsFuncId {
    pub cid: ContextId,
    pub func: FuncId,
}

impl CsFuncId {
    pub fn new(cid: ContextId, func: FuncId) -> Self {
        Self { cid, func }
    }
}

pub struct PagBuilder<'p> {
    program: &'p Program,
    scale: PtaAnalysisScale,
    detect_singleton: bool,

    pag: Pag,
    cg: CallGraph,
    ctx: KLimitedContext,

    func_pags: FxHashMap<FuncId, FuncPag>,
    inter_func_pags: FxHashMap<FuncId, InterFuncPag>,
    /// Functions whose summary is being extracted (recursion guard)
    building: FxHashSet<FuncId>,
    /// Parameter stand-ins of SDK methods
    sdk_params: FxHashMap<FuncId, Vec<PagValue>>,
    /// Synthetic call site per SDK parameter node
    sdk_param_sites: FxHashMap<NodeId, CallSiteId>,
    singleton_funcs: FxHashMap<FuncId, bool>,

    worklist: VecDeque<CsFuncId>,
    queued: FxHashSet<CsFuncId>,
    handled: FxHashSet<CsFuncId>,
    handled_funcs: FxHashSet<FuncId>,
    /// Functions instantiated by the latest `handle_reachable`
    funcs_handled_this_round: Vec<FuncId>,

    /// (call site, context) pairs already resolved by signature
    unknown_resolved: FxHashSet<(CallSiteId, ContextId)>,
    /// Captured / imported values and the node each of their nodes feeds
    live_inter_edges: Vec<(PagValue, NodeId)>,
    live_inter_set: FxHashSet<(PagValue, NodeId)>,
}

impl<'p> PagBuilder<'p> {
    pub fn new(program: &'p Program, cg: CallGraph, config: &PtaConfig) -> Self {
        Self {
            program,
            scale: config.scale,
            detect_singleton: config.detect_singleton,
            pag: Pag::new(config.pts_strategy),
            cg,
            ctx: KLimitedContext::new(config.k_limit),
            func_pags: FxHashMap::default(),
            inter_func_pags: FxHashMap::default(),
            building: FxHashSet::default(),
            sdk_params: FxHashMap::default(),
            sdk_param_sites: FxHashMap::default(),
            singleton_funcs: FxHashMap::default(),
            worklist: VecDeque::new(),
            queued: FxHashSet::default(),
            handled: FxHashSet::default(),
            handled_funcs: FxHashSet::default(),
            funcs_handled_this_round: Vec::new(),
            unknown_resolved: FxHashSet::default(),
            live_inter_edges: Vec::new(),
            live_inter_set: FxHashSet::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    #[inline]
    pub fn pag(&self) -> &Pag {
        &self.pag
    }

    #[inline]
    pub fn pag_mut(&mut self) -> &mut Pag {
        &mut self.pag
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.cg
    }

    #[inline]
    pub fn contexts(&self) -> &KLimitedContext {
        &self.ctx
    }

    pub fn func_pag(&self, func: FuncId) -> Option<&FuncPag> {
        self.func_pags.get(&func)
    }

    pub fn inter_func_pag(&self, func: FuncId) -> Option<&InterFuncPag> {
        self.inter_func_pags.get(&func)
    }

    /// Functions instantiated in at least one context, ascending
    pub fn handled_funcs(&self) -> Vec<FuncId> {
        let mut funcs: Vec<FuncId> = self.handled_funcs.iter().copied().collect();
        funcs.sort_unstable();
        funcs
    }

    /// Functions with a body that no context ever reached, ascending
    pub fn unhandled_funcs(&self) -> Vec<FuncId> {
        self.cg
            .nodes()
            .filter(|n| !n.is_sdk && !n.is_unknown())
            .filter(|n| n.method.is_some_and(|m| self.program.method(m).has_body()))
            .map(|n| n.id)
            .filter(|f| !self.handled_funcs.contains(f))
            .collect()
    }

    pub fn funcs_handled_this_round(&self) -> &[FuncId] {
        &self.funcs_handled_this_round
    }

    pub fn has_pending_work(&self) -> bool {
        !self.worklist.is_empty()
    }

    #[inline]
    pub(crate) fn node_of(&mut self, cid: ContextId, value: impl Into<PagValue>, stmt: Option<StmtId>) -> Result<NodeId> {
        self.pag.get_or_new_node(self.program, cid, value.into(), stmt)
    }

    fn method_of(&self, func: FuncId) -> Result<MethodId> {
        self.cg
            .method_of(func)
            .ok_or_else(|| PtaError::MethodNotFound(self.cg.node(func).signature.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════════════

    /// Seed the worklist with the entries and instantiate everything they reach
    pub fn build_for_entries(&mut self, entries: &[FuncId]) -> Result<()> {
        self.worklist.clear();
        self.queued.clear();
        for &func in entries {
            let cid = self.ctx.get_new_context_id(func);
            self.build_func_pag_and_add_to_worklist(CsFuncId::new(cid, func))?;
        }
        self.handle_reachable()?;

        let global = self.pag.get_or_new_global_this();
        self.pag.add_edge(global, global, PagEdgeKind::Copy, None);
        info!(
            entries = entries.len(),
            funcs = self.handled_funcs.len(),
            nodes = self.pag.node_count(),
            edges = self.pag.edge_count(),
            "PAG built for entries"
        );
        Ok(())
    }

    /// Instantiate every queued (context, function); false if nothing was queued
    pub fn handle_reachable(&mut self) -> Result<bool> {
        if self.worklist.is_empty() {
            return Ok(false);
        }
        self.funcs_handled_this_round.clear();
        while let Some(cs_func) = self.worklist.pop_front() {
            self.queued.remove(&cs_func);
            if self.build_pag_from_func_pag(cs_func)? {
                self.funcs_handled_this_round.push(cs_func.func);
            }
        }
        self.reconnect_inter_edges();
        debug!(
            funcs = self.funcs_handled_this_round.len(),
            nodes = self.pag.node_count(),
            "Reachable functions instantiated"
        );
        Ok(true)
    }

    /// Build the summary of `cs_func.func` and queue it
    ///
    /// Singleton factories are queued in the empty context; the context the
    /// function was actually queued in is returned.
    pub fn build_func_pag_and_add_to_worklist(&mut self, cs_func: CsFuncId) -> Result<CsFuncId> {
        if self.queued.contains(&cs_func) {
            return Ok(cs_func);
        }
        self.build_func_pag(cs_func.func)?;

        let mut cs_func = cs_func;
        if self.is_singleton_function(cs_func.func) {
            cs_func.cid = ContextId::DUMMY;
        }
        if self.queued.insert(cs_func) {
            self.worklist.push_back(cs_func);
        }
        Ok(cs_func)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Summaries
    // ═══════════════════════════════════════════════════════════════════════

    /// Extract the summary of `func`; false if it exists or cannot be built
    pub fn build_func_pag(&mut self, func: FuncId) -> Result<bool> {
        if self.func_pags.contains_key(&func) || self.building.contains(&func) {
            return Ok(false);
        }
        let Some(method) = self.cg.method_of(func) else {
            return Ok(false);
        };
        let m = self.program.method(method);
        if !m.has_body() {
            if m.is_sdk {
                self.build_sdk_func_pag(func, method);
            }
            return Ok(false);
        }

        trace!(%func, method = %m.signature, "building function summary");
        self.building.insert(func);
        let mut func_pag = FuncPag::new(func);
        let result = self.fill_func_pag(func, method, &mut func_pag);
        self.building.remove(&func);
        result?;

        self.func_pags.insert(func, func_pag);
        Ok(true)
    }

    fn fill_func_pag(&mut self, func: FuncId, method: MethodId, func_pag: &mut FuncPag) -> Result<()> {
        let program = self.program;
        for &stmt_id in program.body(method) {
            match &program.stmt(stmt_id).kind {
                StmtKind::Assign { lhs, rhs } => match rhs {
                    Rhs::Value(rhs) => {
                        self.process_external_scope_value(rhs, func)?;
                        if let Some(kind) = classify_assign(program, lhs, rhs).edge_kind() {
                            func_pag.add_internal_edge(kind, rhs.clone(), lhs.clone(), stmt_id);
                        }
                    }
                    Rhs::Invoke(invoke) => {
                        self.process_external_scope_invoke(invoke, func)?;
                        self.add_invoke_call_sites(stmt_id, invoke, true, func_pag)?;
                    }
                    Rhs::Expr(_) => {}
                },
                StmtKind::Invoke(invoke) if self.scale == PtaAnalysisScale::WholeProgram => {
                    self.process_external_scope_invoke(invoke, func)?;
                    self.add_invoke_call_sites(stmt_id, invoke, false, func_pag)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Bucket the call sites registered for `stmt`
    fn add_invoke_call_sites(
        &self,
        stmt: StmtId,
        invoke: &InvokeExpr,
        is_assign: bool,
        func_pag: &mut FuncPag,
    ) -> Result<()> {
        let direct = self.cg.call_sites_by_stmt(stmt);
        if !direct.is_empty() {
            for &cs in direct {
                match self.cg.call_site(cs).callee {
                    Some(callee) if self.cg.is_unknown(callee) => func_pag.add_unknown_call_site(cs),
                    _ => func_pag.add_normal_call_site(cs),
                }
            }
            return Ok(());
        }
        if let Some(cs) = self.cg.dyn_call_site_by_stmt(stmt) {
            func_pag.add_dynamic_call_site(cs);
            return Ok(());
        }
        match invoke.kind {
            InvokeKind::Static => Err(PtaError::StaticCallSiteNotFound(stmt.to_string())),
            _ if is_assign => Ok(()),
            _ => Err(PtaError::CallSiteNotFound(stmt.to_string())),
        }
    }

    fn build_sdk_func_pag(&mut self, func: FuncId, method: MethodId) {
        if self.sdk_params.contains_key(&func) {
            return;
        }
        let params = (0..self.program.method(method).params.len())
            .map(|index| PagValue::SdkParam { func, index })
            .collect();
        self.sdk_params.insert(func, params);
    }

    /// Static factory whose allocation escapes through a static field
    pub fn is_singleton_function(&mut self, func: FuncId) -> bool {
        if !self.detect_singleton {
            return false;
        }
        if let Some(known) = self.singleton_funcs.get(&func) {
            return *known;
        }
        let (Some(method), Some(func_pag)) = (self.cg.method_of(func), self.func_pags.get(&func)) else {
            return false;
        };
        let is_singleton = singleton::is_singleton_function(self.program, method, func_pag);
        if is_singleton {
            info!(method = %self.program.method(method).signature, "singleton factory folded into empty context");
        }
        self.singleton_funcs.insert(func, is_singleton);
        is_singleton
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Instantiation
    // ═══════════════════════════════════════════════════════════════════════

    /// Instantiate `cs_func`; false if it was instantiated before
    fn build_pag_from_func_pag(&mut self, cs_func: CsFuncId) -> Result<bool> {
        if self.handled.contains(&cs_func) {
            return Ok(false);
        }
        let Some(func_pag) = self.func_pags.get(&cs_func.func).cloned() else {
            return Ok(false);
        };
        self.handled.insert(cs_func);
        self.handled_funcs.insert(cs_func.func);
        trace!(func = %cs_func.func, cid = %cs_func.cid, "instantiating function");

        let cid = cs_func.cid;
        self.add_edges_from_func_pag(&func_pag, cid)?;
        if let Some(inter) = self.inter_func_pags.get(&cs_func.func).cloned() {
            self.add_edges_from_inter_func_pag(&inter, cid)?;
        }
        self.add_calls_edges_from_func_pag(&func_pag, cid)?;
        self.add_dynamic_call_site(&func_pag, cid)?;
        self.add_unknown_call_site(&func_pag)?;
        Ok(true)
    }

    fn add_edges_from_func_pag(&mut self, func_pag: &FuncPag, cid: ContextId) -> Result<()> {
        for edge in func_pag.edges() {
            let src = self.node_of(cid, edge.src.clone(), Some(edge.stmt))?;
            let dst = self.node_of(cid, edge.dst.clone(), Some(edge.stmt))?;
            self.pag.add_edge(src, dst, edge.kind, Some(edge.stmt));

            if self.scale == PtaAnalysisScale::MethodLevel {
                if let Value::Parameter { index, .. } = edge.src {
                    self.add_fake_param_object(func_pag.func, index, src)?;
                }
            }
        }
        Ok(())
    }

    /// Method-level scale: class-typed parameters point to a fabricated object
    fn add_fake_param_object(&mut self, func: FuncId, index: usize, param_node: NodeId) -> Result<()> {
        let method = self.method_of(func)?;
        let Some(param) = self.program.method(method).params.get(index) else {
            return Ok(());
        };
        if !matches!(param.ty, Type::Class(_)) {
            return Ok(());
        }
        let fake = PagValue::FakeObject {
            func,
            slot: FakeSlot::Param(index),
            ty: param.ty.clone(),
        };
        let obj = self.node_of(ContextId::DUMMY, fake, None)?;
        self.pag.add_edge(obj, param_node, PagEdgeKind::Address, None);
        Ok(())
    }

    fn add_edges_from_inter_func_pag(&mut self, inter: &InterFuncPag, cid: ContextId) -> Result<()> {
        for edge in inter.edges() {
            let dst = self.node_of(cid, Value::Local(edge.dst), None)?;
            let src_value = PagValue::Ir(Value::Local(edge.src));

            // the source exists at least in the context its function is entered in
            let src_cid = self.ctx.get_new_context_id(edge.src_func);
            self.node_of(src_cid, src_value.clone(), None)?;

            let target = if edge.via_export {
                let hub = self.node_of(ContextId::DUMMY, PagValue::ExportHub(edge.src), None)?;
                self.pag.add_edge(hub, dst, PagEdgeKind::InterProceduralCopy, None);
                hub
            } else {
                dst
            };
            if self.live_inter_set.insert((src_value.clone(), target)) {
                self.live_inter_edges.push((src_value.clone(), target));
            }
            self.connect_inter_edge(&src_value, target);
        }
        Ok(())
    }

    fn connect_inter_edge(&mut self, src_value: &PagValue, target: NodeId) {
        let sources = self.pag.nodes_by_value(src_value).to_vec();
        for src in sources {
            if src != target {
                self.pag.add_edge(src, target, PagEdgeKind::InterProceduralCopy, None);
            }
        }
    }

    /// Connect source nodes created after their inter edge was first added
    fn reconnect_inter_edges(&mut self) {
        let live = std::mem::take(&mut self.live_inter_edges);
        for (value, target) in &live {
            self.connect_inter_edge(value, *target);
        }
        self.live_inter_edges = live;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::call_graph::CallGraphBuilder;
    use crate::features::ir::{FieldSignature, MethodSpec, ProgramBuilder};

    fn builder_for<'p>(program: &'p Program, entry: MethodId, config: &PtaConfig) -> (PagBuilder<'p>, FuncId) {
        let cg = CallGraphBuilder::new(program).build(&[entry]);
        let func = cg.func_of_method(entry).unwrap();
        (PagBuilder::new(program, cg, config), func)
    }

    #[test]
    fn test_func_pag_edges() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        let field = FieldSignature::new("A", "x", Type::class("A"));
        let p = pb.local(main, "p", Type::class("A"));
        let q = pb.local(main, "q", Type::class("A"));
        pb.add_class(file, "A", None);
        pb.new_object(main, p, "A");
        pb.store(main, p, field.clone(), q);
        pb.load(main, q, p, field);
        pb.assign(main, Value::Local(q), Rhs::Expr("1 + 2".into()));
        let program = pb.build();

        let config = PtaConfig::default();
        let (mut builder, func) = builder_for(&program, main, &config);
        assert!(builder.build_func_pag(func).unwrap());
        assert!(!builder.build_func_pag(func).unwrap());

        let kinds: Vec<PagEdgeKind> = builder.func_pag(func).unwrap().edges().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![PagEdgeKind::Address, PagEdgeKind::Write, PagEdgeKind::Load]);
    }

    #[test]
    fn test_entry_instantiation_and_global_this() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        pb.add_class(file, "A", None);
        let p = pb.local(main, "p", Type::class("A"));
        pb.new_object(main, p, "A");
        let program = pb.build();

        let config = PtaConfig::default();
        let (mut builder, func) = builder_for(&program, main, &config);
        builder.build_for_entries(&[func]).unwrap();

        assert_eq!(builder.handled_funcs(), vec![func]);
        assert!(!builder.has_pending_work());
        let global = builder.pag().global_this().unwrap();
        assert!(builder.pag().has_edge(PagEdgeKind::Copy, global, global));
        assert_eq!(builder.pag().nodes_by_value(&Value::Local(p).into()).len(), 1);
    }

    #[test]
    fn test_static_call_without_site_is_an_error() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        let class = pb.add_class(file, "A", None);
        let g = pb.add_method(class, "g", MethodSpec::static_method());
        let sig = pb.signature(g);
        pb.call(main, None, InvokeExpr::new_static(sig, vec![]));
        let program = pb.build();

        // call graph without the call site registered
        let mut cg = CallGraph::new();
        let func = cg.add_method_node(&program, main);
        let mut builder = PagBuilder::new(&program, cg, &PtaConfig::default());
        let err = builder.build_func_pag(func).unwrap_err();
        assert!(matches!(err, PtaError::StaticCallSiteNotFound(_)));
    }

    #[test]
    fn test_method_level_fake_params() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let class = pb.add_class(file, "A", None);
        let m = pb.add_method(
            class,
            "f",
            MethodSpec::static_method()
                .param("a", Type::class("A"))
                .param("n", Type::Number),
        );
        let program = pb.build();

        let config = PtaConfig::default().scale(PtaAnalysisScale::MethodLevel);
        let (mut builder, func) = builder_for(&program, m, &config);
        builder.build_for_entries(&[func]).unwrap();

        let fakes = builder
            .pag()
            .nodes()
            .iter()
            .filter(|n| matches!(n.value, PagValue::FakeObject { slot: FakeSlot::Param(_), .. }))
            .count();
        assert_eq!(fakes, 1);
    }
}
