//! Call edges: parameters, returns, receivers and dynamic resolution

use super::{CsFuncId, PagBuilder};
use crate::config::PtaAnalysisScale;
use crate::errors::{PtaError, Result};
use crate::features::call_graph::{CallSite, CallSiteId, FuncId};
use crate::features::ir::{InvokeExpr, InvokeKind, LocalId, MethodId, MethodKind, StmtKind, Type, Value};
use crate::features::points_to::domain::{
    ContextId, FakeSlot, FuncPag, NodeId, PagEdgeKind, PagNodeKind, PagValue, PtsCollection,
};
use crate::features::points_to::infrastructure::builtin_api::{BuiltinApi, ResolutionStrategy};
use crate::shared::constants::names::FOR_EACH_METHOD_NAME;
use rustc_hash::FxHashSet;
use tracing::{error, trace, warn};

impl<'p> PagBuilder<'p> {
    // ═══════════════════════════════════════════════════════════════════════
    // Static calls
    // ═══════════════════════════════════════════════════════════════════════

    pub(super) fn add_calls_edges_from_func_pag(&mut self, func_pag: &FuncPag, cid: ContextId) -> Result<()> {
        for &cs_id in func_pag.normal_call_sites() {
            let cs = self.cg.call_site(cs_id).clone();
            let Some(callee) = cs.callee else {
                continue;
            };
            let callee_cid = self.ctx.get_or_new_context(cid, callee, cs.stmt);

            if self.scale == PtaAnalysisScale::MethodLevel {
                self.add_static_pag_call_return_edge(&cs, callee, cid, callee_cid)?;
            }
            if !self.process_storage(&cs, callee, cid)? {
                self.add_static_pag_call_edge(&cs, callee, cid, callee_cid, None)?;
            }

            let node = self.cg.node(callee);
            if !node.is_receiver_init() {
                continue;
            }
            let Some(method) = node.method else {
                continue;
            };
            match cs.invoke.base() {
                Some(base) => {
                    self.add_this_ref_call_edge(&[], cid, base, method, callee_cid, cs.caller)?;
                }
                None => error!(call_site = %cs.id, "receiver initializer called without a receiver"),
            }
        }
        Ok(())
    }

    /// Wire arguments and the return value of a call to `callee`
    ///
    /// `pt_node` is the function value the call went through; a bound
    /// function replays the arguments of its `bind` call.
    pub fn add_static_pag_call_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        caller_cid: ContextId,
        callee_cid: ContextId,
        pt_node: Option<NodeId>,
    ) -> Result<()> {
        let Some(method) = self.cg.method_of(callee) else {
            return Ok(());
        };
        if self.cg.node(callee).is_sdk {
            return self.add_sdk_method_pag_call_edge(cs, callee, method, caller_cid, callee_cid);
        }
        if !self.program.method(method).has_body() {
            return Ok(());
        }

        let queued = self.build_func_pag_and_add_to_worklist(CsFuncId::new(callee_cid, callee))?;
        let callee_cid = queued.cid;

        let bound = pt_node.and_then(|n| self.pag.node(n).bound_call().cloned());
        match bound {
            Some(bound) => {
                let args = self.cg.call_site(bound.call_site).invoke.args.clone();
                self.add_call_param_pag_edge(method, &args, cs, bound.origin_cid, callee_cid, bound.args_offset)?;
            }
            None => {
                let args = cs.invoke.args.clone();
                self.add_call_param_pag_edge(method, &args, cs, caller_cid, callee_cid, 0)?;
            }
        }
        // The result local belongs to the calling function, bound or not
        self.add_call_return_pag_edge(method, cs, caller_cid, callee_cid)
    }

    /// Copy `args[offset..]` into the callee's parameters
    pub(super) fn add_call_param_pag_edge(
        &mut self,
        callee: MethodId,
        args: &[Value],
        cs: &CallSite,
        caller_cid: ContextId,
        callee_cid: ContextId,
        offset: usize,
    ) -> Result<()> {
        let params = self.program.parameter_refs(callee);
        if cs.invoke.method_name() == FOR_EACH_METHOD_NAME {
            return self.add_foreach_param_pag_edge(cs, caller_cid, callee_cid, &params);
        }

        for (arg, param) in args.iter().skip(offset).zip(params.iter()) {
            if arg.is_constant() {
                continue;
            }
            let src = self.node_of(caller_cid, arg.clone(), cs.stmt)?;
            let dst = self.node_of(callee_cid, param.clone(), cs.stmt)?;
            self.pag.add_edge(src, dst, PagEdgeKind::Copy, cs.stmt);
        }
        Ok(())
    }

    /// Copy returned locals into the call's left operand
    pub(super) fn add_call_return_pag_edge(
        &mut self,
        callee: MethodId,
        cs: &CallSite,
        caller_cid: ContextId,
        callee_cid: ContextId,
    ) -> Result<()> {
        let Some(lhs) = cs.result.clone() else {
            return Ok(());
        };
        for ret in self.program.return_stmts(callee) {
            let value = match &self.program.stmt(ret).kind {
                StmtKind::Return(Some(value)) => value,
                _ => continue,
            };
            match value {
                Value::Local(_) => {
                    let src = self.node_of(callee_cid, value.clone(), Some(ret))?;
                    let dst = self.node_of(caller_cid, lhs.clone(), cs.stmt)?;
                    self.pag.add_edge(src, dst, PagEdgeKind::Copy, Some(ret));
                }
                Value::Constant(_) => {}
                other => {
                    return Err(PtaError::UnexpectedReturnValue(format!(
                        "{} in {}",
                        other,
                        self.program.method(callee).signature
                    )))
                }
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SDK methods
    // ═══════════════════════════════════════════════════════════════════════

    fn add_sdk_method_pag_call_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        method: MethodId,
        caller_cid: ContextId,
        callee_cid: ContextId,
    ) -> Result<()> {
        if BuiltinApi::classify(&self.program.method(method).signature).is_container_op() {
            return Ok(());
        }
        self.build_sdk_func_pag(callee, method);
        self.add_sdk_method_return_pag_edge(cs, callee, method, caller_cid, callee_cid)?;
        self.add_sdk_method_param_pag_edge(cs, callee, caller_cid, callee_cid)
    }

    /// Class-typed results of bodiless callees point to a fabricated object
    fn add_sdk_method_return_pag_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        method: MethodId,
        caller_cid: ContextId,
        callee_cid: ContextId,
    ) -> Result<()> {
        let ty = &self.program.method(method).return_type;
        let (Type::Class(_), Some(lhs)) = (ty, cs.result.clone()) else {
            return Ok(());
        };
        let fake = PagValue::FakeObject {
            func: callee,
            slot: FakeSlot::Return,
            ty: ty.clone(),
        };
        let obj = self.node_of(callee_cid, fake, cs.stmt)?;
        let dst = self.node_of(caller_cid, lhs, cs.stmt)?;
        self.pag.add_edge(obj, dst, PagEdgeKind::Address, cs.stmt);
        Ok(())
    }

    /// Callbacks handed to an SDK method are invoked through a synthetic call site
    fn add_sdk_method_param_pag_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        caller_cid: ContextId,
        callee_cid: ContextId,
    ) -> Result<()> {
        for (index, arg) in cs.invoke.args.iter().enumerate() {
            let Value::Local(local) = arg else {
                continue;
            };
            let Some(callback) = self.program.local(*local).ty.function_signature().cloned() else {
                continue;
            };
            let Some(param) = self.sdk_params.get(&callee).and_then(|p| p.get(index)).cloned() else {
                continue;
            };

            let src = self.node_of(caller_cid, arg.clone(), cs.stmt)?;
            let dst = self.node_of(callee_cid, param, cs.stmt)?;
            if !self.sdk_param_sites.contains_key(&dst) {
                self.pag.set_sdk_param(dst);
                let site = self
                    .cg
                    .add_synthetic_call_site(callee, InvokeExpr::new_static(callback, vec![]));
                self.pag.add_related_dyn_call_site(dst, site);
                self.sdk_param_sites.insert(dst, site);
            }
            self.pag.add_edge(src, dst, PagEdgeKind::Copy, cs.stmt);
        }
        Ok(())
    }

    pub(super) fn add_static_pag_call_return_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        caller_cid: ContextId,
        callee_cid: ContextId,
    ) -> Result<()> {
        let Some(method) = self.cg.method_of(callee) else {
            return Ok(());
        };
        self.add_sdk_method_return_pag_edge(cs, callee, method, caller_cid, callee_cid)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Receivers
    // ═══════════════════════════════════════════════════════════════════════

    /// Flow the receiver `base` into the callee's `this`
    ///
    /// `seeds` are added to the callee's this-ref directly. Returns the
    /// receiver node, or `None` when the callee has no `this` to bind.
    pub(super) fn add_this_ref_call_edge(
        &mut self,
        seeds: &[NodeId],
        cid: ContextId,
        base: LocalId,
        callee: MethodId,
        callee_cid: ContextId,
        caller: FuncId,
    ) -> Result<Option<NodeId>> {
        let m = self.program.method(callee);
        if !m.has_body() {
            error!(method = %m.signature, "receiver call into a method without body");
            return Ok(None);
        }
        if self.program.this_assign_stmt(callee).is_none() {
            if m.kind == MethodKind::Constructor {
                return Err(PtaError::MissingThisAssignment(m.signature.to_string()));
            }
            warn!(method = %m.signature, "no this assignment, receiver dropped");
            return Ok(None);
        }

        let this_ref = self.node_of(callee_cid, Value::This { method: callee }, None)?;
        for &obj in seeds {
            self.pag.add_pts(this_ref, obj);
        }

        let base_value = PagValue::Ir(Value::Local(base));
        let src = match self.pag.get_node(cid, &base_value) {
            Some(node) => Some(node),
            None => self
                .source_value_from_external_scope(base, caller)
                .and_then(|(src, _)| self.pag.nodes_by_value(&Value::Local(src).into()).first().copied()),
        };
        let Some(src) = src else {
            return Err(PtaError::BaseNodeNotFound(format!(
                "{} in {}",
                self.program.local(base).name,
                m.signature
            )));
        };
        self.pag.add_edge(src, this_ref, PagEdgeKind::This, None);
        Ok(Some(src))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dynamic call sites
    // ═══════════════════════════════════════════════════════════════════════

    /// Attach dynamic sites to the nodes of the local they dispatch through
    pub(super) fn add_dynamic_call_site(&mut self, func_pag: &FuncPag, cid: ContextId) -> Result<()> {
        for &cs_id in func_pag.dynamic_call_sites() {
            let cs = self.cg.call_site(cs_id).clone();
            let Some(local) = cs.invoke.dispatch_local() else {
                continue;
            };
            let mut nodes = self.pag.nodes_by_value(&Value::Local(local).into()).to_vec();
            if nodes.is_empty() {
                if let Some((src, _)) = self.source_value_from_external_scope(local, func_pag.func) {
                    nodes = self.pag.nodes_by_value(&Value::Local(src).into()).to_vec();
                }
            }
            if nodes.is_empty() {
                warn!(call_site = %cs_id, local = %self.program.local(local).name, "dispatch local has no node");
                continue;
            }
            for node in nodes {
                self.pag.add_related_dyn_call_site(node, cs_id);
            }
            if let Some(lhs) = cs.result {
                self.node_of(cid, lhs, cs.stmt)?;
            }
        }
        Ok(())
    }

    /// Unresolved static calls naming a local of the caller dispatch through it
    pub(super) fn add_unknown_call_site(&mut self, func_pag: &FuncPag) -> Result<()> {
        if func_pag.unknown_call_sites().is_empty() {
            return Ok(());
        }
        let method = self.method_of(func_pag.func)?;
        for &cs_id in func_pag.unknown_call_sites() {
            let name = self.cg.call_site(cs_id).invoke.method_name().to_string();
            let Some(local) = self.program.local_by_name(method, &name) else {
                continue;
            };
            let nodes = self.pag.nodes_by_value(&Value::Local(local).into()).to_vec();
            if nodes.is_empty() {
                warn!(call_site = %cs_id, %name, "unknown callee local has no node");
            }
            for node in nodes {
                self.pag.add_related_unknown_call_site(node, cs_id);
            }
        }
        Ok(())
    }

    /// Resolve call site `cs_id` for a new pointee of its dispatch local
    pub fn add_dynamic_call_edge(&mut self, cs_id: CallSiteId, pointee: NodeId, cid: ContextId) -> Result<()> {
        let cs = self.cg.call_site(cs_id).clone();
        if let Some(declared) = cs.callee {
            if self.process_storage(&cs, declared, cid)? {
                return Ok(());
            }
        }

        let builtin = BuiltinApi::classify(&cs.invoke.signature);
        let callees = self.get_dynamic_callee(pointee, &cs);
        if callees.is_empty() {
            if builtin.is_container_op() {
                return self.process_container_pag_call_edge(&cs, cid, pointee, builtin);
            }
            warn!(call_site = %cs_id, pointee = %pointee, callee = %cs.invoke.signature, "dynamic callee not resolved");
            return Ok(());
        }

        for (callee, strategy) in callees {
            trace!(call_site = %cs_id, %callee, ?strategy, "dynamic call resolved");
            self.cg.add_dynamic_call_edge(cs.caller, callee, cs.stmt);
            if self.cg.detect_reachable(callee, cs.caller) {
                return Ok(());
            }
            let callee_cid = self.ctx.get_or_new_context(cid, callee, cs.stmt);

            if self.scale == PtaAnalysisScale::MethodLevel {
                self.add_static_pag_call_return_edge(&cs, callee, cid, callee_cid)?;
                continue;
            }
            if builtin.is_builtin() {
                self.process_builtin_method_pag_call_edge(&cs, callee, cid, callee_cid, pointee, builtin)?;
            } else {
                self.process_normal_method_pag_call_edge(&cs, callee, cid, callee_cid, pointee)?;
            }
        }
        Ok(())
    }

    /// Callees of `cs` when its dispatch local points to `pointee`
    pub fn get_dynamic_callee(&self, pointee: NodeId, cs: &CallSite) -> Vec<(FuncId, ResolutionStrategy)> {
        let node = self.pag.node(pointee);
        if let PagNodeKind::Function { signature, .. } = &node.kind {
            return self
                .program
                .method_by_signature(signature)
                .and_then(|m| self.cg.func_of_method(m))
                .map(|f| vec![(f, ResolutionStrategy::ClosureValue)])
                .unwrap_or_default();
        }

        let class_name = match &node.value {
            PagValue::Ir(Value::New(alloc)) => self.program.alloc_class_name(*alloc),
            PagValue::FakeObject { ty, .. } => ty.class_name(),
            PagValue::Ir(Value::NewArray(_)) => None,
            _ => return Vec::new(),
        };

        let mut target = None;
        if let Some(class_name) = class_name {
            target = self
                .program
                .class_by_name(class_name)
                .and_then(|c| self.program.find_method_in_hierarchy(c, cs.invoke.method_name()))
                .map(|m| (m, ResolutionStrategy::VirtualDispatch))
                .or_else(|| {
                    self.program
                        .method_by_signature(&cs.invoke.signature)
                        .map(|m| (m, ResolutionStrategy::StaticTarget))
                });
        }
        if let Some((method, strategy)) = target {
            return self
                .cg
                .func_of_method(method)
                .map(|f| vec![(f, strategy)])
                .unwrap_or_default();
        }

        self.function_typed_args(&cs.invoke)
            .into_iter()
            .map(|f| (f, ResolutionStrategy::ArgumentInferredFunction))
            .collect()
    }

    /// Declared methods behind the function-typed arguments of `invoke`
    fn function_typed_args(&self, invoke: &InvokeExpr) -> Vec<FuncId> {
        invoke
            .args
            .iter()
            .filter_map(|arg| match self.program.value_type(arg) {
                Type::Function(sig) => self.program.method_by_signature(&sig),
                _ => None,
            })
            .filter_map(|m| self.cg.func_of_method(m))
            .collect()
    }

    fn process_normal_method_pag_call_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        cid: ContextId,
        callee_cid: ContextId,
        pointee: NodeId,
    ) -> Result<()> {
        self.add_static_pag_call_edge(cs, callee, cid, callee_cid, Some(pointee))?;

        let node = self.cg.node(callee);
        let (Some(method), false) = (node.method, node.is_sdk) else {
            return Ok(());
        };
        match cs.invoke.kind {
            InvokeKind::Instance { base } => {
                self.add_this_ref_call_edge(&[pointee], cid, base, method, callee_cid, cs.caller)?;
            }
            InvokeKind::Ptr { .. } => {
                let Some(bound) = self.pag.node(pointee).bound_call().cloned() else {
                    return Ok(());
                };
                let origin = self.cg.call_site(bound.call_site).clone();
                if let Some(Value::Local(this_arg)) = origin.invoke.args.first() {
                    self.add_this_ref_call_edge(
                        &bound.this_pts,
                        bound.origin_cid,
                        *this_arg,
                        method,
                        callee_cid,
                        origin.caller,
                    )?;
                }
            }
            InvokeKind::Static => {}
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unresolved dynamic calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Resolve a dynamic site by its declared signature or function-typed arguments
    pub fn handle_unknown_dynamic_call(&mut self, cs_id: CallSiteId, cid: ContextId) -> Result<()> {
        if !self.unknown_resolved.insert((cs_id, cid)) {
            return Ok(());
        }
        let cs = self.cg.call_site(cs_id).clone();
        warn!(call_site = %cs_id, %cid, callee = %cs.invoke.signature, "receiver has no pointee, resolving by signature");

        let callees: Vec<FuncId> = match self
            .program
            .method_by_signature(&cs.invoke.signature)
            .and_then(|m| self.cg.func_of_method(m))
        {
            Some(f) => vec![f],
            None => self.function_typed_args(&cs.invoke),
        };

        for callee in callees {
            if self.process_storage(&cs, callee, cid)? {
                if let Some(arg) = cs.invoke.args.first().filter(|a| !a.is_constant()) {
                    self.node_of(cid, arg.clone(), cs.stmt)?;
                }
            }
            self.cg.add_dynamic_call_edge(cs.caller, callee, cs.stmt);
            if !self.cg.detect_reachable(callee, cs.caller) {
                let callee_cid = self.ctx.get_or_new_context(cid, callee, cs.stmt);
                self.add_static_pag_call_edge(&cs, callee, cid, callee_cid, None)?;
            }
        }
        Ok(())
    }

    /// Dynamic instance calls of this round's functions that no pointee resolved
    pub fn handle_unprocessed_call_sites(&mut self, processed: &FxHashSet<CallSiteId>) -> Result<()> {
        for func in self.funcs_handled_this_round.clone() {
            let Some(func_pag) = self.func_pags.get(&func) else {
                error!(%func, "handled function has no summary");
                continue;
            };
            let sites: Vec<CallSiteId> = func_pag
                .dynamic_call_sites()
                .iter()
                .copied()
                .filter(|cs| !processed.contains(cs))
                .collect();

            for cs_id in sites {
                let Some(base) = self.cg.call_site(cs_id).invoke.base() else {
                    continue;
                };
                // Only contexts where the receiver is still empty; the others
                // are resolved per pointee by the propagator
                let mut cids: Vec<ContextId> = self
                    .pag
                    .nodes_by_value(&Value::Local(base).into())
                    .iter()
                    .filter_map(|n| {
                        let node = self.pag.node(*n);
                        node.pts.is_empty().then_some(node.cid).flatten()
                    })
                    .collect();
                cids.sort_unstable();
                cids.dedup();
                for cid in cids {
                    self.handle_unknown_dynamic_call(cs_id, cid)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PtaConfig;
    use crate::features::call_graph::CallGraphBuilder;
    use crate::features::ir::{MethodSpec, Program, ProgramBuilder};

    struct Dispatch {
        program: Program,
        main: MethodId,
        a_f: MethodId,
        b_f: MethodId,
        o: LocalId,
    }

    fn dispatch() -> Dispatch {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        let a = pb.add_class(file, "A", None);
        let b = pb.add_class(file, "B", Some(a));
        let a_f = pb.add_method(a, "f", MethodSpec::instance());
        let b_f = pb.add_method(b, "f", MethodSpec::instance());
        let o = pb.local(main, "o", Type::class("A"));
        pb.new_object(main, o, "B");
        pb.call(main, None, InvokeExpr::new_instance(o, pb.signature(a_f), vec![]));
        Dispatch {
            program: pb.build(),
            main,
            a_f,
            b_f,
            o,
        }
    }

    #[test]
    fn test_virtual_dispatch_uses_receiver_class() {
        let d = dispatch();
        let cg = CallGraphBuilder::new(&d.program).build(&[d.main]);
        let fmain = cg.func_of_method(d.main).unwrap();
        let mut builder = PagBuilder::new(&d.program, cg, &PtaConfig::default());
        builder.build_for_entries(&[fmain]).unwrap();

        let obj = builder
            .pag()
            .nodes()
            .iter()
            .find(|n| n.is_allocation_like() && matches!(n.value, PagValue::Ir(Value::New(_))))
            .map(|n| n.id)
            .unwrap();
        let o_node = builder.pag().nodes_by_value(&Value::Local(d.o).into())[0];
        let (dyn_sites, _) = builder.pag().node(o_node).related_call_sites();
        assert_eq!(dyn_sites.len(), 1);

        let cs = builder.call_graph().call_site(dyn_sites[0]).clone();
        let callees = builder.get_dynamic_callee(obj, &cs);
        let b_f = builder.call_graph().func_of_method(d.b_f).unwrap();
        assert_eq!(callees, vec![(b_f, ResolutionStrategy::VirtualDispatch)]);
        assert_ne!(builder.call_graph().func_of_method(d.a_f), Some(b_f));
    }

    #[test]
    fn test_dynamic_edge_binds_this() {
        let d = dispatch();
        let cg = CallGraphBuilder::new(&d.program).build(&[d.main]);
        let fmain = cg.func_of_method(d.main).unwrap();
        let mut builder = PagBuilder::new(&d.program, cg, &PtaConfig::default());
        builder.build_for_entries(&[fmain]).unwrap();

        let o_node = builder.pag().nodes_by_value(&Value::Local(d.o).into())[0];
        let cid = builder.pag().node(o_node).cid.unwrap();
        let cs_id = builder.pag().node(o_node).related_call_sites().0[0];
        let obj = builder
            .pag()
            .nodes()
            .iter()
            .find(|n| matches!(n.value, PagValue::Ir(Value::New(_))))
            .map(|n| n.id)
            .unwrap();

        builder.add_dynamic_call_edge(cs_id, obj, cid).unwrap();
        let b_f = builder.call_graph().func_of_method(d.b_f).unwrap();
        assert!(builder.call_graph().has_edge(fmain, b_f));

        let this_nodes = builder
            .pag()
            .nodes_by_value(&Value::This { method: d.b_f }.into())
            .to_vec();
        assert_eq!(this_nodes.len(), 1);
        assert!(builder.pag().pts(this_nodes[0]).contains(obj));
        assert!(builder.pag().has_edge(PagEdgeKind::This, o_node, this_nodes[0]));
        assert!(builder.has_pending_work());
    }
}
