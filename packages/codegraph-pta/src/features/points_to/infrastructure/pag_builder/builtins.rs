//! Hand-modelled built-ins: container writes, `forEach` and
//! `Function.prototype.{call,apply,bind}`

use super::{CsFuncId, PagBuilder};
use crate::errors::{PtaError, Result};
use crate::features::call_graph::{CallSite, FuncId};
use crate::features::ir::{MethodId, Rhs, StmtKind, Value};
use crate::features::points_to::domain::{BoundCall, ContextId, NodeId, PagEdgeKind, PtsCollection};
use crate::features::points_to::infrastructure::builtin_api::BuiltinApi;
use tracing::{debug, warn};

impl<'p> PagBuilder<'p> {
    pub(super) fn process_builtin_method_pag_call_edge(
        &mut self,
        cs: &CallSite,
        callee: FuncId,
        cid: ContextId,
        callee_cid: ContextId,
        pointee: NodeId,
        builtin: BuiltinApi,
    ) -> Result<()> {
        let Some(method) = self.cg.method_of(callee) else {
            return Ok(());
        };
        match builtin {
            BuiltinApi::SetAdd | BuiltinApi::MapSet => self.process_container_pag_call_edge(cs, cid, pointee, builtin),
            BuiltinApi::FunctionCall => {
                let queued = self.build_func_pag_and_add_to_worklist(CsFuncId::new(callee_cid, callee))?;
                let args = cs.invoke.args.clone();
                self.add_call_param_pag_edge(method, &args, cs, cid, queued.cid, 1)?;
                self.add_call_return_pag_edge(method, cs, cid, queued.cid)?;
                self.add_this_edge(cs, cid, method, queued.cid)
            }
            BuiltinApi::FunctionApply => {
                let queued = self.build_func_pag_and_add_to_worklist(CsFuncId::new(callee_cid, callee))?;
                let caller = self
                    .cg
                    .method_of(cs.caller)
                    .ok_or_else(|| PtaError::CallerNotFound(cs.caller.to_string()))?;
                let args = self.transfer_array_values(caller, cs.invoke.args.get(1));
                self.add_call_param_pag_edge(method, &args, cs, cid, queued.cid, 0)?;
                self.add_call_return_pag_edge(method, cs, cid, queued.cid)?;
                self.add_this_edge(cs, cid, method, queued.cid)
            }
            BuiltinApi::FunctionBind => self.handle_function_bind(cs, cid, pointee),
            BuiltinApi::NotBuiltIn => Ok(()),
        }
    }

    /// `Set.add(v)` / `Map.set(k, v)`: the value flows into the element node
    pub(super) fn process_container_pag_call_edge(
        &mut self,
        cs: &CallSite,
        cid: ContextId,
        pointee: NodeId,
        builtin: BuiltinApi,
    ) -> Result<()> {
        if !self.pag.node(pointee).is_container() {
            return Ok(());
        }
        let Some(value) = builtin.container_value_arg().and_then(|i| cs.invoke.args.get(i)) else {
            return Ok(());
        };
        if value.is_constant() {
            return Ok(());
        }
        let src = self.node_of(cid, value.clone(), cs.stmt)?;
        let element = self.pag.get_or_clone_container_field_node(pointee);
        self.pag.add_edge(src, element, PagEdgeKind::Copy, cs.stmt);
        Ok(())
    }

    /// `c.forEach(cb)`: the elements of `c` flow into `cb`'s first parameter
    pub(super) fn add_foreach_param_pag_edge(
        &mut self,
        cs: &CallSite,
        caller_cid: ContextId,
        callee_cid: ContextId,
        params: &[Value],
    ) -> Result<()> {
        let (Some(container), Some(param)) = (cs.invoke.base(), params.first()) else {
            return Ok(());
        };
        let base = self.node_of(caller_cid, Value::Local(container), cs.stmt)?;
        let dst = self.node_of(callee_cid, param.clone(), cs.stmt)?;
        for obj in self.pag.pts(base).to_vec() {
            if !self.pag.node(obj).is_container() {
                continue;
            }
            let element = self.pag.get_or_clone_container_field_node(obj);
            self.pag.add_edge(element, dst, PagEdgeKind::Copy, cs.stmt);
        }
        Ok(())
    }

    /// `f.call(thisArg, ...)` / `f.apply(thisArg, ...)`: bind `this` of the target
    fn add_this_edge(&mut self, cs: &CallSite, cid: ContextId, callee: MethodId, callee_cid: ContextId) -> Result<()> {
        if self.program.method(callee).is_static {
            return Ok(());
        }
        match cs.invoke.args.first() {
            Some(Value::Local(this_arg)) => {
                self.add_this_ref_call_edge(&[], cid, *this_arg, callee, callee_cid, cs.caller)?;
            }
            Some(Value::Constant(c)) if c.is_null() => {}
            Some(other) => debug!(call_site = %cs.id, this_arg = %other, "this argument is not a local"),
            None => {}
        }
        Ok(())
    }

    /// `g = f.bind(thisArg, ...)`: `g` holds a clone of `f` carrying the bind call
    fn handle_function_bind(&mut self, cs: &CallSite, cid: ContextId, pointee: NodeId) -> Result<()> {
        let Some(clone) = self.pag.get_or_clone_func_node(pointee, cs.stmt) else {
            warn!(call_site = %cs.id, %pointee, "bind target is not a function value");
            return Ok(());
        };

        let this_pts = match cs.invoke.args.first() {
            Some(Value::Local(this_arg)) => {
                let node = self.node_of(cid, Value::Local(*this_arg), cs.stmt)?;
                self.pag.pts(node).to_vec()
            }
            _ => Vec::new(),
        };
        self.pag.set_bound_call(
            clone,
            BoundCall {
                call_site: cs.id,
                args_offset: 1,
                origin_cid: cid,
                this_pts,
            },
        );

        let Some(lhs) = cs.result.clone() else {
            return Ok(());
        };
        let dst = self.node_of(cid, lhs, cs.stmt)?;
        self.pag.add_edge(clone, dst, PagEdgeKind::Copy, cs.stmt);
        Ok(())
    }

    /// Locals stored into the elements of array `arr` within `method`
    pub(super) fn transfer_array_values(&self, method: MethodId, arr: Option<&Value>) -> Vec<Value> {
        let Some(Value::Local(arr)) = arr else {
            return Vec::new();
        };
        if !self.program.local(*arr).ty.is_array() {
            return Vec::new();
        }
        self.program
            .body(method)
            .iter()
            .filter_map(|s| match &self.program.stmt(*s).kind {
                StmtKind::Assign {
                    lhs: Value::ArrayElement { base, .. },
                    rhs: Rhs::Value(v @ Value::Local(_)),
                } if base == arr => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PtaConfig;
    use crate::features::call_graph::CallGraphBuilder;
    use crate::features::ir::{ArrayIndex, InvokeExpr, MethodSpec, ProgramBuilder, Type};

    #[test]
    fn test_transfer_array_values() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        pb.add_class(file, "A", None);
        let arr = pb.local(main, "arr", Type::array_of(Type::class("A")));
        let a = pb.local(main, "a", Type::class("A"));
        let b = pb.local(main, "b", Type::class("A"));
        pb.new_array(main, arr, Type::class("A"));
        pb.new_object(main, a, "A");
        pb.new_object(main, b, "A");
        for (i, v) in [a, b].into_iter().enumerate() {
            pb.assign(
                main,
                Value::ArrayElement { base: arr, index: ArrayIndex::Const(i) },
                Rhs::Value(Value::Local(v)),
            );
        }
        let program = pb.build();
        let cg = CallGraphBuilder::new(&program).build(&[main]);
        let builder = PagBuilder::new(&program, cg, &PtaConfig::default());

        let values = builder.transfer_array_values(main, Some(&Value::Local(arr)));
        assert_eq!(values, vec![Value::Local(a), Value::Local(b)]);
        assert!(builder.transfer_array_values(main, Some(&Value::Local(a))).is_empty());
    }

    #[test]
    fn test_bind_clone_carries_call() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        let class = pb.add_class(file, "A", None);
        let f = pb.add_method(class, "f", MethodSpec::instance());
        let function = pb.add_class(file, "Function", None);
        let bind = pb.add_method(function, "bind", MethodSpec::sdk());

        let o = pb.local(main, "o", Type::class("A"));
        let g = pb.local(main, "g", Type::Function(pb.signature(f)));
        pb.new_object(main, o, "A");
        let f_ref = pb.function_ref(main, f);
        let fv = pb.local(main, "fv", Type::Function(pb.signature(f)));
        pb.copy(main, fv, Value::Local(f_ref));
        pb.call(
            main,
            Some(g),
            InvokeExpr::new_instance(fv, pb.signature(bind), vec![Value::Local(o)]),
        );
        let program = pb.build();

        let cg = CallGraphBuilder::new(&program).build(&[main]);
        let fmain = cg.func_of_method(main).unwrap();
        let mut builder = PagBuilder::new(&program, cg, &PtaConfig::default());
        builder.build_for_entries(&[fmain]).unwrap();

        let fv_node = builder.pag().nodes_by_value(&Value::Local(fv).into())[0];
        let cid = builder.pag().node(fv_node).cid.unwrap();
        let cs_id = builder.pag().node(fv_node).related_call_sites().0[0];
        let func_node = builder.pag().nodes_by_value(&Value::Local(f_ref).into())[0];

        builder.add_dynamic_call_edge(cs_id, func_node, cid).unwrap();
        let g_node = builder.pag().nodes_by_value(&Value::Local(g).into())[0];
        let clone = builder.pag().predecessors(g_node, PagEdgeKind::Copy)[0];
        let bound = builder.pag().node(clone).bound_call().unwrap();
        assert_eq!(bound.call_site, cs_id);
        assert_eq!(bound.args_offset, 1);
        assert_eq!(builder.pag().node(clone).cloned_from, Some(func_node));
    }
}
