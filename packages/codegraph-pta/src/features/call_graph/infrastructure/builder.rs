//! Direct-edge call graph construction
//!
//! Creates one node per method and registers every invoke statement as a
//! call site. Static calls and receiver initializers get their edge right
//! away; instance and function-pointer calls are left as dynamic sites for
//! the pointer analysis to resolve.

use super::call_graph::CallGraph;
use crate::features::call_graph::domain::FuncId;
use crate::features::ir::{InvokeKind, MethodId, MethodKind, Program, StmtId};
use tracing::{debug, trace};

pub struct CallGraphBuilder<'p> {
    program: &'p Program,
    cg: CallGraph,
}

impl<'p> CallGraphBuilder<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            cg: CallGraph::new(),
        }
    }

    /// Build the direct call graph rooted at `entries`
    pub fn build(mut self, entries: &[MethodId]) -> CallGraph {
        for method in self.program.method_ids() {
            self.cg.add_method_node(self.program, method);
        }

        for method in self.program.method_ids() {
            let Some(caller) = self.cg.func_of_method(method) else {
                continue;
            };
            for stmt in self.program.body(method).to_vec() {
                self.register_stmt(caller, stmt);
            }
        }

        let entry_funcs: Vec<FuncId> = entries
            .iter()
            .filter_map(|m| self.cg.func_of_method(*m))
            .collect();
        self.cg.set_entries(entry_funcs);

        debug!(
            nodes = self.cg.node_count(),
            edges = self.cg.edge_count(),
            call_sites = self.cg.call_site_count(),
            "Direct call graph built"
        );
        self.cg
    }

    fn register_stmt(&mut self, caller: FuncId, stmt_id: StmtId) {
        let stmt = self.program.stmt(stmt_id);
        let Some(invoke) = stmt.invoke_expr() else {
            return;
        };
        let result = stmt.lhs().cloned();
        let declared = self.program.method_by_signature(&invoke.signature);

        match invoke.kind {
            InvokeKind::Static => {
                let callee = match declared {
                    Some(m) => self.cg.add_method_node(self.program, m),
                    None => self.cg.add_unknown_node(&invoke.signature),
                };
                trace!(%stmt_id, callee = %invoke.signature, "static call site");
                self.cg
                    .add_direct_call_site(caller, callee, stmt_id, invoke.clone(), result);
            }
            InvokeKind::Instance { .. } if declared.is_some_and(|m| self.is_receiver_init(m)) => {
                if let Some(m) = declared {
                    let callee = self.cg.add_method_node(self.program, m);
                    trace!(%stmt_id, callee = %invoke.signature, "receiver init call site");
                    self.cg
                        .add_direct_call_site(caller, callee, stmt_id, invoke.clone(), result);
                }
            }
            InvokeKind::Instance { .. } | InvokeKind::Ptr { .. } => {
                let callee = match declared {
                    Some(m) => self.cg.add_method_node(self.program, m),
                    None => self.cg.add_unknown_node(&invoke.signature),
                };
                trace!(%stmt_id, callee = %invoke.signature, "dynamic call site");
                self.cg
                    .add_dynamic_call_site(caller, Some(callee), stmt_id, invoke.clone(), result);
            }
        }
    }

    fn is_receiver_init(&self, method: MethodId) -> bool {
        matches!(
            self.program.method(method).kind,
            MethodKind::Constructor | MethodKind::Intrinsic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::call_graph::domain::CallSiteKind;
    use crate::features::ir::{InvokeExpr, MethodSignature, MethodSpec, ProgramBuilder, Type};

    #[test]
    fn test_static_and_dynamic_sites() {
        let mut pb = ProgramBuilder::new();
        let file = pb.add_file("a.ts");
        let main = pb.default_method(file).unwrap();
        let class = pb.add_class(file, "A", None);
        let ctor = pb.add_method(class, "constructor", MethodSpec::constructor());
        let f = pb.add_method(class, "f", MethodSpec::instance());
        let g = pb.add_method(class, "g", MethodSpec::static_method());

        let o = pb.local(main, "o", Type::class("A"));
        pb.new_object(main, o, "A");
        let init = pb.call(main, None, InvokeExpr::new_instance(o, pb.signature(ctor), vec![]));
        let virt = pb.call(main, None, InvokeExpr::new_instance(o, pb.signature(f), vec![]));
        let stat = pb.call(main, None, InvokeExpr::new_static(pb.signature(g), vec![]));
        let unk = pb.call(
            main,
            None,
            InvokeExpr::new_static(MethodSignature::unknown("h"), vec![]),
        );
        let program = pb.build();

        let cg = CallGraphBuilder::new(&program).build(&[main]);
        let fmain = cg.func_of_method(main).unwrap();

        assert_eq!(cg.entries(), &[fmain]);
        assert_eq!(cg.call_sites_by_stmt(init).len(), 1);
        assert_eq!(cg.call_sites_by_stmt(stat).len(), 1);
        assert!(cg.call_sites_by_stmt(virt).is_empty());

        let dyn_site = cg.call_site(cg.dyn_call_site_by_stmt(virt).unwrap());
        assert_eq!(dyn_site.kind, CallSiteKind::Dynamic);
        assert_eq!(dyn_site.callee, cg.func_of_method(f));

        let unk_site = cg.call_site(cg.call_sites_by_stmt(unk)[0]);
        assert!(cg.is_unknown(unk_site.callee.unwrap()));

        assert!(cg.has_edge(fmain, cg.func_of_method(g).unwrap()));
        assert!(!cg.has_edge(fmain, cg.func_of_method(f).unwrap()));
    }
}
