//! Captured and imported variables
//!
//! A local read in a function without ever being assigned there comes
//! from an enclosing scope: a namespace or file default method, or an
//! import of another file. The builder records an inter-function edge
//! from the defining local and queues the defining function so the
//! source node exists.

use super::{CsFuncId, PagBuilder};
use crate::errors::Result;
use crate::features::call_graph::FuncId;
use crate::features::ir::{InvokeExpr, InvokeKind, LocalId, Value};
use crate::features::points_to::domain::InterEdge;
use crate::shared::constants::names::THIS_NAME;
use tracing::trace;

impl<'p> PagBuilder<'p> {
    /// Right operand of an assignment in `func`
    pub(super) fn process_external_scope_value(&mut self, value: &Value, func: FuncId) -> Result<()> {
        match value {
            Value::Local(local) => self.handle_value_from_external_scope(*local, func),
            Value::InstanceField { base, .. } => self.handle_value_from_external_scope(*base, func),
            _ => Ok(()),
        }
    }

    /// Receiver, function pointer and arguments of a dynamic invoke in `func`
    pub(super) fn process_external_scope_invoke(&mut self, invoke: &InvokeExpr, func: FuncId) -> Result<()> {
        if matches!(invoke.kind, InvokeKind::Static) {
            return Ok(());
        }
        for used in invoke.uses() {
            if let Value::Local(local) = used {
                self.handle_value_from_external_scope(local, func)?;
            }
        }
        Ok(())
    }

    fn handle_value_from_external_scope(&mut self, local: LocalId, func: FuncId) -> Result<()> {
        let l = self.program.local(local);
        if l.declaring_stmt.is_some() || l.name == THIS_NAME {
            return Ok(());
        }
        let Some((src, via_export)) = self.source_value_from_external_scope(local, func) else {
            return Ok(());
        };
        self.add_inter_func_edge(src, local, func, via_export)
    }

    /// Defining local of an undeclared `local` used in `func`
    ///
    /// Enclosing namespaces are searched innermost first, then the file's
    /// default method, then the file's imports. The flag is set for imports;
    /// `local` itself is never its own source.
    pub(super) fn source_value_from_external_scope(&self, local: LocalId, func: FuncId) -> Option<(LocalId, bool)> {
        let method = self.cg.method_of(func)?;
        let name = self.program.local(local).name.as_str();

        let mut ns = self.program.method_namespace(method);
        while let Some(id) = ns {
            let namespace = self.program.namespace(id);
            if let Some(src) = namespace
                .default_method
                .and_then(|dm| self.program.local_by_name(dm, name))
                .filter(|src| *src != local)
            {
                return Some((src, false));
            }
            ns = namespace.parent;
        }

        let file = self.program.file(self.program.method_file(method));
        if let Some(src) = file
            .default_method
            .and_then(|dm| self.program.local_by_name(dm, name))
            .filter(|src| *src != local)
        {
            return Some((src, false));
        }

        let import = file.imports.iter().find(|i| i.name == name)?;
        let from = self.program.file_by_name(&import.from_file)?;
        self.program
            .file(from)
            .exports
            .get(&import.export_name)
            .map(|src| (*src, true))
    }

    fn add_inter_func_edge(&mut self, src: LocalId, dst: LocalId, func: FuncId, via_export: bool) -> Result<()> {
        let Some(src_func) = self.cg.func_of_method(self.program.local(src).method) else {
            return Ok(());
        };
        let edge = InterEdge {
            src,
            src_func,
            dst,
            via_export,
        };
        if !self.inter_func_pags.entry(func).or_default().add_edge(edge) {
            return Ok(());
        }
        trace!(
            src = %self.program.local(src).name,
            %src_func,
            %func,
            via_export,
            "captured variable"
        );

        let cid = self.ctx.get_new_context_id(src_func);
        self.build_func_pag_and_add_to_worklist(CsFuncId::new(cid, src_func))?;
        Ok(())
    }
}
