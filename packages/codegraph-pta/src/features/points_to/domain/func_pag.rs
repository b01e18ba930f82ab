//! Per-function PAG summaries
//!
//! A [`FuncPag`] holds the intraprocedural edges of one function in terms
//! of IR values plus its call sites, bucketed by how the callee is found.
//! It is context independent; the builder instantiates it once per
//! context the function is reached in.
//!
//! An [`InterFuncPag`] holds the edges from captured or imported locals of
//! other functions into this function's locals.

use super::pag_edge::PagEdgeKind;
use crate::features::call_graph::{CallSiteId, FuncId};
use crate::features::ir::{LocalId, Program, StmtId, Value};
use crate::shared::constants::names::GLOBAL_THIS_NAME;

/// Pointer semantics of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignKind {
    Address,
    Copy,
    Load,
    Write,
    /// No pointer flow recognized (or an invoke on the right)
    Unknown,
}

impl AssignKind {
    pub fn edge_kind(self) -> Option<PagEdgeKind> {
        match self {
            AssignKind::Address => Some(PagEdgeKind::Address),
            AssignKind::Copy => Some(PagEdgeKind::Copy),
            AssignKind::Load => Some(PagEdgeKind::Load),
            AssignKind::Write => Some(PagEdgeKind::Write),
            AssignKind::Unknown => None,
        }
    }
}

fn is_undeclared(program: &Program, local: LocalId) -> bool {
    program.local(local).declaring_stmt.is_none()
}

/// Classify `lhs := rhs`
pub fn classify_assign(program: &Program, lhs: &Value, rhs: &Value) -> AssignKind {
    if rhs.is_allocation() {
        return AssignKind::Address;
    }

    if matches!(lhs, Value::Local(_)) {
        let closure = match rhs {
            Value::Local(r) => is_undeclared(program, *r) && program.local(*r).ty.is_function(),
            Value::InstanceField { field, .. } | Value::StaticField(field) => field.ty.is_function(),
            _ => false,
        };
        if closure {
            return AssignKind::Address;
        }
    }

    if let Value::Local(r) = rhs {
        let local = program.local(*r);
        if local.declaring_stmt.is_none() && local.name == GLOBAL_THIS_NAME {
            return AssignKind::Address;
        }
    }

    match (lhs, rhs) {
        (
            Value::Local(_),
            Value::Local(_) | Value::Parameter { .. } | Value::This { .. } | Value::StaticField(_),
        ) => AssignKind::Copy,
        (Value::StaticField(_), Value::Local(_)) => AssignKind::Copy,
        (Value::Local(_), Value::InstanceField { .. } | Value::ArrayElement { .. }) => AssignKind::Load,
        (Value::InstanceField { .. } | Value::ArrayElement { .. }, Value::Local(_)) => AssignKind::Write,
        _ => AssignKind::Unknown,
    }
}

/// Intraprocedural edge; `src` is always the right operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncPagEdge {
    pub kind: PagEdgeKind,
    pub src: Value,
    pub dst: Value,
    pub stmt: StmtId,
}

#[derive(Debug, Clone)]
pub struct FuncPag {
    pub func: FuncId,
    edges: Vec<FuncPagEdge>,
    normal_call_sites: Vec<CallSiteId>,
    dynamic_call_sites: Vec<CallSiteId>,
    unknown_call_sites: Vec<CallSiteId>,
}

impl FuncPag {
    pub fn new(func: FuncId) -> Self {
        Self {
            func,
            edges: Vec::new(),
            normal_call_sites: Vec::new(),
            dynamic_call_sites: Vec::new(),
            unknown_call_sites: Vec::new(),
        }
    }

    pub fn add_internal_edge(&mut self, kind: PagEdgeKind, src: Value, dst: Value, stmt: StmtId) {
        self.edges.push(FuncPagEdge {
            kind,
            src,
            dst,
            stmt,
        });
    }

    pub fn add_normal_call_site(&mut self, cs: CallSiteId) {
        self.normal_call_sites.push(cs);
    }

    pub fn add_dynamic_call_site(&mut self, cs: CallSiteId) {
        self.dynamic_call_sites.push(cs);
    }

    pub fn add_unknown_call_site(&mut self, cs: CallSiteId) {
        self.unknown_call_sites.push(cs);
    }

    pub fn edges(&self) -> &[FuncPagEdge] {
        &self.edges
    }

    pub fn normal_call_sites(&self) -> &[CallSiteId] {
        &self.normal_call_sites
    }

    pub fn dynamic_call_sites(&self) -> &[CallSiteId] {
        &self.dynamic_call_sites
    }

    pub fn unknown_call_sites(&self) -> &[CallSiteId] {
        &self.unknown_call_sites
    }
}

/// Captured or imported local of `src_func` flowing into local `dst`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterEdge {
    pub src: LocalId,
    pub src_func: FuncId,
    pub dst: LocalId,
    /// Routed through the export hub of `src`
    pub via_export: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InterFuncPag {
    edges: Vec<InterEdge>,
}

impl InterFuncPag {
    /// Add an edge; false if already present
    pub fn add_edge(&mut self, edge: InterEdge) -> bool {
        if self.edges.contains(&edge) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn edges(&self) -> &[InterEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
