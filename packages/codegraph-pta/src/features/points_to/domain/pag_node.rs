//! PAG nodes
//!
//! One arena entry per abstract location. The node kind is a closed enum;
//! kind-specific data lives in the variant payload.

use super::pag_edge::EdgeLists;
use super::pts::Pts;
use super::{ContextId, NodeId};
use crate::features::call_graph::{CallSiteId, FuncId};
use crate::features::ir::{FieldSignature, LocalId, MethodSignature, StmtId, Type, Value};
use std::fmt;

/// Which fabricated object a [`PagValue::FakeObject`] stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeSlot {
    /// Receiver-less parameter object (method-level scale)
    Param(usize),
    /// Return object of a bodiless or unanalysed callee
    Return,
}

/// What a PAG node represents
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PagValue {
    /// A value of the program
    Ir(Value),
    /// Heap object fabricated for a method parameter or return value
    FakeObject { func: FuncId, slot: FakeSlot, ty: Type },
    /// Parameter stand-in of an SDK method
    SdkParam { func: FuncId, index: usize },
    /// Named slot of a storage API
    StorageProperty { storage: String, name: String },
    /// The implicit global object
    GlobalThis,
    /// Element slot of a container object
    ContainerElement(NodeId),
    /// Hub every importer of an exported local reads from
    ExportHub(LocalId),
}

impl PagValue {
    #[inline]
    pub fn ir(&self) -> Option<&Value> {
        match self {
            PagValue::Ir(v) => Some(v),
            _ => None,
        }
    }

    /// Context normalization: these values exist once, outside any context
    #[inline]
    pub fn is_context_free(&self) -> bool {
        matches!(
            self,
            PagValue::GlobalThis
                | PagValue::StorageProperty { .. }
                | PagValue::ExportHub(_)
                | PagValue::Ir(Value::StaticField(_))
        )
    }
}

impl From<Value> for PagValue {
    fn from(v: Value) -> Self {
        PagValue::Ir(v)
    }
}

impl fmt::Display for PagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagValue::Ir(v) => write!(f, "{}", v),
            PagValue::FakeObject { func, slot, ty } => write!(f, "fake<{}>@{}:{:?}", ty, func, slot),
            PagValue::SdkParam { func, index } => write!(f, "sdk-param{}@{}", index, func),
            PagValue::StorageProperty { storage, name } => write!(f, "{}['{}']", storage, name),
            PagValue::GlobalThis => write!(f, "globalThis"),
            PagValue::ContainerElement(obj) => write!(f, "{}[*]", obj),
            PagValue::ExportHub(l) => write!(f, "export(local#{})", l.0),
        }
    }
}

/// Field a reference node reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Named(FieldSignature),
    /// Any element of an array or container
    Element,
}

/// Replay data of a function value produced by `Function.bind`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundCall {
    /// The `bind` call whose arguments are replayed
    pub call_site: CallSiteId,
    pub args_offset: usize,
    /// Context the `bind` call was analysed in
    pub origin_cid: ContextId,
    /// Pointees of the bound receiver at bind time
    pub this_pts: Vec<NodeId>,
}

/// Node kind with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagNodeKind {
    /// Abstract object; containers get one merged element node
    HeapObject { container: bool },
    LocalVar {
        /// Dynamic call sites dispatched through this local
        dyn_call_sites: Vec<CallSiteId>,
        /// Unresolved call sites naming this local
        unknown_call_sites: Vec<CallSiteId>,
        /// Parameter stand-in of an SDK method
        sdk_param: bool,
        /// Storage property this local is linked to
        storage_link: Option<NodeId>,
    },
    RefVar(FieldKey),
    Param,
    ThisRef,
    /// Function value; `bound` is set on `Function.bind` clones
    Function {
        signature: MethodSignature,
        bound: Option<BoundCall>,
    },
    GlobalThis,
    ExportInfo,
}

impl PagNodeKind {
    pub fn local() -> Self {
        PagNodeKind::LocalVar {
            dyn_call_sites: Vec::new(),
            unknown_call_sites: Vec::new(),
            sdk_param: false,
            storage_link: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PagNodeKind::HeapObject { .. } => "HeapObject",
            PagNodeKind::LocalVar { .. } => "LocalVar",
            PagNodeKind::RefVar(_) => "RefVar",
            PagNodeKind::Param => "Param",
            PagNodeKind::ThisRef => "ThisRef",
            PagNodeKind::Function { .. } => "Function",
            PagNodeKind::GlobalThis => "GlobalThis",
            PagNodeKind::ExportInfo => "ExportInfo",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PagNode {
    pub id: NodeId,
    pub kind: PagNodeKind,
    /// `None` only for the global object
    pub cid: Option<ContextId>,
    pub value: PagValue,
    pub stmt: Option<StmtId>,
    pub pts: Pts,
    /// Pointees added since the solver last propagated this node
    pub(crate) diff: Vec<NodeId>,
    /// Owning object of a cloned field / element node
    pub base_pt: Option<NodeId>,
    /// Abstract node this one was cloned from
    pub cloned_from: Option<NodeId>,
    pub in_edges: EdgeLists,
    pub out_edges: EdgeLists,
}

impl PagNode {
    /// Objects that seed themselves: allocation sites, closures, globalThis
    #[inline]
    pub fn is_allocation_like(&self) -> bool {
        matches!(
            self.kind,
            PagNodeKind::HeapObject { .. } | PagNodeKind::GlobalThis | PagNodeKind::Function { .. }
        )
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self.kind, PagNodeKind::LocalVar { .. })
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, PagNodeKind::HeapObject { container: true })
    }

    #[inline]
    pub fn field_key(&self) -> Option<&FieldKey> {
        match &self.kind {
            PagNodeKind::RefVar(key) => Some(key),
            _ => None,
        }
    }

    /// Dynamic and unknown call sites attached to a local
    pub fn related_call_sites(&self) -> (&[CallSiteId], &[CallSiteId]) {
        match &self.kind {
            PagNodeKind::LocalVar {
                dyn_call_sites,
                unknown_call_sites,
                ..
            } => (dyn_call_sites.as_slice(), unknown_call_sites.as_slice()),
            _ => (&[][..], &[][..]),
        }
    }

    pub fn storage_link(&self) -> Option<NodeId> {
        match &self.kind {
            PagNodeKind::LocalVar { storage_link, .. } => *storage_link,
            _ => None,
        }
    }

    pub fn is_sdk_param(&self) -> bool {
        matches!(self.kind, PagNodeKind::LocalVar { sdk_param: true, .. })
    }

    pub fn bound_call(&self) -> Option<&BoundCall> {
        match &self.kind {
            PagNodeKind::Function { bound, .. } => bound.as_ref(),
            _ => None,
        }
    }
}
