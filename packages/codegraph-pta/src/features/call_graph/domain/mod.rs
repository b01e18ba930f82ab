//! Call graph domain types

use crate::define_id;
use crate::features::ir::{InvokeExpr, MethodId, MethodKind, MethodSignature, StmtId, Value};

define_id!(
    /// Call graph node (one per method, plus unresolved callees)
    FuncId
);
define_id!(
    /// Registered call site
    CallSiteId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallGraphNodeKind {
    Real,
    Constructor,
    Intrinsic,
    /// Callee the front-end could not resolve
    Unknown,
}

impl From<MethodKind> for CallGraphNodeKind {
    fn from(kind: MethodKind) -> Self {
        match kind {
            MethodKind::Normal => CallGraphNodeKind::Real,
            MethodKind::Constructor => CallGraphNodeKind::Constructor,
            MethodKind::Intrinsic => CallGraphNodeKind::Intrinsic,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallGraphNode {
    pub id: FuncId,
    /// Backing method, `None` for unknown callees
    pub method: Option<MethodId>,
    pub signature: MethodSignature,
    pub kind: CallGraphNodeKind,
    pub is_sdk: bool,
}

impl CallGraphNode {
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.kind == CallGraphNodeKind::Unknown || self.signature.is_unknown()
    }

    /// Constructors and intrinsics receive their receiver through `this`
    #[inline]
    pub fn is_receiver_init(&self) -> bool {
        matches!(
            self.kind,
            CallGraphNodeKind::Constructor | CallGraphNodeKind::Intrinsic
        )
    }
}

/// How a call site was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSiteKind {
    /// Callee known from the signature
    Direct,
    /// Callee depends on the receiver / function pointer
    Dynamic,
    /// Fabricated for a callback handed to an SDK method
    Synthetic,
}

/// A call: caller, optional fixed callee, statement and invoke expression
#[derive(Debug, Clone)]
pub struct CallSite {
    pub id: CallSiteId,
    pub kind: CallSiteKind,
    pub caller: FuncId,
    /// Fixed callee of direct sites; for dynamic sites the statically
    /// declared target when the front-end knew one
    pub callee: Option<FuncId>,
    /// `None` for synthetic sites
    pub stmt: Option<StmtId>,
    pub invoke: InvokeExpr,
    /// Left operand when the call result is assigned
    pub result: Option<Value>,
}

impl CallSite {
    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.invoke.args
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.kind != CallSiteKind::Direct
    }
}
