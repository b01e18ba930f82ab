//! Points-to domain model
//!
//! - pag / pag_node / pag_edge: pointer assignment graph arena
//! - context: k-limited call-string contexts
//! - func_pag: per-function summaries extracted from the IR
//! - pts: points-to set representations

pub mod context;
pub mod func_pag;
pub mod pag;
pub mod pag_edge;
pub mod pag_node;
pub mod pts;

use crate::define_id;

define_id!(
    /// Node in the PAG arena
    NodeId
);
define_id!(
    /// Edge in the PAG arena
    EdgeId
);
define_id!(
    /// Interned call-string context
    ContextId
);

pub use context::{ContextElem, KLimitedContext};
pub use func_pag::{classify_assign, AssignKind, FuncPag, FuncPagEdge, InterEdge, InterFuncPag};
pub use pag::{Pag, PagStats};
pub use pag_edge::{EdgeLists, PagEdge, PagEdgeKind};
pub use pag_node::{BoundCall, FakeSlot, FieldKey, PagNode, PagNodeKind, PagValue};
pub use pts::{HashPts, Pts, PtsCollection};
