//! Call graph
//!
//! Built from direct edges up front by [`CallGraphBuilder`], then extended
//! by the pointer analysis as dynamic call sites resolve.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallGraphNode, CallGraphNodeKind, CallSite, CallSiteId, CallSiteKind, FuncId};
pub use infrastructure::builder::CallGraphBuilder;
pub use infrastructure::call_graph::CallGraph;
