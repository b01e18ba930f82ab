//! # Points-to Analysis
//!
//! Context- and field-sensitive inclusion-based (Andersen-style) pointer
//! analysis over a pointer assignment graph (PAG):
//! - **k-limited call strings**: functions are instantiated per context,
//!   heap objects are cloned per context
//! - **Field sensitivity**: field references are cloned per pointed-to
//!   object on demand
//! - **On-the-fly call graph**: dynamic calls resolve as receivers and
//!   function values gain pointees
//!
//! ## Academic References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Pearce et al. "Efficient Field-Sensitive Pointer Analysis" (CC 2004)
//! - Lhoták & Hendren "Context-Sensitive Points-to Analysis: Is It Worth It?" (CC 2006)
//!
//! ## Usage
//! ```text
//! let cg = CallGraphBuilder::new(&program).build(&[main]);
//! let mut pta = PointerAnalysis::new(&program, cg, PtaConfig::default())?;
//! pta.solve()?;
//! assert!(pta.may_alias(&x, &y));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{PointerAnalysis, PtaStats};
pub use domain::{ContextId, NodeId, Pag, PagEdgeKind, PagNodeKind, PagValue};
pub use ports::AliasAnalysis;
