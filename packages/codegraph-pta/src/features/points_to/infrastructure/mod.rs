//! Infrastructure layer for the pointer analysis
//!
//! - **PagBuilder**: instantiates function summaries into the PAG, models
//!   built-ins, application storage and SDK callbacks
//! - **Propagator**: difference propagation with on-the-fly call resolution
//! - **SparseBitmap**: sorted points-to set representation
//! - **singleton**: singleton factory detection

pub mod builtin_api;
pub mod pag_builder;
pub mod propagation;
pub mod singleton;
pub mod sparse_bitmap;

pub use builtin_api::{BuiltinApi, ResolutionStrategy};
pub use pag_builder::{CsFuncId, PagBuilder};
pub use propagation::{PropagationStats, Propagator};
pub use sparse_bitmap::SparseBitmap;
