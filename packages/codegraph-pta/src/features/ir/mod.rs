//! Intermediate representation consumed by the pointer analysis
//!
//! - domain/         - program model (files, classes, methods, statements, values)
//! - infrastructure/ - [`ProgramBuilder`] for constructing programs in code

pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use infrastructure::program_builder::{MethodSpec, ProgramBuilder};
