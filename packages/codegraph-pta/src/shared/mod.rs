//! Shared module - Common constants and macros
//!
//! Has no dependency on any feature module.

#[macro_use]
pub mod macros;
pub mod constants;
