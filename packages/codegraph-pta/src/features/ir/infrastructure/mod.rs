//! IR construction

pub mod program_builder;
