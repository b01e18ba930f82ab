//! Call graph storage and construction

pub mod builder;
pub mod call_graph;
