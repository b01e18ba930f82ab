//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure model (no external dependencies)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - Algorithms and builders

/// Program model read by the analysis
pub mod ir;

/// Call graph, extended on the fly by the analysis
pub mod call_graph;

/// Points-to analysis over the pointer assignment graph
pub mod points_to;
