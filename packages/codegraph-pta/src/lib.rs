/*
 * Codegraph PTA - Pointer Analysis Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Constants and macros
 * - config/      : Analysis configuration (validated, YAML-loadable)
 * - features/    : Vertical slices (ir → call_graph → points_to)
 *
 * Analysis:
 * - Context-sensitive (k-limited call strings) and field-sensitive
 * - Andersen-style inclusion constraints over a pointer assignment graph
 * - Call graph completed on the fly from points-to results
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Call-edge builders thread caller and callee contexts
#![allow(clippy::type_complexity)] // Composite memo keys
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared constants and macros
pub mod shared;
/// Feature modules (IR, call graph, points-to)
pub mod features;
/// Configuration system
pub mod config;
/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{PtaAnalysisScale, PtaConfig, PtsStrategy};
pub use errors::{PtaError, Result};
pub use features::points_to::{AliasAnalysis, PointerAnalysis, PtaStats};
