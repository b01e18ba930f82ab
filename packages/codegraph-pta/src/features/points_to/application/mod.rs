//! Application layer: the analysis driver and its query surface

pub mod pointer_analysis;

pub use pointer_analysis::{PointerAnalysis, PtaStats};
