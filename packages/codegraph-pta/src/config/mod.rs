//! Configuration for the pointer analysis
//!
//! ```rust,ignore
//! use codegraph_pta::config::{PtaConfig, PtsStrategy};
//!
//! let config = PtaConfig::default().k_limit(2).pts_strategy(PtsStrategy::HashSet);
//! config.validate()?;
//!
//! let config = PtaConfig::from_yaml_file("pta.yaml")?;
//! ```

pub mod error;
pub mod pta_config;

pub use error::{ConfigError, ConfigResult};
pub use pta_config::{PtaAnalysisScale, PtaConfig, PtsStrategy, MAX_K_LIMIT};
