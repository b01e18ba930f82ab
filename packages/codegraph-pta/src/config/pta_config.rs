//! Pointer analysis configuration
//!
//! A plain value built once and handed to [`PointerAnalysis::new`], which
//! validates it. Nothing reads configuration from a process-wide static.
//!
//! [`PointerAnalysis::new`]: crate::features::points_to::PointerAnalysis::new

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for the call-string depth
pub const MAX_K_LIMIT: usize = 5;

/// How much of the program the analysis is expected to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtaAnalysisScale {
    /// Entries are real program entries; all callees are built
    WholeProgram,
    /// Entries are arbitrary methods; class-typed parameters and call
    /// results are replaced by fabricated heap objects
    MethodLevel,
}

/// Points-to set representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtsStrategy {
    /// Sorted vector with pending buffer
    SparseBitmap,
    /// FxHashSet
    HashSet,
}

/// Pointer analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PtaConfig {
    /// Call-string depth (0 = context-insensitive)
    pub k_limit: usize,

    /// Analysis scale
    pub scale: PtaAnalysisScale,

    /// Points-to collection type
    pub pts_strategy: PtsStrategy,

    /// Write `pta_stats.json` into `output_dir` after solving
    pub debug_dump: bool,

    /// Directory for debug output
    pub output_dir: PathBuf,

    /// Collapse singleton factories into the empty context
    pub detect_singleton: bool,

    /// Solver round budget (None = until fixpoint)
    pub max_rounds: Option<usize>,
}

impl Default for PtaConfig {
    fn default() -> Self {
        Self {
            k_limit: 1,
            scale: PtaAnalysisScale::WholeProgram,
            pts_strategy: PtsStrategy::SparseBitmap,
            debug_dump: false,
            output_dir: PathBuf::from("./out"),
            detect_singleton: true,
            max_rounds: None,
        }
    }
}

impl PtaConfig {
    /// Field names accepted in YAML
    pub const FIELDS: &'static [&'static str] = &[
        "k_limit",
        "scale",
        "pts_strategy",
        "debug_dump",
        "output_dir",
        "detect_singleton",
        "max_rounds",
    ];

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.k_limit > MAX_K_LIMIT {
            return Err(ConfigError::range_with_hint(
                "k_limit",
                self.k_limit,
                0,
                MAX_K_LIMIT,
                "Context depth above 5 makes the context space explode",
            ));
        }

        if let Some(n) = self.max_rounds {
            if n == 0 {
                return Err(ConfigError::Validation(
                    "max_rounds must be at least 1 or None for unlimited".to_string(),
                ));
            }
        }

        if self.debug_dump && self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must be set when debug_dump is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse from a YAML document, rejecting unknown keys
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if let serde_yaml::Value::Mapping(map) = &raw {
            for key in map.keys() {
                let name = key.as_str().unwrap_or_default();
                if !Self::FIELDS.contains(&name) {
                    return Err(ConfigError::unknown_field_with_suggestion(
                        name,
                        "pta",
                        Self::FIELDS.iter().map(|f| f.to_string()).collect(),
                    ));
                }
            }
        }

        let config: PtaConfig = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Builder: Set k_limit
    pub fn k_limit(mut self, v: usize) -> Self {
        self.k_limit = v;
        self
    }

    /// Builder: Set scale
    pub fn scale(mut self, v: PtaAnalysisScale) -> Self {
        self.scale = v;
        self
    }

    /// Builder: Set pts_strategy
    pub fn pts_strategy(mut self, v: PtsStrategy) -> Self {
        self.pts_strategy = v;
        self
    }

    /// Builder: Enable debug dump into `dir`
    pub fn debug_dump(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dump = true;
        self.output_dir = dir.into();
        self
    }

    /// Builder: Set detect_singleton
    pub fn detect_singleton(mut self, v: bool) -> Self {
        self.detect_singleton = v;
        self
    }

    /// Builder: Set max_rounds
    pub fn max_rounds(mut self, v: Option<usize>) -> Self {
        self.max_rounds = v;
        self
    }
}
