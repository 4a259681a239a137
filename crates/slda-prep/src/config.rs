use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cross_validation::CrossValidationConfig;
use crate::estimator::SldaConfig;

/// Central configuration for a preparation run.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PrepConfig {
    /// Prefix for every written file (default `./out_`).
    pub output_prefix: String,
    /// Write stratified folds instead of a single dataset.
    pub cross_validation: Option<CrossValidationConfig>,
    pub estimator: SldaConfig,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            output_prefix: "./out_".to_string(),
            cross_validation: None,
            estimator: SldaConfig::default(),
        }
    }
}

/// Load a `PrepConfig` from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PrepConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: PrepConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
