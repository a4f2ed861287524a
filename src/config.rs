//! Service configuration module.
//!
//! Handles loading, validating, and merging `pixstore.toml`. The user file is
//! sparse: it is merged on top of the stock defaults, so it only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! originals_dir = "data/originals"
//! variations_dir = "data/variations"
//!
//! [transformations]
//! numeric_params = ["width", "height", "x", "y"]  # parsed as integers
//! max_dimension = 16384     # largest width or height any step may produce
//!
//! [output]
//! quality = 90              # encode quality when no `compress` step is given
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for `warm` (omit for auto)
//!
//! [[hooks]]
//! name = "pipeline_limit"   # a built-in hook
//! events = { getImagePreExec = 5 }
//! params = { max = 6 }
//! ```
//!
//! Unknown keys are rejected to catch typos early. `[[hooks]]` entries are
//! an array, so a user list replaces the (empty) stock list wholesale.

use crate::hooks::{HookError, builtin, parse_event_key};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Hook configuration error: {0}")]
    Hook(#[from] HookError),
    #[error("Storage setup error: {0}")]
    Storage(#[from] StorageError),
}

/// Service configuration loaded from `pixstore.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Where originals and variations live on disk.
    pub storage: StorageConfig,
    /// Transformation string parsing.
    pub transformations: TransformationsConfig,
    /// Encoding defaults.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Built-in hooks to enable, in registration order.
    pub hooks: Vec<HookConfig>,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.originals_dir.is_empty() || self.storage.variations_dir.is_empty() {
            return Err(ConfigError::Validation(
                "storage directories must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.transformations.numeric_params.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "transformations.numeric_params must not contain empty names".into(),
            ));
        }
        if self.transformations.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "transformations.max_dimension must be at least 1".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for hook in &self.hooks {
            if !builtin::names().contains(&hook.name.as_str()) {
                return Err(HookError::UnknownHook(hook.name.clone()).into());
            }
            let bad_key = hook
                .events
                .iter()
                .flat_map(|events| events.keys())
                .find(|k| parse_event_key(k).is_none());
            if let Some(key) = bad_key {
                return Err(HookError::InvalidEventKey(key.clone()).into());
            }
        }
        Ok(())
    }
}

/// Storage roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub originals_dir: String,
    pub variations_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            originals_dir: "data/originals".to_string(),
            variations_dir: "data/variations".to_string(),
        }
    }
}

/// Transformation parsing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformationsConfig {
    /// Parameter keys whose values are parsed as integers. All others stay
    /// verbatim strings.
    pub numeric_params: Vec<String>,
    /// Largest width or height any step may produce. Pipelines planned past
    /// it are rejected before the original is decoded.
    pub max_dimension: u32,
}

impl Default for TransformationsConfig {
    fn default() -> Self {
        Self {
            numeric_params: crate::transformation::DEFAULT_NUMERIC_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            max_dimension: crate::transformation::DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Encoding defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Quality used when a pipeline has no `compress` step (1-100).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers used by batch warming.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// One `[[hooks]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// Built-in hook name, e.g. `request_log`.
    pub name: String,
    /// Event key → priority. When absent the hook's own defaults apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<BTreeMap<String, i32>>,
    /// Hook-specific parameters.
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub params: toml::Table,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ServiceConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(path = %path.display(), hooks = config.hooks.len(), "Loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `pixstore.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixstore Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Originals and their info records, sharded by account and identifier.
originals_dir = "data/originals"

# Cached variations, sharded the same way, one file per output width.
variations_dir = "data/variations"

# ---------------------------------------------------------------------------
# Transformation parsing
# ---------------------------------------------------------------------------
[transformations]
# Parameter keys whose values are parsed as integers.
# Every other value is kept as a verbatim string.
numeric_params = ["width", "height", "x", "y"]

# Largest width or height (in pixels) any transformation step may produce.
# Requests that would exceed it fail as invalid before any decoding.
max_dimension = 16384

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Encode quality (1 = worst, 100 = best) for pipelines without a
# `compress` step. Changing it re-renders cached variations on next request.
quality = 90

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers used by `warm`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Hooks
# ---------------------------------------------------------------------------
# Built-in hooks run around operations (getImage, addImage, deleteImage,
# updateMetadata, purgeVariations). Event keys are "<operation>PreExec" or
# "<operation>PostExec"; lower priorities run first.
#
# [[hooks]]
# name = "request_log"
# events = { getImagePreExec = 0, getImagePostExec = 100 }
#
# [[hooks]]
# name = "pipeline_limit"
# params = { max = 10 }
"##
}
