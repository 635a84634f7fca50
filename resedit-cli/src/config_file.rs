//! YAML configuration loading: `RawConfig` mirrors spec.md §6's recognized
//! keys exactly as written in the document; `resedit-pipeline::Config` is
//! the validated form the pipeline consumes.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use resedit_format::string_pool::ValidationMode;
use resedit_pipeline::Config;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RawConfig {
    pub own_package_prefixes: Vec<String>,
    pub package_mappings: HashMap<String, String>,
    pub class_mappings: HashMap<String, String>,
    pub dex_paths: Vec<String>,
    pub targets: Vec<String>,
    pub process_tools_context: Option<bool>,
    pub keep_backup: bool,
    pub parallel_processing: bool,
    pub auto_sign: bool,
    pub validation_mode: Option<RawValidationMode>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RawValidationMode {
    Strict,
    Lenient,
    Warn,
}

impl From<RawValidationMode> for ValidationMode {
    fn from(mode: RawValidationMode) -> Self {
        match mode {
            RawValidationMode::Strict => ValidationMode::Strict,
            RawValidationMode::Lenient => ValidationMode::Lenient,
            RawValidationMode::Warn => ValidationMode::Warn,
        }
    }
}

pub fn load_config(path: &Path) -> Result<RawConfig> {
    let file = File::open(path).with_context(|| format!("failed to open config file {}", path.display()))?;
    serde_yaml::from_reader(file).with_context(|| format!("{} is not a valid configuration document", path.display()))
}

/// Converts a deserialized `RawConfig` into the validated `Config` the
/// pipeline consumes, checking for own-prefix/mapping conflicts up front so
/// a misconfigured run fails with a usage-level diagnostic instead of a
/// mid-run rollback.
pub fn into_pipeline_config(raw: RawConfig) -> Result<Config> {
    let mut config = Config {
        own_package_prefixes: raw.own_package_prefixes,
        package_mappings: raw.package_mappings.into_iter().collect(),
        class_mappings: raw.class_mappings.into_iter().collect(),
        enumerated_classes: None,
        targets: raw.targets,
        process_tools_context: raw.process_tools_context.unwrap_or(true),
        keep_backup: raw.keep_backup,
        parallel_processing: raw.parallel_processing,
        auto_sign: raw.auto_sign,
        validation_mode: raw.validation_mode.map(Into::into).unwrap_or_default(),
    };

    // Constructing these up front surfaces a `MappingConflict` here rather
    // than deep inside the pipeline's own pre-validate phase.
    config.package_map().context("package_mappings contains a conflicting entry")?;
    config.class_map().context("class_mappings contains a conflicting entry")?;
    config
        .validate_mapping_consistency()
        .context("class_mappings contradicts package_mappings within the own-prefix scope")?;

    Ok(config)
}
