//! The validated, crate-internal configuration the pipeline actually
//! consumes. `resedit-cli` deserializes a `RawConfig` from YAML and converts
//! it into this type before running the pipeline.

use std::collections::HashSet;

use resedit_format::string_pool::ValidationMode;
use resedit_rewrite::filter::Whitelist;
use resedit_rewrite::mapping::{ClassMap, PackageMap};

use crate::error::{PipelineError, Result};

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub own_package_prefixes: Vec<String>,
    pub package_mappings: Vec<(String, String)>,
    pub class_mappings: Vec<(String, String)>,
    pub enumerated_classes: Option<HashSet<String>>,
    pub targets: Vec<String>,
    pub process_tools_context: bool,
    pub keep_backup: bool,
    pub parallel_processing: bool,
    pub auto_sign: bool,
    pub validation_mode: ValidationMode,
}

impl Config {
    pub fn whitelist(&self) -> Whitelist {
        Whitelist::new(self.own_package_prefixes.iter().cloned())
    }

    pub fn package_map(&self) -> Result<PackageMap> {
        let mut map = PackageMap::new();
        for (from, to) in &self.package_mappings {
            map.insert(from.clone(), to.clone())?;
        }
        Ok(map)
    }

    pub fn class_map(&self) -> Result<ClassMap> {
        let mut map = ClassMap::new();
        for (from, to) in &self.class_mappings {
            map.insert(from.clone(), to.clone())?;
        }
        Ok(map)
    }

    /// No exact class mapping may contradict a prefix mapping within the
    /// own-prefix scope: if both an exact and a prefix rule apply to the
    /// same source name, they must agree on the result.
    pub fn validate_mapping_consistency(&self) -> Result<()> {
        let package_map = self.package_map()?;
        for (from, to) in &self.class_mappings {
            let via_prefix = package_map.replace(from);
            if via_prefix != *from && via_prefix != *to {
                return Err(PipelineError::MappingConflict {
                    key: from.clone(),
                    existing: via_prefix,
                    incoming: to.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_class_mapping_contradicting_prefix_mapping() {
        let config = Config {
            own_package_prefixes: vec!["com.app".into()],
            package_mappings: vec![("com.app".into(), "z.q".into())],
            class_mappings: vec![("com.app.MyView".into(), "other.MyView".into())],
            ..Config::default()
        };
        assert!(config.validate_mapping_consistency().is_err());
    }

    #[test]
    fn accepts_class_mapping_consistent_with_prefix_mapping() {
        let config = Config {
            own_package_prefixes: vec!["com.app".into()],
            package_mappings: vec![("com.app".into(), "z.q".into())],
            class_mappings: vec![("com.app.MyView".into(), "z.q.MyView".into())],
            ..Config::default()
        };
        assert!(config.validate_mapping_consistency().is_ok());
    }
}
