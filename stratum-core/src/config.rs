//! Project-level validator configuration (`.stratum.yaml`).

use crate::error::{StratumError, StratumResult};
use crate::violation::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".stratum.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Naming namespace, substituted for `{namespace}` and `{groupId}`.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Root package for slice extraction; falls back to `namespace`.
    #[serde(default)]
    pub base_package: Option<String>,

    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,

    #[serde(default = "default_parent_suffixes")]
    pub parent_suffixes: Vec<String>,

    #[serde(default = "default_aggregator_suffixes")]
    pub aggregator_suffixes: Vec<String>,

    #[serde(default = "default_module_type_file")]
    pub module_type_file: String,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(default = "default_source_roots")]
    pub source_roots: Vec<String>,

    /// Directory names never treated as modules.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// External catalog, `.properties` or YAML, overlaid on the standard one.
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    #[serde(default)]
    pub disabled_rules: Vec<String>,

    #[serde(default)]
    pub severity_overrides: BTreeMap<String, Severity>,

    #[serde(default)]
    pub report_only: bool,
}

fn default_namespace() -> String {
    "com.example".to_string()
}

fn default_descriptor_file() -> String {
    "pom.xml".to_string()
}

fn default_parent_suffixes() -> Vec<String> {
    vec!["-parent".to_string()]
}

fn default_aggregator_suffixes() -> Vec<String> {
    vec!["-aggregator".to_string()]
}

fn default_module_type_file() -> String {
    ".module.yaml".to_string()
}

fn default_backup_dir() -> String {
    ".stratum-backup".to_string()
}

fn default_source_roots() -> Vec<String> {
    vec!["src/main/java".to_string()]
}

fn default_ignore() -> Vec<String> {
    vec!["target".to_string(), ".git".to_string(), "node_modules".to_string()]
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            base_package: None,
            descriptor_file: default_descriptor_file(),
            parent_suffixes: default_parent_suffixes(),
            aggregator_suffixes: default_aggregator_suffixes(),
            module_type_file: default_module_type_file(),
            backup_dir: default_backup_dir(),
            source_roots: default_source_roots(),
            ignore: default_ignore(),
            catalog: None,
            disabled_rules: Vec::new(),
            severity_overrides: BTreeMap::new(),
            report_only: false,
        }
    }
}

impl ValidatorConfig {
    /// Tries YAML first, then JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StratumResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        if let Ok(config) = serde_yaml::from_str::<ValidatorConfig>(&content) {
            return Ok(config);
        }

        serde_json::from_str(&content).map_err(|e| {
            StratumError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> StratumResult<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn file_name(profile: Option<&str>) -> String {
        match profile {
            Some(profile) => format!(".stratum.{}.yaml", profile),
            None => CONFIG_FILE.to_string(),
        }
    }

    /// Walks up from `start` looking for the configuration file.
    pub fn find_config_file(start: &Path, profile: Option<&str>) -> Option<PathBuf> {
        let name = Self::file_name(profile);
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(&name);
            if candidate.exists() {
                return Some(candidate);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Loads the configuration for `project_root`, falling back to defaults.
    /// A named profile whose file cannot be found is an error.
    pub fn discover(project_root: &Path, profile: Option<&str>) -> StratumResult<(Self, Option<PathBuf>)> {
        match Self::find_config_file(project_root, profile) {
            Some(path) => {
                let mut config = Self::load_from_file(&path)?;
                if let (Some(catalog), Some(dir)) = (config.catalog.as_mut(), path.parent()) {
                    if catalog.is_relative() {
                        *catalog = dir.join(&*catalog);
                    }
                }
                Ok((config, Some(path)))
            }
            None if profile.is_some() => Err(StratumError::config(format!(
                "profile file {} not found above {}",
                Self::file_name(profile),
                project_root.display()
            ))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn base_package(&self) -> &str {
        self.base_package.as_deref().unwrap_or(&self.namespace)
    }

    /// Parent and aggregator suffixes, stripped when deriving `{base}`.
    pub fn grouping_suffixes(&self) -> Vec<String> {
        self.parent_suffixes
            .iter()
            .chain(self.aggregator_suffixes.iter())
            .cloned()
            .collect()
    }

    pub fn is_ignored(&self, dir_name: &str) -> bool {
        dir_name == self.backup_dir || self.ignore.iter().any(|i| i == dir_name)
    }
}
