use anyhow::{Context, Result};
use clap::{ArgMatches, Command};
use std::path::{Path, PathBuf};

pub mod config;
pub mod descriptor;
pub mod error;
pub mod layer;
pub mod model;
pub mod pattern;
pub mod rule;
pub mod source;
pub mod violation;

pub use config::ValidatorConfig;
pub use descriptor::{Dependency, DescriptorDocument, ModuleDescriptor, ParentRef};
pub use error::{StratumError, StratumResult};
pub use layer::{Layer, ModuleType};
pub use model::{StructuralModel, SubModuleInfo};
pub use pattern::PlaceholderContext;
pub use rule::{
    ClassPatternCriteria, Condition, DependencyCriteria, DescriptorCriteria, DetectionCriteria, NamingCriteria,
    NamingTarget, RuleCatalog, RuleDefinition, VendorCriteria,
};
pub use source::{SourceFile, TypeDeclaration, TypeKind};
pub use violation::{Passed, Severity, Verdict, Violation};

/// Trait that all stratum plugins must implement
pub trait StratumPlugin: Send + Sync {
    /// Returns the plugin name (used for command routing)
    fn name(&self) -> &str;

    /// Register CLI commands for this plugin
    fn register_commands(&self, app: Command) -> Command;

    /// Handle a command for this plugin
    fn handle_command(&self, matches: &ArgMatches, config: &RuntimeConfig) -> Result<()>;
}

/// Runtime configuration available to all plugins
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub working_dir: PathBuf,
}

impl RuntimeConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Resolves the optional `PATH` argument against the working directory.
    pub fn project_root(&self, path: Option<&String>) -> Result<PathBuf> {
        let root = match path {
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => self.working_dir.join(p),
            None => self.working_dir.clone(),
        };
        root.canonicalize()
            .with_context(|| format!("Project root {} does not exist", root.display()))
    }

    /// Loads `.stratum.yaml` (or the profile's file) above `project_root`.
    pub fn load_config(&self, project_root: &Path, profile: Option<&str>) -> Result<ValidatorConfig> {
        let (config, path) = ValidatorConfig::discover(project_root, profile)?;
        match path {
            Some(path) => tracing::debug!("Using configuration {}", path.display()),
            None => tracing::debug!("No configuration file found, using defaults"),
        }
        Ok(config)
    }
}

/// Error carrying the process exit code a command wants, e.g. a failed scan.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CommandExit {
    pub code: i32,
    pub message: String,
}
