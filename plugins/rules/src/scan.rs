use crate::catalog;
use crate::cross::CrossValidator;
use crate::cycles::{detect_cycles, slice_edges};
use crate::engine::RuleEngine;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use stratum_core::model::descriptor_children;
use stratum_core::{
    ModuleDescriptor, RuleCatalog, Severity, SourceFile, StratumResult, StructuralModel, ValidatorConfig, Violation,
};
use tracing::{debug, info, warn};

pub const SLICE_CYCLE: &str = "ARCH-001";

/// Lexically resolves `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Every module reachable from the project root through child directories
/// holding a descriptor, in depth-first order.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    root: PathBuf,
    modules: Vec<PathBuf>,
    descriptors: BTreeMap<PathBuf, ModuleDescriptor>,
}

impl ProjectTree {
    /// The root descriptor must parse; broken descriptors below it are skipped.
    pub fn discover(root: &Path, config: &ValidatorConfig) -> StratumResult<Self> {
        let root = normalize(root);
        let root_descriptor = ModuleDescriptor::load(&root.join(&config.descriptor_file))?;

        let mut tree = Self {
            root: root.clone(),
            modules: vec![root.clone()],
            descriptors: BTreeMap::from([(root.clone(), root_descriptor)]),
        };
        tree.walk(&root, config);

        debug!("Discovered {} modules under {}", tree.modules.len(), root.display());
        Ok(tree)
    }

    fn walk(&mut self, dir: &Path, config: &ValidatorConfig) {
        for child in descriptor_children(dir, config) {
            let path = dir.join(&child);
            match ModuleDescriptor::load(&path.join(&config.descriptor_file)) {
                Ok(descriptor) => {
                    self.modules.push(path.clone());
                    self.descriptors.insert(path.clone(), descriptor);
                    self.walk(&path, config);
                }
                Err(e) => warn!("Skipping module {}: {}", path.display(), e),
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules(&self) -> &[PathBuf] {
        &self.modules
    }

    pub fn descriptor(&self, dir: &Path) -> Option<&ModuleDescriptor> {
        self.descriptors.get(&normalize(dir))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub modules: Vec<String>,
    pub violations: Vec<Violation>,
}

impl ScanReport {
    pub fn worst_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Zero unless some violation is ERROR or CRITICAL.
    pub fn exit_code(&self) -> i32 {
        self.worst_severity().map(|s| s.exit_code()).unwrap_or(0)
    }
}

pub struct ProjectScanner {
    engine: RuleEngine,
}

impl ProjectScanner {
    pub fn new(catalog: RuleCatalog, config: ValidatorConfig) -> Self {
        Self {
            engine: RuleEngine::new(catalog, config),
        }
    }

    /// Resolves the catalog (standard, external overlay, overrides) for `config`.
    pub fn from_config(config: ValidatorConfig) -> StratumResult<Self> {
        let catalog = catalog::resolve(&config)?;
        Ok(Self::new(catalog, config))
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    pub fn config(&self) -> &ValidatorConfig {
        self.engine.config()
    }

    /// Scans modules sequentially: rule violations per module in catalog
    /// order, then cross-validation, then slice cycles for the whole tree.
    pub fn scan(&self, root: &Path) -> StratumResult<ScanReport> {
        let config = self.engine.config();
        let tree = ProjectTree::discover(root, config)?;
        let cross = CrossValidator::new(self.engine.catalog(), config);

        let mut report = ScanReport {
            root: tree.root().to_path_buf(),
            ..Default::default()
        };
        let mut sources: Vec<SourceFile> = Vec::new();

        for dir in tree.modules() {
            let model = match StructuralModel::build(dir, config) {
                Ok(model) => model,
                Err(e) => {
                    warn!("Skipping module {}: {}", dir.display(), e);
                    continue;
                }
            };

            let mut violations = self.engine.validate(&model);
            violations.extend(cross.cross_validate(&model, &tree));
            debug!("{}: {} violation(s)", model.artifact_id, violations.len());

            report.modules.push(model.artifact_id.clone());
            report.violations.extend(violations);
            sources.extend(model.sources);
        }

        report.violations.extend(self.slice_cycles(&tree, &sources));

        info!(
            "Scanned {} module(s): {} violation(s)",
            report.modules.len(),
            report.violations.len()
        );
        Ok(report)
    }

    fn slice_cycles(&self, tree: &ProjectTree, sources: &[SourceFile]) -> Vec<Violation> {
        let rule = match self.engine.catalog().get(SLICE_CYCLE).filter(|r| r.enabled) {
            Some(rule) => rule,
            None => return Vec::new(),
        };

        let edges = slice_edges(sources, self.engine.config().base_package());
        detect_cycles(&edges)
            .into_iter()
            .map(|cycle| {
                let path = cycle.join(" -> ");
                Violation::new(SLICE_CYCLE, rule.severity, &path, tree.root())
                    .expected("no dependency cycles between slices")
                    .found(format!("cycle {}", path))
                    .reason(&rule.reason)
                    .fix(&rule.fix_hint)
                    .reference(&rule.reference)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./pom.xml")), PathBuf::from("/a/c/pom.xml"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_exit_code_follows_worst_severity() {
        let mut report = ScanReport::default();
        assert_eq!(report.exit_code(), 0);

        report.violations.push(Violation::new("NAM-003", Severity::Info, "x", "/x"));
        report.violations.push(Violation::new("MS-021", Severity::Warning, "x", "/x"));
        assert_eq!(report.exit_code(), 0);

        report.violations.push(Violation::new("MS-010", Severity::Error, "x", "/x"));
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.count(Severity::Error), 1);
        assert_eq!(report.worst_severity(), Some(Severity::Error));
    }
}
