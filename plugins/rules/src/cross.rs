//! Declared-versus-actual structure checks that span more than one module.

use crate::scan::{normalize, ProjectTree};
use std::path::{Path, PathBuf};
use stratum_core::model::descriptor_children;
use stratum_core::{
    Layer, ModuleDescriptor, ModuleType, ParentRef, RuleCatalog, StructuralModel, ValidatorConfig, Violation,
};
use tracing::debug;

pub const PARENT_REFERENCE: &str = "XV-001";
pub const CHILD_REFERENCE: &str = "XV-002";
pub const DECLARED_TYPE: &str = "XV-003";
pub const LEAF_PARENT_TYPE: &str = "XV-004";

/// Structural type of the module in `dir`.
///
/// A module is a leaf unless it has pom packaging. For pom modules an
/// explicit parent or aggregator suffix on the artifact id decides; only
/// without one does a child directory with a layer suffix make it a parent.
pub fn infer_module_type(dir: &Path, descriptor: &ModuleDescriptor, config: &ValidatorConfig) -> ModuleType {
    if !descriptor.is_aggregate() {
        return ModuleType::Leaf;
    }

    let artifact_id = descriptor.artifact_id.as_str();
    if config.parent_suffixes.iter().any(|s| artifact_id.ends_with(s.as_str())) {
        return ModuleType::Parent;
    }
    if config.aggregator_suffixes.iter().any(|s| artifact_id.ends_with(s.as_str())) {
        return ModuleType::Aggregator;
    }

    let has_layer_child = descriptor_children(dir, config)
        .iter()
        .any(|child| Layer::from_artifact_id(child).is_some());

    if has_layer_child {
        ModuleType::Parent
    } else {
        ModuleType::Aggregator
    }
}

/// `com.acme` and `com.acme.billing` are inside `com.acme`; `com.acmex` is not.
fn in_namespace(group_id: &str, namespace: &str) -> bool {
    group_id == namespace
        || group_id
            .strip_prefix(namespace)
            .map(|rest| rest.starts_with('.'))
            .unwrap_or(false)
}

pub struct CrossValidator<'a> {
    catalog: &'a RuleCatalog,
    config: &'a ValidatorConfig,
}

impl<'a> CrossValidator<'a> {
    pub fn new(catalog: &'a RuleCatalog, config: &'a ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn cross_validate(&self, model: &StructuralModel, tree: &ProjectTree) -> Vec<Violation> {
        let mut violations = Vec::new();

        violations.extend(self.check_parent_reference(model, tree));
        violations.extend(self.check_child_references(model));
        violations.extend(self.check_declared_type(model));
        violations.extend(self.check_leaf_parent(model, tree));

        violations
    }

    /// Violation skeleton for a built-in rule, or `None` when it is disabled or absent.
    fn raise(&self, rule_id: &str, target: &str, location: &Path) -> Option<Violation> {
        let rule = self.catalog.get(rule_id).filter(|r| r.enabled)?;
        Some(
            Violation::new(rule_id, rule.severity, target, location)
                .reason(&rule.reason)
                .fix(&rule.fix_hint)
                .reference(&rule.reference),
        )
    }

    /// A parent counts as local when it names a relative path or lives in our namespace.
    fn is_local(&self, parent: &ParentRef) -> bool {
        parent.relative_path.as_deref().map(|p| !p.is_empty()).unwrap_or(false)
            || parent
                .group_id
                .as_deref()
                .map(|g| in_namespace(g, &self.config.namespace))
                .unwrap_or(false)
    }

    fn parent_descriptor_path(&self, module_dir: &Path, parent: &ParentRef) -> PathBuf {
        let target = normalize(&module_dir.join(parent.descriptor_path()));
        if target.extension().and_then(|e| e.to_str()) == Some("xml") {
            target
        } else {
            target.join(&self.config.descriptor_file)
        }
    }

    fn load_parent(&self, tree: &ProjectTree, descriptor_path: &Path) -> Option<ModuleDescriptor> {
        let dir = descriptor_path.parent()?;
        if let Some(known) = tree.descriptor(dir) {
            return Some(known.clone());
        }
        if !descriptor_path.is_file() {
            return None;
        }
        match ModuleDescriptor::load(descriptor_path) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!("Cannot read parent descriptor: {}", e);
                None
            }
        }
    }

    fn check_parent_reference(&self, model: &StructuralModel, tree: &ProjectTree) -> Option<Violation> {
        let parent = model.descriptor.parent.as_ref()?;
        if !self.is_local(parent) {
            return None;
        }

        let descriptor_path = self.parent_descriptor_path(&model.base_path, parent);
        match self.load_parent(tree, &descriptor_path) {
            None => Some(
                self.raise(PARENT_REFERENCE, &model.artifact_id, &model.base_path)?
                    .expected(format!("parent {} at {}", parent.artifact_id, parent.descriptor_path()))
                    .found(format!("{} does not exist or cannot be read", descriptor_path.display())),
            ),
            Some(found) if found.artifact_id != parent.artifact_id => Some(
                self.raise(PARENT_REFERENCE, &model.artifact_id, &model.base_path)?
                    .expected(format!("parent {}", parent.artifact_id))
                    .found(format!("{} declares {}", descriptor_path.display(), found.artifact_id)),
            ),
            Some(_) => None,
        }
    }

    fn check_child_references(&self, model: &StructuralModel) -> Vec<Violation> {
        let mut violations = Vec::new();

        for module in &model.descriptor.modules {
            let dir = normalize(&model.base_path.join(module));
            let problem = if !dir.is_dir() {
                format!("directory {} does not exist", module)
            } else if !dir.join(&self.config.descriptor_file).is_file() {
                format!("{} has no {}", module, self.config.descriptor_file)
            } else {
                continue;
            };

            if let Some(violation) = self.raise(CHILD_REFERENCE, &model.artifact_id, &model.base_path) {
                violations.push(
                    violation
                        .expected(format!("module {} with a {}", module, self.config.descriptor_file))
                        .found(problem),
                );
            }
        }

        violations
    }

    fn check_declared_type(&self, model: &StructuralModel) -> Option<Violation> {
        let declared = model.declared_type?;
        let actual = infer_module_type(&model.base_path, &model.descriptor, self.config);
        if declared.is_satisfied_by(actual) {
            return None;
        }

        Some(
            self.raise(DECLARED_TYPE, &model.artifact_id, &model.base_path.join(&self.config.module_type_file))?
                .expected(format!("structure of a {} module", declared))
                .found(format!("structure of a {} module", actual)),
        )
    }

    fn check_leaf_parent(&self, model: &StructuralModel, tree: &ProjectTree) -> Option<Violation> {
        Layer::from_artifact_id(&model.artifact_id)?;
        let parent = model.descriptor.parent.as_ref()?;
        if !self.is_local(parent) {
            return None;
        }

        let descriptor_path = self.parent_descriptor_path(&model.base_path, parent);
        let parent_descriptor = self.load_parent(tree, &descriptor_path)?;
        let parent_dir = descriptor_path.parent()?;
        let actual = infer_module_type(parent_dir, &parent_descriptor, self.config);
        if actual == ModuleType::Parent {
            return None;
        }

        Some(
            self.raise(LEAF_PARENT_TYPE, &model.artifact_id, &model.base_path)?
                .expected(format!("{} to be a parent module", parent_descriptor.artifact_id))
                .found(format!("{} is a {} module", parent_descriptor.artifact_id, actual)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pom(artifact: &str, packaging: &str) -> String {
        format!(
            "<project><groupId>com.acme</groupId><artifactId>{}</artifactId><packaging>{}</packaging></project>",
            artifact, packaging
        )
    }

    fn write_module(dir: &Path, artifact: &str, packaging: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("pom.xml"), pom(artifact, packaging)).unwrap();
    }

    fn infer(dir: &Path) -> ModuleType {
        let descriptor = ModuleDescriptor::load(&dir.join("pom.xml")).unwrap();
        infer_module_type(dir, &descriptor, &ValidatorConfig::default())
    }

    #[test]
    fn test_non_pom_is_leaf() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "billing-parent", "jar");
        assert_eq!(infer(dir.path()), ModuleType::Leaf);
    }

    #[test]
    fn test_aggregator_suffix_without_layers() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "billing-aggregator", "pom");
        assert_eq!(infer(dir.path()), ModuleType::Aggregator);
    }

    #[test]
    fn test_aggregator_suffix_beats_layer_children() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "billing-aggregator", "pom");
        write_module(&dir.path().join("billing-core"), "billing-core", "jar");
        assert_eq!(infer(dir.path()), ModuleType::Aggregator);
    }

    #[test]
    fn test_parent_suffix_beats_missing_layers() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "billing-parent", "pom");
        assert_eq!(infer(dir.path()), ModuleType::Parent);
    }

    #[test]
    fn test_structure_decides_without_suffix() {
        let dir = tempdir().unwrap();
        write_module(dir.path(), "billing", "pom");
        assert_eq!(infer(dir.path()), ModuleType::Aggregator);

        write_module(&dir.path().join("billing-core"), "billing-core", "jar");
        assert_eq!(infer(dir.path()), ModuleType::Parent);
    }

    #[test]
    fn test_local_parent_needs_namespace_boundary() {
        let catalog = RuleCatalog::default();
        let config = ValidatorConfig {
            namespace: "com.acme".to_string(),
            ..Default::default()
        };
        let validator = CrossValidator::new(&catalog, &config);
        let parent = |group: &str| ParentRef {
            group_id: Some(group.to_string()),
            artifact_id: "shop-parent".to_string(),
            ..Default::default()
        };

        assert!(validator.is_local(&parent("com.acme")));
        assert!(validator.is_local(&parent("com.acme.shop")));
        assert!(!validator.is_local(&parent("com.acmex")));
        assert!(!validator.is_local(&parent("org.apache")));
        assert!(validator.is_local(&ParentRef {
            relative_path: Some("../build".to_string()),
            ..parent("org.apache")
        }));
    }

    #[test]
    fn test_library_satisfied_by_leaf() {
        assert!(ModuleType::Library.is_satisfied_by(ModuleType::Leaf));
        assert!(!ModuleType::Parent.is_satisfied_by(ModuleType::Aggregator));
    }
}
