//! In-memory structure of one project module, rebuilt on every scan.

use crate::config::ValidatorConfig;
use crate::descriptor::ModuleDescriptor;
use crate::error::{StratumError, StratumResult};
use crate::layer::{Layer, ModuleType};
use crate::pattern::{self, PlaceholderContext};
use crate::source::SourceFile;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct SubModuleInfo {
    /// Directory name under the owning module.
    pub name: String,
    pub artifact_id: String,
    pub path: PathBuf,
    pub layer: Option<Layer>,
    pub descriptor: ModuleDescriptor,
    pub source_files: Vec<PathBuf>,
    pub sources: Vec<SourceFile>,
}

impl SubModuleInfo {
    pub fn descriptor_path(&self, config: &ValidatorConfig) -> PathBuf {
        self.path.join(&config.descriptor_file)
    }

    pub fn has_source_code(&self) -> bool {
        !self.source_files.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct StructuralModel {
    pub artifact_id: String,
    pub group_id: Option<String>,
    pub base_path: PathBuf,
    pub is_parent: bool,
    pub descriptor: ModuleDescriptor,
    /// Keyed by layer name for layer submodules, by directory name otherwise.
    pub sub_modules: BTreeMap<String, SubModuleInfo>,
    pub module_order: Vec<String>,
    pub source_files: Vec<PathBuf>,
    pub sources: Vec<SourceFile>,
    /// Type declared in the module type marker file, if any.
    pub declared_type: Option<ModuleType>,
    /// Immediate child directories holding a descriptor, in name order.
    pub child_directories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModuleTypeMarker {
    #[serde(rename = "type")]
    module_type: ModuleType,
}

impl StructuralModel {
    /// Scans `base_path` and its immediate children. The module's own
    /// descriptor must parse; broken child descriptors and sources are skipped.
    pub fn build(base_path: &Path, config: &ValidatorConfig) -> StratumResult<Self> {
        let descriptor_path = base_path.join(&config.descriptor_file);
        let descriptor = ModuleDescriptor::load(&descriptor_path)?;

        let mut sub_modules = BTreeMap::new();
        let child_directories = descriptor_children(base_path, config);

        for name in &child_directories {
            let path = base_path.join(name);
            let child_descriptor = match ModuleDescriptor::load(&path.join(&config.descriptor_file)) {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping submodule {}: {}", path.display(), e);
                    continue;
                }
            };

            let layer = Layer::from_artifact_id(&child_descriptor.artifact_id)
                .or_else(|| Layer::from_artifact_id(name));
            let (source_files, sources) = collect_sources(&path, config);

            let key = match layer {
                Some(layer) if !sub_modules.contains_key(layer.name()) => layer.name().to_string(),
                _ => name.clone(),
            };

            debug!("Submodule {} ({}) as '{}'", child_descriptor.artifact_id, path.display(), key);
            sub_modules.insert(
                key,
                SubModuleInfo {
                    name: name.clone(),
                    artifact_id: child_descriptor.artifact_id.clone(),
                    path,
                    layer,
                    descriptor: child_descriptor,
                    source_files,
                    sources,
                },
            );
        }

        let (source_files, sources) = collect_sources(base_path, config);

        Ok(Self {
            artifact_id: descriptor.artifact_id.clone(),
            group_id: descriptor.effective_group_id().map(str::to_string),
            base_path: base_path.to_path_buf(),
            is_parent: descriptor.is_aggregate(),
            module_order: descriptor.modules.clone(),
            declared_type: read_declared_type(base_path, config),
            descriptor,
            sub_modules,
            source_files,
            sources,
            child_directories,
        })
    }

    pub fn layer(&self, layer: Layer) -> Option<&SubModuleInfo> {
        self.sub_modules.get(layer.name()).filter(|s| s.layer == Some(layer))
    }

    pub fn has_layer(&self, layer: Layer) -> bool {
        self.layer(layer).is_some()
    }

    pub fn layers(&self) -> Vec<Layer> {
        Layer::ALL.iter().copied().filter(|l| self.has_layer(*l)).collect()
    }

    pub fn sub_module_named(&self, name: &str) -> Option<&SubModuleInfo> {
        self.sub_modules
            .values()
            .find(|s| s.artifact_id == name || s.name == name)
    }

    pub fn descriptor_path(&self, config: &ValidatorConfig) -> PathBuf {
        self.base_path.join(&config.descriptor_file)
    }

    /// Artifact id with its layer or grouping suffix stripped.
    pub fn base_name(&self, config: &ValidatorConfig) -> String {
        pattern::base_name(&self.artifact_id, &config.grouping_suffixes())
    }

    pub fn placeholders(&self, config: &ValidatorConfig) -> PlaceholderContext {
        PlaceholderContext {
            base: self.base_name(config),
            namespace: config.namespace.clone(),
            module: self.artifact_id.clone(),
        }
    }

    /// All sources of this module and its submodules.
    pub fn all_sources(&self) -> impl Iterator<Item = &SourceFile> {
        self.sources
            .iter()
            .chain(self.sub_modules.values().flat_map(|s| s.sources.iter()))
    }
}

/// Immediate child directories holding a descriptor file, sorted by name.
pub fn descriptor_children(dir: &Path, config: &ValidatorConfig) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.') && !config.is_ignored(name))
        .filter(|name| dir.join(name).join(&config.descriptor_file).is_file())
        .collect();
    names.sort();
    names
}

fn collect_sources(module_dir: &Path, config: &ValidatorConfig) -> (Vec<PathBuf>, Vec<SourceFile>) {
    let mut files = Vec::new();
    let mut sources = Vec::new();

    for root in &config.source_roots {
        let root = module_dir.join(root);
        if !root.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&root).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("java") {
                continue;
            }

            files.push(path.to_path_buf());
            match SourceFile::load(path) {
                Ok(source) => sources.push(source),
                Err(e) => warn!("Skipping source file: {}", e),
            }
        }
    }

    (files, sources)
}

fn read_declared_type(module_dir: &Path, config: &ValidatorConfig) -> Option<ModuleType> {
    let marker = module_dir.join(&config.module_type_file);
    if !marker.is_file() {
        return None;
    }

    let parsed = std::fs::read_to_string(&marker)
        .map_err(StratumError::from)
        .and_then(|content| serde_yaml::from_str::<ModuleTypeMarker>(&content).map_err(StratumError::from));

    match parsed {
        Ok(marker) => Some(marker.module_type),
        Err(e) => {
            warn!("Ignoring module type marker {}: {}", marker.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn pom(artifact: &str, packaging: &str, modules: &[&str]) -> String {
        let modules: String = modules.iter().map(|m| format!("<module>{}</module>", m)).collect();
        format!(
            "<project><groupId>com.acme</groupId><artifactId>{}</artifactId><packaging>{}</packaging><modules>{}</modules></project>",
            artifact, packaging, modules
        )
    }

    #[test]
    fn test_build_detects_layers() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("pom.xml"), pom("billing-parent", "pom", &["billing-api", "billing-core"])).unwrap();
        for name in ["billing-api", "billing-core", "billing-docs"] {
            fs::create_dir_all(root.join(name)).unwrap();
            fs::write(root.join(name).join("pom.xml"), pom(name, "jar", &[])).unwrap();
        }
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join(".module.yaml"), "type: parent\n").unwrap();

        let src = root.join("billing-core/src/main/java/com/acme/billing/core");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("Impl.java"), "package com.acme.billing.core;\npublic class Impl {}\n").unwrap();
        fs::write(src.join("Broken.java"), "class X {}\0").unwrap();

        let model = StructuralModel::build(root, &ValidatorConfig::default()).unwrap();
        assert_eq!(model.artifact_id, "billing-parent");
        assert!(model.is_parent);
        assert_eq!(model.layers(), vec![Layer::Api, Layer::Core]);
        assert!(model.sub_modules.contains_key("billing-docs"));
        assert_eq!(model.module_order, vec!["billing-api", "billing-core"]);
        assert_eq!(model.declared_type, Some(ModuleType::Parent));
        assert_eq!(model.base_name(&ValidatorConfig::default()), "billing");

        let core = model.layer(Layer::Core).unwrap();
        assert_eq!(core.source_files.len(), 2);
        assert_eq!(core.sources.len(), 1);
    }

    #[test]
    fn test_broken_child_descriptor_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("pom.xml"), pom("shop", "pom", &[])).unwrap();
        fs::create_dir_all(root.join("shop-api")).unwrap();
        fs::write(root.join("shop-api/pom.xml"), "<project><artifactId>").unwrap();

        let model = StructuralModel::build(root, &ValidatorConfig::default()).unwrap();
        assert!(model.sub_modules.is_empty());
        assert_eq!(model.child_directories, vec!["shop-api"]);
    }

    #[test]
    fn test_missing_own_descriptor_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(StructuralModel::build(dir.path(), &ValidatorConfig::default()).is_err());
    }
}
