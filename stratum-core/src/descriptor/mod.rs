//! Module descriptor (`pom.xml`) model and editor.

mod edit;
pub mod xml;

pub use edit::DescriptorDocument;

use crate::error::{StratumError, StratumResult};
use crate::pattern;
use serde::{Deserialize, Serialize};
use std::path::Path;
use xml::XmlElement;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRef {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

impl ParentRef {
    /// Relative path to the parent descriptor, Maven's default when undeclared.
    pub fn descriptor_path(&self) -> &str {
        match self.relative_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => "../pom.xml",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
}

impl Dependency {
    pub fn new(group_id: Option<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id,
            artifact_id: artifact_id.into(),
            version: None,
            scope: None,
        }
    }

    pub fn effective_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("compile")
    }
}

/// Parsed view of a module descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub group_id: Option<String>,
    pub artifact_id: String,
    pub version: Option<String>,
    pub packaging: String,
    pub parent: Option<ParentRef>,
    pub dependencies: Vec<Dependency>,
    pub modules: Vec<String>,
}

impl ModuleDescriptor {
    pub fn load(path: &Path) -> StratumResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source, path)
    }

    pub fn parse(source: &str, path: &Path) -> StratumResult<Self> {
        let root = xml::parse(source).map_err(|e| StratumError::descriptor(path, e))?;
        Self::from_tree(&root, source, path)
    }

    pub(crate) fn from_tree(root: &XmlElement, source: &str, path: &Path) -> StratumResult<Self> {
        if root.name != "project" {
            return Err(StratumError::descriptor(
                path,
                format!("expected <project> root element, found <{}>", root.name),
            ));
        }

        let artifact_id = root
            .child_text(source, "artifactId")
            .ok_or_else(|| StratumError::descriptor(path, "missing <artifactId>"))?;

        let parent = match root.child("parent") {
            Some(parent) => Some(ParentRef {
                group_id: parent.child_text(source, "groupId"),
                artifact_id: parent
                    .child_text(source, "artifactId")
                    .ok_or_else(|| StratumError::descriptor(path, "<parent> without <artifactId>"))?,
                version: parent.child_text(source, "version"),
                relative_path: parent.child("relativePath").and_then(|r| r.text(source)),
            }),
            None => None,
        };

        // dependencyManagement entries are not declared dependencies
        let dependencies = root
            .child("dependencies")
            .map(|deps| {
                deps.children_named("dependency")
                    .filter_map(|dep| {
                        Some(Dependency {
                            group_id: dep.child_text(source, "groupId"),
                            artifact_id: dep.child_text(source, "artifactId")?,
                            version: dep.child_text(source, "version"),
                            scope: dep.child_text(source, "scope"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let modules = root
            .child("modules")
            .map(|mods| {
                mods.children_named("module")
                    .filter_map(|m| m.text(source))
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            group_id: root.child_text(source, "groupId"),
            artifact_id,
            version: root.child_text(source, "version"),
            packaging: root
                .child_text(source, "packaging")
                .unwrap_or_else(|| "jar".to_string()),
            parent,
            dependencies,
            modules,
        })
    }

    /// Own groupId, or the one inherited from the parent reference.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Declares package-type aggregate (`<packaging>pom</packaging>`).
    pub fn is_aggregate(&self) -> bool {
        self.packaging == "pom"
    }

    pub fn dependencies_matching<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.dependencies
            .iter()
            .filter(move |d| pattern::matches(&d.artifact_id, pattern))
    }

    pub fn has_dependency_matching(&self, pattern: &str) -> bool {
        self.dependencies_matching(pattern).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <modelVersion>4.0.0</modelVersion>
    <parent>
        <groupId>com.acme</groupId>
        <artifactId>billing-parent</artifactId>
        <version>1.0.0</version>
    </parent>
    <artifactId>billing-core</artifactId>
    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>org.junit</groupId>
                <artifactId>junit-bom</artifactId>
            </dependency>
        </dependencies>
    </dependencyManagement>
    <dependencies>
        <dependency>
            <groupId>com.acme</groupId>
            <artifactId>billing-api</artifactId>
        </dependency>
        <dependency>
            <groupId>org.junit.jupiter</groupId>
            <artifactId>junit-jupiter</artifactId>
            <scope>test</scope>
        </dependency>
    </dependencies>
</project>
"#;

    #[test]
    fn test_parse_descriptor() {
        let descriptor = ModuleDescriptor::parse(POM, Path::new("pom.xml")).unwrap();
        assert_eq!(descriptor.artifact_id, "billing-core");
        assert_eq!(descriptor.packaging, "jar");
        assert_eq!(descriptor.effective_group_id(), Some("com.acme"));
        assert_eq!(descriptor.effective_version(), Some("1.0.0"));
        assert_eq!(descriptor.parent.as_ref().unwrap().artifact_id, "billing-parent");
        assert_eq!(descriptor.parent.as_ref().unwrap().descriptor_path(), "../pom.xml");
    }

    #[test]
    fn test_dependency_management_is_not_declared() {
        let descriptor = ModuleDescriptor::parse(POM, Path::new("pom.xml")).unwrap();
        assert_eq!(descriptor.dependencies.len(), 2);
        assert!(!descriptor.has_dependency_matching("junit-bom"));
        assert!(descriptor.has_dependency_matching("*-api"));
        let junit = descriptor.dependencies_matching("junit*").next().unwrap();
        assert_eq!(junit.effective_scope(), "test");
        assert_eq!(descriptor.dependencies[0].effective_scope(), "compile");
    }

    #[test]
    fn test_missing_artifact_id_is_an_error() {
        let result = ModuleDescriptor::parse("<project><groupId>x</groupId></project>", Path::new("pom.xml"));
        assert!(matches!(result, Err(StratumError::Descriptor { .. })));
    }

    #[test]
    fn test_wrong_root_is_an_error() {
        let result = ModuleDescriptor::parse("<settings/>", Path::new("pom.xml"));
        assert!(result.is_err());
    }
}
