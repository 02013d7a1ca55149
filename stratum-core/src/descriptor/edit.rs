use super::xml::{self, XmlElement};
use super::{Dependency, ModuleDescriptor, ParentRef};
use crate::error::{StratumError, StratumResult};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Whitespace-preserving editor over a descriptor's text.
///
/// Every lookup follows the full element path from `<project>`, so a
/// `<parent><artifactId>` or a `dependencyManagement` entry is never mistaken
/// for the project-level element of the same name. Edits splice the affected
/// byte range only; all other bytes are left as they were.
#[derive(Debug, Clone)]
pub struct DescriptorDocument {
    source: String,
    path: PathBuf,
}

impl DescriptorDocument {
    pub fn parse(source: impl Into<String>, path: impl Into<PathBuf>) -> StratumResult<Self> {
        let document = Self {
            source: source.into(),
            path: path.into(),
        };
        document.root()?;
        Ok(document)
    }

    pub fn load(path: &Path) -> StratumResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(source, path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn into_string(self) -> String {
        self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> StratumResult<ModuleDescriptor> {
        let root = self.root()?;
        ModuleDescriptor::from_tree(&root, &self.source, &self.path)
    }

    /// Adds `<module>name</module>`, creating `<modules>` when needed.
    pub fn append_module(&mut self, name: &str) -> StratumResult<bool> {
        let root = self.root()?;
        let unit = self.indent_unit(&root);
        let nl = self.newline();

        match root.child("modules") {
            Some(modules) => {
                let listed: Vec<&XmlElement> = modules.children_named("module").collect();
                if listed.iter().any(|m| m.text(&self.source).as_deref() == Some(name)) {
                    return Ok(false);
                }
                match listed.last() {
                    Some(last) => {
                        let indent = self.indent_at(last.open.start);
                        let at = last.outer().end;
                        let text = format!("{nl}{indent}<module>{}</module>", xml::escape(name));
                        self.splice(at..at, &text);
                    }
                    None => {
                        let indent = self.indent_at(modules.open.start);
                        let block = format!(
                            "<modules>{nl}{indent}{unit}<module>{}</module>{nl}{indent}</modules>",
                            xml::escape(name)
                        );
                        self.splice(modules.outer(), &block);
                    }
                }
            }
            None => {
                let anchor = self.coordinate_anchor(&root)?;
                let indent = self.indent_at(anchor.open.start);
                let at = anchor.outer().end;
                let block = format!(
                    "{nl}{nl}{indent}<modules>{nl}{indent}{unit}<module>{}</module>{nl}{indent}</modules>",
                    xml::escape(name)
                );
                self.splice(at..at, &block);
            }
        }
        Ok(true)
    }

    /// Moves the `<module>` entry named `name` to the first position.
    ///
    /// Entries are swapped slot by slot, so comments and blank lines between
    /// entries stay where they were.
    pub fn move_module_first(&mut self, name: &str) -> StratumResult<bool> {
        let root = self.root()?;
        let modules = match root.child("modules") {
            Some(modules) => modules,
            None => return Ok(false),
        };

        let slots: Vec<Range<usize>> = modules.children_named("module").map(|m| m.outer()).collect();
        let index = match modules
            .children_named("module")
            .position(|m| m.text(&self.source).as_deref() == Some(name))
        {
            Some(0) | None => return Ok(false),
            Some(index) => index,
        };

        let snippets: Vec<String> = slots.iter().map(|r| self.source[r.clone()].to_string()).collect();
        let mut order = vec![index];
        order.extend((0..slots.len()).filter(|i| *i != index));

        for (slot, source_index) in slots.iter().zip(order).rev() {
            self.splice(slot.clone(), &snippets[source_index]);
        }
        Ok(true)
    }

    /// Sets `<packaging>`, inserting it after the coordinates when absent.
    pub fn set_packaging(&mut self, packaging: &str) -> StratumResult<bool> {
        let root = self.root()?;
        let nl = self.newline();

        if let Some(existing) = root.child("packaging") {
            if existing.text(&self.source).as_deref() == Some(packaging) {
                return Ok(false);
            }
            let replacement = format!("<packaging>{}</packaging>", xml::escape(packaging));
            self.splice(existing.outer(), &replacement);
            return Ok(true);
        }

        let anchor = root
            .child("version")
            .or_else(|| root.child("artifactId"))
            .ok_or_else(|| StratumError::descriptor(&self.path, "missing <artifactId>"))?;
        let indent = self.indent_at(anchor.open.start);
        let at = anchor.outer().end;
        let text = format!("{nl}{indent}<packaging>{}</packaging>", xml::escape(packaging));
        self.splice(at..at, &text);
        Ok(true)
    }

    /// Inserts a `<parent>` block after `<modelVersion>` (or first in the project).
    pub fn insert_parent(&mut self, parent: &ParentRef) -> StratumResult<bool> {
        let root = self.root()?;
        if root.child("parent").is_some() {
            return Ok(false);
        }
        let unit = self.indent_unit(&root);
        let nl = self.newline();

        let (at, indent) = match root.child("modelVersion") {
            Some(model_version) => (model_version.outer().end, self.indent_at(model_version.open.start)),
            None => (root.open.end, unit.clone()),
        };
        let block = format!("{nl}{}", render_parent(parent, &indent, &unit, nl));
        self.splice(at..at, &block);
        Ok(true)
    }

    /// Adds a project-level dependency unless one with the same artifact id exists.
    pub fn add_dependency(&mut self, dependency: &Dependency) -> StratumResult<bool> {
        let root = self.root()?;
        let unit = self.indent_unit(&root);
        let nl = self.newline();

        match root.child("dependencies") {
            Some(dependencies) => {
                let entries: Vec<&XmlElement> = dependencies.children_named("dependency").collect();
                if entries
                    .iter()
                    .any(|d| d.child_text(&self.source, "artifactId").as_deref() == Some(dependency.artifact_id.as_str()))
                {
                    return Ok(false);
                }
                match entries.last() {
                    Some(last) => {
                        let indent = self.indent_at(last.open.start);
                        let at = last.outer().end;
                        let text = format!("{nl}{}", render_dependency(dependency, &indent, &unit, nl));
                        self.splice(at..at, &text);
                    }
                    None => {
                        let indent = self.indent_at(dependencies.open.start);
                        let inner = render_dependency(dependency, &format!("{indent}{unit}"), &unit, nl);
                        let block = format!("<dependencies>{nl}{inner}{nl}{indent}</dependencies>");
                        self.splice(dependencies.outer(), &block);
                    }
                }
            }
            None => {
                let close = root
                    .close
                    .clone()
                    .ok_or_else(|| StratumError::descriptor(&self.path, "self-closing <project>"))?;
                let inner = render_dependency(dependency, &format!("{unit}{unit}"), &unit, nl);
                let block = format!("{nl}{unit}<dependencies>{nl}{inner}{nl}{unit}</dependencies>{nl}");
                self.splice(close.start..close.start, &block);
            }
        }
        Ok(true)
    }

    /// Removes the first project-level dependency with `artifact_id`.
    pub fn remove_dependency(&mut self, artifact_id: &str) -> StratumResult<bool> {
        let root = self.root()?;
        let target = match self.find_dependency(&root, artifact_id) {
            Some(target) => target.outer(),
            None => return Ok(false),
        };
        // take the leading whitespace with it so no blank line is left behind
        let start = self.source[..target.start].trim_end().len();
        self.splice(start..target.end, "");
        Ok(true)
    }

    /// Sets the `<scope>` of a project-level dependency.
    pub fn set_dependency_scope(&mut self, artifact_id: &str, scope: &str) -> StratumResult<bool> {
        let root = self.root()?;
        let nl = self.newline();
        let target = match self.find_dependency(&root, artifact_id) {
            Some(target) => target,
            None => return Ok(false),
        };

        if let Some(existing) = target.child("scope") {
            if existing.text(&self.source).as_deref() == Some(scope) {
                return Ok(false);
            }
            let replacement = format!("<scope>{}</scope>", xml::escape(scope));
            self.splice(existing.outer(), &replacement);
            return Ok(true);
        }

        let anchor = target
            .child("version")
            .or_else(|| target.child("artifactId"))
            .ok_or_else(|| StratumError::descriptor(&self.path, "<dependency> without <artifactId>"))?;
        let indent = self.indent_at(anchor.open.start);
        let at = anchor.outer().end;
        let text = format!("{nl}{indent}<scope>{}</scope>", xml::escape(scope));
        self.splice(at..at, &text);
        Ok(true)
    }

    /// Renders a fresh descriptor for a new child module.
    pub fn new_module(parent: &ParentRef, artifact_id: &str, dependencies: &[Dependency]) -> String {
        let unit = "    ";
        let nl = "\n";
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<project xmlns=\"http://maven.apache.org/POM/4.0.0\"\n");
        out.push_str("         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n");
        out.push_str("         xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd\">\n");
        out.push_str("    <modelVersion>4.0.0</modelVersion>\n\n");
        out.push_str(&render_parent(parent, unit, unit, nl));
        out.push_str("\n\n");
        out.push_str(&format!("    <artifactId>{}</artifactId>\n", xml::escape(artifact_id)));
        if !dependencies.is_empty() {
            out.push_str("\n    <dependencies>\n");
            for dependency in dependencies {
                out.push_str(&render_dependency(dependency, "        ", unit, nl));
                out.push('\n');
            }
            out.push_str("    </dependencies>\n");
        }
        out.push_str("</project>\n");
        out
    }

    fn root(&self) -> StratumResult<XmlElement> {
        xml::parse(&self.source).map_err(|e| StratumError::descriptor(&self.path, e))
    }

    fn find_dependency<'a>(&self, root: &'a XmlElement, artifact_id: &str) -> Option<&'a XmlElement> {
        root.child("dependencies")?
            .children_named("dependency")
            .find(|d| d.child_text(&self.source, "artifactId").as_deref() == Some(artifact_id))
    }

    fn coordinate_anchor<'a>(&self, root: &'a XmlElement) -> StratumResult<&'a XmlElement> {
        ["packaging", "version", "artifactId"]
            .iter()
            .find_map(|name| root.child(name))
            .ok_or_else(|| StratumError::descriptor(&self.path, "missing <artifactId>"))
    }

    fn splice(&mut self, range: Range<usize>, text: &str) {
        self.source.replace_range(range, text);
    }

    /// Whitespace between the start of the line and `pos`, if only whitespace.
    fn indent_at(&self, pos: usize) -> String {
        let line_start = self.source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let prefix = &self.source[line_start..pos];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            prefix.to_string()
        } else {
            String::new()
        }
    }

    fn indent_unit(&self, root: &XmlElement) -> String {
        root.children
            .first()
            .map(|c| self.indent_at(c.open.start))
            .filter(|indent| !indent.is_empty())
            .unwrap_or_else(|| "    ".to_string())
    }

    fn newline(&self) -> &'static str {
        if self.source.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }
}

fn render_parent(parent: &ParentRef, indent: &str, unit: &str, nl: &str) -> String {
    let mut lines = vec![format!("{indent}<parent>")];
    if let Some(group_id) = &parent.group_id {
        lines.push(format!("{indent}{unit}<groupId>{}</groupId>", xml::escape(group_id)));
    }
    lines.push(format!("{indent}{unit}<artifactId>{}</artifactId>", xml::escape(&parent.artifact_id)));
    if let Some(version) = &parent.version {
        lines.push(format!("{indent}{unit}<version>{}</version>", xml::escape(version)));
    }
    if let Some(relative_path) = &parent.relative_path {
        lines.push(format!("{indent}{unit}<relativePath>{}</relativePath>", xml::escape(relative_path)));
    }
    lines.push(format!("{indent}</parent>"));
    lines.join(nl)
}

fn render_dependency(dependency: &Dependency, indent: &str, unit: &str, nl: &str) -> String {
    let mut lines = vec![format!("{indent}<dependency>")];
    if let Some(group_id) = &dependency.group_id {
        lines.push(format!("{indent}{unit}<groupId>{}</groupId>", xml::escape(group_id)));
    }
    lines.push(format!("{indent}{unit}<artifactId>{}</artifactId>", xml::escape(&dependency.artifact_id)));
    if let Some(version) = &dependency.version {
        lines.push(format!("{indent}{unit}<version>{}</version>", xml::escape(version)));
    }
    if let Some(scope) = &dependency.scope {
        lines.push(format!("{indent}{unit}<scope>{}</scope>", xml::escape(scope)));
    }
    lines.push(format!("{indent}</dependency>"));
    lines.join(nl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <modelVersion>4.0.0</modelVersion>
    <groupId>com.acme</groupId>
    <artifactId>billing-parent</artifactId>
    <version>1.0.0</version>
    <packaging>pom</packaging>

    <modules>
        <module>billing-api</module>
        <!-- implementation -->
        <module>billing-core</module>
        <module>billing-common</module>
    </modules>
</project>
"#;

    const LEAF_POM: &str = r#"<project>
    <modelVersion>4.0.0</modelVersion>
    <artifactId>billing-core</artifactId>
    <dependencyManagement>
        <dependencies>
            <dependency>
                <artifactId>billing-api</artifactId>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>
"#;

    fn doc(source: &str) -> DescriptorDocument {
        DescriptorDocument::parse(source, "pom.xml").unwrap()
    }

    #[test]
    fn test_append_module_to_existing_list() {
        let mut document = doc(PARENT_POM);
        assert!(document.append_module("billing-facade").unwrap());
        let model = document.model().unwrap();
        assert_eq!(model.modules.last().map(String::as_str), Some("billing-facade"));
        assert!(document
            .as_str()
            .contains("        <module>billing-common</module>\n        <module>billing-facade</module>\n    </modules>"));
    }

    #[test]
    fn test_append_module_is_idempotent() {
        let mut document = doc(PARENT_POM);
        assert!(!document.append_module("billing-api").unwrap());
        assert_eq!(document.as_str(), PARENT_POM);
    }

    #[test]
    fn test_append_module_creates_modules_block() {
        let source = "<project>\n    <artifactId>solo</artifactId>\n    <packaging>pom</packaging>\n</project>\n";
        let mut document = doc(source);
        assert!(document.append_module("solo-api").unwrap());
        assert_eq!(document.model().unwrap().modules, vec!["solo-api".to_string()]);
        assert!(document.as_str().contains("    <modules>\n        <module>solo-api</module>\n    </modules>"));
    }

    #[test]
    fn test_append_module_expands_self_closing_modules() {
        let source = "<project>\n    <artifactId>solo</artifactId>\n    <modules/>\n</project>\n";
        let mut document = doc(source);
        assert!(document.append_module("solo-core").unwrap());
        assert_eq!(document.model().unwrap().modules, vec!["solo-core".to_string()]);
    }

    #[test]
    fn test_move_module_first_keeps_comments() {
        let mut document = doc(PARENT_POM);
        assert!(document.move_module_first("billing-common").unwrap());
        let model = document.model().unwrap();
        assert_eq!(model.modules, vec!["billing-common", "billing-api", "billing-core"]);
        assert!(document.as_str().contains("<!-- implementation -->"));
        assert!(!document.move_module_first("billing-common").unwrap());
    }

    #[test]
    fn test_untouched_bytes_are_preserved() {
        let mut document = doc(PARENT_POM);
        document.append_module("billing-facade").unwrap();
        let edited = document.as_str();
        let split = PARENT_POM.find("    </modules>").unwrap();
        let prefix = &PARENT_POM[..PARENT_POM.find("        <module>billing-common</module>").unwrap()];
        assert!(edited.starts_with(prefix));
        assert!(edited.ends_with(&PARENT_POM[split..]));
    }

    #[test]
    fn test_insert_parent_after_model_version() {
        let mut document = doc(LEAF_POM);
        let parent = ParentRef {
            group_id: Some("com.acme".to_string()),
            artifact_id: "billing-parent".to_string(),
            version: Some("1.0.0".to_string()),
            relative_path: None,
        };
        assert!(document.insert_parent(&parent).unwrap());
        let model = document.model().unwrap();
        assert_eq!(model.parent.unwrap().artifact_id, "billing-parent");
        assert_eq!(model.artifact_id, "billing-core");
        assert!(!document.insert_parent(&parent).unwrap());
    }

    #[test]
    fn test_add_dependency_ignores_dependency_management() {
        let mut document = doc(LEAF_POM);
        let dependency = Dependency::new(Some("com.acme".to_string()), "billing-api");
        assert!(document.add_dependency(&dependency).unwrap());
        let model = document.model().unwrap();
        assert_eq!(model.dependencies.len(), 1);
        assert_eq!(model.dependencies[0].artifact_id, "billing-api");
        assert!(!document.add_dependency(&dependency).unwrap());
    }

    #[test]
    fn test_remove_dependency_and_scope() {
        let source = r#"<project>
    <artifactId>billing-api</artifactId>
    <dependencies>
        <dependency>
            <artifactId>billing-core</artifactId>
        </dependency>
        <dependency>
            <artifactId>junit-jupiter</artifactId>
            <version>5.10.0</version>
        </dependency>
    </dependencies>
</project>
"#;
        let mut document = doc(source);
        assert!(document.remove_dependency("billing-core").unwrap());
        assert!(!document.remove_dependency("billing-core").unwrap());
        assert!(document.set_dependency_scope("junit-jupiter", "test").unwrap());
        assert!(!document.set_dependency_scope("junit-jupiter", "test").unwrap());

        let model = document.model().unwrap();
        assert_eq!(model.dependencies.len(), 1);
        assert_eq!(model.dependencies[0].effective_scope(), "test");
        assert!(document.as_str().contains("<version>5.10.0</version>\n            <scope>test</scope>"));
    }

    #[test]
    fn test_set_packaging() {
        let mut document = doc(LEAF_POM);
        assert!(document.set_packaging("pom").unwrap());
        assert_eq!(document.model().unwrap().packaging, "pom");
        assert!(!document.set_packaging("pom").unwrap());
    }

    #[test]
    fn test_new_module_round_trips() {
        let parent = ParentRef {
            group_id: Some("com.acme".to_string()),
            artifact_id: "billing-parent".to_string(),
            version: Some("1.0.0".to_string()),
            relative_path: None,
        };
        let deps = vec![Dependency::new(Some("com.acme".to_string()), "billing-api")];
        let text = DescriptorDocument::new_module(&parent, "billing-core", &deps);
        let model = ModuleDescriptor::parse(&text, Path::new("pom.xml")).unwrap();
        assert_eq!(model.artifact_id, "billing-core");
        assert_eq!(model.effective_group_id(), Some("com.acme"));
        assert_eq!(model.dependencies.len(), 1);
    }
}
