use std::path::{Path, PathBuf};
use stratum_core::model::descriptor_children;
use stratum_core::pattern::{self, cap_list, PlaceholderContext};
use stratum_core::{
    ClassPatternCriteria, Condition, DependencyCriteria, DescriptorCriteria, DetectionCriteria, Layer,
    ModuleDescriptor, NamingCriteria, NamingTarget, RuleCatalog, RuleDefinition, SourceFile, StructuralModel,
    TypeDeclaration, ValidatorConfig, VendorCriteria, Verdict, Violation,
};
use tracing::debug;

/// What a rule is evaluated against: the module itself or one of its layer submodules.
struct Subject<'a> {
    artifact_id: &'a str,
    directory: String,
    path: &'a Path,
    descriptor: &'a ModuleDescriptor,
    sources: Vec<&'a SourceFile>,
    source_files: Vec<&'a PathBuf>,
    /// `None` for the module itself.
    layer: Option<Layer>,
    ctx: PlaceholderContext,
}

pub struct RuleEngine {
    catalog: RuleCatalog,
    config: ValidatorConfig,
}

impl RuleEngine {
    pub fn new(catalog: RuleCatalog, config: ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Evaluates every enabled rule, in catalog order.
    pub fn validate(&self, model: &StructuralModel) -> Vec<Violation> {
        self.catalog
            .enabled()
            .filter_map(|rule| self.evaluate(rule, model).into_violation())
            .collect()
    }

    pub fn evaluate(&self, rule: &RuleDefinition, model: &StructuralModel) -> Verdict {
        let verdict = self.dispatch(rule, model);
        if let Verdict::Passed(passed) = &verdict {
            if let Some(reason) = &passed.reason {
                debug!("{} on {}: {}", rule.rule_id, model.artifact_id, reason);
            }
        }
        verdict
    }

    fn dispatch(&self, rule: &RuleDefinition, model: &StructuralModel) -> Verdict {
        if !rule.enabled {
            return Verdict::not_applicable(&rule.rule_id, &model.artifact_id, "rule disabled");
        }

        let criteria = match &rule.detection {
            Some(criteria) => criteria,
            None => return Verdict::passed(&rule.rule_id, &model.artifact_id),
        };

        if !rule.target_modules.is_empty() {
            let patterns = model.placeholders(&self.config).substitute_all(&rule.target_modules);
            if !pattern::matches_any(&model.artifact_id, &patterns) {
                return Verdict::not_applicable(
                    &rule.rule_id,
                    &model.artifact_id,
                    format!("{} is not a targeted module", model.artifact_id),
                );
            }
        }

        if let DetectionCriteria::Dependency(c) = criteria {
            if let Some(condition) = c.condition {
                if !condition_holds(condition, model) {
                    return Verdict::not_applicable(
                        &rule.rule_id,
                        &model.artifact_id,
                        format!("condition {} not met", condition),
                    );
                }
            }
        }

        let subject = match self.resolve_scope(criteria.scope(), model) {
            Some(subject) => subject,
            None => {
                let layer = criteria.scope().map(|l| l.name()).unwrap_or("module");
                return Verdict::not_applicable(
                    &rule.rule_id,
                    &model.artifact_id,
                    format!("no {} submodule", layer),
                );
            }
        };

        match criteria {
            DetectionCriteria::Dependency(c) => self.check_dependency(rule, c, model, &subject),
            DetectionCriteria::Vendor(c) => self.check_vendor(rule, c, &subject),
            DetectionCriteria::ClassPattern(c) => self.check_class_pattern(rule, c, &subject),
            DetectionCriteria::Descriptor(c) => self.check_descriptor(rule, c, model, &subject),
            DetectionCriteria::Naming(c) => self.check_naming(rule, c, &subject),
        }
    }

    fn resolve_scope<'a>(&self, scope: Option<Layer>, model: &'a StructuralModel) -> Option<Subject<'a>> {
        match scope {
            None => Some(Subject {
                artifact_id: &model.artifact_id,
                directory: dir_name(&model.base_path),
                path: &model.base_path,
                descriptor: &model.descriptor,
                sources: model.sources.iter().collect(),
                source_files: model.source_files.iter().collect(),
                layer: None,
                ctx: model.placeholders(&self.config),
            }),
            Some(layer) => {
                let sub = model.layer(layer)?;
                Some(Subject {
                    artifact_id: &sub.artifact_id,
                    directory: sub.name.clone(),
                    path: &sub.path,
                    descriptor: &sub.descriptor,
                    sources: sub.sources.iter().collect(),
                    source_files: sub.source_files.iter().collect(),
                    layer: Some(layer),
                    ctx: PlaceholderContext {
                        base: pattern::base_name(&sub.artifact_id, &self.config.grouping_suffixes()),
                        namespace: self.config.namespace.clone(),
                        module: model.artifact_id.clone(),
                    },
                })
            }
        }
    }

    fn violation(&self, rule: &RuleDefinition, subject: &Subject) -> Violation {
        Violation::new(&rule.rule_id, rule.severity, subject.artifact_id, subject.path)
            .reason(&rule.reason)
            .fix(subject.ctx.substitute(&rule.fix_hint))
            .reference(&rule.reference)
    }

    fn check_dependency(
        &self,
        rule: &RuleDefinition,
        c: &DependencyCriteria,
        model: &StructuralModel,
        subject: &Subject,
    ) -> Verdict {
        let descriptor = subject.descriptor;

        if !c.sibling_requirements.is_empty() {
            let missing: Vec<String> = subject
                .ctx
                .substitute_all(&c.sibling_requirements)
                .into_iter()
                .filter(|required| {
                    !model
                        .sub_modules
                        .values()
                        .any(|s| pattern::matches(&s.artifact_id, required) || pattern::matches(&s.name, required))
                })
                .collect();

            if !missing.is_empty() {
                // the fix belongs to the grouping module, not the scoped layer
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .located_at(&model.base_path)
                        .expected(format!("{} alongside {}", cap_list(&missing), subject.artifact_id))
                        .found(format!("{} exists, {} is missing", subject.artifact_id, cap_list(&missing))),
                );
            }
        }

        if !c.must_contain.is_empty() {
            let required = subject.ctx.substitute_all(&c.must_contain);
            let missing: Vec<&String> = required
                .iter()
                .filter(|p| !descriptor.has_dependency_matching(p))
                .collect();

            if !missing.is_empty() {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("dependency on {}", cap_list(&missing)))
                        .found(declared_dependencies(descriptor)),
                );
            }
        }

        if !c.must_not_contain.is_empty() {
            let forbidden = subject.ctx.substitute_all(&c.must_not_contain);
            let exceptions = subject.ctx.substitute_all(&c.exceptions);
            let offending: Vec<&str> = descriptor
                .dependencies
                .iter()
                .map(|d| d.artifact_id.as_str())
                .filter(|a| pattern::matches_any(a, &forbidden) && !pattern::matches_any(a, &exceptions))
                .collect();

            if !offending.is_empty() {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("no dependency matching {}", cap_list(&forbidden)))
                        .found(format!("depends on {}", cap_list(&offending))),
                );
            }
        }

        if let Some(required_scope) = &c.required_scope {
            let selectors = if c.scoped.is_empty() { &c.must_contain } else { &c.scoped };
            let selectors = subject.ctx.substitute_all(selectors);
            let wrong: Vec<String> = descriptor
                .dependencies
                .iter()
                .filter(|d| pattern::matches_any(&d.artifact_id, &selectors))
                .filter(|d| d.effective_scope() != required_scope)
                .map(|d| format!("{} ({})", d.artifact_id, d.effective_scope()))
                .collect();

            if !wrong.is_empty() {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("scope {} for {}", required_scope, cap_list(&selectors)))
                        .found(cap_list(&wrong)),
                );
            }
        }

        Verdict::passed(&rule.rule_id, subject.artifact_id)
    }

    fn check_vendor(&self, rule: &RuleDefinition, c: &VendorCriteria, subject: &Subject) -> Verdict {
        let exceptions = subject.ctx.substitute_all(&c.exceptions);

        let mut candidates: Vec<&str> = vec![subject.artifact_id];
        candidates.extend(subject.descriptor.dependencies.iter().map(|d| d.artifact_id.as_str()));
        for source in &subject.sources {
            if let Some(package) = &source.package {
                candidates.push(package);
            }
            candidates.extend(source.types.iter().map(|t| t.name.as_str()));
        }

        let mut hits: Vec<String> = Vec::new();
        for candidate in candidates {
            if pattern::matches_any(candidate, &exceptions) {
                continue;
            }
            if let Some(vendor) = c.vendors.iter().find(|v| pattern::contains_token(candidate, v)) {
                let hit = format!("{} ({})", candidate, vendor);
                if !hits.contains(&hit) {
                    hits.push(hit);
                }
            }
        }

        if hits.is_empty() {
            return Verdict::passed(&rule.rule_id, subject.artifact_id);
        }

        Verdict::Violated(
            self.violation(rule, subject)
                .expected(format!("no vendor-specific names ({})", cap_list(&c.vendors)))
                .found(cap_list(&hits)),
        )
    }

    fn check_class_pattern(&self, rule: &RuleDefinition, c: &ClassPatternCriteria, subject: &Subject) -> Verdict {
        let selected: Vec<(&SourceFile, &TypeDeclaration)> = subject
            .sources
            .iter()
            .flat_map(|source| source.types.iter().map(move |t| (*source, t)))
            .filter(|(_, t)| c.selects(t))
            .collect();

        if selected.is_empty() {
            return Verdict::passed(&rule.rule_id, subject.artifact_id);
        }

        let (expected, offenders): (String, Vec<&TypeDeclaration>) = if c.forbidden {
            (
                "no matching types".to_string(),
                selected.iter().map(|(_, t)| *t).collect(),
            )
        } else if let Some(suffix) = &c.required_suffix {
            (
                format!("type names ending in {}", suffix),
                selected
                    .iter()
                    .map(|(_, t)| *t)
                    .filter(|t| !t.name.ends_with(suffix.as_str()))
                    .collect(),
            )
        } else if let Some(annotation) = &c.required_annotation {
            (
                format!("@{} on every matching type", annotation),
                selected
                    .iter()
                    .map(|(_, t)| *t)
                    .filter(|t| !t.has_annotation(annotation))
                    .collect(),
            )
        } else {
            return Verdict::passed(&rule.rule_id, subject.artifact_id);
        };

        if offenders.is_empty() {
            return Verdict::passed(&rule.rule_id, subject.artifact_id);
        }

        let names: Vec<&str> = offenders.iter().map(|t| t.name.as_str()).collect();
        Verdict::Violated(
            self.violation(rule, subject)
                .expected(expected)
                .found(format!("{} type(s): {}", offenders.len(), cap_list(&names))),
        )
    }

    fn check_descriptor(
        &self,
        rule: &RuleDefinition,
        c: &DescriptorCriteria,
        model: &StructuralModel,
        subject: &Subject,
    ) -> Verdict {
        let descriptor = subject.descriptor;

        if c.requires_parent && descriptor.parent.is_none() {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected("a <parent> declaration")
                    .found("no parent"),
            );
        }

        if c.requires_no_parent {
            if let Some(parent) = &descriptor.parent {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected("no <parent> declaration")
                        .found(format!("parent {}", parent.artifact_id)),
                );
            }
        }

        if c.no_source_code && !subject.source_files.is_empty() {
            let names: Vec<String> = subject
                .source_files
                .iter()
                .map(|p| relative(p, subject.path))
                .collect();
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected("no source files")
                    .found(format!("{} source file(s): {}", names.len(), cap_list(&names))),
            );
        }

        if c.no_dependencies && !descriptor.dependencies.is_empty() {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected("no declared dependencies")
                    .found(declared_dependencies(descriptor)),
            );
        }

        if c.all_submodules_listed {
            let children = match subject.layer {
                None => model.child_directories.clone(),
                Some(_) => descriptor_children(subject.path, &self.config),
            };
            let unlisted: Vec<&String> = children
                .iter()
                .filter(|child| !descriptor.modules.iter().any(|m| m.trim_end_matches('/') == child.as_str()))
                .collect();

            if !unlisted.is_empty() {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected("every child module listed in <modules>")
                        .found(format!("unlisted: {}", cap_list(&unlisted))),
                );
            }
        }

        if let Some(first) = c.module_order.first() {
            let first = subject.ctx.substitute(first);
            let modules = &descriptor.modules;
            if let Some(matching) = modules.iter().find(|m| pattern::matches(m, &first)) {
                if !pattern::matches(&modules[0], &first) {
                    return Verdict::Violated(
                        self.violation(rule, subject)
                            .expected(format!("{} declared first", matching))
                            .found(format!("module order: {}", cap_list(modules))),
                    );
                }
            }
        }

        if !c.required_suffixes.is_empty() {
            let suffixes = subject.ctx.substitute_all(&c.required_suffixes);
            if !suffixes.iter().any(|s| subject.artifact_id.ends_with(s.as_str())) {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("artifact id ending in {}", cap_list(&suffixes)))
                        .found(subject.artifact_id.to_string()),
                );
            }
        }

        if let Some(packaging) = &c.packaging {
            if &descriptor.packaging != packaging {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("packaging {}", packaging))
                        .found(format!("packaging {}", descriptor.packaging)),
                );
            }
        }

        Verdict::passed(&rule.rule_id, subject.artifact_id)
    }

    fn check_naming(&self, rule: &RuleDefinition, c: &NamingCriteria, subject: &Subject) -> Verdict {
        let candidate = match c.target {
            NamingTarget::ArtifactId => subject.artifact_id.to_string(),
            NamingTarget::Directory => subject.directory.clone(),
            NamingTarget::GroupId => match subject.descriptor.effective_group_id() {
                Some(group) => group.to_string(),
                None => {
                    return Verdict::not_applicable(&rule.rule_id, subject.artifact_id, "no groupId declared")
                }
            },
        };

        let required_prefixes = subject.ctx.substitute_all(&c.required_prefixes);
        if !required_prefixes.is_empty() && !required_prefixes.iter().any(|p| candidate.starts_with(p.as_str())) {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected(format!("starting with {}", cap_list(&required_prefixes)))
                    .found(candidate),
            );
        }

        let required_suffixes = subject.ctx.substitute_all(&c.required_suffixes);
        if !required_suffixes.is_empty() && !required_suffixes.iter().any(|s| candidate.ends_with(s.as_str())) {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected(format!("ending with {}", cap_list(&required_suffixes)))
                    .found(candidate),
            );
        }

        let forbidden_prefixes = subject.ctx.substitute_all(&c.forbidden_prefixes);
        if let Some(prefix) = forbidden_prefixes.iter().find(|p| candidate.starts_with(p.as_str())) {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected(format!("not starting with {}", prefix))
                    .found(candidate),
            );
        }

        let forbidden_suffixes = subject.ctx.substitute_all(&c.forbidden_suffixes);
        if let Some(suffix) = forbidden_suffixes.iter().find(|s| candidate.ends_with(s.as_str())) {
            return Verdict::Violated(
                self.violation(rule, subject)
                    .expected(format!("not ending with {}", suffix))
                    .found(candidate),
            );
        }

        if let Some(must_match) = &c.must_match {
            let expected = subject.ctx.substitute(must_match);
            if !pattern::matches(&candidate, &expected) {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("matching {}", expected))
                        .found(candidate),
                );
            }
        }

        if c.singular {
            let base = pattern::base_name(&candidate, &self.config.grouping_suffixes());
            let last = base.rsplit(|ch: char| ch == '-' || ch == '.').next().unwrap_or(&base);
            if is_plural(last) {
                return Verdict::Violated(
                    self.violation(rule, subject)
                        .expected(format!("a singular name instead of '{}'", last))
                        .found(candidate),
                );
            }
        }

        if let Some(parent_pattern) = &c.parent_must_match {
            let expected = subject.ctx.substitute(parent_pattern);
            match &subject.descriptor.parent {
                Some(parent) if pattern::matches(&parent.artifact_id, &expected) => {}
                Some(parent) => {
                    return Verdict::Violated(
                        self.violation(rule, subject)
                            .expected(format!("parent matching {}", expected))
                            .found(format!("parent {}", parent.artifact_id)),
                    )
                }
                None => {
                    return Verdict::Violated(
                        self.violation(rule, subject)
                            .expected(format!("parent matching {}", expected))
                            .found("no parent"),
                    )
                }
            }
        }

        Verdict::passed(&rule.rule_id, subject.artifact_id)
    }
}

fn condition_holds(condition: Condition, model: &StructuralModel) -> bool {
    match condition {
        Condition::HasLayer(layer) => model.has_layer(layer),
        Condition::LacksLayer(layer) => !model.has_layer(layer),
        Condition::IsParent => model.is_parent,
        Condition::IsNotParent => !model.is_parent,
    }
}

/// Rough English plural test for the last segment of a name.
fn is_plural(word: &str) -> bool {
    let word = word.to_ascii_lowercase();
    if word.len() <= 3 || !word.ends_with('s') {
        return false;
    }
    const SINGULAR_ENDINGS: [&str; 6] = ["ss", "us", "is", "ics", "ous", "sis"];
    !SINGULAR_ENDINGS.iter().any(|ending| word.ends_with(ending))
}

fn declared_dependencies(descriptor: &ModuleDescriptor) -> String {
    if descriptor.dependencies.is_empty() {
        return "no dependencies".to_string();
    }
    let ids: Vec<&str> = descriptor.dependencies.iter().map(|d| d.artifact_id.as_str()).collect();
    format!("dependencies: {}", cap_list(&ids))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::{Dependency, Severity, SubModuleInfo};
    use std::collections::BTreeMap;

    fn descriptor(artifact: &str, deps: &[(&str, Option<&str>)]) -> ModuleDescriptor {
        ModuleDescriptor {
            group_id: Some("com.acme".to_string()),
            artifact_id: artifact.to_string(),
            packaging: "jar".to_string(),
            dependencies: deps
                .iter()
                .map(|(a, scope)| Dependency {
                    scope: scope.map(str::to_string),
                    ..Dependency::new(Some("com.acme".to_string()), *a)
                })
                .collect(),
            ..Default::default()
        }
    }

    fn sub(artifact: &str, deps: &[(&str, Option<&str>)], sources: Vec<SourceFile>) -> SubModuleInfo {
        SubModuleInfo {
            name: artifact.to_string(),
            artifact_id: artifact.to_string(),
            path: PathBuf::from("/p").join(artifact),
            layer: Layer::from_artifact_id(artifact),
            descriptor: descriptor(artifact, deps),
            source_files: sources.iter().map(|s| s.path.clone()).collect(),
            sources,
        }
    }

    fn model(artifact: &str, modules: &[&str], subs: Vec<SubModuleInfo>) -> StructuralModel {
        let mut desc = descriptor(artifact, &[]);
        desc.packaging = "pom".to_string();
        desc.modules = modules.iter().map(|m| m.to_string()).collect();
        let mut sub_modules = BTreeMap::new();
        for s in subs {
            let key = s.layer.map(|l| l.name().to_string()).unwrap_or_else(|| s.name.clone());
            sub_modules.insert(key, s);
        }
        StructuralModel {
            artifact_id: artifact.to_string(),
            group_id: Some("com.acme".to_string()),
            base_path: PathBuf::from("/p"),
            is_parent: true,
            module_order: desc.modules.clone(),
            child_directories: sub_modules.values().map(|s| s.name.clone()).collect(),
            descriptor: desc,
            sub_modules,
            source_files: Vec::new(),
            sources: Vec::new(),
            declared_type: None,
        }
    }

    fn java(name: &str, content: &str) -> SourceFile {
        SourceFile::parse(Path::new(name), content).unwrap()
    }

    fn engine() -> RuleEngine {
        let mut config = ValidatorConfig::default();
        config.namespace = "com.acme".to_string();
        RuleEngine::new(crate::catalog::standard().unwrap(), config)
    }

    fn verdict(engine: &RuleEngine, id: &str, model: &StructuralModel) -> Verdict {
        engine.evaluate(engine.catalog().require(id).unwrap(), model)
    }

    #[test]
    fn test_completeness_violation() {
        let engine = engine();
        let m = model("foo-parent", &["foo-api"], vec![sub("foo-api", &[], vec![])]);
        let violation = verdict(&engine, "MS-010", &m).into_violation().unwrap();
        assert_eq!(violation.severity, Severity::Error);
        assert!(violation.found.contains("foo-api exists"));
        assert!(violation.found.contains("foo-core is missing"));
        assert_eq!(violation.fix, "Create module foo-core and list it in the parent descriptor.");
    }

    #[test]
    fn test_absent_scope_is_not_applicable() {
        let engine = engine();
        let m = model("foo-parent", &["foo-core"], vec![sub("foo-core", &[], vec![])]);
        match verdict(&engine, "MS-010", &m) {
            Verdict::Passed(p) => assert_eq!(p.reason.as_deref(), Some("not applicable: no api submodule")),
            Verdict::Violated(v) => panic!("unexpected violation {}", v),
        }
    }

    #[test]
    fn test_must_contain_and_condition() {
        let engine = engine();
        let m = model(
            "foo-parent",
            &["foo-api", "foo-core"],
            vec![sub("foo-api", &[], vec![]), sub("foo-core", &[], vec![])],
        );
        let violation = verdict(&engine, "DEP-001", &m).into_violation().unwrap();
        assert_eq!(violation.expected, "dependency on foo-api");
        assert_eq!(violation.found, "no dependencies");
        // DEP-004 requires an spi layer
        assert!(!verdict(&engine, "DEP-004", &m).is_violation());

        let m = model(
            "foo-parent",
            &["foo-spi", "foo-api", "foo-core"],
            vec![
                sub("foo-spi", &[], vec![]),
                sub("foo-api", &[], vec![]),
                sub("foo-core", &[("foo-api", None)], vec![]),
            ],
        );
        assert!(!verdict(&engine, "DEP-001", &m).is_violation());
        assert!(verdict(&engine, "DEP-004", &m).is_violation());
    }

    #[test]
    fn test_must_not_contain_and_required_scope() {
        let engine = engine();
        let m = model(
            "foo-parent",
            &["foo-api", "foo-core"],
            vec![
                sub("foo-api", &[("bar-core", None)], vec![]),
                sub("foo-core", &[("foo-api", None), ("junit-jupiter", None), ("mockito-core", Some("test"))], vec![]),
            ],
        );
        let violation = verdict(&engine, "DEP-002", &m).into_violation().unwrap();
        assert_eq!(violation.found, "depends on bar-core");

        let violation = verdict(&engine, "DEP-005", &m).into_violation().unwrap();
        assert_eq!(violation.found, "junit-jupiter (compile)");
    }

    #[test]
    fn test_target_modules_filter() {
        let engine = engine();
        let mut m = model("foo", &[], vec![]);
        m.source_files = vec![PathBuf::from("/p/src/main/java/A.java")];
        assert!(!verdict(&engine, "MS-022", &m).is_violation());

        m.artifact_id = "foo-parent".to_string();
        let violation = verdict(&engine, "MS-022", &m).into_violation().unwrap();
        assert_eq!(violation.found, "1 source file(s): src/main/java/A.java");
    }

    #[test]
    fn test_module_order_checks_only_first_position() {
        let engine = engine();
        let m = model("foo-parent", &["foo-api", "foo-common"], vec![]);
        let violation = verdict(&engine, "MS-021", &m).into_violation().unwrap();
        assert_eq!(violation.expected, "foo-common declared first");

        let m = model("foo-parent", &["foo-common", "foo-core", "foo-api"], vec![]);
        assert!(!verdict(&engine, "MS-021", &m).is_violation());

        let m = model("foo-parent", &["foo-api", "foo-core"], vec![]);
        assert!(!verdict(&engine, "MS-021", &m).is_violation());
    }

    #[test]
    fn test_unlisted_submodule() {
        let engine = engine();
        let m = model(
            "foo-parent",
            &["foo-api"],
            vec![sub("foo-api", &[], vec![]), sub("foo-core", &[], vec![])],
        );
        let violation = verdict(&engine, "MS-020", &m).into_violation().unwrap();
        assert_eq!(violation.found, "unlisted: foo-core");
    }

    #[test]
    fn test_vendor_tokens() {
        let engine = engine();
        let source = java(
            "S3Gateway.java",
            "package com.acme.foo.api;\npublic interface AwsStorage {}\npublic interface JavascriptEngine {}\n",
        );
        let m = model(
            "foo-parent",
            &["foo-api"],
            vec![sub("foo-api", &[("oracle-bom", None)], vec![source])],
        );
        let violation = verdict(&engine, "VEN-001", &m).into_violation().unwrap();
        assert_eq!(violation.found, "AwsStorage (aws)");
    }

    #[test]
    fn test_class_patterns() {
        let engine = engine();
        let api = java(
            "Api.java",
            "package com.acme.foo.api;\n@Service\npublic class Registry {}\npublic record Invoice(String id) {}\n",
        );
        let core = java(
            "Core.java",
            "package com.acme.foo.core;\npublic class InvoiceHandler implements InvoiceService {}\npublic class InvoiceServiceImpl implements InvoiceService {}\n",
        );
        let spi = java(
            "Spi.java",
            "package com.acme.foo.spi;\n@ExtensionPoint\npublic interface Exporter {}\npublic interface Importer {}\n",
        );
        let m = model(
            "foo-parent",
            &[],
            vec![
                sub("foo-api", &[], vec![api]),
                sub("foo-core", &[], vec![core]),
                sub("foo-spi", &[], vec![spi]),
            ],
        );

        assert_eq!(verdict(&engine, "CLS-001", &m).into_violation().unwrap().found, "1 type(s): Registry");
        assert_eq!(verdict(&engine, "CLS-002", &m).into_violation().unwrap().found, "1 type(s): InvoiceHandler");
        assert_eq!(verdict(&engine, "CLS-003", &m).into_violation().unwrap().found, "1 type(s): Importer");
        assert_eq!(verdict(&engine, "CLS-004", &m).into_violation().unwrap().found, "1 type(s): Invoice");
    }

    #[test]
    fn test_naming_rules() {
        let engine = engine();
        let mut m = model("orders-impl", &[], vec![]);
        m.base_path = PathBuf::from("/p/orders");
        assert_eq!(verdict(&engine, "NAM-001", &m).into_violation().unwrap().expected, "not ending with -impl");
        assert!(verdict(&engine, "NAM-003", &m).is_violation());
        assert!(!verdict(&engine, "NAM-002", &m).is_violation());

        m.descriptor.group_id = Some("org.other".to_string());
        let violation = verdict(&engine, "NAM-002", &m).into_violation().unwrap();
        assert_eq!(violation.expected, "starting with com.acme");

        m.base_path = PathBuf::from("/p/address");
        assert!(!verdict(&engine, "NAM-003", &m).is_violation());
    }

    #[test]
    fn test_parent_placement() {
        let engine = engine();
        let mut api = sub("foo-api", &[], vec![]);
        api.descriptor.parent = Some(stratum_core::ParentRef {
            artifact_id: "bar-parent".to_string(),
            ..Default::default()
        });
        let m = model("foo-parent", &[], vec![api]);
        let violation = verdict(&engine, "NAM-004", &m).into_violation().unwrap();
        assert_eq!(violation.found, "parent bar-parent");
    }

    #[test]
    fn test_validate_follows_catalog_order() {
        let engine = engine();
        let m = model("foo-parent", &["foo-api"], vec![sub("foo-api", &[("foo-core", None)], vec![])]);
        let ids: Vec<String> = engine.validate(&m).into_iter().map(|v| v.rule_id).collect();
        assert_eq!(ids, vec!["MS-010", "MS-031", "DEP-002", "NAM-004"]);
    }

    #[test]
    fn test_is_plural() {
        assert!(is_plural("orders"));
        assert!(!is_plural("address"));
        assert!(!is_plural("status"));
        assert!(!is_plural("api"));
        assert!(!is_plural("analysis"));
    }
}
