//! Built-in fixers. Each one is driven by the detection criteria of the rule
//! it repairs and re-reads the project from disk before planning.

mod annotation;
mod dependency;
mod manual;
mod modules;
mod parent;

pub use annotation::AnnotationFixer;
pub use dependency::DependencyFixer;
pub use manual::ManualRemedyFixer;
pub use modules::{MissingModuleFixer, ModuleListFixer, ModuleOrderFixer, PackagingFixer};
pub use parent::ParentReferenceFixer;

use crate::fixer::{FixContext, Fixer};
use std::path::Path;
use stratum_core::{
    pattern, DescriptorDocument, DetectionCriteria, ParentRef, PlaceholderContext, StratumError, StratumResult,
    Violation,
};

/// Every built-in fixer, highest priority first.
pub fn builtin() -> Vec<Box<dyn Fixer>> {
    vec![
        Box::new(MissingModuleFixer),
        Box::new(ModuleListFixer),
        Box::new(PackagingFixer),
        Box::new(ModuleOrderFixer),
        Box::new(ParentReferenceFixer),
        Box::new(DependencyFixer),
        Box::new(AnnotationFixer),
        Box::new(ManualRemedyFixer),
    ]
}

/// Placeholder values for the violation's subject, as the engine derived them.
/// Scoped rules report against a submodule, but `{module}` names the grouping
/// module that owns it.
fn placeholders(violation: &Violation, ctx: &FixContext) -> PlaceholderContext {
    let scoped = ctx.rule.detection.as_ref().and_then(DetectionCriteria::scope).is_some();
    let module = if scoped {
        grouping_artifact_id(violation, ctx).unwrap_or_else(|| violation.target.clone())
    } else {
        violation.target.clone()
    };

    PlaceholderContext {
        base: pattern::base_name(&violation.target, &ctx.config.grouping_suffixes()),
        namespace: ctx.config.namespace.clone(),
        module,
    }
}

fn grouping_artifact_id(violation: &Violation, ctx: &FixContext) -> Option<String> {
    let artifact_of = |dir: &Path| load_descriptor(dir, ctx).and_then(|d| d.model()).ok().map(|m| m.artifact_id);

    match artifact_of(&ctx.module_root) {
        Some(id) if id != violation.target => Some(id),
        _ => ctx.module_root.parent().and_then(artifact_of),
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

fn criteria<'a>(ctx: &'a FixContext) -> StratumResult<&'a DetectionCriteria> {
    ctx.rule
        .detection
        .as_ref()
        .ok_or_else(|| StratumError::Fix(format!("rule {} has no detection criteria", ctx.rule.rule_id)))
}

fn wrong_criteria(ctx: &FixContext, expected: &str) -> StratumError {
    StratumError::Fix(format!(
        "rule {} uses {} detection, expected {}",
        ctx.rule.rule_id,
        ctx.rule.detection.as_ref().map(|d| d.kind()).unwrap_or("no"),
        expected
    ))
}

fn load_descriptor(dir: &Path, ctx: &FixContext) -> StratumResult<DescriptorDocument> {
    DescriptorDocument::load(&dir.join(&ctx.config.descriptor_file))
}

/// Parent reference pointing at the module whose descriptor lives in `dir`.
fn parent_ref_for(dir: &Path, ctx: &FixContext) -> StratumResult<ParentRef> {
    let parent = load_descriptor(dir, ctx)?.model()?;
    Ok(ParentRef {
        group_id: parent.effective_group_id().map(str::to_string),
        version: parent.effective_version().map(str::to_string),
        artifact_id: parent.artifact_id,
        relative_path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stratum_core::{Severity, ValidatorConfig};
    use tempfile::tempdir;

    fn pom(artifact_id: &str) -> String {
        format!("<project>\n    <groupId>com.acme</groupId>\n    <artifactId>{}</artifactId>\n</project>\n", artifact_id)
    }

    #[test]
    fn test_module_placeholder_names_the_grouping_module() {
        let dir = tempdir().unwrap();
        let core = dir.path().join("billing-core");
        fs::create_dir_all(&core).unwrap();
        fs::write(dir.path().join("pom.xml"), pom("billing-parent")).unwrap();
        fs::write(core.join("pom.xml"), pom("billing-core")).unwrap();

        let catalog = stratum_rules::catalog::standard().unwrap();
        let config = ValidatorConfig::default();

        let scoped = Violation::new("DEP-001", Severity::Error, "billing-core", &core);
        let ctx = FixContext::new(dir.path(), &scoped, true, &config, catalog.require("DEP-001").unwrap());
        assert_eq!(placeholders(&scoped, &ctx).module, "billing-parent");

        let unscoped = Violation::new("MS-020", Severity::Error, "billing-parent", dir.path());
        let ctx = FixContext::new(dir.path(), &unscoped, true, &config, catalog.require("MS-020").unwrap());
        assert_eq!(placeholders(&unscoped, &ctx).module, "billing-parent");
    }

    #[test]
    fn test_module_placeholder_falls_back_to_target() {
        let dir = tempdir().unwrap();
        let core = dir.path().join("billing/billing-core");
        fs::create_dir_all(&core).unwrap();
        let catalog = stratum_rules::catalog::standard().unwrap();
        let config = ValidatorConfig::default();

        let v = Violation::new("DEP-001", Severity::Error, "billing-core", &core);
        let ctx = FixContext::new(dir.path(), &v, true, &config, catalog.require("DEP-001").unwrap());
        assert_eq!(placeholders(&v, &ctx).module, "billing-core");
    }
}
