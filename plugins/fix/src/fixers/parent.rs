use super::{criteria, load_descriptor, parent_ref_for, wrong_criteria};
use crate::fixer::{FileEdit, FixContext, FixPlan, Fixer};
use stratum_core::{DetectionCriteria, StratumResult, Violation};

/// Points a layer module without `<parent>` at its grouping module.
pub struct ParentReferenceFixer;

impl Fixer for ParentReferenceFixer {
    fn name(&self) -> &str {
        "ParentReferenceFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["MS-030", "MS-031"]
    }

    fn priority(&self) -> u32 {
        70
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        match criteria(ctx)? {
            DetectionCriteria::Descriptor(c) if c.requires_parent => {}
            _ => return Err(wrong_criteria(ctx, "pom with requiresParent")),
        }

        let group = match ctx.module_root.parent() {
            Some(dir) if dir.join(&ctx.config.descriptor_file).is_file() => dir,
            _ => {
                return Ok(FixPlan::NotFixable(format!(
                    "{} has no enclosing module to use as parent; {}",
                    violation.target, ctx.rule.fix_hint
                )))
            }
        };

        let parent = parent_ref_for(group, ctx)?;
        let mut document = load_descriptor(&ctx.module_root, ctx)?;
        document.insert_parent(&parent)?;

        Ok(FixPlan::Edits {
            description: format!("set parent of {} to {}", violation.target, parent.artifact_id),
            edits: vec![FileEdit::write(ctx.descriptor_path(), document.into_string())],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use stratum_core::{Severity, ValidatorConfig};
    use tempfile::tempdir;

    #[test]
    fn test_parent_block_is_inserted() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><groupId>com.acme</groupId><artifactId>foo-parent</artifactId><version>1.0</version><packaging>pom</packaging></project>",
        )
        .unwrap();
        let core = dir.path().join("foo-core");
        fs::create_dir(&core).unwrap();
        fs::write(
            core.join("pom.xml"),
            "<project>\n    <modelVersion>4.0.0</modelVersion>\n    <artifactId>foo-core</artifactId>\n</project>\n",
        )
        .unwrap();

        let catalog = stratum_rules::catalog::standard().unwrap();
        let config = ValidatorConfig::default();
        let v = Violation::new("MS-030", Severity::Error, "foo-core", &core);
        let ctx = FixContext::new(dir.path(), &v, true, &config, catalog.require("MS-030").unwrap());

        match ParentReferenceFixer.plan(&v, &ctx).unwrap() {
            FixPlan::Edits { edits, .. } => match &edits[0] {
                FileEdit::Write { content, .. } => assert_eq!(
                    content,
                    "<project>\n    <modelVersion>4.0.0</modelVersion>\n    <parent>\n        <groupId>com.acme</groupId>\n        <artifactId>foo-parent</artifactId>\n        <version>1.0</version>\n    </parent>\n    <artifactId>foo-core</artifactId>\n</project>\n"
                ),
                other => panic!("unexpected edit {:?}", other),
            },
            FixPlan::NotFixable(remedy) => panic!("not fixable: {}", remedy),
        }
    }
}
