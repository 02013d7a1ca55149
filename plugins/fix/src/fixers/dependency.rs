use super::{criteria, has_wildcard, load_descriptor, placeholders, wrong_criteria};
use crate::fixer::{FileEdit, FixContext, FixPlan, Fixer};
use stratum_core::{pattern, Dependency, DetectionCriteria, StratumResult, Violation};

/// Adds required dependencies, removes forbidden ones and corrects scopes,
/// in that order, exactly as the rule's criteria state them.
pub struct DependencyFixer;

impl Fixer for DependencyFixer {
    fn name(&self) -> &str {
        "DependencyFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["DEP-001", "DEP-002", "DEP-003", "DEP-004", "DEP-005"]
    }

    fn priority(&self) -> u32 {
        60
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let c = match criteria(ctx)? {
            DetectionCriteria::Dependency(c) => c,
            _ => return Err(wrong_criteria(ctx, "dependency")),
        };
        let placeholders = placeholders(violation, ctx);

        let must_contain = placeholders.substitute_all(&c.must_contain);
        if let Some(wildcard) = must_contain.iter().find(|p| has_wildcard(p)) {
            return Ok(FixPlan::NotFixable(format!(
                "cannot choose an artifact for pattern '{}'; {}",
                wildcard, ctx.rule.fix_hint
            )));
        }

        let mut document = load_descriptor(&ctx.module_root, ctx)?;
        let current = document.model()?;
        let mut actions = Vec::new();

        for artifact_id in &must_contain {
            let added = document.add_dependency(&Dependency {
                version: Some("${project.version}".to_string()),
                ..Dependency::new(current.effective_group_id().map(str::to_string), artifact_id.as_str())
            })?;
            if added {
                actions.push(format!("add {}", artifact_id));
            }
        }

        let forbidden = placeholders.substitute_all(&c.must_not_contain);
        let exceptions = placeholders.substitute_all(&c.exceptions);
        for dependency in &current.dependencies {
            let id = dependency.artifact_id.as_str();
            if pattern::matches_any(id, &forbidden) && !pattern::matches_any(id, &exceptions) {
                document.remove_dependency(id)?;
                actions.push(format!("remove {}", id));
            }
        }

        if let Some(scope) = &c.required_scope {
            let selectors = if c.scoped.is_empty() { &c.must_contain } else { &c.scoped };
            let selectors = placeholders.substitute_all(selectors);
            for dependency in &current.dependencies {
                let id = dependency.artifact_id.as_str();
                if pattern::matches_any(id, &selectors) && document.set_dependency_scope(id, scope)? {
                    actions.push(format!("set scope of {} to {}", id, scope));
                }
            }
        }

        Ok(FixPlan::Edits {
            description: if actions.is_empty() {
                "dependencies already as required".to_string()
            } else {
                format!("{}: {}", violation.target, actions.join(", "))
            },
            edits: vec![FileEdit::write(ctx.descriptor_path(), document.into_string())],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use stratum_core::{Severity, ValidatorConfig};
    use tempfile::tempdir;

    const CORE: &str = r#"<project>
    <groupId>com.acme</groupId>
    <artifactId>foo-core</artifactId>
    <dependencies>
        <dependency>
            <groupId>org.junit.jupiter</groupId>
            <artifactId>junit-jupiter</artifactId>
        </dependency>
    </dependencies>
</project>
"#;

    fn plan_for(rule: &str, dir: &Path) -> String {
        let catalog = stratum_rules::catalog::standard().unwrap();
        let config = ValidatorConfig::default();
        let v = Violation::new(rule, Severity::Error, "foo-core", dir);
        let ctx = FixContext::new(dir, &v, true, &config, catalog.require(rule).unwrap());
        match DependencyFixer.plan(&v, &ctx).unwrap() {
            FixPlan::Edits { mut edits, .. } => match edits.remove(0) {
                FileEdit::Write { content, .. } => content,
                other => panic!("unexpected edit {:?}", other),
            },
            FixPlan::NotFixable(remedy) => panic!("not fixable: {}", remedy),
        }
    }

    #[test]
    fn test_missing_api_dependency_is_added() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pom.xml"), CORE).unwrap();

        let content = plan_for("DEP-001", dir.path());
        assert!(content.contains(
            "        </dependency>\n        <dependency>\n            <groupId>com.acme</groupId>\n            <artifactId>foo-api</artifactId>\n            <version>${project.version}</version>\n        </dependency>\n    </dependencies>"
        ));
    }

    #[test]
    fn test_test_scope_is_set() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pom.xml"), CORE).unwrap();

        let content = plan_for("DEP-005", dir.path());
        assert!(content.contains(
            "<artifactId>junit-jupiter</artifactId>\n            <scope>test</scope>\n        </dependency>"
        ));
    }
}
