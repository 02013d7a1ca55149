use super::{criteria, has_wildcard, load_descriptor, parent_ref_for, placeholders, wrong_criteria};
use crate::fixer::{FileEdit, FixContext, FixPlan, Fixer};
use stratum_core::model::descriptor_children;
use stratum_core::{
    pattern, Dependency, DescriptorCriteria, DescriptorDocument, DetectionCriteria, Layer, StratumResult, Violation,
};

/// Creates a missing sibling layer module and lists it in the grouping module.
pub struct MissingModuleFixer;

impl Fixer for MissingModuleFixer {
    fn name(&self) -> &str {
        "MissingModuleFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["MS-010", "MS-011"]
    }

    fn priority(&self) -> u32 {
        100
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let required = match criteria(ctx)? {
            DetectionCriteria::Dependency(c) if !c.sibling_requirements.is_empty() => {
                placeholders(violation, ctx).substitute_all(&c.sibling_requirements)
            }
            _ => return Err(wrong_criteria(ctx, "dependency with siblingRequirements")),
        };
        if let Some(wildcard) = required.iter().find(|r| has_wildcard(r)) {
            return Ok(FixPlan::NotFixable(format!(
                "cannot derive a module name from pattern '{}'; {}",
                wildcard, ctx.rule.fix_hint
            )));
        }

        let group = &ctx.module_root;
        let parent = parent_ref_for(group, ctx)?;
        let mut document = load_descriptor(group, ctx)?;
        let mut edits = Vec::new();

        for name in &required {
            let dir = group.join(name);
            let descriptor = dir.join(&ctx.config.descriptor_file);

            if !descriptor.exists() {
                // an implementation module starts out depending on the contract it implements
                let dependencies = match Layer::from_artifact_id(name) {
                    Some(Layer::Core) => vec![Dependency {
                        version: Some("${project.version}".to_string()),
                        ..Dependency::new(parent.group_id.clone(), violation.target.as_str())
                    }],
                    _ => Vec::new(),
                };
                edits.push(FileEdit::write(
                    &descriptor,
                    DescriptorDocument::new_module(&parent, name, &dependencies),
                ));
                if let Some(source_root) = ctx.config.source_roots.first() {
                    edits.push(FileEdit::CreateDir(dir.join(source_root)));
                }
            }

            document.append_module(name)?;
        }

        edits.push(FileEdit::write(ctx.descriptor_path(), document.into_string()));
        Ok(FixPlan::Edits {
            description: format!("create module {} and list it in {}", required.join(", "), parent.artifact_id),
            edits,
        })
    }
}

fn descriptor_criteria<'a>(ctx: &'a FixContext) -> StratumResult<&'a DescriptorCriteria> {
    match criteria(ctx)? {
        DetectionCriteria::Descriptor(c) => Ok(c),
        _ => Err(wrong_criteria(ctx, "pom")),
    }
}

/// Appends every unlisted child module to `<modules>`.
pub struct ModuleListFixer;

impl Fixer for ModuleListFixer {
    fn name(&self) -> &str {
        "ModuleListFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["MS-020"]
    }

    fn priority(&self) -> u32 {
        90
    }

    fn plan(&self, _violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        if !descriptor_criteria(ctx)?.all_submodules_listed {
            return Err(wrong_criteria(ctx, "pom with allSubmodulesListed"));
        }

        let mut document = load_descriptor(&ctx.module_root, ctx)?;
        let mut added = Vec::new();
        for child in descriptor_children(&ctx.module_root, ctx.config) {
            if document.append_module(&child)? {
                added.push(child);
            }
        }

        Ok(FixPlan::Edits {
            description: format!("list {} in <modules>", pattern::cap_list(&added)),
            edits: vec![FileEdit::write(ctx.descriptor_path(), document.into_string())],
        })
    }
}

/// Sets `<packaging>` to the value the rule requires.
pub struct PackagingFixer;

impl Fixer for PackagingFixer {
    fn name(&self) -> &str {
        "PackagingFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["MS-023"]
    }

    fn priority(&self) -> u32 {
        85
    }

    fn plan(&self, _violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let packaging = descriptor_criteria(ctx)?
            .packaging
            .clone()
            .ok_or_else(|| wrong_criteria(ctx, "pom with packaging"))?;

        let mut document = load_descriptor(&ctx.module_root, ctx)?;
        document.set_packaging(&packaging)?;

        Ok(FixPlan::Edits {
            description: format!("set packaging to {}", packaging),
            edits: vec![FileEdit::write(ctx.descriptor_path(), document.into_string())],
        })
    }
}

/// Moves the module the rule wants first to the top of `<modules>`.
pub struct ModuleOrderFixer;

impl Fixer for ModuleOrderFixer {
    fn name(&self) -> &str {
        "ModuleOrderFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["MS-021"]
    }

    fn priority(&self) -> u32 {
        80
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let first = descriptor_criteria(ctx)?
            .module_order
            .first()
            .map(|p| placeholders(violation, ctx).substitute(p))
            .ok_or_else(|| wrong_criteria(ctx, "pom with moduleOrder"))?;

        let mut document = load_descriptor(&ctx.module_root, ctx)?;
        let modules = document.model()?.modules;
        let matching: Vec<&String> = modules.iter().filter(|m| pattern::matches(m, &first)).collect();

        let name = match matching.as_slice() {
            [] => return Ok(FixPlan::Edits { description: "nothing to reorder".to_string(), edits: Vec::new() }),
            [only] => only.to_string(),
            several => {
                return Ok(FixPlan::NotFixable(format!(
                    "{} modules match {} ({}); reorder <modules> by hand",
                    several.len(),
                    first,
                    pattern::cap_list(several)
                )))
            }
        };

        document.move_module_first(&name)?;
        Ok(FixPlan::Edits {
            description: format!("declare {} first", name),
            edits: vec![FileEdit::write(ctx.descriptor_path(), document.into_string())],
        })
    }
}
