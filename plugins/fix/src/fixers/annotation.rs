use super::{criteria, has_wildcard, placeholders, wrong_criteria};
use crate::fixer::{FileEdit, FixContext, FixPlan, Fixer};
use std::fs;
use std::path::{Path, PathBuf};
use stratum_core::{ClassPatternCriteria, DetectionCriteria, SourceFile, StratumResult, Violation};
use tracing::warn;
use walkdir::WalkDir;

/// Adds the annotation a class-pattern rule requires, plus its import.
pub struct AnnotationFixer;

impl Fixer for AnnotationFixer {
    fn name(&self) -> &str {
        "AnnotationFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        &["CLS-003"]
    }

    fn priority(&self) -> u32 {
        50
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let c = match criteria(ctx)? {
            DetectionCriteria::ClassPattern(c) if c.required_annotation.is_some() => c,
            _ => return Err(wrong_criteria(ctx, "class with requiredAnnotation")),
        };
        let annotation = c.required_annotation.as_deref().unwrap_or_default();
        let import = c.annotation_import.as_ref().map(|i| placeholders(violation, ctx).substitute(i));
        if let Some(import) = import.as_deref().filter(|i| has_wildcard(i)) {
            return Ok(FixPlan::NotFixable(format!(
                "annotation import '{}' is a pattern; {}",
                import, ctx.rule.fix_hint
            )));
        }

        let mut edits = Vec::new();
        let mut annotated = 0;
        for path in java_files(&ctx.module_root, ctx) {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let source = match SourceFile::parse(&path, &content) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if let Some((updated, count)) = annotate(&source, &content, c, annotation, import.as_deref()) {
                annotated += count;
                edits.push(FileEdit::write(path, updated));
            }
        }

        Ok(FixPlan::Edits {
            description: format!("annotate {} type(s) with @{}", annotated, annotation),
            edits,
        })
    }
}

fn java_files(module_root: &Path, ctx: &FixContext) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ctx
        .config
        .source_roots
        .iter()
        .map(|root| module_root.join(root))
        .filter(|root| root.is_dir())
        .flat_map(|root| {
            WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("java"))
                .collect::<Vec<_>>()
        })
        .collect();
    files.sort();
    files
}

/// New file content with the annotation in front of every selected type
/// that lacks it, or `None` when nothing needs to change.
fn annotate(
    source: &SourceFile,
    content: &str,
    criteria: &ClassPatternCriteria,
    annotation: &str,
    import: Option<&str>,
) -> Option<(String, usize)> {
    let mut offsets: Vec<usize> = source
        .types
        .iter()
        .filter(|t| criteria.selects(t) && !t.has_annotation(annotation))
        .map(|t| t.declaration_offset)
        .collect();
    if offsets.is_empty() {
        return None;
    }
    offsets.sort_unstable();

    let nl = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut updated = content.to_string();
    for &offset in offsets.iter().rev() {
        let indent: String = content[offset..].chars().take_while(|c| *c == ' ' || *c == '\t').collect();
        updated.insert_str(offset, &format!("{}@{}{}", indent, annotation, nl));
    }

    if let Some(import) = import {
        let same_package = source.package.as_deref() == import.rsplit_once('.').map(|(p, _)| p);
        if !same_package && !source.imports_type(import) {
            let at = import_position(&updated);
            let line = format!("import {};{}", import, nl);
            if at == 0 {
                updated.insert_str(0, &format!("{}{}", line, nl));
            } else {
                updated.insert_str(at, &line);
            }
        }
    }

    Some((updated, offsets.len()))
}

/// Start of the line after the last import, or after the package line.
fn import_position(content: &str) -> usize {
    let mut position = 0;
    let mut after_package = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        offset += line.len();
        if trimmed.starts_with("import ") {
            position = offset;
        } else if trimmed.starts_with("package ") {
            after_package = Some(offset);
        }
    }

    if position > 0 {
        return position;
    }
    match after_package {
        // keep a blank line between package and imports
        Some(end) if content[end..].starts_with('\n') => end + 1,
        Some(end) if content[end..].starts_with("\r\n") => end + 2,
        Some(end) => end,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::Severity;
    use tempfile::tempdir;

    fn spi_criteria() -> ClassPatternCriteria {
        ClassPatternCriteria {
            interfaces: true,
            required_annotation: Some("ExtensionPoint".to_string()),
            annotation_import: Some("{namespace}.spi.ExtensionPoint".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_annotation_and_import_inserted() {
        let content = "package com.acme.billing.spi;\n\nimport java.util.List;\n\n/** Hook. */\npublic interface InvoiceHook {\n    void before(List<String> lines);\n}\n";
        let source = SourceFile::parse(Path::new("InvoiceHook.java"), content).unwrap();

        let (updated, count) = annotate(
            &source,
            content,
            &spi_criteria(),
            "ExtensionPoint",
            Some("com.acme.spi.ExtensionPoint"),
        )
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            updated,
            "package com.acme.billing.spi;\n\nimport java.util.List;\nimport com.acme.spi.ExtensionPoint;\n\n/** Hook. */\n@ExtensionPoint\npublic interface InvoiceHook {\n    void before(List<String> lines);\n}\n"
        );
    }

    #[test]
    fn test_annotated_interfaces_and_classes_untouched() {
        let content = "package com.acme.spi;\n\n@ExtensionPoint\npublic interface Hook {}\n\nclass Helper {}\n";
        let source = SourceFile::parse(Path::new("Hook.java"), content).unwrap();
        assert!(annotate(&source, content, &spi_criteria(), "ExtensionPoint", None).is_none());
    }

    #[test]
    fn test_plan_walks_source_roots() {
        let dir = tempdir().unwrap();
        let java = dir.path().join("src/main/java/com/acme/spi");
        fs::create_dir_all(&java).unwrap();
        fs::write(java.join("Hook.java"), "package com.acme.spi;\n\npublic interface Hook {}\n").unwrap();

        let catalog = stratum_rules::catalog::standard().unwrap();
        let config = stratum_core::ValidatorConfig {
            namespace: "com.acme".to_string(),
            ..Default::default()
        };
        let v = Violation::new("CLS-003", Severity::Warning, "foo-spi", dir.path());
        let ctx = FixContext::new(dir.path(), &v, true, &config, catalog.require("CLS-003").unwrap());

        match AnnotationFixer.plan(&v, &ctx).unwrap() {
            FixPlan::Edits { edits, .. } => {
                assert_eq!(edits.len(), 1);
                match &edits[0] {
                    // same package as the annotation, so no import
                    FileEdit::Write { content, .. } => {
                        assert_eq!(content, "package com.acme.spi;\n\n@ExtensionPoint\npublic interface Hook {}\n")
                    }
                    other => panic!("unexpected edit {:?}", other),
                }
            }
            FixPlan::NotFixable(remedy) => panic!("not fixable: {}", remedy),
        }
    }
}
