//! Lightweight summaries of Java source files.
//!
//! Only what the class-pattern, vendor and slice rules need is extracted:
//! the package, the imports and each type declaration with its kind,
//! annotations and supertypes. Comments and string literals are blanked out
//! first (byte offsets are kept) so that commented-out code never counts.

use crate::error::{StratumError, StratumResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

static PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("package regex is valid"));

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;").expect("import regex is valid")
});

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:@[\w.]+(?:\([^)]*\))?\s+)*)((?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*)(@interface|class|interface|enum|record)\s+(\w+)",
    )
    .expect("declaration regex is valid")
});

static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([\w.]+)").expect("annotation regex is valid"));

static SUPERTYPES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(extends|implements)\s+(.+?)(?:\bextends\b|\bimplements\b|\bpermits\b|$)")
        .expect("supertype regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDeclaration {
    pub name: String,
    pub kind: TypeKind,
    /// Simple names, e.g. `Service` for `@org.springframework.stereotype.Service`.
    pub annotations: Vec<String>,
    /// Simple names without type arguments.
    pub supertypes: Vec<String>,
    /// 1-based line of the declaration keyword.
    pub line: usize,
    /// Byte offset of the start of the line holding the first modifier or keyword.
    pub declaration_offset: usize,
}

impl TypeDeclaration {
    pub fn has_annotation(&self, name: &str) -> bool {
        let simple = name.rsplit('.').next().unwrap_or(name);
        self.annotations.iter().any(|a| a == simple)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<String>,
    pub types: Vec<TypeDeclaration>,
}

impl SourceFile {
    pub fn load(path: &Path) -> StratumResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StratumError::scan(path, e.to_string()))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> StratumResult<Self> {
        if content.contains('\0') {
            return Err(StratumError::scan(path, "binary content"));
        }

        let code = blank_comments_and_literals(content);

        let package = PACKAGE.captures(&code).map(|c| c[1].to_string());
        let imports = IMPORT.captures_iter(&code).map(|c| c[1].to_string()).collect();

        let mut types = Vec::new();
        for caps in DECLARATION.captures_iter(&code) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let keyword = &caps[3];
            let name_end = caps.get(4).map(|m| m.end()).unwrap_or(whole.end);

            let kind = match keyword {
                "class" => TypeKind::Class,
                "interface" => TypeKind::Interface,
                "enum" => TypeKind::Enum,
                "record" => TypeKind::Record,
                _ => TypeKind::Annotation,
            };

            let annotations = ANNOTATION
                .captures_iter(caps.get(1).map(|m| m.as_str()).unwrap_or(""))
                .map(|a| simple_name(&a[1]))
                .collect();

            // the line holding the first modifier or the keyword itself
            let modifiers_start = caps
                .get(2)
                .filter(|m| !m.as_str().is_empty())
                .or_else(|| caps.get(3))
                .map(|m| m.start())
                .unwrap_or(whole.start);
            let declaration_offset = code[..modifiers_start].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let keyword_start = caps.get(3).map(|m| m.start()).unwrap_or(whole.start);

            types.push(TypeDeclaration {
                name: caps[4].to_string(),
                kind,
                annotations,
                supertypes: parse_supertypes(header(&code, name_end)),
                line: code[..keyword_start].matches('\n').count() + 1,
                declaration_offset,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            package,
            imports,
            types,
        })
    }

    pub fn imports_type(&self, qualified: &str) -> bool {
        let package = qualified.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        self.imports
            .iter()
            .any(|i| i == qualified || (i.ends_with(".*") && &i[..i.len() - 2] == package))
    }
}

/// Text between the type name and the opening brace (or record components).
fn header(code: &str, from: usize) -> &str {
    let rest = &code[from..];
    let end = rest.find('{').unwrap_or(rest.len());
    &rest[..end]
}

fn parse_supertypes(header: &str) -> Vec<String> {
    let flattened = strip_angle_brackets(&strip_parentheses(header)).replace('\n', " ");
    let mut supertypes = Vec::new();
    let mut remaining = flattened.as_str();

    while let Some(caps) = SUPERTYPES.captures(remaining) {
        let list = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        supertypes.extend(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(simple_name),
        );
        let consumed = caps.get(2).map(|m| m.end()).unwrap_or(remaining.len());
        if consumed >= remaining.len() {
            break;
        }
        remaining = &remaining[consumed..];
    }
    supertypes
}

fn simple_name(qualified: &str) -> String {
    qualified.trim().rsplit('.').next().unwrap_or(qualified).to_string()
}

fn strip_angle_brackets(text: &str) -> String {
    let mut depth = 0usize;
    text.chars()
        .filter(|c| match c {
            '<' => {
                depth += 1;
                false
            }
            '>' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect()
}

fn strip_parentheses(text: &str) -> String {
    let mut depth = 0usize;
    text.chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect()
}

/// Replaces comments and string/char literals with spaces, keeping newlines
/// and byte offsets intact.
fn blank_comments_and_literals(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    let mut blank = |out: &mut Vec<u8>, from: usize, to: usize| {
        for b in &mut out[from..to] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = content[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
                blank(&mut out, i, end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = content[i + 2..].find("*/").map(|n| i + 2 + n + 2).unwrap_or(bytes.len());
                blank(&mut out, i, end);
                i = end;
            }
            b'"' if content[i..].starts_with("\"\"\"") => {
                let end = content[i + 3..].find("\"\"\"").map(|n| i + 3 + n + 3).unwrap_or(bytes.len());
                blank(&mut out, i + 1, end.saturating_sub(1).max(i + 1));
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j] != quote && bytes[j] != b'\n' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let end = (j + 1).min(bytes.len());
                blank(&mut out, i + 1, end.saturating_sub(1).max(i + 1));
                i = end;
            }
            _ => i += 1,
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE: &str = r#"package com.acme.billing.core;

import com.acme.billing.api.InvoiceService;
import java.util.*;
import static java.util.Objects.requireNonNull;

/**
 * Implementation. class Fake {}
 */
@Service
@Transactional(readOnly = true)
public class InvoiceServiceImpl extends AbstractService<Invoice> implements InvoiceService, java.io.Serializable {
    private final String note = "interface Hidden {}";
}
"#;

    #[test]
    fn test_parse_package_and_imports() {
        let file = SourceFile::parse(Path::new("InvoiceServiceImpl.java"), SERVICE).unwrap();
        assert_eq!(file.package.as_deref(), Some("com.acme.billing.core"));
        assert_eq!(
            file.imports,
            vec!["com.acme.billing.api.InvoiceService", "java.util.*", "java.util.Objects.requireNonNull"]
        );
        assert!(file.imports_type("java.util.List"));
        assert!(!file.imports_type("java.io.File"));
    }

    #[test]
    fn test_parse_type_declaration() {
        let file = SourceFile::parse(Path::new("InvoiceServiceImpl.java"), SERVICE).unwrap();
        assert_eq!(file.types.len(), 1);
        let decl = &file.types[0];
        assert_eq!(decl.name, "InvoiceServiceImpl");
        assert_eq!(decl.kind, TypeKind::Class);
        assert_eq!(decl.annotations, vec!["Service", "Transactional"]);
        assert_eq!(decl.supertypes, vec!["AbstractService", "InvoiceService", "Serializable"]);
        assert!(decl.has_annotation("org.springframework.stereotype.Service"));
        assert_eq!(decl.line, 12);
    }

    #[test]
    fn test_declaration_offset_points_at_modifier_line() {
        let file = SourceFile::parse(Path::new("InvoiceServiceImpl.java"), SERVICE).unwrap();
        let offset = file.types[0].declaration_offset;
        assert!(SERVICE[offset..].starts_with("public class InvoiceServiceImpl"));
    }

    #[test]
    fn test_records_enums_and_interfaces() {
        let source = r#"package com.acme.billing.api;

public record InvoiceDto(String id, java.util.List<String> lines) implements Comparable<InvoiceDto> {}

enum Status { OPEN, CLOSED }

public sealed interface Payment extends Comparable<Payment> permits Card, Cash {}
"#;
        let file = SourceFile::parse(Path::new("Types.java"), source).unwrap();
        let kinds: Vec<TypeKind> = file.types.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TypeKind::Record, TypeKind::Enum, TypeKind::Interface]);
        assert_eq!(file.types[0].supertypes, vec!["Comparable"]);
        assert_eq!(file.types[2].supertypes, vec!["Comparable"]);
    }

    #[test]
    fn test_binary_content_is_a_scan_error() {
        let result = SourceFile::parse(Path::new("Bad.java"), "class A {}\0");
        assert!(matches!(result, Err(StratumError::Scan { .. })));
    }
}
