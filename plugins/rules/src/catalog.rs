//! Rule catalog loading.
//!
//! Catalogs come in two shapes: flat properties (`MS-010.detection.pom.noSourceCode=true`)
//! and YAML. Both are turned into the same intermediate tree and deserialized
//! through the same raw records, so equivalent content yields identical
//! definitions in identical order.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use stratum_core::{
    ClassPatternCriteria, Condition, DependencyCriteria, DescriptorCriteria, DetectionCriteria, Layer,
    NamingCriteria, NamingTarget, RuleCatalog, RuleDefinition, Severity, StratumError, StratumResult,
    ValidatorConfig, VendorCriteria,
};
use tracing::debug;

const STANDARD_CATALOG: &str = include_str!("../catalog/standard.yaml");

/// The built-in catalog shipped with stratum.
pub fn standard() -> StratumResult<RuleCatalog> {
    from_yaml_str(STANDARD_CATALOG)
}

/// Standard catalog, overlaid with the configured external catalog, with
/// disabled rules and severity overrides applied.
pub fn resolve(config: &ValidatorConfig) -> StratumResult<RuleCatalog> {
    let mut catalog = standard()?;

    if let Some(path) = &config.catalog {
        let external = load(path)?;
        debug!("Overlaying {} rules from {}", external.len(), path.display());
        catalog.overlay(external);
    }

    catalog.apply_config(config)?;
    Ok(catalog)
}

/// Loads a catalog file, choosing the format by extension.
pub fn load(path: &Path) -> StratumResult<RuleCatalog> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StratumError::config(format!("cannot read catalog {}: {}", path.display(), e)))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("properties") => from_properties_str(&content),
        _ => from_yaml_str(&content),
    }
}

pub fn from_yaml_str(content: &str) -> StratumResult<RuleCatalog> {
    let root: Value = serde_yaml::from_str(content)?;
    match root {
        Value::Mapping(mapping) => from_tree(mapping),
        Value::Null => RuleCatalog::new(Vec::new()),
        _ => Err(StratumError::config("catalog must be a mapping keyed by rule id")),
    }
}

pub fn from_properties_str(content: &str) -> StratumResult<RuleCatalog> {
    let mut root = Mapping::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .or_else(|| line.split_once(':'))
            .ok_or_else(|| StratumError::config(format!("line {}: expected key=value", number + 1)))?;

        let segments: Vec<&str> = key.trim().split('.').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(StratumError::config(format!(
                "line {}: key '{}' must look like RULEID.field",
                number + 1,
                key.trim()
            )));
        }

        insert_path(&mut root, &segments, value.trim(), number + 1)?;
    }

    from_tree(root)
}

fn insert_path(node: &mut Mapping, segments: &[&str], value: &str, line: usize) -> StratumResult<()> {
    let key = segments[0];

    if segments.len() == 1 {
        node.insert(Value::String(key.to_string()), Value::String(value.to_string()));
        return Ok(());
    }

    if !node.contains_key(key) {
        node.insert(Value::String(key.to_string()), Value::Mapping(Mapping::new()));
    }
    match node.get_mut(key) {
        Some(Value::Mapping(child)) => insert_path(child, &segments[1..], value, line),
        _ => Err(StratumError::config(format!(
            "line {}: '{}' is both a value and a group",
            line, key
        ))),
    }
}

fn from_tree(root: Mapping) -> StratumResult<RuleCatalog> {
    let mut rules = Vec::new();

    for (key, value) in root {
        let rule_id = match key {
            Value::String(id) => id,
            other => return Err(StratumError::config(format!("rule id must be a string, got {:?}", other))),
        };
        let raw: RawRule = serde_yaml::from_value(value)
            .map_err(|e| StratumError::config(format!("rule {}: {}", rule_id, e)))?;
        rules.push(raw.into_definition(rule_id)?);
    }

    RuleCatalog::new(rules)
}

// Properties values are always strings, so lists and flags accept both forms.

#[derive(Deserialize)]
#[serde(untagged)]
enum ListValue {
    One(String),
    Many(Vec<String>),
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match ListValue::deserialize(deserializer)? {
        ListValue::One(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        ListValue::Many(items) => items,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match FlagValue::deserialize(deserializer)? {
        FlagValue::Bool(b) => Ok(b),
        FlagValue::Text(text) => match text.trim() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected a boolean, got '{}'", other))),
        },
    }
}

fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    flag(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: String,
    severity: Option<String>,
    #[serde(default, deserialize_with = "optional_flag")]
    enabled: Option<bool>,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    fix: String,
    #[serde(default)]
    reference: String,
    #[serde(default, deserialize_with = "string_list")]
    target_modules: Vec<String>,
    #[serde(default)]
    detection: Option<RawDetection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDetection {
    naming: Option<RawNaming>,
    dependency: Option<RawDependency>,
    pom: Option<RawDescriptor>,
    class: Option<RawClassPattern>,
    vendor: Option<RawVendor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawNaming {
    scope: Option<String>,
    target: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    required_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    required_suffixes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    forbidden_prefixes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    forbidden_suffixes: Vec<String>,
    must_match: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    singular: bool,
    parent_must_match: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDependency {
    scope: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    must_contain: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    must_not_contain: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    exceptions: Vec<String>,
    required_scope: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    scoped: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    sibling_requirements: Vec<String>,
    condition: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDescriptor {
    scope: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    requires_parent: bool,
    #[serde(default, deserialize_with = "flag")]
    requires_no_parent: bool,
    #[serde(default, deserialize_with = "flag")]
    no_source_code: bool,
    #[serde(default, deserialize_with = "flag")]
    no_dependencies: bool,
    #[serde(default, deserialize_with = "flag")]
    all_submodules_listed: bool,
    #[serde(default, deserialize_with = "string_list")]
    module_order: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    required_suffixes: Vec<String>,
    packaging: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawClassPattern {
    scope: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    annotations: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    supertypes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    name_suffixes: Vec<String>,
    #[serde(default, deserialize_with = "flag")]
    records: bool,
    #[serde(default, deserialize_with = "flag")]
    interfaces: bool,
    #[serde(default, deserialize_with = "flag")]
    enums: bool,
    #[serde(default, deserialize_with = "flag")]
    forbidden: bool,
    required_suffix: Option<String>,
    required_annotation: Option<String>,
    annotation_import: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawVendor {
    scope: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    vendors: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    exceptions: Vec<String>,
}

fn parse_scope(rule_id: &str, scope: Option<String>) -> StratumResult<Option<Layer>> {
    match scope.as_deref().map(str::trim) {
        None | Some("") | Some("module") => Ok(None),
        Some(name) => name
            .parse::<Layer>()
            .map(Some)
            .map_err(|e| StratumError::config(format!("rule {}: {}", rule_id, e))),
    }
}

impl RawRule {
    fn into_definition(self, rule_id: String) -> StratumResult<RuleDefinition> {
        let severity = match self.severity {
            Some(text) => text
                .parse::<Severity>()
                .map_err(|e| StratumError::config(format!("rule {}: {}", rule_id, e)))?,
            None => Severity::Error,
        };

        let detection = match self.detection {
            Some(raw) => raw.resolve(&rule_id)?,
            None => None,
        };

        Ok(RuleDefinition {
            name: self.name.unwrap_or_else(|| rule_id.clone()),
            description: self.description,
            category: self.category,
            severity,
            enabled: self.enabled.unwrap_or(true),
            detection,
            reason: self.reason,
            fix_hint: self.fix,
            reference: self.reference,
            target_modules: self.target_modules,
            rule_id,
        })
    }
}

impl RawDetection {
    /// Exactly one non-empty variant yields criteria; none yields a no-op rule.
    fn resolve(self, rule_id: &str) -> StratumResult<Option<DetectionCriteria>> {
        let mut variants = Vec::new();

        if let Some(raw) = self.dependency {
            variants.push(raw.resolve(rule_id)?);
        }
        if let Some(raw) = self.vendor {
            variants.push(DetectionCriteria::Vendor(VendorCriteria {
                scope: parse_scope(rule_id, raw.scope)?,
                vendors: raw.vendors,
                exceptions: raw.exceptions,
            }));
        }
        if let Some(raw) = self.class {
            variants.push(DetectionCriteria::ClassPattern(ClassPatternCriteria {
                scope: parse_scope(rule_id, raw.scope)?,
                annotations: raw.annotations,
                supertypes: raw.supertypes,
                name_suffixes: raw.name_suffixes,
                records: raw.records,
                interfaces: raw.interfaces,
                enums: raw.enums,
                forbidden: raw.forbidden,
                required_suffix: raw.required_suffix,
                required_annotation: raw.required_annotation,
                annotation_import: raw.annotation_import,
            }));
        }
        if let Some(raw) = self.pom {
            variants.push(DetectionCriteria::Descriptor(DescriptorCriteria {
                scope: parse_scope(rule_id, raw.scope)?,
                requires_parent: raw.requires_parent,
                requires_no_parent: raw.requires_no_parent,
                no_source_code: raw.no_source_code,
                no_dependencies: raw.no_dependencies,
                all_submodules_listed: raw.all_submodules_listed,
                module_order: raw.module_order,
                required_suffixes: raw.required_suffixes,
                packaging: raw.packaging,
            }));
        }
        if let Some(raw) = self.naming {
            let target = match raw.target.as_deref() {
                Some(target) => target
                    .parse::<NamingTarget>()
                    .map_err(|e| StratumError::config(format!("rule {}: {}", rule_id, e)))?,
                None => NamingTarget::default(),
            };
            variants.push(DetectionCriteria::Naming(NamingCriteria {
                scope: parse_scope(rule_id, raw.scope)?,
                target,
                required_prefixes: raw.required_prefixes,
                required_suffixes: raw.required_suffixes,
                forbidden_prefixes: raw.forbidden_prefixes,
                forbidden_suffixes: raw.forbidden_suffixes,
                must_match: raw.must_match,
                singular: raw.singular,
                parent_must_match: raw.parent_must_match,
            }));
        }

        variants.retain(|criteria| !is_empty(criteria));
        match variants.len() {
            0 => Ok(None),
            1 => Ok(variants.pop()),
            n => Err(StratumError::config(format!(
                "rule {} declares {} detection variants, expected one",
                rule_id, n
            ))),
        }
    }
}

impl RawDependency {
    fn resolve(self, rule_id: &str) -> StratumResult<DetectionCriteria> {
        let condition = match self.condition.as_deref() {
            Some(text) => Some(
                text.parse::<Condition>()
                    .map_err(|e| StratumError::config(format!("rule {}: {}", rule_id, e)))?,
            ),
            None => None,
        };

        Ok(DetectionCriteria::Dependency(DependencyCriteria {
            scope: parse_scope(rule_id, self.scope)?,
            must_contain: self.must_contain,
            must_not_contain: self.must_not_contain,
            exceptions: self.exceptions,
            required_scope: self.required_scope,
            scoped: self.scoped,
            sibling_requirements: self.sibling_requirements,
            condition,
        }))
    }
}

/// A variant with no predicate set, ignoring its scope and selectors.
fn is_empty(criteria: &DetectionCriteria) -> bool {
    match criteria {
        DetectionCriteria::Naming(c) => {
            c.required_prefixes.is_empty()
                && c.required_suffixes.is_empty()
                && c.forbidden_prefixes.is_empty()
                && c.forbidden_suffixes.is_empty()
                && c.must_match.is_none()
                && !c.singular
                && c.parent_must_match.is_none()
        }
        DetectionCriteria::Dependency(c) => {
            c.must_contain.is_empty()
                && c.must_not_contain.is_empty()
                && c.required_scope.is_none()
                && c.sibling_requirements.is_empty()
        }
        DetectionCriteria::Descriptor(c) => {
            !c.requires_parent
                && !c.requires_no_parent
                && !c.no_source_code
                && !c.no_dependencies
                && !c.all_submodules_listed
                && c.module_order.is_empty()
                && c.required_suffixes.is_empty()
                && c.packaging.is_none()
        }
        DetectionCriteria::ClassPattern(c) => {
            !c.forbidden && c.required_suffix.is_none() && c.required_annotation.is_none()
        }
        DetectionCriteria::Vendor(c) => c.vendors.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let catalog = standard().unwrap();
        assert!(catalog.len() >= 20);
        let ms010 = catalog.require("MS-010").unwrap();
        assert_eq!(ms010.severity, Severity::Error);
        match ms010.detection.as_ref().unwrap() {
            DetectionCriteria::Dependency(c) => {
                assert_eq!(c.scope, Some(Layer::Api));
                assert_eq!(c.sibling_requirements, vec!["{base}-core"]);
            }
            other => panic!("unexpected criteria {:?}", other),
        }
        assert!(catalog.require("XV-003").unwrap().detection.is_none());
    }

    #[test]
    fn test_properties_and_yaml_are_equivalent() {
        let properties = r#"
# completeness
MS-010.name=Component completeness
MS-010.severity=ERROR
MS-010.fix={base}-core is needed
MS-010.detection.dependency.scope=api
MS-010.detection.dependency.siblingRequirements={base}-core
! vendors
VEN-001.name=Vendor neutral
VEN-001.severity=warning
VEN-001.enabled=false
VEN-001.targetModules=*-parent, shop
VEN-001.detection.vendor.vendors=aws, oracle
DEP-004.name=Core depends on spi
DEP-004.detection.dependency.condition=hasSpi
DEP-004.detection.dependency.mustContain={base}-spi
"#;
        let yaml = r#"
MS-010:
  name: Component completeness
  severity: ERROR
  fix: "{base}-core is needed"
  detection:
    dependency:
      scope: api
      siblingRequirements: ["{base}-core"]
VEN-001:
  name: Vendor neutral
  severity: warning
  enabled: false
  targetModules: ["*-parent", shop]
  detection:
    vendor:
      vendors: [aws, oracle]
DEP-004:
  name: Core depends on spi
  detection:
    dependency:
      condition: hasSpi
      mustContain: ["{base}-spi"]
"#;
        let from_properties = from_properties_str(properties).unwrap();
        let from_yaml = from_yaml_str(yaml).unwrap();
        assert_eq!(from_properties, from_yaml);

        let ids: Vec<&str> = from_yaml.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["MS-010", "VEN-001", "DEP-004"]);
        assert!(!from_yaml.require("VEN-001").unwrap().enabled);
    }

    #[test]
    fn test_multiple_variants_rejected() {
        let yaml = "X-1:\n  detection:\n    pom:\n      noSourceCode: true\n    vendor:\n      vendors: [aws]\n";
        assert!(matches!(from_yaml_str(yaml), Err(StratumError::Config(_))));
    }

    #[test]
    fn test_empty_variant_is_a_no_op() {
        let yaml = "X-1:\n  detection:\n    pom:\n      scope: core\n";
        let catalog = from_yaml_str(yaml).unwrap();
        assert!(catalog.require("X-1").unwrap().detection.is_none());
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let properties = "X-1.detection.dependency.condition=hasWidgets\nX-1.detection.dependency.mustContain=a\n";
        assert!(matches!(from_properties_str(properties), Err(StratumError::Config(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "X-1:\n  detection:\n    pom:\n      requiresParents: true\n";
        assert!(from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_malformed_properties_line() {
        assert!(from_properties_str("just-a-word\n").is_err());
        assert!(from_properties_str("X-1=value\n").is_err());
    }

    #[test]
    fn test_resolve_applies_config() {
        let mut config = ValidatorConfig::default();
        config.disabled_rules = vec!["NAM-003".to_string()];
        let catalog = resolve(&config).unwrap();
        assert!(!catalog.require("NAM-003").unwrap().enabled);

        config.disabled_rules = vec!["NOPE-1".to_string()];
        assert!(matches!(resolve(&config), Err(StratumError::UnknownRule(_))));
    }
}
