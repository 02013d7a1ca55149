//! Rule definitions, detection criteria and the rule catalog.

use crate::config::ValidatorConfig;
use crate::error::{StratumError, StratumResult};
use crate::layer::Layer;
use crate::pattern;
use crate::source::{TypeDeclaration, TypeKind};
use crate::violation::Severity;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Gate for dependency rules, e.g. `hasSpi` or `!isParent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    HasLayer(Layer),
    LacksLayer(Layer),
    IsParent,
    IsNotParent,
}

impl FromStr for Condition {
    type Err = StratumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negated, name) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        if name == "isParent" {
            return Ok(if negated { Condition::IsNotParent } else { Condition::IsParent });
        }

        let layer = name
            .strip_prefix("has")
            .and_then(|layer| layer.parse::<Layer>().ok())
            .ok_or_else(|| StratumError::config(format!("unknown condition '{}'", trimmed)))?;

        Ok(if negated {
            Condition::LacksLayer(layer)
        } else {
            Condition::HasLayer(layer)
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn capitalized(layer: &Layer) -> String {
            let name = layer.name();
            format!("{}{}", name[..1].to_ascii_uppercase(), &name[1..])
        }
        match self {
            Condition::HasLayer(layer) => write!(f, "has{}", capitalized(layer)),
            Condition::LacksLayer(layer) => write!(f, "!has{}", capitalized(layer)),
            Condition::IsParent => f.write_str("isParent"),
            Condition::IsNotParent => f.write_str("!isParent"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamingTarget {
    #[default]
    ArtifactId,
    GroupId,
    Directory,
}

impl FromStr for NamingTarget {
    type Err = StratumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "artifact-id" | "artifactId" => Ok(NamingTarget::ArtifactId),
            "group-id" | "groupId" => Ok(NamingTarget::GroupId),
            "directory" => Ok(NamingTarget::Directory),
            other => Err(StratumError::config(format!("unknown naming target '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingCriteria {
    pub scope: Option<Layer>,
    pub target: NamingTarget,
    pub required_prefixes: Vec<String>,
    pub required_suffixes: Vec<String>,
    pub forbidden_prefixes: Vec<String>,
    pub forbidden_suffixes: Vec<String>,
    pub must_match: Option<String>,
    pub singular: bool,
    pub parent_must_match: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyCriteria {
    pub scope: Option<Layer>,
    pub must_contain: Vec<String>,
    pub must_not_contain: Vec<String>,
    pub exceptions: Vec<String>,
    pub required_scope: Option<String>,
    pub scoped: Vec<String>,
    pub sibling_requirements: Vec<String>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorCriteria {
    pub scope: Option<Layer>,
    pub requires_parent: bool,
    pub requires_no_parent: bool,
    pub no_source_code: bool,
    pub no_dependencies: bool,
    pub all_submodules_listed: bool,
    pub module_order: Vec<String>,
    pub required_suffixes: Vec<String>,
    pub packaging: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPatternCriteria {
    pub scope: Option<Layer>,
    pub annotations: Vec<String>,
    pub supertypes: Vec<String>,
    pub name_suffixes: Vec<String>,
    pub records: bool,
    pub interfaces: bool,
    pub enums: bool,
    pub forbidden: bool,
    pub required_suffix: Option<String>,
    pub required_annotation: Option<String>,
    pub annotation_import: Option<String>,
}

impl ClassPatternCriteria {
    /// Whether `decl` is one of the types this rule is about.
    pub fn selects(&self, decl: &TypeDeclaration) -> bool {
        if self.records || self.interfaces || self.enums {
            let kind_ok = (self.records && decl.kind == TypeKind::Record)
                || (self.interfaces && decl.kind == TypeKind::Interface)
                || (self.enums && decl.kind == TypeKind::Enum);
            if !kind_ok {
                return false;
            }
        }

        if !self.annotations.is_empty()
            && !decl.annotations.iter().any(|a| pattern::matches_any(a, &self.annotations))
        {
            return false;
        }

        if !self.supertypes.is_empty() && !decl.supertypes.iter().any(|s| pattern::matches_any(s, &self.supertypes)) {
            return false;
        }

        self.name_suffixes.is_empty() || pattern::matches_any(&decl.name, &self.name_suffixes)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorCriteria {
    pub scope: Option<Layer>,
    pub vendors: Vec<String>,
    pub exceptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionCriteria {
    Naming(NamingCriteria),
    Dependency(DependencyCriteria),
    Descriptor(DescriptorCriteria),
    ClassPattern(ClassPatternCriteria),
    Vendor(VendorCriteria),
}

impl DetectionCriteria {
    pub fn scope(&self) -> Option<Layer> {
        match self {
            DetectionCriteria::Naming(c) => c.scope,
            DetectionCriteria::Dependency(c) => c.scope,
            DetectionCriteria::Descriptor(c) => c.scope,
            DetectionCriteria::ClassPattern(c) => c.scope,
            DetectionCriteria::Vendor(c) => c.scope,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DetectionCriteria::Naming(_) => "naming",
            DetectionCriteria::Dependency(_) => "dependency",
            DetectionCriteria::Descriptor(_) => "pom",
            DetectionCriteria::ClassPattern(_) => "class",
            DetectionCriteria::Vendor(_) => "vendor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub rule_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub enabled: bool,
    /// `None` makes the rule a no-op that always passes.
    pub detection: Option<DetectionCriteria>,
    pub reason: String,
    pub fix_hint: String,
    pub reference: String,
    pub target_modules: Vec<String>,
}

impl RuleDefinition {
    pub fn new(rule_id: impl Into<String>, name: impl Into<String>, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            severity,
            enabled: true,
            detection: None,
            reason: String::new(),
            fix_hint: String::new(),
            reference: String::new(),
            target_modules: Vec::new(),
        }
    }
}

/// Ordered, id-unique collection of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCatalog {
    rules: Vec<RuleDefinition>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<RuleDefinition>) -> StratumResult<Self> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.rule_id.as_str()) {
                return Err(StratumError::config(format!("duplicate rule id '{}'", rule.rule_id)));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter()
    }

    pub fn enabled(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, rule_id: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }

    /// Like `get`, but a missing id is a configuration error.
    pub fn require(&self, rule_id: &str) -> StratumResult<&RuleDefinition> {
        self.get(rule_id)
            .ok_or_else(|| StratumError::UnknownRule(rule_id.to_string()))
    }

    /// Overlays `other`: same ids replace in place, new ids are appended.
    pub fn overlay(&mut self, other: RuleCatalog) {
        for rule in other.rules {
            match self.rules.iter_mut().find(|r| r.rule_id == rule.rule_id) {
                Some(existing) => *existing = rule,
                None => self.rules.push(rule),
            }
        }
    }

    /// Applies disabled rules and severity overrides. Unknown ids are fatal.
    pub fn apply_config(&mut self, config: &ValidatorConfig) -> StratumResult<()> {
        for rule_id in &config.disabled_rules {
            let rule = self
                .rules
                .iter_mut()
                .find(|r| &r.rule_id == rule_id)
                .ok_or_else(|| StratumError::UnknownRule(rule_id.clone()))?;
            rule.enabled = false;
        }

        for (rule_id, severity) in &config.severity_overrides {
            let rule = self
                .rules
                .iter_mut()
                .find(|r| &r.rule_id == rule_id)
                .ok_or_else(|| StratumError::UnknownRule(rule_id.clone()))?;
            rule.severity = *severity;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_parsing() {
        assert_eq!("hasSpi".parse::<Condition>().unwrap(), Condition::HasLayer(Layer::Spi));
        assert_eq!("!hasFacade".parse::<Condition>().unwrap(), Condition::LacksLayer(Layer::Facade));
        assert_eq!("isParent".parse::<Condition>().unwrap(), Condition::IsParent);
        assert_eq!("!isParent".parse::<Condition>().unwrap(), Condition::IsNotParent);
        assert!(matches!("hasWidgets".parse::<Condition>(), Err(StratumError::Config(_))));
        assert_eq!(Condition::HasLayer(Layer::Spi).to_string(), "hasSpi");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let rules = vec![
            RuleDefinition::new("MS-010", "a", Severity::Error),
            RuleDefinition::new("MS-010", "b", Severity::Error),
        ];
        assert!(matches!(RuleCatalog::new(rules), Err(StratumError::Config(_))));
    }

    #[test]
    fn test_apply_config() {
        let mut catalog = RuleCatalog::new(vec![
            RuleDefinition::new("MS-010", "a", Severity::Error),
            RuleDefinition::new("NAM-001", "b", Severity::Warning),
        ])
        .unwrap();

        let mut config = ValidatorConfig::default();
        config.disabled_rules = vec!["MS-010".to_string()];
        config.severity_overrides.insert("NAM-001".to_string(), Severity::Critical);
        catalog.apply_config(&config).unwrap();

        assert!(!catalog.require("MS-010").unwrap().enabled);
        assert_eq!(catalog.require("NAM-001").unwrap().severity, Severity::Critical);
        assert_eq!(catalog.enabled().count(), 1);
    }

    #[test]
    fn test_unknown_rule_in_config_is_fatal() {
        let mut catalog = RuleCatalog::new(vec![RuleDefinition::new("MS-010", "a", Severity::Error)]).unwrap();
        let mut config = ValidatorConfig::default();
        config.disabled_rules = vec!["XX-999".to_string()];
        assert!(matches!(catalog.apply_config(&config), Err(StratumError::UnknownRule(id)) if id == "XX-999"));
    }

    #[test]
    fn test_overlay_replaces_and_appends() {
        let mut catalog = RuleCatalog::new(vec![RuleDefinition::new("MS-010", "a", Severity::Error)]).unwrap();
        let other = RuleCatalog::new(vec![
            RuleDefinition::new("MS-010", "replaced", Severity::Info),
            RuleDefinition::new("ORG-001", "extra", Severity::Warning),
        ])
        .unwrap();
        catalog.overlay(other);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.rules()[0].name, "replaced");
        assert_eq!(catalog.rules()[1].rule_id, "ORG-001");
    }
}
