use crate::backup::BackupManager;
use crate::fixer::{self, FixContext, FixResult, FixStatus, Fixer};
use crate::fixers;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use stratum_core::{RuleCatalog, ValidatorConfig, Violation};
use tracing::debug;

/// Everything a fix run shares across violations.
pub struct FixRun<'a> {
    pub project_root: &'a Path,
    pub config: &'a ValidatorConfig,
    pub catalog: &'a RuleCatalog,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixSummary {
    pub results: Vec<FixResult>,
}

impl FixSummary {
    pub fn count(&self, status: FixStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(FixStatus::Failed) > 0
    }
}

/// Fixers registered up front and looked up by rule id.
pub struct FixerPipeline {
    fixers: Vec<Box<dyn Fixer>>,
    by_rule: HashMap<String, usize>,
}

impl FixerPipeline {
    pub fn new() -> Self {
        Self {
            fixers: Vec::new(),
            by_rule: HashMap::new(),
        }
    }

    /// A pipeline holding every built-in fixer.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        for fixer in fixers::builtin() {
            pipeline.register(fixer);
        }
        pipeline
    }

    /// When two fixers claim a rule, the higher priority one keeps it; on a
    /// tie the earlier registration wins.
    pub fn register(&mut self, fixer: Box<dyn Fixer>) {
        self.fixers.push(fixer);
        self.fixers.sort_by_key(|f| std::cmp::Reverse(f.priority()));

        self.by_rule.clear();
        for (index, fixer) in self.fixers.iter().enumerate() {
            for rule_id in fixer.rule_ids() {
                self.by_rule.entry(rule_id.to_string()).or_insert(index);
            }
        }
    }

    pub fn fixers(&self) -> impl Iterator<Item = &dyn Fixer> {
        self.fixers.iter().map(|f| f.as_ref())
    }

    pub fn fixer_for(&self, rule_id: &str) -> Option<&dyn Fixer> {
        self.by_rule.get(rule_id).map(|&index| self.fixers[index].as_ref())
    }

    /// Whether an automatic (non-manual) fixer handles `rule_id`.
    pub fn is_fixable(&self, rule_id: &str) -> bool {
        self.fixer_for(rule_id).map(|f| !f.is_manual()).unwrap_or(false)
    }

    pub fn mark_fixable(&self, violation: &mut Violation) {
        violation.fixable = self.is_fixable(&violation.rule_id);
    }

    /// Runs fixers over `violations` in descending priority. Each fix is
    /// committed or rolled back before the next one starts.
    pub fn run(&self, run: &FixRun, violations: &[Violation]) -> FixSummary {
        let backups = BackupManager::staged(run.project_root, run.config);

        let mut ordered: Vec<&Violation> = violations.iter().collect();
        ordered.sort_by_key(|v| std::cmp::Reverse(self.fixer_for(&v.rule_id).map(|f| f.priority()).unwrap_or(0)));

        let mut summary = FixSummary::default();
        for violation in ordered {
            let result = self.fix_one(run, violation, &backups);
            debug!("{} {}: {}", result.status, violation.rule_id, result.message);
            summary.results.push(result);
        }
        summary
    }

    fn fix_one(&self, run: &FixRun, violation: &Violation, backups: &BackupManager) -> FixResult {
        let fixer = match self.fixer_for(&violation.rule_id) {
            Some(fixer) => fixer,
            None => {
                let remedy = if violation.fix.is_empty() {
                    "no fixer registered for this rule".to_string()
                } else {
                    violation.fix.clone()
                };
                return FixResult::new(violation, "none", FixStatus::NotFixable, remedy);
            }
        };

        let rule = match run.catalog.require(&violation.rule_id) {
            Ok(rule) => rule,
            Err(e) => return FixResult::new(violation, fixer.name(), FixStatus::Failed, e.to_string()),
        };

        let ctx = FixContext::new(run.project_root, violation, run.dry_run, run.config, rule);
        fixer::apply(fixer, violation, &ctx, backups)
    }
}

impl Default for FixerPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
