use crate::fixer::{FixContext, FixPlan, Fixer};
use stratum_core::{StratumResult, Violation};

/// Rules whose repair needs judgement: renames, moving code, vendor
/// isolation, structural mismatches and cycles. Reports the remedy only.
pub struct ManualRemedyFixer;

const MANUAL_RULES: &[&str] = &[
    "MS-022", "NAM-001", "NAM-002", "NAM-003", "NAM-004", "CLS-001", "CLS-002", "CLS-004", "VEN-001", "XV-001",
    "XV-002", "XV-003", "XV-004", "ARCH-001",
];

impl Fixer for ManualRemedyFixer {
    fn name(&self) -> &str {
        "ManualRemedyFixer"
    }

    fn rule_ids(&self) -> &[&'static str] {
        MANUAL_RULES
    }

    fn priority(&self) -> u32 {
        0
    }

    fn is_manual(&self) -> bool {
        true
    }

    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan> {
        let remedy = if !violation.fix.is_empty() {
            violation.fix.clone()
        } else if !ctx.rule.fix_hint.is_empty() {
            ctx.rule.fix_hint.clone()
        } else {
            format!("{} needs a manual change", ctx.rule.rule_id)
        };
        Ok(FixPlan::NotFixable(remedy))
    }
}
