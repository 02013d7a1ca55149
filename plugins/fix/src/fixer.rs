use crate::backup::BackupManager;
use crate::diff::unified_diff;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use stratum_core::{RuleDefinition, StratumResult, ValidatorConfig, Violation};
use tracing::{debug, info, info_span, warn};

/// A single change a fixer wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEdit {
    /// Replace (or create) the file with `content`.
    Write { path: PathBuf, content: String },
    CreateDir(PathBuf),
}

impl FileEdit {
    pub fn write(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        FileEdit::Write {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileEdit::Write { path, .. } => path,
            FileEdit::CreateDir(path) => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixPlan {
    Edits { description: String, edits: Vec<FileEdit> },
    /// The change needs a human; carries the remedy to show.
    NotFixable(String),
}

/// What a fixer gets to work with.
pub struct FixContext<'a> {
    pub project_root: &'a Path,
    /// Directory of the module the violation points at.
    pub module_root: PathBuf,
    pub dry_run: bool,
    pub config: &'a ValidatorConfig,
    pub rule: &'a RuleDefinition,
}

impl<'a> FixContext<'a> {
    pub fn new(
        project_root: &'a Path,
        violation: &Violation,
        dry_run: bool,
        config: &'a ValidatorConfig,
        rule: &'a RuleDefinition,
    ) -> Self {
        let module_root = if violation.location.is_file() {
            violation
                .location
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project_root.to_path_buf())
        } else {
            violation.location.clone()
        };

        Self {
            project_root,
            module_root,
            dry_run,
            config,
            rule,
        }
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.module_root.join(&self.config.descriptor_file)
    }

    /// Path relative to the project root, for diff labels and messages.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

pub trait Fixer: Send + Sync {
    fn name(&self) -> &str;

    fn rule_ids(&self) -> &[&'static str];

    /// Higher runs first.
    fn priority(&self) -> u32;

    /// Manual fixers never change files; they only report a remedy.
    fn is_manual(&self) -> bool {
        false
    }

    /// Reads the current state from disk and works out the edits.
    fn plan(&self, violation: &Violation, ctx: &FixContext) -> StratumResult<FixPlan>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixStatus {
    Fixed,
    Skipped,
    NotFixable,
    Failed,
    DryRun,
}

impl FixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixStatus::Fixed => "FIXED",
            FixStatus::Skipped => "SKIPPED",
            FixStatus::NotFixable => "NOT_FIXABLE",
            FixStatus::Failed => "FAILED",
            FixStatus::DryRun => "DRY_RUN",
        }
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixResult {
    pub rule_id: String,
    pub target: String,
    pub fixer: String,
    pub status: FixStatus,
    pub message: String,
    pub files: Vec<PathBuf>,
    pub diffs: Vec<String>,
}

impl FixResult {
    pub fn new(violation: &Violation, fixer: &str, status: FixStatus, message: impl Into<String>) -> Self {
        Self {
            rule_id: violation.rule_id.clone(),
            target: violation.target.clone(),
            fixer: fixer.to_string(),
            status,
            message: message.into(),
            files: Vec::new(),
            diffs: Vec::new(),
        }
    }
}

/// Plans and, outside dry-run mode, applies one fix inside a transaction.
pub fn apply(fixer: &dyn Fixer, violation: &Violation, ctx: &FixContext, backups: &BackupManager) -> FixResult {
    let span = info_span!("fix", rule = %violation.rule_id, fixer = fixer.name());
    let _enter = span.enter();

    let (description, edits) = match fixer.plan(violation, ctx) {
        Ok(FixPlan::Edits { description, edits }) => (description, edits),
        Ok(FixPlan::NotFixable(remedy)) => {
            debug!("Not fixable: {}", remedy);
            return FixResult::new(violation, fixer.name(), FixStatus::NotFixable, remedy);
        }
        Err(e) => {
            warn!("Planning failed: {}", e);
            return FixResult::new(violation, fixer.name(), FixStatus::Failed, e.to_string());
        }
    };

    let changes: Vec<(&FileEdit, String)> = edits
        .iter()
        .filter_map(|edit| change_of(edit, ctx).map(|diff| (edit, diff)))
        .collect();

    if changes.is_empty() {
        debug!("Nothing to change for {}", violation.target);
        return FixResult::new(violation, fixer.name(), FixStatus::Skipped, "already satisfied");
    }

    let files: Vec<PathBuf> = changes.iter().map(|(edit, _)| edit.path().to_path_buf()).collect();
    let diffs: Vec<String> = changes.iter().map(|(_, diff)| diff.clone()).collect();

    if ctx.dry_run {
        let mut result = FixResult::new(violation, fixer.name(), FixStatus::DryRun, description);
        result.files = files;
        result.diffs = diffs;
        return result;
    }

    let applied = backups.transaction(|tx| {
        for (edit, _) in &changes {
            match edit {
                FileEdit::Write { path, content } => tx.write(path, content)?,
                FileEdit::CreateDir(path) => tx.create_dir_all(path)?,
            }
        }
        Ok(())
    });

    let mut result = match applied {
        Ok(()) => {
            info!("{}: {}", violation.target, description);
            FixResult::new(violation, fixer.name(), FixStatus::Fixed, description)
        }
        Err(e) => {
            warn!("Fix rolled back: {}", e);
            FixResult::new(violation, fixer.name(), FixStatus::Failed, format!("rolled back: {}", e))
        }
    };
    result.files = files;
    result.diffs = diffs;
    result
}

/// Diff for an edit that changes something, `None` for a no-op.
fn change_of(edit: &FileEdit, ctx: &FixContext) -> Option<String> {
    match edit {
        FileEdit::Write { path, content } => {
            let existing = fs::read_to_string(path).ok();
            if existing.as_deref() == Some(content.as_str()) {
                return None;
            }
            Some(unified_diff(
                &ctx.display(path),
                existing.as_deref().unwrap_or(""),
                content,
                existing.is_none(),
            ))
        }
        FileEdit::CreateDir(path) if path.is_dir() => None,
        FileEdit::CreateDir(path) => Some(format!("+++ b/{}/ (new directory)\n", ctx.display(path))),
    }
}
