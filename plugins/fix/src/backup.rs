//! File backups taken before any fixer touches the project.

use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use stratum_core::{StratumError, StratumResult, ValidatorConfig};
use tracing::{debug, warn};

const BACKUP_EXTENSION: &str = ".bak";
const EXTERNAL_DIR: &str = "__external__";

/// Maps an original file to the place its backup lives, and back.
///
/// `original_path(&backup_path(p))` must give `p` back for every absolute
/// path the strategy accepts.
pub trait BackupStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn backup_path(&self, original: &Path) -> PathBuf;

    fn original_path(&self, backup: &Path) -> Option<PathBuf>;

    /// Directory owned by the strategy, pruned once it is empty.
    fn staging_dir(&self) -> Option<&Path> {
        None
    }
}

/// Backups mirrored under `<root>/.stratum-backup/`. Files outside the
/// project root are kept under `__external__` with their absolute path;
/// relative paths are resolved against the working directory first.
#[derive(Debug, Clone)]
pub struct StagedBackup {
    root: PathBuf,
    dir: PathBuf,
}

impl StagedBackup {
    pub fn new(root: impl Into<PathBuf>, dir_name: &str) -> Self {
        let root = absolute(&root.into());
        let dir = root.join(dir_name);
        Self { root, dir }
    }
}

impl BackupStrategy for StagedBackup {
    fn name(&self) -> &str {
        "staged"
    }

    fn backup_path(&self, original: &Path) -> PathBuf {
        let original = absolute(original);
        let staged = match original.strip_prefix(&self.root) {
            Ok(relative) => self.dir.join(relative),
            Err(_) => {
                let parts: PathBuf = original
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect();
                self.dir.join(EXTERNAL_DIR).join(parts)
            }
        };
        with_backup_extension(&staged)
    }

    fn original_path(&self, backup: &Path) -> Option<PathBuf> {
        let relative = strip_backup_extension(backup)?;
        let relative = relative.strip_prefix(&self.dir).ok()?;
        match relative.strip_prefix(EXTERNAL_DIR) {
            Ok(external) => Some(Path::new("/").join(external)),
            Err(_) => Some(self.root.join(relative)),
        }
    }

    fn staging_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Backups written next to the original as `<file>.bak`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiblingBackup;

impl BackupStrategy for SiblingBackup {
    fn name(&self) -> &str {
        "sibling"
    }

    fn backup_path(&self, original: &Path) -> PathBuf {
        with_backup_extension(original)
    }

    fn original_path(&self, backup: &Path) -> Option<PathBuf> {
        strip_backup_extension(backup)
    }
}

/// `path` made absolute against the working directory, with `.` and `..`
/// folded away. Works for files that do not exist yet.
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn with_backup_extension(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(BACKUP_EXTENSION);
    PathBuf::from(name)
}

fn strip_backup_extension(path: &Path) -> Option<PathBuf> {
    path.to_str()?.strip_suffix(BACKUP_EXTENSION).map(PathBuf::from)
}

/// One file secured before modification. `backup` is `None` when the file
/// did not exist yet, so undoing the change means deleting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub original: PathBuf,
    pub backup: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

pub struct BackupManager {
    strategy: Box<dyn BackupStrategy>,
}

impl BackupManager {
    pub fn new(strategy: Box<dyn BackupStrategy>) -> Self {
        Self { strategy }
    }

    /// Staged backups under the configured backup directory of `root`.
    pub fn staged(root: &Path, config: &ValidatorConfig) -> Self {
        Self::new(Box::new(StagedBackup::new(root, &config.backup_dir)))
    }

    pub fn strategy(&self) -> &dyn BackupStrategy {
        self.strategy.as_ref()
    }

    pub fn backup(&self, path: &Path) -> StratumResult<BackupRecord> {
        let created_at = Utc::now();

        if !path.exists() {
            return Ok(BackupRecord {
                original: path.to_path_buf(),
                backup: None,
                created_at,
            });
        }
        if !path.is_file() {
            return Err(StratumError::Backup(format!("{} is not a regular file", path.display())));
        }

        let backup = self.strategy.backup_path(path);
        if let Some(parent) = backup.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StratumError::Backup(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        fs::copy(path, &backup).map_err(|e| {
            StratumError::Backup(format!("cannot copy {} to {}: {}", path.display(), backup.display(), e))
        })?;

        debug!("Backed up {} to {}", path.display(), backup.display());
        Ok(BackupRecord {
            original: path.to_path_buf(),
            backup: Some(backup),
            created_at,
        })
    }

    /// Puts the original content back. The backup stays on disk for manual
    /// recovery; only `cleanup` (or a commit) deletes it.
    pub fn restore(&self, record: &BackupRecord) -> StratumResult<()> {
        match &record.backup {
            Some(backup) => {
                fs::copy(backup, &record.original).map_err(|e| {
                    StratumError::Backup(format!(
                        "cannot restore {} from {}: {}",
                        record.original.display(),
                        backup.display(),
                        e
                    ))
                })?;
            }
            None => {
                if record.original.exists() {
                    fs::remove_file(&record.original).map_err(|e| {
                        StratumError::Backup(format!("cannot remove {}: {}", record.original.display(), e))
                    })?;
                }
            }
        }
        debug!("Restored {}", record.original.display());
        Ok(())
    }

    /// Deletes the backups of `records`, returning how many were removed.
    pub fn cleanup(&self, records: &[BackupRecord]) -> usize {
        records
            .iter()
            .filter_map(|r| r.backup.as_deref())
            .filter(|backup| self.discard(backup))
            .count()
    }

    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Runs `work` in a transaction, committing on success and rolling back
    /// on error.
    pub fn transaction<T, F>(&self, work: F) -> StratumResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> StratumResult<T>,
    {
        let mut tx = self.begin();
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => match tx.rollback() {
                Ok(()) => Err(e),
                Err(rollback) => Err(StratumError::Backup(format!("{}; rollback failed: {}", e, rollback))),
            },
        }
    }

    fn discard(&self, backup: &Path) -> bool {
        if let Err(e) = fs::remove_file(backup) {
            warn!("Could not delete backup {}: {}", backup.display(), e);
            return false;
        }
        if let Some(staging) = self.strategy.staging_dir() {
            let mut dir = backup.parent();
            while let Some(current) = dir {
                if !current.starts_with(staging) || fs::remove_dir(current).is_err() {
                    break;
                }
                dir = current.parent();
            }
        }
        true
    }
}
