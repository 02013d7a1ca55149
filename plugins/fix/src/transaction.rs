use crate::backup::{BackupManager, BackupRecord};
use std::fs;
use std::path::{Path, PathBuf};
use stratum_core::{StratumError, StratumResult};
use tracing::{debug, error};

/// A group of file changes that is kept as a whole or undone as a whole.
///
/// Every file is backed up before its first write. Dropping a transaction
/// that was neither committed nor rolled back rolls it back.
pub struct Transaction<'a> {
    manager: &'a BackupManager,
    records: Vec<BackupRecord>,
    created_dirs: Vec<PathBuf>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(manager: &'a BackupManager) -> Self {
        Self {
            manager,
            records: Vec::new(),
            created_dirs: Vec::new(),
            finished: false,
        }
    }

    /// Secures `path` once; later calls for the same path are no-ops.
    pub fn backup(&mut self, path: &Path) -> StratumResult<()> {
        if self.records.iter().any(|r| r.original == path) {
            return Ok(());
        }
        let record = self.manager.backup(path)?;
        self.records.push(record);
        Ok(())
    }

    pub fn write(&mut self, path: &Path, content: &str) -> StratumResult<()> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.backup(path)?;
        fs::write(path, content)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Creates `dir` and its missing ancestors, remembering each one created.
    pub fn create_dir_all(&mut self, dir: &Path) -> StratumResult<()> {
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(path) = current {
            if path.as_os_str().is_empty() || path.exists() {
                break;
            }
            missing.push(path.to_path_buf());
            current = path.parent();
        }

        for path in missing.into_iter().rev() {
            fs::create_dir(&path)?;
            self.created_dirs.push(path);
        }
        Ok(())
    }

    /// Files touched so far.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.records.iter().map(|r| r.original.as_path())
    }

    /// Keeps every change and deletes the backups.
    pub fn commit(mut self) -> StratumResult<usize> {
        self.finished = true;
        let removed = self.manager.cleanup(&self.records);
        debug!("Committed {} file(s), removed {} backup(s)", self.records.len(), removed);
        Ok(self.records.len())
    }

    pub fn rollback(mut self) -> StratumResult<()> {
        self.finished = true;
        self.undo()
    }

    /// Restores files in reverse order, then removes created directories.
    /// Keeps going after a failed restore so that as much as possible is
    /// undone. Backups stay on disk for manual recovery.
    fn undo(&mut self) -> StratumResult<()> {
        let mut failures = Vec::new();

        for record in self.records.drain(..).rev() {
            if let Err(e) = self.manager.restore(&record) {
                error!("Rollback of {} failed: {}", record.original.display(), e);
                failures.push(e.to_string());
            }
        }

        for dir in self.created_dirs.drain(..).rev() {
            if let Err(e) = fs::remove_dir(&dir) {
                error!("Could not remove {}: {}", dir.display(), e);
                failures.push(format!("{}: {}", dir.display(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StratumError::Backup(failures.join("; ")))
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.undo() {
            error!("Rollback of abandoned transaction failed: {}", e);
        }
    }
}
