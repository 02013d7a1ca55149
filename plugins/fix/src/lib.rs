pub mod backup;
pub mod diff;
pub mod fixer;
pub mod fixers;
pub mod pipeline;
pub mod plugin;
pub mod transaction;

pub use backup::{BackupManager, BackupRecord, BackupStrategy, SiblingBackup, StagedBackup};
pub use fixer::{FileEdit, FixContext, FixPlan, FixResult, FixStatus, Fixer};
pub use pipeline::{FixRun, FixSummary, FixerPipeline};
pub use plugin::FixPlugin;
pub use transaction::Transaction;
