use crate::backup::archiver::name::new_archive_file_name;
use crate::backup::archiver::{create_archive, move_archive, ArchiveJob, Archiver};
use crate::backup::backup_config::BackupConfig;
use crate::backup::notifications::status::{notify, tail_lines};
use crate::backup::notifications::Notification;
use crate::backup::paths::paths_equivalent;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::retention::archive_prune::{clear_staging, prune_archives, SweepReport};
use chrono::{Local, NaiveDate};
use std::io::Write;
use std::path::PathBuf;

/// What one run left behind. Only `archive` is guaranteed; the rest is best-effort.
#[derive(Debug)]
pub struct RunSummary {
    pub archive: PathBuf,
    pub staged: bool,
    /// Archives removed from the staging directory, `None` when nothing was staged.
    pub staging_cleanup: Option<Vec<PathBuf>>,
    pub pruned: Vec<PathBuf>,
    /// Problems hit by the staging and backup directory sweeps together.
    pub cleanup_failures: usize,
    pub notified: bool,
}

impl RunSummary {
    /// Logs whatever went wrong in a sweep as one warning and returns what it removed.
    fn settle_sweep(&mut self, dir: &str, sweep: Result<SweepReport>) -> Vec<PathBuf> {
        let (removed, failed) = match sweep {
            Ok(report) => report.into_parts(),
            Err(e) => (vec![], Err(e)),
        };
        if let Err(e) = failed {
            let count = match &e {
                Error::LotsOfError(errors) => errors.len(),
                _ => 1,
            };
            self.cleanup_failures += count;
            tracing::warn!("Failed to clean up {dir}, {count} problem(s):\n{e}");
        }
        removed
    }
}

/// One backup run: archive, relocate, prune, report.
///
/// Archive name generation, path resolution, the archiver and the move are fatal and
/// returned as errors. Cleanup and notification problems are logged and recorded in the
/// summary.
pub struct BackupRun<'a, A: Archiver, N: Notification> {
    config: &'a BackupConfig,
    archiver: A,
    notifier: Option<N>,
}

impl<'a, A: Archiver, N: Notification> BackupRun<'a, A, N> {
    pub fn new(config: &'a BackupConfig, archiver: A, notifier: Option<N>) -> Self {
        Self {
            config,
            archiver,
            notifier,
        }
    }

    pub fn execute(&self, output: &mut dyn Write) -> Result<RunSummary> {
        self.execute_on(Local::now().date_naive(), output)
    }

    pub fn execute_on(&self, date: NaiveDate, output: &mut dyn Write) -> Result<RunSummary> {
        let config = self.config;
        tracing::info!("Backup process starting...");

        let file_name =
            new_archive_file_name(date).add_msg("Failed to generate random ID")?;
        let final_path = config.backup_dir().join(&file_name);

        let same_dir = paths_equivalent(config.temp_dir(), config.backup_dir())
            .add_msg("Failed to compare directory paths")?;

        let mut summary = RunSummary {
            archive: final_path.clone(),
            staged: !same_dir,
            staging_cleanup: None,
            pruned: vec![],
            cleanup_failures: 0,
            notified: false,
        };

        if same_dir {
            tracing::info!("Creating archive at backup directory: {:?}", final_path);
            self.archive_to(&final_path, output)?;
        } else {
            let staged_path = config.temp_dir().join(&file_name);
            tracing::info!("Creating archive at temp directory: {:?}", staged_path);
            self.archive_to(&staged_path, output)?;

            tracing::info!("Moving archive to backup directory: {:?}", final_path);
            move_archive(&staged_path, &final_path)?;

            let cleared = clear_staging(config.temp_dir());
            summary.staging_cleanup = Some(summary.settle_sweep("temp directory", cleared));
        }

        let pruned = prune_archives(config.backup_dir(), *config.retain_recent_backups());
        summary.pruned = summary.settle_sweep("backup directory", pruned);

        summary.notified = self.send_status();
        Ok(summary)
    }

    fn archive_to(&self, path: &std::path::Path, output: &mut dyn Write) -> Result<()> {
        let job = ArchiveJob {
            directories: self.config.directories(),
            output: path,
            password: self.config.password(),
        };
        create_archive(&self.archiver, &job, output).add_msg("Failed to create backup archive")
    }

    fn send_status(&self) -> bool {
        let Some(notifier) = &self.notifier else {
            tracing::info!("Email notification not configured, skipping");
            return false;
        };

        let result = tail_lines(self.config.log_file_path(), *self.config.email_tail_lines())
            .and_then(|lines| notify(notifier, &lines));
        match result {
            Ok(()) => {
                tracing::info!("Status email sent");
                true
            }
            Err(e) => {
                tracing::warn!("Failed to send status email: {e}");
                false
            }
        }
    }
}
