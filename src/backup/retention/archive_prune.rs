use crate::backup::archiver::name::is_archive_file_name;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::{convert_error_vec, Result};
use crate::backup::result_error::AddMsg;
use itertools::Itertools;
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Outcome of a best-effort delete loop: what went away and what refused to.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<Error>,
}

impl SweepReport {
    /// What was removed, and every failure folded into one error.
    pub fn into_parts(self) -> (Vec<PathBuf>, Result<()>) {
        let SweepReport { removed, failures } = self;
        (removed, convert_error_vec(failures))
    }
}

fn remove_all<I: IntoIterator<Item = PathBuf>>(paths: I) -> SweepReport {
    paths
        .into_iter()
        .fold(SweepReport::default(), |mut report, path| {
            tracing::info!("Removing old backup file: {:?}", path);
            match std::fs::remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) => {
                    tracing::warn!("Failed to delete old backup file {:?}: {e}", path);
                    report.failures.push(
                        Error::from(e).add_msg(format!("Failed to delete {:?}", path)),
                    );
                }
            }
            report
        })
}

/// Archive files in `dir` with their modification time, in listing order.
pub fn list_archives<P: AsRef<Path>>(dir: P) -> Result<Vec<(PathBuf, SystemTime)>> {
    let dir = dir.as_ref();
    let mut archives = Vec::new();
    let entries = read_dir(dir)
        .map_err(Error::from)
        .add_msg(format!("Failed to list {:?}", dir))?;
    for entry in entries {
        let entry = entry?;
        let is_archive = entry
            .file_name()
            .to_str()
            .is_some_and(is_archive_file_name);
        if !is_archive {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(Error::from)
            .add_msg(format!("Failed to read modification time of {:?}", entry.path()))?;
        archives.push((entry.path(), modified));
    }
    Ok(archives)
}

/// Deletes all but the `retain` most recently modified archives in `dir`.
///
/// Equal modification times keep their listing order. A file that cannot be deleted is
/// recorded in the report and the sweep moves on.
pub fn prune_archives<P: AsRef<Path>>(dir: P, retain: usize) -> Result<SweepReport> {
    let archives = list_archives(dir)?;
    if archives.len() <= retain {
        tracing::debug!("{} archives, retaining up to {}", archives.len(), retain);
        return Ok(SweepReport::default());
    }

    let expired = archives.len() - retain;
    Ok(remove_all(
        archives
            .into_iter()
            .sorted_by_key(|(_, modified)| *modified)
            .take(expired)
            .map(|(path, _)| path),
    ))
}

/// Deletes every archive left in the staging directory.
pub fn clear_staging<P: AsRef<Path>>(dir: P) -> Result<SweepReport> {
    Ok(remove_all(
        list_archives(dir)?.into_iter().map(|(path, _)| path),
    ))
}
