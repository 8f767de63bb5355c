use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use std::path::Path;

/// Tells whether `staging` and `target` are the same directory.
///
/// A blank `staging` means "no staging directory" and counts as the same location without
/// looking at the filesystem. Otherwise both sides are canonicalized (absolute, symlinks
/// resolved) and compared; a path that cannot be resolved is an error.
pub fn paths_equivalent<P1: AsRef<Path>, P2: AsRef<Path>>(staging: P1, target: P2) -> Result<bool> {
    let staging = staging.as_ref();
    let target = target.as_ref();
    if staging.to_string_lossy().trim().is_empty() {
        tracing::info!("Temp directory not set, using backup directory.");
        return Ok(true);
    }

    let staging_canonical = std::fs::canonicalize(staging)
        .map_err(Error::from)
        .add_msg(format!("Error resolving path {:?}", staging))?;
    let target_canonical = std::fs::canonicalize(target)
        .map_err(Error::from)
        .add_msg(format!("Error resolving path {:?}", target))?;

    tracing::debug!(
        "Comparing {:?} with {:?}",
        staging_canonical,
        target_canonical
    );
    Ok(staging_canonical == target_canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blank_staging_is_equivalent_without_fs() {
        assert!(paths_equivalent("", "/definitely/not/there").unwrap());
        assert!(paths_equivalent("   \t", "/definitely/not/there").unwrap());
    }

    #[test]
    fn test_same_directory_through_dot_segments() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        let dotted = temp_dir.path().join("sub").join("..");

        assert!(paths_equivalent(&dotted, temp_dir.path()).unwrap());
    }

    #[test]
    fn test_distinct_directories() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::fs::create_dir(&a).unwrap();
        std::fs::create_dir(&b).unwrap();

        assert!(!paths_equivalent(&a, &b).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolves_to_target() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        let link = temp_dir.path().join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(paths_equivalent(&link, &real).unwrap());
    }

    #[test]
    fn test_missing_path_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        assert!(paths_equivalent(&missing, temp_dir.path()).is_err());
        assert!(paths_equivalent(temp_dir.path(), &missing).is_err());
    }
}
