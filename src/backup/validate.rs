//! Validation functions for configuration values.

use sanitize_filename::{is_sanitized, sanitize};
use validator::ValidationError;

use std::path::Path;

pub fn validate_file_name<S: AsRef<str>>(name: S) -> Result<(), ValidationError> {
    let name = name.as_ref();
    if name.trim().is_empty() {
        return Err(ValidationError::new("InvalidFileName")
            .with_message("file name must not be empty".into()));
    }
    if !is_sanitized(name) {
        return Err(ValidationError::new("InvalidFileName").with_message(
            format!("Invalid file name, try sanitizing like {:?}", sanitize(name)).into(),
        ));
    }

    Ok(())
}

pub fn validate_not_blank_path<P: AsRef<Path>>(path: P) -> Result<(), ValidationError> {
    if path.as_ref().to_string_lossy().trim().is_empty() {
        return Err(
            ValidationError::new("BlankPath").with_message("path must not be empty".into())
        );
    }

    Ok(())
}

pub fn validate_dir_exist_or_created<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    validate_not_blank_path(dir)?;
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return std::fs::create_dir_all(dir).map_err(|e| {
            ValidationError::new("InvalidDirectory").with_message(
                format!("cannot create or access directory {:?}: {}", dir, e).into(),
            )
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("backup.log").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("   ").is_err());
        assert!(validate_file_name("../backup.log").is_err());
    }

    #[test]
    fn test_validate_not_blank_path() {
        assert!(validate_not_blank_path("/backups").is_ok());
        assert!(validate_not_blank_path(" ").is_err());
    }

    #[test]
    fn test_validate_dir_created_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a/b");
        assert!(validate_dir_exist_or_created(&nested).is_ok());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_validate_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, "x").unwrap();
        assert!(validate_dir_exist_or_created(&file).is_err());
    }
}
