pub mod name;
pub mod seven_zip;

pub use name::{ARCHIVE_EXT, ARCHIVE_PREFIX};

use crate::backup::redacted::{RedactedString, REDACTED_PASSPHRASE};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// `a` add, `-mx=0` store only, `-mhe=on` encrypt headers, then keep modified/created/accessed
/// times and file attributes.
const ARCHIVER_FLAGS: [&str; 7] = ["a", "-mx=0", "-mhe=on", "-mtm=on", "-mtc=on", "-mta=on", "-mtr=on"];
const PASSWORD_FLAG: &str = "-p";

/// How the archiver process ended. `code` is `None` when it was killed by a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiverStatus {
    pub code: Option<i32>,
}

impl ArchiverStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ArchiverStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl Display for ArchiverStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// The external archiving tool.
///
/// Everything the process prints on stdout and stderr goes to `output`.
pub trait Archiver {
    fn program(&self) -> String;

    fn run(&self, args: &[OsString], output: &mut dyn Write) -> Result<ArchiverStatus>;
}

/// One archive to produce: which directories, where, and with which password.
#[derive(Debug)]
pub struct ArchiveJob<'a> {
    pub directories: &'a [PathBuf],
    pub output: &'a Path,
    pub password: &'a RedactedString,
}

impl ArchiveJob<'_> {
    /// Flags, `-p<password>`, output path, then the source directories.
    ///
    /// The password travels on the command line and is visible to anyone who can list the
    /// host's processes while the archiver runs.
    pub fn args(&self) -> Vec<OsString> {
        self.args_with_password(self.password.inner())
    }

    pub fn redacted_args(&self) -> Vec<OsString> {
        self.args_with_password(REDACTED_PASSPHRASE)
    }

    fn args_with_password(&self, password: &str) -> Vec<OsString> {
        ARCHIVER_FLAGS
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(OsString::from(format!(
                "{PASSWORD_FLAG}{password}"
            ))))
            .chain(std::iter::once(self.output.as_os_str().to_owned()))
            .chain(self.directories.iter().map(|d| d.as_os_str().to_owned()))
            .collect()
    }
}

/// Runs the archiver for `job`. Launch failure and any unsuccessful exit are errors.
pub fn create_archive<A: Archiver + ?Sized>(
    archiver: &A,
    job: &ArchiveJob,
    output: &mut dyn Write,
) -> Result<()> {
    tracing::info!("Starting backup: {:?}", job.output);
    tracing::debug!("Running {} {:?}", archiver.program(), job.redacted_args());

    let status = archiver.run(&job.args(), output)?;
    if status.success() {
        tracing::info!("Archive created: {:?}", job.output);
        Ok(())
    } else {
        tracing::error!("{} execution failed: {}", archiver.program(), status);
        Err(Error::archiver_failed(archiver.program(), status.to_string()))
    }
}

/// Renames the staged archive into place.
pub fn move_archive<P1: AsRef<Path>, P2: AsRef<Path>>(src: P1, dst: P2) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    std::fs::rename(src, dst)
        .map_err(Error::from)
        .add_msg(format!("Failed to move archive {:?} to {:?}", src, dst))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records its arguments and, when told to succeed, creates the output archive.
    pub(crate) struct FakeArchiver {
        pub calls: RefCell<Vec<Vec<OsString>>>,
        pub exit_code: i32,
    }

    impl FakeArchiver {
        pub(crate) fn succeeding() -> Self {
            Self {
                calls: RefCell::new(vec![]),
                exit_code: 0,
            }
        }

        pub(crate) fn failing(exit_code: i32) -> Self {
            Self {
                calls: RefCell::new(vec![]),
                exit_code,
            }
        }
    }

    impl Archiver for FakeArchiver {
        fn program(&self) -> String {
            "fake-7z".to_string()
        }

        fn run(&self, args: &[OsString], output: &mut dyn Write) -> Result<ArchiverStatus> {
            self.calls.borrow_mut().push(args.to_vec());
            writeln!(output, "7-Zip (fake) output")?;
            if self.exit_code == 0 {
                std::fs::write(&args[ARCHIVER_FLAGS.len() + 1], b"archive")?;
            }
            Ok(ArchiverStatus::from_code(self.exit_code))
        }
    }

    fn password() -> RedactedString {
        RedactedString::from("s3cret")
    }

    #[test]
    fn test_args_fixed_order() {
        let password = password();
        let directories = vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")];
        let job = ArchiveJob {
            directories: &directories,
            output: Path::new("/backups/backup_2024-01-01_ABCDEF.7z"),
            password: &password,
        };

        let expected: Vec<OsString> = [
            "a",
            "-mx=0",
            "-mhe=on",
            "-mtm=on",
            "-mtc=on",
            "-mta=on",
            "-mtr=on",
            "-ps3cret",
            "/backups/backup_2024-01-01_ABCDEF.7z",
            "/data/a",
            "/data/b",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        assert_eq!(job.args(), expected);
    }

    #[test]
    fn test_redacted_args_hide_password() {
        let password = password();
        let job = ArchiveJob {
            directories: &[],
            output: Path::new("out.7z"),
            password: &password,
        };

        let redacted = job.redacted_args();
        assert!(redacted.iter().all(|a| !a.to_string_lossy().contains("s3cret")));
        assert_eq!(
            redacted[ARCHIVER_FLAGS.len()],
            OsString::from(format!("-p{REDACTED_PASSPHRASE}"))
        );
    }

    #[test]
    fn test_create_archive_success_writes_output() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("backup_2024-01-01_ABCDEF.7z");
        let password = password();
        let archiver = FakeArchiver::succeeding();
        let mut log = Vec::new();

        create_archive(
            &archiver,
            &ArchiveJob {
                directories: &[temp_dir.path().to_path_buf()],
                output: &out,
                password: &password,
            },
            &mut log,
        )
        .unwrap();

        assert!(out.is_file());
        assert_eq!(archiver.calls.borrow().len(), 1);
        assert_eq!(String::from_utf8(log).unwrap(), "7-Zip (fake) output\n");
    }

    #[test]
    fn test_create_archive_non_zero_exit_fails() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("backup_2024-01-01_ABCDEF.7z");
        let password = password();
        let archiver = FakeArchiver::failing(2);

        let err = create_archive(
            &archiver,
            &ArchiveJob {
                directories: &[],
                output: &out,
                password: &password,
            },
            &mut std::io::sink(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::ArchiverFailed { .. }));
        assert!(err.to_string().contains("exit code 2"));
        assert!(!out.exists());
    }

    #[test]
    fn test_move_archive() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.7z");
        let dst = temp_dir.path().join("dst.7z");
        std::fs::write(&src, "archive").unwrap();

        move_archive(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "archive");
    }

    #[test]
    fn test_move_archive_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = move_archive(temp_dir.path().join("nope"), temp_dir.path().join("dst")).unwrap_err();
        assert!(err.to_string().contains("Failed to move archive"));
    }

    #[test]
    fn test_archiver_status_display() {
        assert_eq!(ArchiverStatus::from_code(0).to_string(), "exit code 0");
        assert!(ArchiverStatus::from_code(0).success());
        assert!(!ArchiverStatus { code: None }.success());
        assert_eq!(ArchiverStatus { code: None }.to_string(), "terminated by signal");
    }
}
