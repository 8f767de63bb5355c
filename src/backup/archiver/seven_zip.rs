use crate::backup::archiver::{Archiver, ArchiverStatus};
use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use function_name::named;
use std::ffi::OsString;
use std::io::{pipe, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Runs a 7-Zip compatible binary (`7z`, `7za`, `7zz`) as a child process.
///
/// Stdout and stderr share one pipe, so the log sees them interleaved as printed and as
/// soon as they are printed. Blocks until the process exits; there is no timeout.
#[derive(Clone, Debug)]
pub struct SevenZipArchiver {
    program: PathBuf,
}

impl SevenZipArchiver {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Archiver for SevenZipArchiver {
    fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    #[named]
    fn run(&self, args: &[OsString], output: &mut dyn Write) -> Result<ArchiverStatus> {
        let (mut reader, writer) = pipe()
            .map_err(Error::from)
            .add_fn_name(function_path!())?;

        // the Command holds write ends of the pipe, it must be gone before reading to EOF
        let mut child = {
            let mut command = Command::new(&self.program);
            command
                .args(args)
                .stdin(Stdio::null())
                .stdout(writer.try_clone()?)
                .stderr(writer);
            command
                .spawn()
                .map_err(Error::from)
                .add_msg(format!("Failed to launch archiver {:?}", self.program))
                .add_fn_name(function_path!())?
        };

        let copied = std::io::copy(&mut reader, output).and_then(|_| output.flush());
        drop(reader);
        let status = child
            .wait()
            .map_err(Error::from)
            .add_msg(format!("Failed to wait for archiver {:?}", self.program))
            .add_fn_name(function_path!())?;
        copied
            .map_err(Error::from)
            .add_msg("Failed to write archiver output to the log")?;

        Ok(status.into())
    }
}
