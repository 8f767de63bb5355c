//! Run log setup.
//!
//! Every record goes to the log file behind `[YYYY-MM-DD HH:MM:SS]`, which is the prefix the
//! log trimmer understands. In debug mode the same records are echoed on stdout.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::retention::log_trim::LOG_TIME_FORMAT;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{Stdout, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Local wall clock in brackets: `[2024-06-10 12:00:00]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BracketedLocalTime;

impl FormatTime for BracketedLocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Local::now().format(LOG_TIME_FORMAT))
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::from)
        .add_msg(format!("Failed to open log file {:?}", path))
}

/// Installs the global subscriber: file layer always, stdout layer in debug mode.
pub fn init<P: AsRef<Path>>(log_path: P, debug: bool) -> Result<()> {
    let log_file = open_append(log_path.as_ref())?;
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let file_layer = fmt::layer()
        .with_timer(BracketedLocalTime)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(level);
    let console_layer = debug.then(|| {
        fmt::layer()
            .with_timer(BracketedLocalTime)
            .with_writer(std::io::stdout)
            .with_filter(level)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| Error::logging_init(e.to_string()))
}

/// Console-only logging for failures that happen before the log file is known.
pub fn init_console() {
    let _ = fmt()
        .with_timer(BracketedLocalTime)
        .with_max_level(LevelFilter::INFO)
        .try_init();
}

/// Raw sink for archiver output: appended to the log file, echoed on stdout in debug mode.
pub struct RunLog {
    file: File,
    console: Option<Stdout>,
}

impl RunLog {
    pub fn open<P: AsRef<Path>>(log_path: P, debug: bool) -> Result<Self> {
        Ok(Self {
            file: open_append(log_path.as_ref())?,
            console: debug.then(std::io::stdout),
        })
    }
}

impl Write for RunLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write_all(buf)?;
        if let Some(console) = self.console.as_mut() {
            console.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        if let Some(console) = self.console.as_mut() {
            console.flush()?;
        }
        Ok(())
    }
}
