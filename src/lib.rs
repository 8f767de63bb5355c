//! # restore_safe
//!
//! A run-once backup tool: hands a set of directories to 7-Zip for an encrypted, store-only
//! archive, keeps the newest archives, trims its own log and mails a status summary.
//!
//! ## Features
//!
//! - **Archiving**: 7-Zip with header encryption, timestamps and attributes preserved
//! - **Staging**: optional temp directory, archive moved into place afterwards
//! - **Retention**: keep the N most recent archives by modification time
//! - **Log trimming**: by age (timestamp aware) or by line count
//! - **Notification**: log tail by SMTP, full log attached
//!
//! Scheduling is left to cron or the Task Scheduler; every invocation is one run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restore_safe::backup::archiver::seven_zip::SevenZipArchiver;
//! use restore_safe::backup::backup_config::BackupConfig;
//! use restore_safe::backup::run::BackupRun;
//!
//! let config = BackupConfig::load("config.json")?;
//! let archiver = SevenZipArchiver::new(config.archiver_path());
//! let run = BackupRun::new(&config, archiver, config.notification()?);
//! let summary = run.execute(&mut std::io::stdout())?;
//! println!("Created {:?}", summary.archive);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
