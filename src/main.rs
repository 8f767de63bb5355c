use clap::Parser;
use restore_safe::backup::archiver::seven_zip::SevenZipArchiver;
use restore_safe::backup::backup_config::{BackupConfig, DEFAULT_CONFIG_FILE};
use restore_safe::backup::logging::{self, RunLog};
use restore_safe::backup::retention::log_trim::{trim_log, TrimOutcome};
use restore_safe::backup::run::BackupRun;
use std::path::PathBuf;
use std::process::exit;
use tracing::{debug, error, info, warn};

/// Back up directories with 7-Zip, prune old archives and mail a status report
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Echo the log on the console and wait for Enter before exiting
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let config = match BackupConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console();
            error!("Failed to load configuration: {e}");
            exit(1);
        }
    };
    let debug = args.debug || *config.debug_mode();
    let log_path = config.log_file_path();

    // before the log file is opened for appending, the rewrite replaces the file;
    // whatever it has to report is logged once the subscriber is installed
    let trimmed = log_path.exists().then(|| {
        trim_log(
            &log_path,
            *config.log_max_lines(),
            *config.log_max_age_days(),
        )
    });

    if let Err(e) = logging::init(&log_path, debug) {
        logging::init_console();
        error!("{e}");
        exit(1);
    }

    if debug {
        info!("Running in debug mode...");
        match serde_json::to_string_pretty(&config) {
            Ok(json) => debug!("Effective configuration:\n{json}"),
            Err(e) => warn!("Cannot render configuration: {e}"),
        }
    }
    info!("Logging to file: {:?}", log_path);
    match trimmed {
        Some(Ok(TrimOutcome::Trimmed {
            before,
            after,
            malformed,
        })) => {
            for bad in malformed {
                warn!(
                    "Error parsing time from log line: {:?}, error: {}",
                    bad.line, bad.error
                );
            }
            info!("Log trimmed from {before} to {after} lines")
        }
        Some(Ok(TrimOutcome::Unchanged { .. })) | None => {}
        Some(Err(e)) => warn!("Failed to trim log file: {e}"),
    }

    let notifier = match config.notification() {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!("Email notification disabled: {e}");
            None
        }
    };

    let res = RunLog::open(&log_path, debug).and_then(|mut output| {
        BackupRun::new(
            &config,
            SevenZipArchiver::new(config.archiver_path()),
            notifier,
        )
        .execute(&mut output)
    });

    match res {
        Ok(summary) => {
            info!("Archive stored at {:?}", summary.archive);
            info!("Backup process completed successfully!");
        }
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    }

    if args.debug {
        println!("Press Enter to exit.");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    }
}
