use crate::backup::notifications::smtp::{SmtpMode, SmtpNotificationConfig};
use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use crate::backup::validate::{validate_dir_exist_or_created, validate_file_name};
use bon::Builder;
use getset::Getters;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static DEFAULT_CONFIG_FILE: &str = "config.json";
static DEFAULT_LOG_FILE_NAME: &str = "backup.log";
static DEFAULT_ARCHIVER: &str = "7z";

/// Settings for one backup run, read from a flat JSON object.
///
/// Loaded once at startup and handed by reference to every step of the run.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(default, deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupConfig {
    #[builder(default, into)]
    directories: Vec<PathBuf>,
    #[validate(custom(function = validate_dir_exist_or_created))]
    #[builder(into)]
    backup_dir: PathBuf,
    #[builder(default, into)]
    temp_dir: PathBuf,
    #[validate(nested)]
    #[builder(into)]
    password: RedactedString,
    #[builder(default)]
    retain_recent_backups: usize,
    #[validate(custom(function = validate_file_name))]
    #[builder(default = DEFAULT_LOG_FILE_NAME.to_string(), into)]
    log_file_name: String,
    #[builder(default)]
    debug_mode: bool,
    #[builder(default = PathBuf::from(DEFAULT_ARCHIVER), into)]
    archiver_path: PathBuf,
    #[builder(default = 1000)]
    log_max_lines: usize,
    #[builder(default = 5)]
    log_max_age_days: u32,
    #[builder(default, into)]
    email_recipient: String,
    #[builder(default, into)]
    email_sender: String,
    #[builder(default, into)]
    email_smtp_server: String,
    #[builder(default = 587)]
    email_smtp_port: u16,
    email_smtp_mode: Option<SmtpMode>,
    #[builder(default)]
    email_smtp_auth_enabled: bool,
    #[builder(default, into)]
    email_smtp_user: String,
    #[builder(default, into)]
    email_smtp_password: RedactedString,
    #[builder(default = 20)]
    email_tail_lines: usize,
    #[builder(default = true)]
    email_attach_log: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig::builder()
            .backup_dir(PathBuf::new())
            .password(RedactedString::default())
            .build()
    }
}

impl BackupConfig {
    /// Reads and validates the configuration file.
    ///
    /// A missing or empty `backup_dir` or `password` fails here, as does any unknown key.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config: BackupConfig = File::open(path)
            .map_err(Error::from)
            .add_msg(format!("Failed to open config file: {:?}", path))
            .and_then(|f| {
                serde_json::from_reader(BufReader::new(f))
                    .map_err(Error::from)
                    .add_msg(format!("Failed to decode config JSON: {:?}", path))
            })?;

        config
            .validate()
            .map_err(Error::from)
            .add_msg(format!("Config validation failed: {:?}", path))?;

        Ok(config)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.backup_dir.join(&self.log_file_name)
    }

    /// Builds the SMTP notifier, or `None` when no recipient or server is configured.
    pub fn notification(&self) -> Result<Option<SmtpNotificationConfig>> {
        if self.email_recipient.trim().is_empty() || self.email_smtp_server.trim().is_empty() {
            return Ok(None);
        }

        let from: Mailbox = self
            .email_sender
            .parse()
            .map_err(Error::from)
            .add_msg(format!("Invalid email_sender {:?}", self.email_sender))?;
        let to: Mailbox = self
            .email_recipient
            .parse()
            .map_err(Error::from)
            .add_msg(format!("Invalid email_recipient {:?}", self.email_recipient))?;

        let smtp_mode = self
            .email_smtp_mode
            .clone()
            .unwrap_or_else(|| SmtpMode::for_port(self.email_smtp_port));

        let credentials = self.email_smtp_auth_enabled.then(|| {
            Credentials::new(
                self.email_smtp_user.clone(),
                self.email_smtp_password.inner().clone(),
            )
        });

        let attachment = self.email_attach_log.then(|| self.log_file_path());

        Ok(Some(
            SmtpNotificationConfig::builder()
                .host(self.email_smtp_server.trim())
                .port(self.email_smtp_port)
                .smtp_mode(smtp_mode)
                .from(from)
                .to(to)
                .maybe_credentials(credentials)
                .maybe_attachment(attachment)
                .build(),
        ))
    }
}
