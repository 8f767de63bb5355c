use crate::backup::function_path;
use crate::backup::notifications::Notification;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{AddFunctionName, AddMsg};
use bon::Builder;
use function_name::named;
use getset::Getters;
use itertools::Itertools;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;

/// SMTP delivery settings for the status email
///
/// Credentials are only present when the config enables SMTP auth. When `attachment` is set
/// the file is read at send time and attached as plain text.
#[derive(Clone, Debug, Builder, Getters)]
#[getset(get = "pub")]
pub struct SmtpNotificationConfig {
    #[builder(into)]
    host: String,
    port: u16,
    #[builder(into)]
    smtp_mode: SmtpMode,
    #[builder(into)]
    from: Mailbox,
    #[builder(into)]
    to: Mailbox,
    credentials: Option<Credentials>,
    attachment: Option<PathBuf>,
}

/// SMTP connection security modes
///
/// - `Unsecured`: Plain text connection (not recommended for production)
/// - `Ssl`: SSL/TLS encrypted connection from start
/// - `StartTls`: Start with plain text, then upgrade to TLS
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmtpMode {
    Unsecured,
    Ssl,
    StartTls,
}

impl SmtpMode {
    /// 465 is implicit TLS, everything else negotiates STARTTLS.
    pub fn for_port(port: u16) -> Self {
        match port {
            465 => SmtpMode::Ssl,
            _ => SmtpMode::StartTls,
        }
    }
}

impl SmtpNotificationConfig {
    fn build_message<D1: Display, D2: Display>(&self, topic: D1, msg: D2) -> Result<Message> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("{}", topic));

        match &self.attachment {
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(format!("{}", msg))
                .map_err(Error::from),
            Some(path) => {
                let content = std::fs::read(path)
                    .map_err(Error::from)
                    .add_msg(format!("Failed to read attachment {:?}", path))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "backup.log".to_string());
                builder
                    .multipart(
                        MultiPart::mixed()
                            .singlepart(SinglePart::plain(format!("{}", msg)))
                            .singlepart(
                                Attachment::new(file_name).body(content, ContentType::TEXT_PLAIN),
                            ),
                    )
                    .map_err(Error::from)
            }
        }
    }
}

impl Notification for SmtpNotificationConfig {
    #[named]
    fn send<D1: Display, D2: Display>(&self, topic: D1, msg: D2) -> Result<()> {
        tracing::info!(
            "Started smtp email notification from {} to {}",
            self.from,
            self.to
        );
        let email = self
            .build_message(topic, msg)
            .add_msg(format!(
                "Fail to build notification email from {} to {}",
                self.from, self.to
            ))
            .add_fn_name(function_path!())?;

        let builder = match self.smtp_mode {
            SmtpMode::Unsecured => Ok(SmtpTransport::builder_dangerous(self.host.as_str())),
            SmtpMode::Ssl => SmtpTransport::relay(self.host.as_str()),
            SmtpMode::StartTls => SmtpTransport::starttls_relay(self.host.as_str()),
        }
        .map_err(Error::from)
        .add_msg(format!(
            "Failed to build smtp client for host: {:?} with mode {:?}",
            self.host, self.smtp_mode
        ))
        .add_fn_name(function_path!())?
        .port(self.port);

        let mailer = match &self.credentials {
            Some(creds) => builder.credentials(creds.clone()),
            None => builder,
        }
        .build();

        tracing::info!("Sending email via {}:{}", self.host, self.port);
        let response = mailer
            .send(&email)
            .map_err(Error::from)
            .add_fn_name(function_path!())?;
        if response.is_positive() {
            Ok(())
        } else {
            let error_vec = response
                .message()
                .map(|m| Error::smtp_send_error(m.to_owned()))
                .collect_vec();
            if error_vec.is_empty() {
                Err(Error::smtp_send_error(format!("smtp code {}", response.code())))
            } else {
                Err(Error::from(error_vec))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mailbox(s: &str) -> Mailbox {
        s.parse::<Mailbox>().unwrap()
    }

    #[test]
    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    fn test_smtp_notification_send() {
        use std::env;

        // Skip if running in CI or without network
        if env::var("CI").is_ok() {
            return;
        }

        let server = maik::MockServer::builder().no_verify_credentials().build();

        let config = SmtpNotificationConfig::builder()
            .host(server.host().to_string())
            .port(server.port())
            .smtp_mode(SmtpMode::Unsecured)
            .from(mailbox("backup@example.com"))
            .to(mailbox("ops@example.com"))
            .build();

        server.start();
        std::thread::sleep(std::time::Duration::from_millis(100));

        let result = config.send("Backup Status", "Backup process completed successfully!");

        std::thread::sleep(std::time::Duration::from_millis(200));

        if result.is_ok() {
            let assertion = maik::MailAssertion::new()
                .recipients_are(["ops@example.com"])
                .body_is("Backup process completed successfully!");
            assert!(server.assert(assertion));
        }
    }

    #[test]
    fn test_smtp_mode_for_port() {
        assert_eq!(SmtpMode::for_port(465), SmtpMode::Ssl);
        assert_eq!(SmtpMode::for_port(587), SmtpMode::StartTls);
        assert_eq!(SmtpMode::for_port(25), SmtpMode::StartTls);
    }

    #[test]
    fn test_smtp_mode_serialization() {
        let modes = vec![
            (SmtpMode::Unsecured, "\"Unsecured\""),
            (SmtpMode::Ssl, "\"Ssl\""),
            (SmtpMode::StartTls, "\"StartTls\""),
        ];

        for (mode, expected) in modes {
            let serialized = serde_json::to_string(&mode).unwrap();
            assert_eq!(serialized, expected);
            let deserialized: SmtpMode = serde_json::from_str(&serialized).unwrap();
            assert_eq!(deserialized, mode);
        }
    }

    #[test]
    fn test_build_message_with_attachment() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("backup.log");
        std::fs::write(&log, "[2024-05-01 10:00:00] INFO done\n").unwrap();

        let config = SmtpNotificationConfig::builder()
            .host("smtp.example.com")
            .port(587)
            .smtp_mode(SmtpMode::StartTls)
            .from(mailbox("backup@example.com"))
            .to(mailbox("ops@example.com"))
            .attachment(log)
            .build();

        let message = config.build_message("Backup Status", "line 1\nline 2").unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: Backup Status"));
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("filename=\"backup.log\""));
    }

    #[test]
    fn test_build_message_missing_attachment_fails() {
        let temp_dir = TempDir::new().unwrap();

        let config = SmtpNotificationConfig::builder()
            .host("smtp.example.com")
            .port(587)
            .smtp_mode(SmtpMode::StartTls)
            .from(mailbox("backup@example.com"))
            .to(mailbox("ops@example.com"))
            .attachment(temp_dir.path().join("missing.log"))
            .build();

        assert!(config.build_message("Backup Status", "body").is_err());
    }
}
