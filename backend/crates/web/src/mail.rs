//! Mail
//!
//! Outgoing mail goes through [`Mailer`]. Delivery is not part of the
//! framework: [`LogMailer`] writes the message to the log and
//! [`MemoryMailer`] keeps it for inspection.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A templated message
#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    /// Template name under `emails/`
    pub template: String,
    pub context: Value,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: &Mail) -> Result<(), MailError>;
}

/// Records every message as a log event instead of delivering it
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &Mail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            template = %mail.template,
            "Mail queued (log transport)"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Mail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn sent(&self) -> Vec<Mail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &Mail) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|_| MailError::Delivery("mailbox lock poisoned".to_string()))?
            .push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn welcome() -> Mail {
        Mail {
            to: "ada@example.com".to_string(),
            subject: "Welcome".to_string(),
            template: "welcome".to_string(),
            context: json!({ "name": "Ada" }),
        }
    }

    #[test]
    fn test_log_mailer_accepts_everything() {
        assert!(LogMailer.send(&welcome()).is_ok());
    }

    #[test]
    fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        mailer.send(&welcome()).unwrap();

        let shared = mailer.clone();
        assert_eq!(shared.sent(), vec![welcome()]);
    }
}
