// snapcart/apps/api/src/services/notifier.rs

//! Outbound email and SMS. Providers are plain calls returning `anyhow::Result`;
//! callers decide whether a failure matters.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  Email,
  Sms,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
  pub message_id: String,
  pub channel: Channel,
  pub to: String,
  pub subject: Option<String>,
  pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<SentMessage>;
  async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<SentMessage>;
}

/// Logs messages and keeps them in an outbox instead of calling a provider.
pub struct LogNotifier {
  sender: String,
  fail_email: bool,
  outbox: Mutex<Vec<SentMessage>>,
}

impl LogNotifier {
  pub fn new(sender: impl Into<String>) -> Self {
    Self {
      sender: sender.into(),
      fail_email: false,
      outbox: Mutex::new(Vec::new()),
    }
  }

  /// Every email send fails. SMS still works.
  pub fn failing_email(sender: impl Into<String>) -> Self {
    Self {
      fail_email: true,
      ..Self::new(sender)
    }
  }

  pub fn sent(&self) -> Vec<SentMessage> {
    self.outbox.lock().clone()
  }

  /// Body of the newest SMS sent to `to`.
  pub fn last_sms_to(&self, to: &str) -> Option<String> {
    self
      .outbox
      .lock()
      .iter()
      .rev()
      .find(|m| m.channel == Channel::Sms && m.to == to)
      .map(|m| m.body.clone())
  }

  fn record(&self, message: SentMessage) -> SentMessage {
    self.outbox.lock().push(message.clone());
    message
  }
}

#[async_trait]
impl Notifier for LogNotifier {
  async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<SentMessage> {
    if self.fail_email {
      warn!(%to, %subject, "Email provider rejected the message.");
      anyhow::bail!("email provider unavailable");
    }
    let message_id = format!("email_{}", Uuid::new_v4());
    info!(%to, from = %self.sender, %subject, %message_id, "Email sent.");
    Ok(self.record(SentMessage {
      message_id,
      channel: Channel::Email,
      to: to.to_string(),
      subject: Some(subject.to_string()),
      body: html_body.to_string(),
    }))
  }

  async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<SentMessage> {
    let message_id = format!("sms_{}", Uuid::new_v4());
    info!(%to, %message_id, "SMS sent.");
    Ok(self.record(SentMessage {
      message_id,
      channel: Channel::Sms,
      to: to.to_string(),
      subject: None,
      body: body.to_string(),
    }))
  }
}
