//! Operator alerts.
//!
//! Alerts go to a human-facing channel (chat, pager). Delivery is always
//! best-effort: a failed send is logged and never aborts the caller.

use async_trait::async_trait;
use embargo_core::{CollectionDescription, CollectionType};

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Warning,
    Danger,
}

/// One titled value shown on an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertField {
    pub title: String,
    pub message: String,
    /// Rendered side by side with other short fields.
    pub short: bool,
}

impl AlertField {
    pub fn new(title: impl Into<String>, message: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            short,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub severity: Severity,
    /// Target channel; `None` uses the alerter's default.
    pub channel: Option<String>,
    pub fields: Vec<AlertField>,
}

impl Alert {
    pub fn new(title: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            severity,
            channel: None,
            fields: Vec::new(),
        }
    }

    /// An alarm about a collection, carrying its type, id and name.
    pub fn collection_alarm(title: impl Into<String>, description: &CollectionDescription) -> Self {
        let publishing_type = match description.collection_type {
            CollectionType::Manual => "manual",
            CollectionType::Scheduled => "scheduled",
        };
        Self::new(title, Severity::Danger)
            .with_field(AlertField::new("Publishing Type", publishing_type, true))
            .with_field(AlertField::new("CollectionID", description.id.clone(), false))
            .with_field(AlertField::new("Collection Name", description.name.clone(), false))
    }

    pub fn with_field(mut self, field: AlertField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// The message of the first field with this title.
    pub fn field(&self, title: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.message.as_str())
    }
}

/// Delivers alerts to operators.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send(&self, alert: &Alert) -> anyhow::Result<()>;
}

/// Send an alert, logging instead of failing.
pub async fn send_quietly(alerter: &dyn Alerter, alert: &Alert) {
    if let Err(e) = alerter.send(alert).await {
        tracing::error!(title = %alert.title, error = %e, "failed to send alert");
    }
}

/// Writes alerts to the log. The default when no chat transport is wired in.
#[derive(Debug, Default, Clone)]
pub struct TracingAlerter;

#[async_trait]
impl Alerter for TracingAlerter {
    async fn send(&self, alert: &Alert) -> anyhow::Result<()> {
        let fields: Vec<String> = alert
            .fields
            .iter()
            .map(|f| format!("{}={}", f.title, f.message))
            .collect();
        let channel = alert.channel.as_deref().unwrap_or("default");

        match alert.severity {
            Severity::Danger => {
                tracing::error!(channel, title = %alert.title, fields = ?fields, "alert")
            }
            Severity::Warning => {
                tracing::warn!(channel, title = %alert.title, fields = ?fields, "alert")
            }
            Severity::Good => {
                tracing::info!(channel, title = %alert.title, fields = ?fields, "alert")
            }
        }
        Ok(())
    }
}
