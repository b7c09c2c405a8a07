//! Start-up alerts for the locked publishing queue.
//!
//! After a restart the keyring cache holds nothing until an administrator
//! logs in, so scheduled publishing cannot decrypt content. On start-up the
//! service warns every configured channel; the first admin login posts the
//! resolution to the channels that got the warning.

use std::sync::Arc;

use tokio::sync::Mutex;

use embargo_core::now_millis;

use crate::alert::{Alert, AlertField, Alerter, Severity};

pub const QUEUE_LOCKED_TITLE: &str = "Publishing system restart complete";
pub const QUEUE_UNLOCKED_TITLE: &str = "Publishing queue unlocked";

#[derive(Debug)]
struct QueueState {
    locked: bool,
    warning_sent: bool,
    /// Channels that received the warning.
    warned: Vec<String>,
}

pub struct StartupAlerter {
    alerter: Arc<dyn Alerter>,
    channels: Vec<String>,
    state: Mutex<QueueState>,
}

impl StartupAlerter {
    pub fn new(alerter: Arc<dyn Alerter>, channels: Vec<String>) -> Self {
        Self {
            alerter,
            channels,
            state: Mutex::new(QueueState {
                locked: true,
                warning_sent: false,
                warned: Vec::new(),
            }),
        }
    }

    /// Warn every channel that the queue is locked. Only the first call sends.
    pub async fn queue_locked(&self) {
        let mut state = self.state.lock().await;
        if !state.locked || state.warning_sent {
            return;
        }

        for channel in &self.channels {
            let alert = Alert::new(QUEUE_LOCKED_TITLE, Severity::Warning)
                .with_channel(channel.clone())
                .with_field(AlertField::new(
                    "Administrator log in required",
                    "Please log out of any existing session and log in again to unlock the publishing queue.",
                    false,
                ));

            match self.alerter.send(&alert).await {
                Ok(()) => state.warned.push(channel.clone()),
                Err(e) => tracing::error!(channel = %channel, error = %e, "failed to send start-up alert"),
            }
        }
        state.warning_sent = true;
    }

    /// Post the resolution. Does nothing unless the warning went out first,
    /// and only the first call after it sends.
    pub async fn queue_unlocked(&self) {
        let mut state = self.state.lock().await;
        if !state.locked || !state.warning_sent {
            return;
        }

        if state.warned.is_empty() {
            tracing::error!("queue unlocked but no start-up warning was delivered to resolve");
        }

        let message = format!("Publishing queue successfully unlocked at {}", now_millis());
        for channel in &state.warned {
            let alert = Alert::new(QUEUE_UNLOCKED_TITLE, Severity::Good)
                .with_channel(channel.clone())
                .with_field(AlertField::new("Resolved", message.clone(), false));

            if let Err(e) = self.alerter.send(&alert).await {
                tracing::error!(channel = %channel, error = %e, "failed to send queue unlocked alert");
            }
        }
        state.locked = false;
        tracing::info!("publishing queue unlocked");
    }

    pub async fn is_locked(&self) -> bool {
        self.state.lock().await.locked
    }
}
