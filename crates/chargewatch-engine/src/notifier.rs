//! FULL-transition notifications
//!
//! [`NotifierGate`] decides which committed transitions deserve a message
//! and hands each one to a [`Notifier`] on its own task, so a slow or failing
//! endpoint never holds up polling.

use crate::slots::{SLOT_COUNT, SlotState, TransitionEvent};
use crate::snapshot::summarize;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification endpoint answered HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// 0-based slot index.
    pub slot: usize,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn slot_full(slot: usize, states: &[SlotState; SLOT_COUNT]) -> Self {
        let title = format!("BC-211 Slot {} FULL", slot + 1);
        let body = format!("{title}\nCurrent states: {}", summarize(states));
        Self { slot, title, body }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Clone, Default)]
pub struct NotifierGate {
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotifierGate {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    /// A gate that never sends anything.
    pub fn disabled() -> Self {
        Self { notifier: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Entering FULL from a real reading. Leaving UNKNOWN is the first
    /// reading after start and stays silent.
    pub fn should_notify(event: &TransitionEvent) -> bool {
        event.current == SlotState::Full
            && matches!(
                event.previous,
                SlotState::Empty | SlotState::Charging | SlotState::Error
            )
    }

    /// Messages owed for one cycle's events, in slot order.
    pub fn notifications_for(
        events: &[TransitionEvent],
        states: &[SlotState; SLOT_COUNT],
    ) -> Vec<Notification> {
        events
            .iter()
            .filter(|e| Self::should_notify(e))
            .map(|e| Notification::slot_full(e.slot, states))
            .collect()
    }

    /// Spawn one send per qualifying event. Must be called inside a Tokio
    /// runtime. The returned handles may be dropped.
    pub fn dispatch(
        &self,
        events: &[TransitionEvent],
        states: &[SlotState; SLOT_COUNT],
    ) -> Vec<JoinHandle<()>> {
        let Some(notifier) = &self.notifier else {
            return Vec::new();
        };

        Self::notifications_for(events, states)
            .into_iter()
            .map(|notification| {
                let notifier = Arc::clone(notifier);
                debug!(slot = notification.slot + 1, "Dispatching FULL notification");
                tokio::spawn(async move {
                    match notifier.notify(&notification).await {
                        Ok(()) => info!(slot = notification.slot + 1, "Notification sent"),
                        Err(e) => warn!(
                            slot = notification.slot + 1,
                            error = %e,
                            "Notification failed"
                        ),
                    }
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for NotifierGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

pub mod mock {
    //! Notifier that records instead of sending.

    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        fail: Mutex<bool>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().clone()
        }

        /// Make every later call fail after recording the attempt.
        pub fn fail_all(&self) {
            *self.fail.lock() = true;
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().push(notification.clone());
            if *self.fail.lock() {
                return Err(NotifyError::Transport("injected failure".into()));
            }
            Ok(())
        }
    }
}
