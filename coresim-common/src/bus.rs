//! Internal event bus
//!
//! A registry of named mailboxes. Each mailbox is a bounded channel drained
//! by its own tokio task which invokes the registered handler once per
//! message, in FIFO order. Producers address mailboxes by name and never
//! block: a full or missing mailbox is reported back to the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::messages::BusPayload;

/// Default mailbox depth.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// A message in flight between two named tasks.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Sender mailbox name
    pub from: String,
    /// Recipient mailbox name
    pub to: String,
    /// Tagged payload
    pub payload: BusPayload,
}

/// Errors reported to bus callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// A mailbox with this name is already registered.
    #[error("task {0} already exists")]
    TaskExists(String),

    /// No mailbox is registered under the destination name.
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),

    /// The destination mailbox is full.
    #[error("mailbox of {0} is full")]
    MailboxFull(String),
}

/// Process-local registry of named mailboxes.
///
/// Cloning shares the registry.
#[derive(Clone, Default)]
pub struct Bus {
    mailboxes: Arc<RwLock<HashMap<String, mpsc::Sender<BusMessage>>>>,
}

impl Bus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mailbox under `name` and spawns its consumer task.
    ///
    /// The handler is invoked once per message in arrival order; the task
    /// ends when the mailbox is removed via [`Bus::stop_task`].
    pub fn start_task<F, Fut>(
        &self,
        name: &str,
        capacity: usize,
        mut handler: F,
    ) -> Result<(), BusError>
    where
        F: FnMut(BusMessage) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel(capacity);
        {
            let mut mailboxes = self
                .mailboxes
                .write()
                .unwrap_or_else(|e| e.into_inner());
            if mailboxes.contains_key(name) {
                return Err(BusError::TaskExists(name.to_string()));
            }
            mailboxes.insert(name.to_string(), tx);
        }

        let task_name = name.to_string();
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                handler(msg).await;
            }
            debug!("bus task {task_name} stopped");
        });

        Ok(())
    }

    /// Enqueues a message for `to` without waiting.
    pub fn send(&self, from: &str, to: &str, payload: BusPayload) -> Result<(), BusError> {
        let mailboxes = self
            .mailboxes
            .read()
            .unwrap_or_else(|e| e.into_inner());
        let tx = mailboxes
            .get(to)
            .ok_or_else(|| BusError::UnknownRecipient(to.to_string()))?;

        tx.try_send(BusMessage {
            from: from.to_string(),
            to: to.to_string(),
            payload,
        })
        .map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BusError::MailboxFull(to.to_string()),
            mpsc::error::TrySendError::Closed(_) => BusError::UnknownRecipient(to.to_string()),
        })
    }

    /// Removes a mailbox; its consumer task ends after draining.
    ///
    /// Returns true if the mailbox existed.
    pub fn stop_task(&self, name: &str) -> bool {
        self.mailboxes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some()
    }

    /// Returns true if a mailbox is registered under `name`.
    pub fn has_task(&self, name: &str) -> bool {
        self.mailboxes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }
}
