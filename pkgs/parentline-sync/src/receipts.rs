//! Read receipt synchronization
//!
//! Opening a message marks it and every sibling of its broadcast group read
//! locally first. The server acknowledgment follows: when it fails, or the
//! device is offline, the row stays `Pending` and the next page fetch
//! carries it.
//!
//! ```text
//! Unread --open--> LocalRead --ack ok--> Synced
//!                      |
//!                      +--ack failed--> SyncFailed (Pending, retried on next fetch)
//! ```

use std::sync::Arc;

use chrono::Utc;
use parentline_store::{MessageStore, SentStatus};
use tracing::{debug, info, instrument, warn};

use crate::api::{PostsApi, ViewRequest};
use crate::error::{Result, SyncError};
use crate::invalidation::ListInvalidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptState {
    /// Read on the device, acknowledgment not attempted
    LocalRead,
    /// Server accepted the acknowledgment
    Synced,
    /// Acknowledgment failed; queued for the next page fetch
    SyncFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptTransition {
    pub message_id: i64,
    pub state: ReceiptState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub opened: i64,
    pub student_id: i64,
    pub student_number: String,
    pub transitions: Vec<ReceiptTransition>,
}

impl ReadOutcome {
    /// Whether anything was written
    pub fn changed(&self) -> bool {
        !self.transitions.is_empty()
    }

    pub fn state_of(&self, message_id: i64) -> Option<ReceiptState> {
        self.transitions
            .iter()
            .find(|t| t.message_id == message_id)
            .map(|t| t.state)
    }
}

pub struct ReadReceiptSynchronizer {
    api: Arc<dyn PostsApi>,
    store: Arc<MessageStore>,
    invalidator: ListInvalidator,
}

impl ReadReceiptSynchronizer {
    pub fn new(api: Arc<dyn PostsApi>, store: Arc<MessageStore>, invalidator: ListInvalidator) -> Self {
        Self {
            api,
            store,
            invalidator,
        }
    }

    /// Mark `message_id` and its group siblings read.
    ///
    /// Rows already read are left untouched, except that the opened row is
    /// re-acknowledged while online if its receipt is still pending.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, message_id: i64, online: bool) -> Result<ReadOutcome> {
        let opened = self
            .store
            .fetch_message(message_id)
            .await?
            .ok_or(SyncError::MessageNotFound(message_id))?;

        let now = Utc::now();
        let initial = if online {
            SentStatus::Acknowledged
        } else {
            SentStatus::Pending
        };

        let siblings = self
            .store
            .fetch_group_members(
                &opened.student_number,
                &opened.title,
                &opened.content,
                opened.sent_time,
            )
            .await?;

        let mut to_ack = Vec::new();
        if self.store.mark_read(opened.id, now, initial).await? {
            to_ack.push(opened.id);
        } else if online && opened.is_pending_ack() {
            debug!("Re-sending pending receipt for message {}", opened.id);
            self.store
                .mark_sent_status(opened.id, SentStatus::Acknowledged)
                .await?;
            to_ack.push(opened.id);
        }

        for sibling in siblings.iter().filter(|m| m.id != opened.id) {
            if sibling.read_status.is_read() {
                continue;
            }
            if self.store.mark_read(sibling.id, now, initial).await? {
                to_ack.push(sibling.id);
            }
        }

        let mut transitions = Vec::with_capacity(to_ack.len());
        let mut failed = Vec::new();
        for id in to_ack {
            let state = if online {
                self.acknowledge(id, opened.student_id, now).await
            } else {
                ReceiptState::LocalRead
            };
            if state == ReceiptState::SyncFailed {
                failed.push(id);
            }
            transitions.push(ReceiptTransition {
                message_id: id,
                state,
            });
        }
        // Every id is attempted before the failed ones go back to the queue
        self.store
            .mark_sent_status_many(&failed, SentStatus::Pending)
            .await?;

        if !transitions.is_empty() {
            info!(
                "Marked {} messages read from message {} (online: {})",
                transitions.len(),
                opened.id,
                online
            );
            self.invalidator.invalidate(&opened.student_number);
        }

        Ok(ReadOutcome {
            opened: opened.id,
            student_id: opened.student_id,
            student_number: opened.student_number,
            transitions,
        })
    }

    /// Send one acknowledgment
    async fn acknowledge(
        &self,
        post_id: i64,
        student_id: i64,
        viewed_at: chrono::DateTime<Utc>,
    ) -> ReceiptState {
        let request = ViewRequest {
            post_id,
            student_id,
            viewed_at,
        };

        match self.api.mark_viewed(&request).await {
            Ok(()) => ReceiptState::Synced,
            Err(e) => {
                warn!("Receipt for message {} not delivered: {}", post_id, e);
                ReceiptState::SyncFailed
            }
        }
    }
}
