//! Cursor-paginated message sync
//!
//! Each page request carries the ids of every message read on this device
//! whose receipt is still pending, so the fetch doubles as a bulk
//! acknowledgment. Pages are persisted before the cursor is handed back.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use parentline_store::{LocalMessage, Message, MessageStore, SentStatus, Student};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::{FetchPostsRequest, PostsApi, RemotePost};
use crate::config::SyncConfig;
use crate::cursor::PaginationCursor;
use crate::error::{Result, SyncError};

/// Result of one successful page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub student_id: i64,
    pub messages: Vec<Message>,
    pub next_cursor: Option<PaginationCursor>,
    pub has_more: bool,
    /// Receipts the server accepted with this request
    pub flushed_acks: Vec<i64>,
}

pub struct PageFetcher {
    api: Arc<dyn PostsApi>,
    store: Arc<MessageStore>,
    config: SyncConfig,
    in_flight: Mutex<HashSet<i64>>,
}

/// Releases the per-student slot when the fetch ends, however it ends
struct InFlightSlot<'a> {
    slots: &'a Mutex<HashSet<i64>>,
    student_id: i64,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        lock(self.slots).remove(&self.student_id);
    }
}

fn lock(slots: &Mutex<HashSet<i64>>) -> MutexGuard<'_, HashSet<i64>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PageFetcher {
    pub fn new(api: Arc<dyn PostsApi>, store: Arc<MessageStore>, config: SyncConfig) -> Self {
        Self {
            api,
            store,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_in_flight(&self, student_id: i64) -> bool {
        lock(&self.in_flight).contains(&student_id)
    }

    fn claim(&self, student_id: i64) -> Result<InFlightSlot<'_>> {
        if !lock(&self.in_flight).insert(student_id) {
            return Err(SyncError::FetchInFlight(student_id));
        }
        Ok(InFlightSlot {
            slots: &self.in_flight,
            student_id,
        })
    }

    /// Fetch and persist one page. `None` requests the newest page.
    ///
    /// On error nothing is written: the cursor stays where it was and the
    /// pending receipts stay pending for the next attempt.
    #[instrument(skip(self, student, cursor), fields(student_id = student.id))]
    pub async fn fetch_page(
        &self,
        student: &Student,
        cursor: Option<&PaginationCursor>,
    ) -> Result<FetchedPage> {
        let _slot = self.claim(student.id)?;

        let pending = self.store.fetch_pending_acks(&student.student_number).await?;
        let request = FetchPostsRequest::new(student.id, pending, cursor);

        let posts = self.api.fetch_posts(&request).await.map_err(|e| {
            warn!("Page fetch for student {} failed: {}", student.id, e);
            e
        })?;

        let messages: Vec<Message> = posts.into_iter().map(Message::from).collect();
        self.store
            .save_messages(&messages, &student.student_number, student.id)
            .await?;

        let flushed_acks = request.read_post_ids;
        self.store
            .mark_sent_status_many(&flushed_acks, SentStatus::Acknowledged)
            .await?;

        let next_cursor = PaginationCursor::after(&messages);
        let has_more = messages.len() >= self.config.page_size;

        info!(
            "Synced {} messages for student {} ({} receipts flushed, more: {})",
            messages.len(),
            student.id,
            flushed_acks.len(),
            has_more
        );

        Ok(FetchedPage {
            student_id: student.id,
            messages,
            next_cursor,
            has_more,
            flushed_acks,
        })
    }

    /// Cached rows for the offline path
    pub async fn load_cached(
        &self,
        student: &Student,
        offset: Option<u64>,
    ) -> Result<Vec<LocalMessage>> {
        Ok(self
            .store
            .fetch_messages(&student.student_number, offset)
            .await?)
    }

    /// Fetch a single message by id, bounded by the configured timeout
    pub async fn fetch_single(&self, id: i64, cancel: &CancellationToken) -> Result<RemotePost> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Single fetch of message {} cancelled", id);
                Err(SyncError::Cancelled)
            }
            result = tokio::time::timeout(self.config.single_fetch_timeout, self.api.fetch_post(id)) => {
                match result {
                    Ok(post) => post,
                    Err(_) => {
                        warn!("Single fetch of message {} timed out", id);
                        Err(SyncError::Timeout)
                    }
                }
            }
        }
    }

    /// Local row for `id`, fetching it on a miss.
    ///
    /// Used when a deep link targets a message the list has not synced yet.
    /// If the row is still missing after the fetch, the id the server
    /// answered with is tried once before giving up.
    #[instrument(skip(self, student, cancel), fields(student_id = student.id))]
    pub async fn resolve_message(
        &self,
        student: &Student,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<LocalMessage> {
        if let Some(local) = self.owned_message(student, id, id).await? {
            return Ok(local);
        }

        debug!("Message {} not cached, fetching", id);
        let post = self.fetch_single(id, cancel).await?;
        let server_id = post.id;
        if server_id != id {
            // Saving would move a row stored for another student
            self.owned_message(student, server_id, id).await?;
        }
        let message = Message::from(post);
        self.store
            .save_messages(
                std::slice::from_ref(&message),
                &student.student_number,
                student.id,
            )
            .await?;

        if let Some(local) = self.owned_message(student, id, id).await? {
            return Ok(local);
        }
        if server_id != id {
            if let Some(local) = self.owned_message(student, server_id, id).await? {
                info!("Message {} resolved under server id {}", id, server_id);
                return Ok(local);
            }
        }

        Err(SyncError::MessageNotFound(id))
    }

    /// Local row for `id`; a row stored for another student is a miss on `requested`
    async fn owned_message(
        &self,
        student: &Student,
        id: i64,
        requested: i64,
    ) -> Result<Option<LocalMessage>> {
        match self.store.fetch_message(id).await? {
            Some(local) if local.student_id != student.id => {
                debug!(
                    "Message {} belongs to student {}, not {}",
                    id, local.student_id, student.id
                );
                Err(SyncError::MessageNotFound(requested))
            }
            found => Ok(found),
        }
    }
}
