//! Keyset cursor for paging through a student's messages

use chrono::{DateTime, Utc};
use parentline_store::Message;
use serde::{Deserialize, Serialize};

/// Position in a student's message history, taken from the last row of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub last_post_id: i64,
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl PaginationCursor {
    pub fn first_page() -> Self {
        Self {
            last_post_id: 0,
            last_sent_at: None,
        }
    }

    /// Cursor continuing after `page`, or `None` for an empty page
    pub fn after(page: &[Message]) -> Option<Self> {
        page.last().map(|last| Self {
            last_post_id: last.id,
            last_sent_at: Some(last.sent_time),
        })
    }

    pub fn is_first_page(&self) -> bool {
        self.last_post_id == 0
    }
}
