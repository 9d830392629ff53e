//! Parentline Store - on-device cache for the Parentline mobile client
//!
//! This crate provides SQLite-based persistent storage using Sea-ORM for the
//! messages a parent receives about their children, together with the
//! read/acknowledgment state of each message.
//!
//! # Architecture
//!
//! - **MessageStore**: message rows, idempotent upserts, read marking and the
//!   derived pending-acknowledgment query
//! - **StudentStore**: the students known on this device
//!
//! # Database Schema
//!
//! - `messages`: remote message fields plus `student_number`, `student_id`,
//!   `read_time` and `sent_status`
//! - `students`: server id, student number, name and class
//!
//! Pending acknowledgments are never stored in a table of their own. They are
//! the rows with `read_status = 1` and `sent_status = 0`, so a restart never
//! loses a read receipt that has not reached the server.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use parentline_store::{Message, MessageStore, Priority, ReadStatus, StoreConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MessageStore::with_config(StoreConfig {
//!     db_path: "parentline.db".into(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! let msg = Message {
//!     id: 42,
//!     title: "Trip".to_string(),
//!     content: "Bus leaves at 8:00".to_string(),
//!     priority: Priority::High,
//!     group_name: Some("5B".to_string()),
//!     edited_at: None,
//!     images: vec![],
//!     sent_time: chrono::Utc::now(),
//!     viewed_at: None,
//!     read_status: ReadStatus::Unread,
//! };
//! store.save_messages(&[msg], "ST-1001", 1001).await?;
//! let pending = store.fetch_pending_acks("ST-1001").await?;
//! assert!(pending.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod message_store;
pub mod migration;
pub mod student_store;
mod types;

pub use message_store::MessageStore;
pub use student_store::StudentStore;
pub use types::{
    LocalMessage, Message, Priority, ReadStatus, SentStatus, Student, StudentQuery,
};

/// Configuration for the on-device store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: std::path::PathBuf,

    /// Rows returned per page on the offline path (default: 20)
    pub page_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::path::PathBuf::from("parentline.db"),
            page_size: 20,
        }
    }
}
