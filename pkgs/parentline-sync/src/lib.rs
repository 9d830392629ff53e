//! Parentline sync - message synchronization for the parent app
//!
//! Pulls a student's messages page by page from the school backend into the
//! on-device store, tracks which messages were read on this device and
//! delivers those read receipts, and routes deep links once the data they
//! point at is available.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use parentline_links::LinkConfig;
//! use parentline_store::MessageStore;
//! use parentline_sync::{ClientConfig, Engine, HttpPostsClient, SessionHooks, SyncConfig, SyncEvent};
//!
//! struct StaticToken;
//!
//! #[async_trait]
//! impl SessionHooks for StaticToken {
//!     async fn refresh_credentials(&self) -> parentline_sync::Result<()> {
//!         Err(parentline_sync::SyncError::Unauthorized)
//!     }
//!     async fn signed_out(&self) {}
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(MessageStore::new("parentline.db".into()).await?);
//! let client = HttpPostsClient::new("https://api.parentline.app", ClientConfig::default())?;
//! client.set_access_token(Some("token".into())).await;
//!
//! let mut engine = Engine::new(
//!     Arc::new(client),
//!     store,
//!     Arc::new(StaticToken),
//!     SyncConfig::default(),
//!     LinkConfig::default(),
//!     true,
//! )?;
//! engine.start().await?;
//! let effects = engine.dispatch(SyncEvent::ListOpened { student_id: 7 }).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod grouping;
pub mod invalidation;
pub mod receipts;

pub use api::{FetchPostsRequest, PostsApi, RemotePost, ViewRequest};
pub use client::HttpPostsClient;
pub use config::{ClientConfig, SyncConfig};
pub use cursor::PaginationCursor;
pub use engine::{reduce, Effect, Engine, FetchFailure, Missing, SessionHooks, SessionState, SyncEvent};
pub use error::{ErrorKind, Result, SyncError};
pub use fetcher::{FetchedPage, PageFetcher};
pub use grouping::{group_key, group_messages, MessageGroup};
pub use invalidation::{ListInvalidated, ListInvalidator};
pub use receipts::{ReadOutcome, ReadReceiptSynchronizer, ReceiptState};
