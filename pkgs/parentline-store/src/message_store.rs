//! Message store - persistent storage for messages and their read receipts

use crate::entities::messages;
use crate::student_store::StudentStore;
use crate::types::{LocalMessage, Message, Priority, ReadStatus, SentStatus, Student, StudentQuery};
use crate::StoreConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use std::path::PathBuf;
use tracing::{debug, info};

/// Message store - manages the on-device message cache
pub struct MessageStore {
    pub(crate) db: DatabaseConnection,
    pub(crate) config: StoreConfig,
    students: StudentStore,
}

impl MessageStore {
    /// Create a new message store with default config
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        Self::with_config(StoreConfig {
            db_path,
            ..Default::default()
        })
        .await
    }

    /// Create a message store with custom config
    pub async fn with_config(config: StoreConfig) -> Result<Self> {
        let db_path_str = config
            .db_path
            .to_str()
            .context("Invalid database path")?
            .replace("\\", "/");

        let db_url = format!("sqlite:{}?mode=rwc", db_path_str);

        let db: DatabaseConnection = Database::connect(db_url.as_str())
            .await
            .context("Failed to connect to database")?;

        crate::migration::Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;

        info!("Message store initialized at {}", config.db_path.display());

        Ok(Self::from_parts(db, config))
    }

    /// Create a message store with an existing, already migrated connection
    pub fn with_connection(db: DatabaseConnection, config: StoreConfig) -> Self {
        info!("Message store initialized with existing connection");
        Self::from_parts(db, config)
    }

    fn from_parts(db: DatabaseConnection, config: StoreConfig) -> Self {
        Self {
            students: StudentStore::new(db.clone()),
            db,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Students known on this device
    pub fn students(&self) -> &StudentStore {
        &self.students
    }

    /// Look up a student
    pub async fn find_student(&self, query: &StudentQuery) -> Result<Option<Student>> {
        self.students.find(query).await
    }

    /// One page of a student's messages, newest first
    pub async fn fetch_messages(
        &self,
        student_number: &str,
        offset: Option<u64>,
    ) -> Result<Vec<LocalMessage>> {
        let rows = messages::Entity::find()
            .filter(messages::Column::StudentNumber.eq(student_number))
            .order_by_desc(messages::Column::SentTime)
            .order_by_desc(messages::Column::Id)
            .offset(offset.unwrap_or(0))
            .limit(self.config.page_size)
            .all(&self.db)
            .await
            .context("Failed to fetch messages")?;

        debug!(
            "Retrieved {} messages for student {}",
            rows.len(),
            student_number
        );
        rows.into_iter().map(model_to_message).collect()
    }

    /// Get message by ID
    pub async fn fetch_message(&self, id: i64) -> Result<Option<LocalMessage>> {
        let row = messages::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("Failed to fetch message")?;

        row.map(model_to_message).transpose()
    }

    /// Upsert remote messages for a student.
    ///
    /// Content fields are last-write-wins. `read_status` never regresses, and a
    /// message the server already reports as read counts as acknowledged.
    pub async fn save_messages(
        &self,
        batch: &[Message],
        student_number: &str,
        student_id: i64,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.context("Failed to begin transaction")?;

        for msg in batch {
            let images = serde_json::to_string(&msg.images)?;
            let existing = messages::Entity::find_by_id(msg.id)
                .one(&txn)
                .await
                .context("Failed to look up message")?;

            if let Some(model) = existing {
                let stored_read = ReadStatus::from_i32(model.read_status);
                let read_status = stored_read.max(msg.read_status);
                let sent_status = if msg.read_status.is_read() {
                    SentStatus::Acknowledged
                } else {
                    SentStatus::from_i32(model.sent_status)
                };
                let read_time = model
                    .read_time
                    .or_else(|| msg.viewed_at.filter(|_| read_status.is_read()).map(millis));

                let mut active: messages::ActiveModel = model.into();
                active.title = Set(msg.title.clone());
                active.content = Set(msg.content.clone());
                active.priority = Set(msg.priority.as_str().to_string());
                active.group_name = Set(msg.group_name.clone());
                active.edited_at = Set(msg.edited_at.map(millis));
                active.images = Set(images);
                active.sent_time = Set(millis(msg.sent_time));
                active.viewed_at = Set(msg.viewed_at.map(millis));
                active.read_status = Set(read_status.as_i32());
                active.read_time = Set(read_time);
                active.sent_status = Set(sent_status.as_i32());
                active.student_number = Set(student_number.to_string());
                active.student_id = Set(student_id);
                active
                    .update(&txn)
                    .await
                    .context("Failed to update message")?;
            } else {
                let sent_status = if msg.read_status.is_read() {
                    SentStatus::Acknowledged
                } else {
                    SentStatus::Pending
                };
                let row = messages::ActiveModel {
                    id: Set(msg.id),
                    title: Set(msg.title.clone()),
                    content: Set(msg.content.clone()),
                    priority: Set(msg.priority.as_str().to_string()),
                    group_name: Set(msg.group_name.clone()),
                    edited_at: Set(msg.edited_at.map(millis)),
                    images: Set(images),
                    sent_time: Set(millis(msg.sent_time)),
                    viewed_at: Set(msg.viewed_at.map(millis)),
                    read_status: Set(msg.read_status.as_i32()),
                    read_time: Set(msg.viewed_at.filter(|_| msg.read_status.is_read()).map(millis)),
                    sent_status: Set(sent_status.as_i32()),
                    student_number: Set(student_number.to_string()),
                    student_id: Set(student_id),
                };
                // Handle RecordNotFound from insert return value
                match row.insert(&txn).await {
                    Ok(_) => {}
                    Err(DbErr::RecordNotFound(_)) => {}
                    Err(e) => return Err(e).context("Failed to insert message"),
                }
            }
        }

        txn.commit().await.context("Failed to commit messages")?;

        debug!(
            "Saved {} messages for student {}",
            batch.len(),
            student_number
        );
        Ok(())
    }

    /// Mark an unread message as read.
    ///
    /// Returns `false` when the row is missing or already read; an already read
    /// row keeps its original `read_time` and `sent_status`.
    pub async fn mark_read(
        &self,
        id: i64,
        read_time: DateTime<Utc>,
        sent_status: SentStatus,
    ) -> Result<bool> {
        let result = messages::Entity::update_many()
            .col_expr(
                messages::Column::ReadStatus,
                Expr::value(ReadStatus::Read.as_i32()),
            )
            .col_expr(messages::Column::ReadTime, Expr::value(millis(read_time)))
            .col_expr(messages::Column::SentStatus, Expr::value(sent_status.as_i32()))
            .filter(messages::Column::Id.eq(id))
            .filter(messages::Column::ReadStatus.eq(ReadStatus::Unread.as_i32()))
            .exec(&self.db)
            .await
            .context("Failed to mark message as read")?;

        let changed = result.rows_affected > 0;
        if changed {
            debug!("Marked message {} as read ({:?})", id, sent_status);
        }
        Ok(changed)
    }

    /// Set the acknowledgment status of a read message
    pub async fn mark_sent_status(&self, id: i64, sent_status: SentStatus) -> Result<()> {
        self.mark_sent_status_many(&[id], sent_status).await
    }

    /// Set the acknowledgment status of several read messages
    pub async fn mark_sent_status_many(&self, ids: &[i64], sent_status: SentStatus) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let result = messages::Entity::update_many()
            .col_expr(messages::Column::SentStatus, Expr::value(sent_status.as_i32()))
            .filter(messages::Column::Id.is_in(ids.iter().copied()))
            .filter(messages::Column::ReadStatus.eq(ReadStatus::Read.as_i32()))
            .exec(&self.db)
            .await
            .context("Failed to update sent status")?;

        debug!(
            "Set sent status {:?} on {} of {} messages",
            sent_status,
            result.rows_affected,
            ids.len()
        );
        Ok(())
    }

    /// Ids read on this device whose receipt the server has not accepted yet
    pub async fn fetch_pending_acks(&self, student_number: &str) -> Result<Vec<i64>> {
        let ids: Vec<i64> = messages::Entity::find()
            .select_only()
            .column(messages::Column::Id)
            .filter(messages::Column::StudentNumber.eq(student_number))
            .filter(messages::Column::ReadStatus.eq(ReadStatus::Read.as_i32()))
            .filter(messages::Column::SentStatus.eq(SentStatus::Pending.as_i32()))
            .order_by_asc(messages::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await
            .context("Failed to fetch pending acknowledgments")?;

        debug!(
            "Found {} pending acknowledgments for student {}",
            ids.len(),
            student_number
        );
        Ok(ids)
    }

    /// Rows of one student sharing a broadcast's title, content and send time
    pub async fn fetch_group_members(
        &self,
        student_number: &str,
        title: &str,
        content: &str,
        sent_time: DateTime<Utc>,
    ) -> Result<Vec<LocalMessage>> {
        let rows = messages::Entity::find()
            .filter(messages::Column::StudentNumber.eq(student_number))
            .filter(messages::Column::Title.eq(title))
            .filter(messages::Column::Content.eq(content))
            .filter(messages::Column::SentTime.eq(millis(sent_time)))
            .order_by_asc(messages::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to fetch group members")?;

        rows.into_iter().map(model_to_message).collect()
    }

    /// Unread message count for a student
    pub async fn unread_count(&self, student_number: &str) -> Result<u64> {
        let count = messages::Entity::find()
            .filter(messages::Column::StudentNumber.eq(student_number))
            .filter(messages::Column::ReadStatus.eq(ReadStatus::Unread.as_i32()))
            .count(&self.db)
            .await
            .context("Failed to get unread count")?;

        debug!("Unread messages for {}: {}", student_number, count);
        Ok(count)
    }
}

fn millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).with_context(|| format!("Invalid timestamp {}", ms))
}

/// Convert Sea-ORM model to LocalMessage
fn model_to_message(model: messages::Model) -> Result<LocalMessage> {
    Ok(LocalMessage {
        id: model.id,
        priority: Priority::parse(&model.priority),
        group_name: model.group_name,
        edited_at: model.edited_at.map(from_millis).transpose()?,
        images: serde_json::from_str(&model.images)
            .with_context(|| format!("Corrupt image list on message {}", model.id))?,
        sent_time: from_millis(model.sent_time)?,
        viewed_at: model.viewed_at.map(from_millis).transpose()?,
        read_status: ReadStatus::from_i32(model.read_status),
        student_id: model.student_id,
        student_number: model.student_number,
        read_time: model.read_time.map(from_millis).transpose()?,
        sent_status: SentStatus::from_i32(model.sent_status),
        title: model.title,
        content: model.content,
    })
}
