//! Message entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64, // remote post id
    pub title: String,
    pub content: String,
    pub priority: String, // "high", "medium" or "low"
    pub group_name: Option<String>,
    pub edited_at: Option<i64>,
    pub images: String, // JSON array of image URLs
    pub sent_time: i64,
    pub viewed_at: Option<i64>,
    pub read_status: i32, // 0 = unread, 1 = read
    pub read_time: Option<i64>,
    pub sent_status: i32, // 0 = ack pending, 1 = acknowledged
    pub student_number: String,
    pub student_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
