//! Domain types shared by the store and the sync engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message priority as assigned by the school
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Parse a priority label; unknown values fall back to `Medium`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// Read state of a message. Only ever moves from `Unread` to `Read`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "u8", from = "u8")]
pub enum ReadStatus {
    Unread,
    Read,
}

impl ReadStatus {
    pub fn as_i32(self) -> i32 {
        match self {
            ReadStatus::Unread => 0,
            ReadStatus::Read => 1,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        if value == 0 {
            ReadStatus::Unread
        } else {
            ReadStatus::Read
        }
    }

    pub fn is_read(self) -> bool {
        self == ReadStatus::Read
    }
}

impl From<ReadStatus> for u8 {
    fn from(status: ReadStatus) -> u8 {
        status.as_i32() as u8
    }
}

impl From<u8> for ReadStatus {
    fn from(value: u8) -> Self {
        ReadStatus::from_i32(value as i32)
    }
}

/// Whether the server has accepted the read receipt of a read message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u8", from = "u8")]
pub enum SentStatus {
    /// Not (yet) confirmed by the server
    Pending,
    /// Server-acknowledged
    Acknowledged,
}

impl SentStatus {
    pub fn as_i32(self) -> i32 {
        match self {
            SentStatus::Pending => 0,
            SentStatus::Acknowledged => 1,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        if value == 0 {
            SentStatus::Pending
        } else {
            SentStatus::Acknowledged
        }
    }
}

impl From<SentStatus> for u8 {
    fn from(status: SentStatus) -> u8 {
        status.as_i32() as u8
    }
}

impl From<u8> for SentStatus {
    fn from(value: u8) -> Self {
        SentStatus::from_i32(value as i32)
    }
}

/// A message as delivered by the remote store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub group_name: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub images: Vec<String>,
    pub sent_time: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub read_status: ReadStatus,
}

/// A message row on the device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalMessage {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub priority: Priority,
    pub group_name: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub images: Vec<String>,
    pub sent_time: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub read_status: ReadStatus,

    pub student_id: i64,
    pub student_number: String,
    pub read_time: Option<DateTime<Utc>>,
    pub sent_status: SentStatus,
}

impl LocalMessage {
    /// Read locally but not yet confirmed by the server
    pub fn is_pending_ack(&self) -> bool {
        self.read_status.is_read() && self.sent_status == SentStatus::Pending
    }
}

/// A student known on this device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub id: i64,
    pub student_number: String,
    pub full_name: String,
    pub class_name: Option<String>,
}

/// Lookup criteria for `StudentStore::find`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentQuery {
    ById(i64),
    ByNumber(String),
}
