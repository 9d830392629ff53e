//! Remote API contract
//!
//! - `POST /posts`: one cursor page, piggybacking pending read receipts
//! - `GET /post/{id}`: single message fallback for deep links
//! - `POST /view`: read acknowledgment, idempotent per (post, student)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parentline_store::{Message, Priority, ReadStatus};
use serde::{Deserialize, Deserializer, Serialize};

use crate::cursor::PaginationCursor;
use crate::error::Result;

/// Body of `POST /posts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPostsRequest {
    pub student_id: i64,
    pub read_post_ids: Vec<i64>,
    pub last_post_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl FetchPostsRequest {
    pub fn new(
        student_id: i64,
        read_post_ids: Vec<i64>,
        cursor: Option<&PaginationCursor>,
    ) -> Self {
        let cursor = cursor.copied().unwrap_or_else(PaginationCursor::first_page);
        Self {
            student_id,
            read_post_ids,
            last_post_id: cursor.last_post_id,
            last_sent_at: cursor.last_sent_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<RemotePost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub post: RemotePost,
}

/// Body of `POST /view`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRequest {
    pub post_id: i64,
    pub student_id: i64,
    pub viewed_at: DateTime<Utc>,
}

/// A message exactly as the backend sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePost {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default = "default_priority", deserialize_with = "lenient_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    /// Singular on the wire; normalized into `Message::images`
    #[serde(default)]
    pub image: Option<String>,
    pub sent_time: DateTime<Utc>,
    #[serde(default)]
    pub viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_status: u8,
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// `null` or an unknown label reads as `Medium` instead of failing the page
fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<Priority, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().map_or(Priority::Medium, Priority::parse))
}

impl From<RemotePost> for Message {
    fn from(post: RemotePost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            priority: post.priority,
            group_name: post.group_name,
            edited_at: post.edited_at,
            images: post
                .image
                .filter(|url| !url.trim().is_empty())
                .into_iter()
                .collect(),
            sent_time: post.sent_time,
            viewed_at: post.viewed_at,
            read_status: ReadStatus::from(post.read_status),
        }
    }
}

/// The backend as seen by the sync engine
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn fetch_posts(&self, request: &FetchPostsRequest) -> Result<Vec<RemotePost>>;

    async fn fetch_post(&self, id: i64) -> Result<RemotePost>;

    async fn mark_viewed(&self, request: &ViewRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_normalization() {
        let json = r#"{
            "id": 3, "title": "T", "content": "C", "priority": "high",
            "image": "https://cdn.example.com/x.png",
            "sent_time": "2025-01-01T00:00:00Z", "read_status": 1
        }"#;
        let post: RemotePost = serde_json::from_str(json).unwrap();
        let msg = Message::from(post);
        assert_eq!(msg.images, vec!["https://cdn.example.com/x.png".to_string()]);
        assert_eq!(msg.priority, Priority::High);
        assert_eq!(msg.read_status, ReadStatus::Read);

        let json = r#"{"id": 4, "title": "T", "content": "C", "image": "",
            "sent_time": "2025-01-01T00:00:00Z"}"#;
        let msg = Message::from(serde_json::from_str::<RemotePost>(json).unwrap());
        assert!(msg.images.is_empty());
        assert_eq!(msg.priority, Priority::Medium);
        assert_eq!(msg.read_status, ReadStatus::Unread);
    }

    #[test]
    fn test_unexpected_priority_does_not_fail_the_page() {
        let json = r#"{"posts": [
            {"id": 1, "title": "T", "content": "C", "priority": null,
             "sent_time": "2025-01-01T00:00:00Z"},
            {"id": 2, "title": "T", "content": "C", "priority": "urgent",
             "sent_time": "2025-01-01T00:00:00Z"},
            {"id": 3, "title": "T", "content": "C", "priority": "High",
             "sent_time": "2025-01-01T00:00:00Z"},
            {"id": 4, "title": "T", "content": "C", "priority": "low",
             "sent_time": "2025-01-01T00:00:00Z"}
        ]}"#;
        let response: PostsResponse = serde_json::from_str(json).unwrap();
        let priorities: Vec<Priority> = response.posts.iter().map(|p| p.priority).collect();
        assert_eq!(
            priorities,
            vec![Priority::Medium, Priority::Medium, Priority::High, Priority::Low]
        );
    }

    #[test]
    fn test_first_page_request_omits_last_sent_at() {
        let request = FetchPostsRequest::new(7, vec![42], None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["last_post_id"], 0);
        assert_eq!(value["read_post_ids"], serde_json::json!([42]));
        assert!(value.get("last_sent_at").is_none());
    }
}
