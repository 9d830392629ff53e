#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parentline_store::{MessageStore, Priority, StoreConfig, Student};
use parentline_sync::{FetchPostsRequest, PostsApi, RemotePost, Result, SyncError, ViewRequest};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const STUDENT_ID: i64 = 7;
pub const STUDENT_NUMBER: &str = "S-0007";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
}

pub fn student() -> Student {
    Student {
        id: STUDENT_ID,
        student_number: STUDENT_NUMBER.to_string(),
        full_name: "Mina Park".to_string(),
        class_name: Some("3B".to_string()),
    }
}

pub fn post(id: i64, title: &str, content: &str, sent_time: DateTime<Utc>) -> RemotePost {
    RemotePost {
        id,
        title: title.to_string(),
        content: content.to_string(),
        priority: Priority::Medium,
        group_name: None,
        edited_at: None,
        image: None,
        sent_time,
        viewed_at: None,
        read_status: 0,
    }
}

/// Distinct posts, id `n` sent `n` minutes after the base time
pub fn numbered_posts(count: i64) -> Vec<RemotePost> {
    (1..=count)
        .map(|id| {
            post(
                id,
                &format!("Notice {}", id),
                "Body",
                base_time() + Duration::minutes(id),
            )
        })
        .collect()
}

pub async fn create_store(dir: &TempDir) -> Arc<MessageStore> {
    let store = MessageStore::with_config(StoreConfig {
        db_path: dir.path().join("parentline.db"),
        page_size: 20,
    })
    .await
    .unwrap();
    store.students().save(&[student()]).await.unwrap();
    Arc::new(store)
}

/// In-memory backend following the wire contract
#[derive(Default)]
pub struct FakePostsApi {
    pub page_size: usize,
    pub posts: Mutex<Vec<RemotePost>>,
    pub singles: Mutex<HashMap<i64, RemotePost>>,
    pub requests: Mutex<Vec<FetchPostsRequest>>,
    pub views: Mutex<Vec<ViewRequest>>,
    pub acknowledged: Mutex<HashSet<(i64, i64)>>,
    pub fail_fetches: Mutex<VecDeque<SyncError>>,
    pub fail_views_for: Mutex<HashSet<i64>>,
    pub fetch_gate: Mutex<Option<Arc<Notify>>>,
    pub hang_single: AtomicBool,
    pub single_calls: AtomicUsize,
}

impl FakePostsApi {
    pub fn with_posts(page_size: usize, posts: Vec<RemotePost>) -> Self {
        Self {
            page_size,
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    pub fn fail_next_fetch(&self, err: SyncError) {
        self.fail_fetches.lock().unwrap().push_back(err);
    }

    pub fn requests(&self) -> Vec<FetchPostsRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn viewed_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.views.lock().unwrap().iter().map(|v| v.post_id).collect();
        ids.sort();
        ids
    }

    fn page_after(&self, request: &FetchPostsRequest) -> Vec<RemotePost> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.sent_time.cmp(&a.sent_time).then(b.id.cmp(&a.id)));

        let start = if request.last_post_id == 0 {
            0
        } else {
            posts
                .iter()
                .position(|p| p.id == request.last_post_id)
                .map(|at| at + 1)
                .unwrap_or(posts.len())
        };
        posts.into_iter().skip(start).take(self.page_size).collect()
    }
}

#[async_trait]
impl PostsApi for FakePostsApi {
    async fn fetch_posts(&self, request: &FetchPostsRequest) -> Result<Vec<RemotePost>> {
        self.requests.lock().unwrap().push(request.clone());

        let gate = self.fetch_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(err) = self.fail_fetches.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut acknowledged = self.acknowledged.lock().unwrap();
        for id in &request.read_post_ids {
            acknowledged.insert((*id, request.student_id));
        }
        drop(acknowledged);

        Ok(self.page_after(request))
    }

    async fn fetch_post(&self, id: i64) -> Result<RemotePost> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_single.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.singles
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(SyncError::MessageNotFound(id))
    }

    async fn mark_viewed(&self, request: &ViewRequest) -> Result<()> {
        self.views.lock().unwrap().push(request.clone());
        if self.fail_views_for.lock().unwrap().contains(&request.post_id) {
            return Err(SyncError::Status(503));
        }
        self.acknowledged
            .lock()
            .unwrap()
            .insert((request.post_id, request.student_id));
        Ok(())
    }
}
