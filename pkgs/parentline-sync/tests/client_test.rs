use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parentline_store::{Message, Priority};
use parentline_sync::{
    ClientConfig, FetchPostsRequest, HttpPostsClient, PostsApi, SyncError, ViewRequest,
};
use serde_json::json;

const TOKEN: &str = "token-1";
const FORBIDDEN_STUDENT: i64 = 403;

#[derive(Clone, Default)]
struct Backend {
    requests: Arc<Mutex<Vec<FetchPostsRequest>>>,
    views: Arc<Mutex<HashSet<(i64, i64)>>>,
    view_calls: Arc<Mutex<usize>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

async fn posts(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<FetchPostsRequest>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if request.student_id == FORBIDDEN_STUDENT {
        return StatusCode::FORBIDDEN.into_response();
    }
    backend.requests.lock().unwrap().push(request);
    Json(json!({
        "posts": [
            {
                "id": 12, "title": "Trip", "content": "Bring lunch", "priority": "high",
                "group_name": "3B", "image": "https://cdn.parentline.app/trip.png",
                "sent_time": "2025-03-01T08:00:00.250Z", "read_status": 0
            },
            {
                "id": 11, "title": "Fees", "content": "Due Friday",
                "sent_time": "2025-02-28T08:00:00Z", "read_status": 1,
                "viewed_at": "2025-02-28T09:00:00Z"
            }
        ]
    }))
    .into_response()
}

async fn single(headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id != 12 {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "post": {
            "id": 12, "title": "Trip", "content": "Bring lunch",
            "sent_time": "2025-03-01T08:00:00.250Z"
        }
    }))
    .into_response()
}

async fn view(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<ViewRequest>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    *backend.view_calls.lock().unwrap() += 1;
    backend
        .views
        .lock()
        .unwrap()
        .insert((request.post_id, request.student_id));
    Json(json!({})).into_response()
}

async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/posts", post(posts))
        .route("/post/{id}", get(single))
        .route("/view", post(view))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

async fn client(addr: SocketAddr, token: Option<&str>) -> HttpPostsClient {
    let client = HttpPostsClient::new(format!("http://{}/", addr), ClientConfig::default()).unwrap();
    client.set_access_token(token.map(String::from)).await;
    client
}

#[tokio::test]
async fn test_fetch_posts_round_trip() {
    let (addr, backend) = spawn_backend().await;
    let client = client(addr, Some(TOKEN)).await;
    assert_eq!(client.base_url(), format!("http://{}", addr));

    let request = FetchPostsRequest::new(7, vec![3, 4], None);
    let posts = client.fetch_posts(&request).await.unwrap();

    assert_eq!(backend.requests.lock().unwrap().as_slice(), &[request]);

    let messages: Vec<Message> = posts.into_iter().map(Message::from).collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].priority, Priority::High);
    assert_eq!(messages[0].images, vec!["https://cdn.parentline.app/trip.png"]);
    assert_eq!(messages[0].sent_time.timestamp_subsec_millis(), 250);
    assert_eq!(messages[1].priority, Priority::Medium);
    assert!(messages[1].read_status.is_read());
    assert!(messages[1].images.is_empty());
}

#[tokio::test]
async fn test_auth_statuses_map_to_errors() {
    let (addr, _backend) = spawn_backend().await;

    let anonymous = client(addr, None).await;
    let err = anonymous
        .fetch_posts(&FetchPostsRequest::new(7, vec![], None))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized));
    assert!(err.is_retryable());

    let signed_in = client(addr, Some(TOKEN)).await;
    let err = signed_in
        .fetch_posts(&FetchPostsRequest::new(FORBIDDEN_STUDENT, vec![], None))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Forbidden));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_fetch_single_post() {
    let (addr, _backend) = spawn_backend().await;
    let client = client(addr, Some(TOKEN)).await;

    let post = client.fetch_post(12).await.unwrap();
    assert_eq!(post.id, 12);
    assert_eq!(post.read_status, 0);

    let err = client.fetch_post(99).await.unwrap_err();
    assert!(matches!(err, SyncError::MessageNotFound(99)));
}

#[tokio::test]
async fn test_repeated_view_is_idempotent() {
    let (addr, backend) = spawn_backend().await;
    let client = client(addr, Some(TOKEN)).await;

    let request = ViewRequest {
        post_id: 12,
        student_id: 7,
        viewed_at: Utc::now(),
    };
    client.mark_viewed(&request).await.unwrap();
    client.mark_viewed(&request).await.unwrap();

    assert_eq!(*backend.view_calls.lock().unwrap(), 2);
    assert_eq!(backend.views.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_is_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(addr, Some(TOKEN)).await;
    let err = client.fetch_post(12).await.unwrap_err();
    assert_eq!(err.kind(), parentline_sync::ErrorKind::Connectivity);
}
