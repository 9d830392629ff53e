//! HTTP client for the posts backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::{FetchPostsRequest, PostResponse, PostsApi, PostsResponse, RemotePost, ViewRequest};
use crate::config::ClientConfig;
use crate::error::{Result, SyncError};

/// `PostsApi` over HTTPS with bearer authentication
pub struct HttpPostsClient {
    base_url: String,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl HttpPostsClient {
    pub fn new(base_url: impl Into<String>, cfg: ClientConfig) -> Result<Self> {
        if cfg.timeout_ms == 0 {
            return Err(SyncError::InvalidConfig("timeout_ms"));
        }
        if cfg.connect_timeout_ms == 0 {
            return Err(SyncError::InvalidConfig("connect_timeout_ms"));
        }
        if cfg.user_agent.trim().is_empty() {
            return Err(SyncError::InvalidConfig("user_agent"));
        }
        let base_url = validated_base(&base_url.into())?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .build()?;
        Ok(Self {
            base_url,
            http,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the access token sent with every request
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let resp = self.authorized(builder).await.send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(SyncError::Unauthorized),
            StatusCode::FORBIDDEN => Err(SyncError::Forbidden),
            status if !status.is_success() => {
                warn!("Request to {} failed with {}", resp.url().path(), status);
                Err(SyncError::Status(status.as_u16()))
            }
            _ => Ok(resp),
        }
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl PostsApi for HttpPostsClient {
    async fn fetch_posts(&self, request: &FetchPostsRequest) -> Result<Vec<RemotePost>> {
        let url = format!("{}/posts", self.base_url);
        let resp = self.send(self.http.post(url).json(request)).await?;
        let page: PostsResponse = Self::read_json(resp).await?;
        debug!(
            "Fetched {} posts for student {} after {}",
            page.posts.len(),
            request.student_id,
            request.last_post_id
        );
        Ok(page.posts)
    }

    async fn fetch_post(&self, id: i64) -> Result<RemotePost> {
        let url = format!("{}/post/{}", self.base_url, id);
        let resp = match self.send(self.http.get(url)).await {
            Err(SyncError::Status(404)) => return Err(SyncError::MessageNotFound(id)),
            other => other?,
        };
        let body: PostResponse = Self::read_json(resp).await?;
        Ok(body.post)
    }

    async fn mark_viewed(&self, request: &ViewRequest) -> Result<()> {
        let url = format!("{}/view", self.base_url);
        self.send(self.http.post(url).json(request)).await?;
        Ok(())
    }
}

fn validated_base(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed =
        url::Url::parse(trimmed).map_err(|_| SyncError::InvalidBaseUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(trimmed.to_string()),
        _ => Err(SyncError::InvalidBaseUrl(raw.to_string())),
    }
}
