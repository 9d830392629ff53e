//! Session reducer and its driver
//!
//! Every lifecycle signal (foregrounding, network changes, deep links,
//! fetch results, message opens) is a [`SyncEvent`]. [`reduce`] folds an
//! event into the [`SessionState`] and returns the [`Effect`]s to run, so
//! the decision logic stays synchronous and testable. [`Engine`] executes
//! the I/O effects and feeds their results back in as events.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parentline_links::{
    rewrite_for_single_student, CanonicalPath, DeepLinkResolver, LinkConfig, LinkDeduplicator,
    LinkOrigin, NavigationContext, NavigationOrchestrator, NavigationPlan, StudentCount,
};
use parentline_store::{MessageStore, Student, StudentQuery};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::PostsApi;
use crate::config::SyncConfig;
use crate::cursor::PaginationCursor;
use crate::error::{ErrorKind, Result, SyncError};
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::grouping::{group_messages, MessageGroup};
use crate::invalidation::{ListInvalidated, ListInvalidator};
use crate::receipts::ReadReceiptSynchronizer;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StudentsLoaded {
        student_ids: Vec<i64>,
    },
    AppForegrounded,
    NetworkChanged {
        online: bool,
    },
    ListOpened {
        student_id: i64,
    },
    LoadMore {
        student_id: i64,
    },
    PageFetchSucceeded {
        page: FetchedPage,
        requested: Option<PaginationCursor>,
    },
    PageFetchFailed {
        student_id: i64,
        cursor: Option<PaginationCursor>,
        failure: FetchFailure,
    },
    MessageOpened {
        message_id: i64,
    },
    DeepLinkReceived {
        uri: String,
        cold_start: bool,
        at: Instant,
    },
}

/// Why a page fetch failed, as far as recovery is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    Unauthorized,
    Forbidden,
    InFlight,
    NotFound,
    Retryable(ErrorKind),
}

impl From<&SyncError> for FetchFailure {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Unauthorized => FetchFailure::Unauthorized,
            SyncError::Forbidden => FetchFailure::Forbidden,
            SyncError::FetchInFlight(_) => FetchFailure::InFlight,
            SyncError::StudentNotFound(_) | SyncError::MessageNotFound(_) => FetchFailure::NotFound,
            other => FetchFailure::Retryable(other.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Student(i64),
    Message(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchPage {
        student_id: i64,
        cursor: Option<PaginationCursor>,
    },
    RefreshCredentialsAndRetry {
        student_id: i64,
        cursor: Option<PaginationCursor>,
    },
    MarkRead {
        message_id: i64,
        online: bool,
    },
    /// Make the message available locally, then navigate
    EnsureMessage {
        student_id: i64,
        message_id: i64,
        plan: NavigationPlan,
    },
    RefreshList {
        student_id: i64,
    },
    ShowFetchError {
        student_id: i64,
        kind: ErrorKind,
    },
    ShowNotFound(Missing),
    Navigate(NavigationPlan),
    SignOut,
}

impl Effect {
    /// Effects the engine runs itself; the rest are for the UI
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Effect::FetchPage { .. }
                | Effect::RefreshCredentialsAndRetry { .. }
                | Effect::MarkRead { .. }
                | Effect::EnsureMessage { .. }
        )
    }
}

/// Pagination state of one student's list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentSync {
    pub cursor: Option<PaginationCursor>,
    pub has_more: bool,
    pub in_flight: bool,
    pub auth_retried: bool,
    pub last_error: Option<ErrorKind>,
}

pub struct SessionState {
    pub online: bool,
    pub signed_out: bool,
    pub active_student: Option<i64>,
    students: Vec<i64>,
    sync: HashMap<i64, StudentSync>,
    resolver: DeepLinkResolver,
    orchestrator: NavigationOrchestrator,
    dedup: LinkDeduplicator,
}

impl SessionState {
    pub fn new(online: bool, links: LinkConfig, config: &SyncConfig) -> Self {
        Self {
            online,
            signed_out: false,
            active_student: None,
            students: Vec::new(),
            sync: HashMap::new(),
            resolver: DeepLinkResolver::new(links),
            orchestrator: NavigationOrchestrator::new(config.mount_delay),
            dedup: LinkDeduplicator::new(config.link_dedup_window),
        }
    }

    pub fn students(&self) -> &[i64] {
        &self.students
    }

    pub fn student_sync(&self, student_id: i64) -> Option<&StudentSync> {
        self.sync.get(&student_id)
    }

    fn request_page(&mut self, student_id: i64, cursor: Option<PaginationCursor>) -> Vec<Effect> {
        if self.signed_out || !self.online {
            return vec![];
        }
        let entry = self.sync.entry(student_id).or_default();
        if entry.in_flight {
            debug!("Fetch for student {} already running", student_id);
            return vec![];
        }
        entry.in_flight = true;
        vec![Effect::FetchPage { student_id, cursor }]
    }

    fn refresh_visible(&mut self) -> Vec<Effect> {
        let targets = match self.active_student {
            Some(student_id) => vec![student_id],
            None => self.students.clone(),
        };
        targets
            .into_iter()
            .flat_map(|student_id| self.request_page(student_id, None))
            .collect()
    }

    fn route_link(&mut self, uri: &str, cold_start: bool, at: Instant) -> Vec<Effect> {
        let kind = self.resolver.classify(uri);
        let path = kind
            .as_ref()
            .map_or(CanonicalPath::Error, |kind| self.resolver.normalize(kind));
        if !self.dedup.should_handle(uri, &path, at) {
            return vec![];
        }
        let Some(kind) = kind else {
            debug!("Ignoring unrecognized link {}", uri);
            return vec![];
        };
        if path.is_error() {
            debug!("Dropping malformed link {}", uri);
            return vec![];
        }

        let path = rewrite_for_single_student(path, &self.students);
        let ctx = NavigationContext {
            cold_start,
            origin: LinkOrigin::of(&kind),
            students: StudentCount::from_ids(&self.students),
        };

        if let Some(student_id) = path.student_id() {
            if !self.students.is_empty() && !self.students.contains(&student_id) {
                return vec![Effect::ShowNotFound(Missing::Student(student_id))];
            }
            self.active_student = Some(student_id);
        }

        let plan = self.orchestrator.plan(path, &ctx);
        info!("Routing link to {} ({} steps)", path, plan.steps().len());
        match path {
            CanonicalPath::Message {
                student_id,
                message_id,
            } => vec![Effect::EnsureMessage {
                student_id,
                message_id,
                plan,
            }],
            _ => vec![Effect::Navigate(plan)],
        }
    }
}

/// Fold one event into the session
pub fn reduce(state: &mut SessionState, event: SyncEvent) -> Vec<Effect> {
    match event {
        SyncEvent::StudentsLoaded { student_ids } => {
            state.students = student_ids;
            if let [only] = state.students.as_slice() {
                state.active_student = Some(*only);
            }
            vec![]
        }
        SyncEvent::AppForegrounded => state.refresh_visible(),
        SyncEvent::NetworkChanged { online } => {
            let reconnected = online && !state.online;
            state.online = online;
            if reconnected {
                state.refresh_visible()
            } else {
                vec![]
            }
        }
        SyncEvent::ListOpened { student_id } => {
            state.active_student = Some(student_id);
            let mut effects = vec![Effect::RefreshList { student_id }];
            effects.extend(state.request_page(student_id, None));
            effects
        }
        SyncEvent::LoadMore { student_id } => {
            let cursor = match state.sync.get(&student_id) {
                Some(entry) if entry.has_more => entry.cursor,
                _ => None,
            };
            match cursor {
                Some(cursor) => state.request_page(student_id, Some(cursor)),
                None => vec![],
            }
        }
        SyncEvent::PageFetchSucceeded { page, requested } => {
            let entry = state.sync.entry(page.student_id).or_default();
            entry.in_flight = false;
            entry.auth_retried = false;
            entry.last_error = None;

            // A newest-page refresh never moves an established cursor back
            let first_load = requested.is_none() && entry.cursor.is_none();
            if requested.is_some() || first_load {
                if let Some(next) = page.next_cursor {
                    entry.cursor = Some(next);
                }
                entry.has_more = page.has_more;
            }
            vec![Effect::RefreshList {
                student_id: page.student_id,
            }]
        }
        SyncEvent::PageFetchFailed {
            student_id,
            cursor,
            failure,
        } => {
            let entry = state.sync.entry(student_id).or_default();
            entry.in_flight = false;
            match failure {
                FetchFailure::Unauthorized if !entry.auth_retried => {
                    entry.auth_retried = true;
                    entry.in_flight = true;
                    vec![Effect::RefreshCredentialsAndRetry { student_id, cursor }]
                }
                FetchFailure::Unauthorized => {
                    error!("Student {} still unauthorized after refresh", student_id);
                    entry.auth_retried = false;
                    entry.last_error = Some(ErrorKind::Authorization);
                    vec![Effect::ShowFetchError {
                        student_id,
                        kind: ErrorKind::Authorization,
                    }]
                }
                FetchFailure::Forbidden => {
                    state.signed_out = true;
                    state.sync.clear();
                    vec![Effect::SignOut]
                }
                FetchFailure::InFlight => vec![],
                FetchFailure::NotFound => vec![Effect::ShowNotFound(Missing::Student(student_id))],
                FetchFailure::Retryable(kind) => {
                    error!("Page fetch for student {} failed ({:?})", student_id, kind);
                    entry.last_error = Some(kind);
                    vec![
                        Effect::ShowFetchError { student_id, kind },
                        Effect::RefreshList { student_id },
                    ]
                }
            }
        }
        SyncEvent::MessageOpened { message_id } => {
            if state.signed_out {
                return vec![];
            }
            vec![Effect::MarkRead {
                message_id,
                online: state.online,
            }]
        }
        SyncEvent::DeepLinkReceived {
            uri,
            cold_start,
            at,
        } => {
            if state.signed_out {
                return vec![];
            }
            state.route_link(&uri, cold_start, at)
        }
    }
}

/// Credential lifecycle owned by the host application
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Obtain a fresh access token after a 401
    async fn refresh_credentials(&self) -> Result<()>;

    /// Called once the backend has answered 403
    async fn signed_out(&self);
}

pub struct Engine {
    state: SessionState,
    store: Arc<MessageStore>,
    fetcher: PageFetcher,
    receipts: ReadReceiptSynchronizer,
    invalidator: ListInvalidator,
    hooks: Arc<dyn SessionHooks>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        api: Arc<dyn PostsApi>,
        store: Arc<MessageStore>,
        hooks: Arc<dyn SessionHooks>,
        config: SyncConfig,
        links: LinkConfig,
        online: bool,
    ) -> Result<Self> {
        config.validate()?;
        links.validate()?;

        let invalidator = ListInvalidator::new(config.settle_delay);
        let state = SessionState::new(online, links, &config);
        let fetcher = PageFetcher::new(api.clone(), store.clone(), config);
        let receipts = ReadReceiptSynchronizer::new(api, store.clone(), invalidator.clone());

        Ok(Self {
            state,
            store,
            fetcher,
            receipts,
            invalidator,
            hooks,
            cancel: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListInvalidated> {
        self.invalidator.subscribe()
    }

    /// Load the students known on this device into the session
    pub async fn start(&mut self) -> Result<Vec<Effect>> {
        let student_ids = self
            .store
            .students()
            .list()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        self.dispatch(SyncEvent::StudentsLoaded { student_ids }).await
    }

    /// Abort a running single-message lookup
    pub fn abort_message_lookup(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    /// Process `event` and everything it triggers. Returns the UI effects
    /// in the order they were produced.
    pub async fn dispatch(&mut self, event: SyncEvent) -> Result<Vec<Effect>> {
        let mut queue = VecDeque::from([event]);
        let mut ui = Vec::new();

        while let Some(event) = queue.pop_front() {
            for effect in reduce(&mut self.state, event) {
                if effect.is_internal() {
                    if let Some(next) = self.execute(effect, &mut ui).await? {
                        queue.push_back(next);
                    }
                } else {
                    if effect == Effect::SignOut {
                        self.hooks.signed_out().await;
                    }
                    ui.push(effect);
                }
            }
        }

        Ok(ui)
    }

    async fn execute(&mut self, effect: Effect, ui: &mut Vec<Effect>) -> Result<Option<SyncEvent>> {
        match effect {
            Effect::FetchPage { student_id, cursor } => {
                Ok(Some(self.run_fetch(student_id, cursor).await))
            }
            Effect::RefreshCredentialsAndRetry { student_id, cursor } => {
                match self.hooks.refresh_credentials().await {
                    Ok(()) => Ok(Some(self.run_fetch(student_id, cursor).await)),
                    Err(e) => {
                        warn!("Credential refresh failed: {}", e);
                        Ok(Some(SyncEvent::PageFetchFailed {
                            student_id,
                            cursor,
                            failure: FetchFailure::from(&e),
                        }))
                    }
                }
            }
            Effect::MarkRead { message_id, online } => {
                match self.receipts.mark_read(message_id, online).await {
                    Ok(outcome) if outcome.changed() => ui.push(Effect::RefreshList {
                        student_id: outcome.student_id,
                    }),
                    Ok(_) => {}
                    Err(SyncError::MessageNotFound(id)) => {
                        ui.push(Effect::ShowNotFound(Missing::Message(id)))
                    }
                    Err(e) => warn!("Failed to mark message {} read: {}", message_id, e),
                }
                Ok(None)
            }
            Effect::EnsureMessage {
                student_id,
                message_id,
                plan,
            } => {
                let resolved = match self.student(student_id).await {
                    Ok(student) => {
                        self.fetcher
                            .resolve_message(&student, message_id, &self.cancel)
                            .await
                    }
                    Err(e) => Err(e),
                };
                match resolved {
                    Ok(_) => ui.push(Effect::Navigate(plan)),
                    Err(SyncError::StudentNotFound(id)) => {
                        ui.push(Effect::ShowNotFound(Missing::Student(id)))
                    }
                    Err(SyncError::MessageNotFound(id)) => {
                        ui.push(Effect::ShowNotFound(Missing::Message(id)))
                    }
                    Err(SyncError::Cancelled) => debug!("Lookup of message {} aborted", message_id),
                    Err(e) => ui.push(Effect::ShowFetchError {
                        student_id,
                        kind: e.kind(),
                    }),
                }
                Ok(None)
            }
            other => {
                ui.push(other);
                Ok(None)
            }
        }
    }

    async fn run_fetch(&self, student_id: i64, cursor: Option<PaginationCursor>) -> SyncEvent {
        let result = match self.student(student_id).await {
            Ok(student) => self.fetcher.fetch_page(&student, cursor.as_ref()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(page) => SyncEvent::PageFetchSucceeded {
                page,
                requested: cursor,
            },
            Err(e) => SyncEvent::PageFetchFailed {
                student_id,
                cursor,
                failure: FetchFailure::from(&e),
            },
        }
    }

    async fn student(&self, student_id: i64) -> Result<Student> {
        self.store
            .find_student(&StudentQuery::ById(student_id))
            .await?
            .ok_or(SyncError::StudentNotFound(student_id))
    }

    /// Cached first page of a student's list, grouped for display
    pub async fn message_groups(&self, student_id: i64) -> Result<Vec<MessageGroup>> {
        let student = self.student(student_id).await?;
        let rows = self.fetcher.load_cached(&student, None).await?;
        Ok(group_messages(rows))
    }

    pub async fn unread_count(&self, student_id: i64) -> Result<u64> {
        let student = self.student(student_id).await?;
        Ok(self.store.unread_count(&student.student_number).await?)
    }
}
