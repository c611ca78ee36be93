use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use validator::Validate;

use crate::domain::notification::{NotificationItem, PushSignal};
use crate::repository::http::HttpNotificationRepository;
use crate::usecase::contracts::NotificationRepository;
use crate::usecase::error::StoreError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Validate)]
pub struct StoreConfig {
    #[validate(url)]
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,
    pub request_timeout: Duration,
    /// Refetch the first page when a mark-all-read call fails, instead of
    /// leaving the list empty until the next reload.
    pub resync_on_mark_all_failure: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            resync_on_mark_all_failure: false,
        }
    }
}

/// Strips trailing slashes; a URL that ends up blank means "not configured".
pub fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    (!url.is_empty()).then(|| url.to_string())
}

impl StoreConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(&api_base_url.into()),
            ..Self::default()
        }
    }

    /// The base URL without trailing slashes, or `None` when blank.
    pub fn base_url(&self) -> Option<&str> {
        self.api_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub items: Vec<NotificationItem>,
    pub unread_count: u64,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub loading: bool,
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageMode {
    Replace,
    Append,
}

impl PageMode {
    fn label(self) -> &'static str {
        match self {
            PageMode::Replace => "first",
            PageMode::Append => "more",
        }
    }
}

/// Clears `loading` if the fetch future is dropped before it completes.
struct InFlight<'a> {
    state: &'a watch::Sender<StoreState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    }
}

/// Client-side cache of one user's unread notifications.
///
/// At most one page fetch runs at a time; read-marking is optimistic and is
/// reconciled with the server on failure. Build a new store when the
/// authenticated user changes.
pub struct NotificationStore<R>
where
    R: NotificationRepository,
{
    user_id: String,
    config: StoreConfig,
    repository: R,
    state: watch::Sender<StoreState>,
    disposed: AtomicBool,
}

/// Builds a store backed by the HTTP notification API.
pub fn create_notification_store(
    user_id: impl Into<String>,
    config: StoreConfig,
) -> Result<NotificationStore<HttpNotificationRepository>, StoreError> {
    let config = StoreConfig {
        api_base_url: config.api_base_url.as_deref().and_then(normalize_base_url),
        ..config
    };
    config.validate()?;

    let repository = HttpNotificationRepository::new(
        config.base_url().unwrap_or_default(),
        config.api_token.clone(),
        config.request_timeout,
    )?;

    Ok(NotificationStore::new(user_id, config, repository))
}

impl<R> NotificationStore<R>
where
    R: NotificationRepository,
{
    pub fn new(user_id: impl Into<String>, config: StoreConfig, repository: R) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            user_id: user_id.into(),
            config,
            repository,
            state,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_configured(&self) -> bool {
        !self.user_id.is_empty() && self.config.base_url().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<NotificationItem> {
        self.state.borrow().items.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.state.borrow().unread_count
    }

    pub fn has_more(&self) -> bool {
        self.state.borrow().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn set_open(&self, open: bool) {
        self.state.send_if_modified(|state| {
            if state.open == open {
                return false;
            }
            state.open = open;
            true
        });
        tracing::debug!(user_id = %self.user_id, open, "drawer visibility changed");
    }

    /// Stops the store. Results of fetches still in flight are discarded.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!(user_id = %self.user_id, "notification store disposed");
        }
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.is_disposed() {
            return Err(StoreError::Disposed);
        }
        if !self.is_configured() {
            tracing::debug!(user_id = %self.user_id, "notification store not configured");
            return Err(StoreError::Unconfigured);
        }
        Ok(())
    }

    fn record_unread(&self) {
        metrics::gauge!("notification_unread_count").set(self.unread_count() as f64);
    }

    /// Checks the in-flight guard and marks a fetch as started. Returns the
    /// cursor to fetch from.
    fn begin_fetch(&self, mode: PageMode) -> Result<Option<String>, StoreError> {
        let mut outcome = Err(StoreError::Busy);
        self.state.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            match mode {
                PageMode::Replace => state.cursor = None,
                PageMode::Append if !state.has_more => {
                    outcome = Err(StoreError::NoMorePages);
                    return false;
                }
                PageMode::Append => {}
            }
            state.loading = true;
            outcome = Ok(state.cursor.clone());
            true
        });
        outcome
    }

    async fn load_page(&self, mode: PageMode) -> Result<(), StoreError> {
        self.ensure_ready()?;
        let cursor = self.begin_fetch(mode).inspect_err(|e| {
            tracing::debug!(user_id = %self.user_id, reason = %e, "fetch ignored");
        })?;
        let _in_flight = InFlight { state: &self.state };

        metrics::counter!("notification_fetches_total", "page" => mode.label()).increment(1);

        let result = self
            .repository
            .list(&self.user_id, self.config.page_size, cursor)
            .await;

        if self.is_disposed() {
            tracing::debug!(user_id = %self.user_id, "store disposed during fetch, discarding page");
            return Err(StoreError::Disposed);
        }

        let page = result.map_err(|e| {
            metrics::counter!("notification_fetch_failures_total").increment(1);
            tracing::warn!(user_id = %self.user_id, error = %e, page = mode.label(), "failed to fetch notifications");
            StoreError::from(e)
        })?;

        let (unread, info) = page.into_unread();
        let fetched = unread.len();
        self.state.send_modify(|state| {
            match mode {
                PageMode::Replace => state.items = unread,
                PageMode::Append => state.items.extend(unread),
            }
            state.unread_count = info.unread_count;
            state.has_more = info.has_more;
            state.cursor = info.next_cursor;
            state.loading = false;
        });
        self.record_unread();

        tracing::debug!(
            user_id = %self.user_id,
            page = mode.label(),
            fetched,
            unread_count = info.unread_count,
            has_more = info.has_more,
            "notifications fetched"
        );
        Ok(())
    }

    /// Reloads the first page, replacing the current items.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn fetch_first(&self) -> Result<(), StoreError> {
        self.load_page(PageMode::Replace).await
    }

    /// Appends the next page. Fails with `NoMorePages` once the server
    /// reports the end of the list.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn fetch_more(&self) -> Result<(), StoreError> {
        self.load_page(PageMode::Append).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id, notification_id = %id))]
    pub async fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidId);
        }
        self.ensure_ready()?;

        self.state.send_modify(|state| {
            state.items.retain(|item| item.id != id);
            state.unread_count = state.unread_count.saturating_sub(1);
        });
        self.record_unread();

        let Err(e) = self.repository.mark_as_read(&self.user_id, id).await else {
            tracing::debug!("notification marked as read");
            return Ok(());
        };

        metrics::counter!("notification_mark_read_failures_total", "scope" => "one").increment(1);
        tracing::warn!(error = %e, "failed to mark notification as read, resynchronizing");

        self.state.send_modify(|state| state.unread_count += 1);
        self.record_unread();
        if let Err(resync) = self.fetch_first().await {
            tracing::warn!(error = %resync, "resynchronization after mark-read failure failed");
        }

        Err(e.into())
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn mark_all_read(&self) -> Result<(), StoreError> {
        self.ensure_ready()?;

        let mut previous = 0;
        self.state.send_modify(|state| {
            previous = state.unread_count;
            state.items.clear();
            state.unread_count = 0;
        });
        self.record_unread();

        let Err(e) = self.repository.mark_all_as_read(&self.user_id).await else {
            tracing::debug!(cleared = previous, "all notifications marked as read");
            return Ok(());
        };

        metrics::counter!("notification_mark_read_failures_total", "scope" => "all").increment(1);
        tracing::warn!(error = %e, restored = previous, "failed to mark all notifications as read");

        self.state.send_modify(|state| state.unread_count = previous);
        self.record_unread();
        if self.config.resync_on_mark_all_failure {
            if let Err(resync) = self.fetch_first().await {
                tracing::warn!(error = %resync, "resynchronization after mark-all-read failure failed");
            }
        }

        Err(e.into())
    }

    /// Handles one raw message from the push channel. Returns whether it was
    /// a push-arrival signal.
    pub async fn on_push_arrived(&self, payload: &[u8]) -> bool {
        if self.is_disposed() || !self.is_configured() {
            return false;
        }

        let Some(PushSignal::NewPush) = PushSignal::parse(payload) else {
            metrics::counter!("notification_push_signals_total", "outcome" => "ignored").increment(1);
            tracing::trace!(user_id = %self.user_id, len = payload.len(), "ignoring unrelated push message");
            return false;
        };

        metrics::counter!("notification_push_signals_total", "outcome" => "accepted").increment(1);
        self.state.send_modify(|state| state.unread_count += 1);
        self.record_unread();

        let open = self.is_open();
        tracing::debug!(user_id = %self.user_id, open, "push arrived");

        if open {
            if let Err(e) = self.fetch_first().await {
                tracing::warn!(user_id = %self.user_id, error = %e, "refetch after push failed");
            }
        }
        true
    }
}
