use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::instrument;

use crate::{
    config::Config,
    error::{AppResult, LoadError, StoreError},
    models::{BookmarkKey, BookmarkRecord, CatalogItem, ToggleOutcome},
    services::{
        coordinator::{KeySlot, PendingToggle, ToggleCoordinator},
        projection::{BookmarkView, Subscribers, Subscription},
        registry::BookmarkRegistry,
        store::{HttpBookmarkStore, RemoteBookmarkStore},
    },
    session::SessionId,
};

/// Everything the engine mutates, guarded by a single lock
///
/// The lock is never held across an `.await`; each critical section applies one complete
/// mutation, so no observer can see a half-applied toggle.
pub(crate) struct SyncState {
    pub(crate) registry: BookmarkRegistry,
    pub(crate) pending: HashMap<BookmarkKey, KeySlot>,
    /// Bumped on every registry change; stamps the views handed to subscribers
    pub(crate) version: u64,
    /// Bumped when the session ends; remote results from an older generation are dropped
    pub(crate) generation: u64,
    /// Count of coordinator mutations, used to tell which ones happened during a fetch
    mutations: u64,
    active_loads: usize,
    /// Keys mutated while a load was outstanding, with the sequence number of the last change
    touched: HashMap<BookmarkKey, u64>,
}

impl SyncState {
    fn new() -> Self {
        Self {
            registry: BookmarkRegistry::new(),
            pending: HashMap::new(),
            version: 0,
            generation: 0,
            mutations: 0,
            active_loads: 0,
            touched: HashMap::new(),
        }
    }

    /// Records a coordinator change to `key` so a load landing afterwards keeps it
    pub(crate) fn mark_touched(&mut self, key: &BookmarkKey) {
        self.mutations += 1;
        if self.active_loads > 0 {
            self.touched.insert(key.clone(), self.mutations);
        }
    }

    /// Replaces the registry with `records`, keeping the local state of every key a toggle
    /// changed after `since` or still has pending
    fn apply_fetched(
        &mut self,
        records: Vec<BookmarkRecord>,
        since: u64,
    ) -> Result<usize, LoadError> {
        let local: Vec<(BookmarkKey, Option<BookmarkRecord>)> = self
            .touched
            .iter()
            .filter(|(_, seq)| **seq > since)
            .map(|(key, _)| key)
            .chain(self.pending.keys())
            .map(|key| (key.clone(), self.registry.get(key).cloned()))
            .collect();

        self.registry.load(records)?;

        for (key, record) in local {
            match record {
                Some(record) => {
                    self.registry.upsert(record);
                }
                None => {
                    self.registry.remove(&key);
                }
            }
        }

        Ok(self.registry.len())
    }

    pub(crate) fn view(&self) -> BookmarkView {
        BookmarkView::new(self.version, self.registry.snapshot())
    }

    /// Records a registry change and returns the view to publish for it
    pub(crate) fn next_view(&mut self) -> BookmarkView {
        self.version += 1;
        self.view()
    }
}

/// State shared between the engine, its coordinator and the coordinator's background tasks
pub(crate) struct Shared {
    pub(crate) session_id: SessionId,
    pub(crate) store: Arc<dyn RemoteBookmarkStore>,
    pub(crate) call_timeout: Duration,
    pub(crate) subscribers: Subscribers,
    state: Mutex<SyncState>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one remote call under the session timeout
    ///
    /// On timeout the call future is dropped, so a response arriving later is never observed.
    pub(crate) async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Remote bookmark call timed out"
                );
                Err(StoreError::Timeout)
            }
        }
    }
}

/// Bookmark synchronization engine for one signed-in session
///
/// Owns the registry, the toggle coordinator and the subscribers. Construct one per session and
/// call [`BookmarkEngine::end_session`] on logout; nothing outlives it.
#[derive(Clone)]
pub struct BookmarkEngine {
    shared: Arc<Shared>,
    coordinator: ToggleCoordinator,
}

impl BookmarkEngine {
    pub fn new(store: Arc<dyn RemoteBookmarkStore>, call_timeout: Duration) -> Self {
        let session_id = SessionId::new();

        tracing::info!(
            session_id = %session_id,
            store = store.name(),
            timeout_ms = call_timeout.as_millis() as u64,
            "Bookmark session created"
        );

        let shared = Arc::new(Shared {
            session_id,
            store,
            call_timeout,
            subscribers: Subscribers::new(),
            state: Mutex::new(SyncState::new()),
        });

        Self {
            coordinator: ToggleCoordinator::new(shared.clone()),
            shared,
        }
    }

    /// Creates an engine talking to the HTTP bookmark API described by `config`
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let store = HttpBookmarkStore::from_config(config)?;
        Ok(Self::new(Arc::new(store), config.request_timeout()))
    }

    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// Fetches the user's bookmarks and replaces the registry with them
    ///
    /// Toggles that ran or are still pending while the fetch was outstanding are replayed over
    /// the fetched list. Returns the number of bookmarks held afterwards. On any failure the
    /// registry is left empty.
    #[instrument(skip(self), fields(session_id = %self.shared.session_id))]
    pub async fn load(&self) -> Result<usize, LoadError> {
        let (generation, since) = {
            let mut state = self.shared.lock();
            state.active_loads += 1;
            (state.generation, state.mutations)
        };
        let fetched = self
            .shared
            .call("list", self.shared.store.list())
            .await
            .map_err(LoadError::from);

        let (result, view) = {
            let mut state = self.shared.lock();
            state.active_loads -= 1;
            if state.generation != generation {
                tracing::debug!("Session ended while bookmarks were loading");
                return Err(LoadError::SessionEnded);
            }

            let result = fetched.and_then(|records| state.apply_fetched(records, since));
            if result.is_err() {
                state.registry.clear();
            }
            if state.active_loads == 0 {
                state.touched.clear();
            }

            (result, state.next_view())
        };

        self.shared.subscribers.publish(&view);

        match &result {
            Ok(count) => tracing::info!(count, "Bookmarks loaded"),
            Err(e) => tracing::error!(error = %e, "Failed to load bookmarks"),
        }

        result
    }

    /// Flips the bookmark state of `item`; see [`ToggleCoordinator::toggle`]
    pub async fn toggle(&self, item: &CatalogItem) -> AppResult<ToggleOutcome> {
        self.coordinator.toggle(item).await
    }

    /// Moves `item` to an explicit bookmark state; see [`ToggleCoordinator::set_bookmarked`]
    pub async fn set_bookmarked(
        &self,
        item: &CatalogItem,
        bookmarked: bool,
    ) -> AppResult<ToggleOutcome> {
        self.coordinator.set_bookmarked(item, bookmarked).await
    }

    pub fn has(&self, key: &BookmarkKey) -> bool {
        self.shared.lock().registry.has(key)
    }

    /// Owned copy of the bookmarks in registry order
    pub fn snapshot(&self) -> Vec<BookmarkRecord> {
        self.shared.lock().registry.snapshot()
    }

    pub fn view(&self) -> BookmarkView {
        self.shared.lock().view()
    }

    /// Subscribes a display surface; it receives the current view immediately
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&BookmarkView) + Send + Sync + 'static,
    {
        self.shared
            .subscribers
            .subscribe(|| self.view(), callback)
    }

    pub fn pending_toggles(&self) -> Vec<PendingToggle> {
        self.coordinator.pending()
    }

    /// Discards all bookmark state of this session
    ///
    /// Pending toggles resolve as [`ToggleOutcome::Discarded`] and results of calls still in
    /// flight are ignored when they arrive.
    #[instrument(skip(self), fields(session_id = %self.shared.session_id))]
    pub fn end_session(&self) {
        let (view, abandoned) = {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.registry.clear();
            state.touched.clear();
            let abandoned: Vec<KeySlot> = state.pending.drain().map(|(_, slot)| slot).collect();
            (state.next_view(), abandoned)
        };

        self.shared.subscribers.publish(&view);

        tracing::info!(abandoned = abandoned.len(), "Bookmark session ended");

        // Dropping the slots closes their completion channels
        drop(abandoned);
    }
}
