use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, Weak,
};

use crate::models::{BookmarkKey, BookmarkRecord, ItemType};

/// Whether `key` is among `items`
///
/// Shared by every surface that renders a bookmark toggle so none of them re-implements key
/// comparison.
pub fn is_bookmarked(items: &[BookmarkRecord], key: &BookmarkKey) -> bool {
    items.iter().any(|item| &item.key == key)
}

/// Immutable, versioned view of the registry handed to display surfaces
#[derive(Debug, Clone, Default)]
pub struct BookmarkView {
    version: u64,
    records: Arc<[BookmarkRecord]>,
}

impl BookmarkView {
    pub fn new(version: u64, records: Vec<BookmarkRecord>) -> Self {
        Self {
            version,
            records: records.into(),
        }
    }

    /// Monotonic counter of registry changes this view reflects
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[BookmarkRecord] {
        &self.records
    }

    pub fn is_bookmarked(&self, key: &BookmarkKey) -> bool {
        is_bookmarked(&self.records, key)
    }

    /// Records of one item type, in registry order
    pub fn of_type(&self, item_type: ItemType) -> Vec<&BookmarkRecord> {
        self.records
            .iter()
            .filter(|r| r.key.item_type() == item_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

type Callback = dyn Fn(&BookmarkView) + Send + Sync;

struct Listener {
    id: u64,
    /// Version of the last view delivered to this listener
    last_version: Mutex<Option<u64>>,
    callback: Box<Callback>,
}

impl Listener {
    fn deliver(&self, view: &BookmarkView) {
        let mut last = self
            .last_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if last.is_some_and(|seen| seen >= view.version) {
            return;
        }

        *last = Some(view.version);
        (self.callback)(view);
    }
}

#[derive(Default)]
struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Arc<Listener>>>,
}

impl ListenerSet {
    fn current(&self) -> Vec<Arc<Listener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| l.id != id);
    }
}

/// Fan-out of registry views to subscribed display surfaces
///
/// Callbacks run on the thread that published the view, outside of any engine lock. Each
/// listener only ever moves forward: a view older than the last one it saw is skipped.
#[derive(Clone, Default)]
pub struct Subscribers {
    inner: Arc<ListenerSet>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` and delivers the view produced by `current` to it right away
    ///
    /// `current` runs after registration so a change published in between is never missed.
    pub fn subscribe<C, F>(&self, current: C, callback: F) -> Subscription
    where
        C: FnOnce() -> BookmarkView,
        F: Fn(&BookmarkView) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener {
            id,
            last_version: Mutex::new(None),
            callback: Box::new(callback),
        });

        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener.clone());

        listener.deliver(&current());

        tracing::debug!(subscriber = id, "Display surface subscribed");

        Subscription {
            id,
            set: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `view` to every current listener
    pub fn publish(&self, view: &BookmarkView) {
        for listener in self.inner.current() {
            listener.deliver(view);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a subscribed callback; the callback is released on `unsubscribe` or drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    set: Weak<ListenerSet>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(set) = self.set.upgrade() {
            set.remove(self.id);
            tracing::debug!(subscriber = self.id, "Display surface unsubscribed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, item_type: ItemType) -> BookmarkRecord {
        BookmarkRecord::new(BookmarkKey::new(id, item_type), format!("#{}", id), None)
    }

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Fn(&BookmarkView) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |view: &BookmarkView| {
            sink.lock().unwrap().push(view.version())
        })
    }

    #[test]
    fn test_is_bookmarked_compares_normalized_keys() {
        let items = vec![record(42, ItemType::Movie)];
        assert!(is_bookmarked(&items, &BookmarkKey::new("42", ItemType::Movie)));
        assert!(!is_bookmarked(&items, &BookmarkKey::new("42", ItemType::Tv)));
    }

    #[test]
    fn test_view_splits_by_type() {
        let view = BookmarkView::new(
            3,
            vec![
                record(1, ItemType::Movie),
                record(2, ItemType::Tv),
                record(3, ItemType::Movie),
            ],
        );
        assert_eq!(view.of_type(ItemType::Movie).len(), 2);
        assert_eq!(view.of_type(ItemType::Tv)[0].title, "#2");
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn test_subscriber_receives_initial_and_updates() {
        let subscribers = Subscribers::new();
        let (seen, callback) = recorder();

        let _subscription = subscribers.subscribe(|| BookmarkView::new(1, vec![]), callback);
        subscribers.publish(&BookmarkView::new(2, vec![record(1, ItemType::Movie)]));

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_stale_views_are_skipped() {
        let subscribers = Subscribers::new();
        let (seen, callback) = recorder();

        let _subscription = subscribers.subscribe(|| BookmarkView::new(5, vec![]), callback);
        subscribers.publish(&BookmarkView::new(4, vec![]));
        subscribers.publish(&BookmarkView::new(5, vec![]));
        subscribers.publish(&BookmarkView::new(6, vec![]));

        assert_eq!(*seen.lock().unwrap(), vec![5, 6]);
    }

    #[test]
    fn test_unsubscribe_and_drop_stop_delivery() {
        let subscribers = Subscribers::new();
        let (seen_a, callback_a) = recorder();
        let (seen_b, callback_b) = recorder();

        let a = subscribers.subscribe(|| BookmarkView::new(1, vec![]), callback_a);
        let b = subscribers.subscribe(|| BookmarkView::new(1, vec![]), callback_b);
        assert_eq!(subscribers.len(), 2);

        a.unsubscribe();
        subscribers.publish(&BookmarkView::new(2, vec![]));
        drop(b);
        subscribers.publish(&BookmarkView::new(3, vec![]));

        assert_eq!(*seen_a.lock().unwrap(), vec![1]);
        assert_eq!(*seen_b.lock().unwrap(), vec![1, 2]);
        assert!(subscribers.is_empty());
    }
}
