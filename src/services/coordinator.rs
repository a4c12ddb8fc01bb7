use std::sync::Arc;

use tokio::sync::watch;
use tracing::{instrument, Instrument};

use crate::{
    error::{AppResult, StoreError, ALREADY_BOOKMARKED, BOOKMARK_NOT_FOUND},
    models::{BookmarkKey, BookmarkRecord, BookmarkState, CatalogItem, ToggleFailure, ToggleOutcome},
    services::{
        engine::{Shared, SyncState},
        projection::BookmarkView,
        registry::BookmarkRegistry,
    },
};

type Completion = watch::Sender<Option<ToggleOutcome>>;
type Waiter = watch::Receiver<Option<ToggleOutcome>>;

/// A toggle that has not resolved yet
///
/// `in_flight` is false for a request queued behind the in-flight one on the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub key: BookmarkKey,
    pub previous_state: BookmarkState,
    pub requested_state: BookmarkState,
    pub in_flight: bool,
}

/// Opposite-direction request waiting for the in-flight one on its key
struct QueuedToggle {
    record: BookmarkRecord,
    requested: BookmarkState,
    done: Completion,
}

/// Per-key bookkeeping while a remote call for that key is outstanding
pub(crate) struct KeySlot {
    in_flight: PendingToggle,
    done: Completion,
    /// Waiters of queued requests that were folded back into the in-flight one
    coalesced: Vec<Completion>,
    queued: Option<QueuedToggle>,
}

/// A mutation already applied to the registry whose remote call still has to run
struct Operation {
    key: BookmarkKey,
    record: BookmarkRecord,
    previous: BookmarkState,
    requested: BookmarkState,
    /// Record taken out of the registry by an optimistic removal, restored on revert
    removed: Option<BookmarkRecord>,
    generation: u64,
}

enum Admission {
    /// Resolved without touching the registry or the network
    Settled(ToggleOutcome),
    /// Joined a request that is already pending
    Wait(Waiter),
    /// Applied optimistically; the remote call has to be started
    Start(Operation, Waiter),
}

/// The only writer of the registry after load and the only caller of remote create/delete
///
/// Toggles on one key are strictly serialized: at most one remote call per key is in flight,
/// an opposite request waits its turn, and a request that would undo a queued one cancels it.
/// Keys are independent of each other.
#[derive(Clone)]
pub struct ToggleCoordinator {
    shared: Arc<Shared>,
}

impl ToggleCoordinator {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Flips the bookmark state of `item`
    ///
    /// The registry changes before the remote call is issued and is rolled back if the call
    /// fails. Remote failures are reported through the outcome; only an item without an id is
    /// an error.
    pub async fn toggle(&self, item: &CatalogItem) -> AppResult<ToggleOutcome> {
        self.request(item, None).await
    }

    /// Moves `item` to `bookmarked`, doing nothing remotely if it is already there
    pub async fn set_bookmarked(
        &self,
        item: &CatalogItem,
        bookmarked: bool,
    ) -> AppResult<ToggleOutcome> {
        self.request(item, Some(BookmarkState::from_present(bookmarked)))
            .await
    }

    /// In-flight and queued toggles, in no particular order
    pub fn pending(&self) -> Vec<PendingToggle> {
        let state = self.shared.lock();
        state
            .pending
            .values()
            .flat_map(|slot| {
                let queued = slot.queued.as_ref().map(|q| PendingToggle {
                    key: slot.in_flight.key.clone(),
                    previous_state: slot.in_flight.requested_state,
                    requested_state: q.requested,
                    in_flight: false,
                });
                std::iter::once(slot.in_flight.clone()).chain(queued)
            })
            .collect()
    }

    #[instrument(
        skip(self, item),
        fields(session_id = %self.shared.session_id, key = tracing::field::Empty)
    )]
    async fn request(
        &self,
        item: &CatalogItem,
        desired: Option<BookmarkState>,
    ) -> AppResult<ToggleOutcome> {
        let record = item.to_record()?;
        tracing::Span::current().record("key", tracing::field::display(&record.key));

        let (admission, view) = {
            let mut state = self.shared.lock();
            Self::admit(&mut state, record, desired)
        };

        if let Some(view) = view {
            self.shared.subscribers.publish(&view);
        }

        let waiter = match admission {
            Admission::Settled(outcome) => return Ok(outcome),
            Admission::Wait(waiter) => waiter,
            Admission::Start(operation, waiter) => {
                tokio::spawn(
                    Self::drive(self.shared.clone(), operation)
                        .instrument(tracing::Span::current()),
                );
                waiter
            }
        };

        Ok(Self::wait(waiter).await)
    }

    /// Decides what a new request does; runs under the state lock
    fn admit(
        state: &mut SyncState,
        record: BookmarkRecord,
        desired: Option<BookmarkState>,
    ) -> (Admission, Option<BookmarkView>) {
        if let Some(slot) = state.pending.get_mut(&record.key) {
            let in_flight = slot.in_flight.requested_state;
            let effective = slot.queued.as_ref().map_or(in_flight, |q| q.requested);
            let wanted = desired.unwrap_or_else(|| effective.flip());

            if wanted == in_flight {
                if let Some(queued) = slot.queued.take() {
                    tracing::debug!("Queued toggle cancelled by a newer one");
                    slot.coalesced.push(queued.done);
                }
                tracing::debug!("Joined in-flight toggle");
                return (Admission::Wait(slot.done.subscribe()), None);
            }

            if let Some(queued) = &slot.queued {
                return (Admission::Wait(queued.done.subscribe()), None);
            }

            let (done, waiter) = watch::channel(None);
            slot.queued = Some(QueuedToggle {
                record,
                requested: wanted,
                done,
            });
            tracing::debug!(requested = ?wanted, "Toggle queued behind in-flight request");
            return (Admission::Wait(waiter), None);
        }

        let current = state.registry.state(&record.key);
        let wanted = desired.unwrap_or_else(|| current.flip());
        if wanted == current {
            return (Admission::Settled(local_match(current)), None);
        }

        let (done, waiter) = watch::channel(None);
        let operation = Self::begin(state, record, wanted, done);
        (Admission::Start(operation, waiter), Some(state.next_view()))
    }

    /// Applies the optimistic mutation and registers the key as pending
    fn begin(
        state: &mut SyncState,
        record: BookmarkRecord,
        requested: BookmarkState,
        done: Completion,
    ) -> Operation {
        let key = record.key.clone();
        let removed = match requested {
            BookmarkState::Present => {
                state.registry.upsert(record.clone());
                None
            }
            BookmarkState::Absent => state.registry.remove(&key),
        };

        state.mark_touched(&key);

        let previous = requested.flip();
        state.pending.insert(
            key.clone(),
            KeySlot {
                in_flight: PendingToggle {
                    key: key.clone(),
                    previous_state: previous,
                    requested_state: requested,
                    in_flight: true,
                },
                done,
                coalesced: Vec::new(),
                queued: None,
            },
        );

        Operation {
            key,
            record,
            previous,
            requested,
            removed,
            generation: state.generation,
        }
    }

    /// Runs the remote call for `operation`, then any request queued behind it on the same key
    async fn drive(shared: Arc<Shared>, mut operation: Operation) {
        loop {
            let result = match operation.requested {
                BookmarkState::Present => {
                    shared
                        .call("create", shared.store.create(&operation.record))
                        .await
                }
                BookmarkState::Absent => {
                    shared
                        .call("delete", shared.store.delete(&operation.key))
                        .await
                }
            };

            let (view, resolved, next) = {
                let mut state = shared.lock();
                if state.generation != operation.generation {
                    tracing::debug!(key = %operation.key, "Dropping toggle result from ended session");
                    return;
                }
                let Some(slot) = state.pending.remove(&operation.key) else {
                    return;
                };

                let (outcome, reverted) = settle(&mut state.registry, &operation, result);
                state.mark_touched(&operation.key);

                let mut resolved: Vec<(Completion, ToggleOutcome)> = std::iter::once(slot.done)
                    .chain(slot.coalesced)
                    .map(|done| (done, outcome.clone()))
                    .collect();

                let mut next = None;
                if let Some(queued) = slot.queued {
                    let current = state.registry.state(&operation.key);
                    if current == queued.requested {
                        resolved.push((queued.done, local_match(current)));
                    } else {
                        next = Some(Self::begin(
                            &mut state,
                            queued.record,
                            queued.requested,
                            queued.done,
                        ));
                    }
                }

                let view = (reverted || next.is_some()).then(|| state.next_view());
                (view, resolved, next)
            };

            if let Some(view) = view {
                shared.subscribers.publish(&view);
            }
            for (done, outcome) in resolved {
                done.send_replace(Some(outcome));
            }

            match next {
                Some(queued) => operation = queued,
                None => break,
            }
        }
    }

    async fn wait(mut waiter: Waiter) -> ToggleOutcome {
        let outcome = match waiter.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(ToggleOutcome::Discarded)
    }
}

/// Outcome for a request whose target state the registry already holds
fn local_match(state: BookmarkState) -> ToggleOutcome {
    let message = match state {
        BookmarkState::Present => ALREADY_BOOKMARKED,
        BookmarkState::Absent => BOOKMARK_NOT_FOUND,
    };
    ToggleOutcome::AlreadyReconciled {
        state,
        message: message.to_string(),
    }
}

/// Maps a store error onto the toggle taxonomy
///
/// `Ok` carries the server message when the failure only says the remote store already holds
/// the requested state.
fn classify(requested: BookmarkState, error: StoreError) -> Result<String, ToggleFailure> {
    match (requested, error) {
        (BookmarkState::Present, StoreError::AlreadyBookmarked(message))
        | (BookmarkState::Absent, StoreError::NotFound(message)) => Ok(message),
        (_, StoreError::Unauthorized(message)) => Err(ToggleFailure::Auth { message }),
        (_, other) => Err(ToggleFailure::Transient {
            message: other.to_string(),
        }),
    }
}

/// Reconciles the registry with the remote result; returns the outcome and whether it reverted
fn settle(
    registry: &mut BookmarkRegistry,
    operation: &Operation,
    result: Result<String, StoreError>,
) -> (ToggleOutcome, bool) {
    let error = match result {
        Ok(message) => {
            tracing::info!(key = %operation.key, state = ?operation.requested, "Toggle confirmed");
            let message = (!message.is_empty()).then_some(message);
            return (
                ToggleOutcome::Confirmed {
                    state: operation.requested,
                    message,
                },
                false,
            );
        }
        Err(error) => error,
    };

    match classify(operation.requested, error) {
        Ok(message) => {
            tracing::info!(
                key = %operation.key,
                state = ?operation.requested,
                message = %message,
                "Remote store already held the requested state"
            );
            (
                ToggleOutcome::AlreadyReconciled {
                    state: operation.requested,
                    message,
                },
                false,
            )
        }
        Err(failure) => {
            match operation.previous {
                BookmarkState::Present => {
                    if let Some(record) = operation.removed.clone() {
                        registry.upsert(record);
                    }
                }
                BookmarkState::Absent => {
                    registry.remove(&operation.key);
                }
            }

            tracing::warn!(
                key = %operation.key,
                restored = ?operation.previous,
                failure = %failure,
                "Toggle reverted"
            );

            (
                ToggleOutcome::Reverted {
                    state: operation.previous,
                    failure,
                },
                true,
            )
        }
    }
}
