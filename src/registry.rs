//! In-flight registry (C3): `topic -> fetch handle`, enforcing at-most-one
//! concurrent fetch per topic and doubling as the "dictionary resident"
//! indicator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::topic::Topic;

/// Observable outcome of a fetch handle.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum HandleState {
    /// Fetch in progress.
    Pending,
    /// Dictionary delivered to the compressor registry.
    Completed,
    /// Terminal failure for this attempt. `retired` distinguishes a
    /// cancellation (which suppresses retry) from an ordinary transient
    /// failure (which does not — the caller hands the topic back to the
    /// queue itself).
    Failed { retired: bool },
}

/// Per-topic fetch handle. Carries a cancellation flag so an in-flight
/// fetch can be told, from outside the task that's awaiting the HTTP
/// response, that its result must be discarded.
#[derive(Debug)]
pub struct FetchHandle {
    state: parking_lot::Mutex<HandleState>,
    cancelled: AtomicBool,
}

impl FetchHandle {
    fn new_pending() -> Arc<Self> {
        Arc::new(Self {
            state: parking_lot::Mutex::new(HandleState::Pending),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> HandleState {
        self.state.lock().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn mark_completed(&self) {
        *self.state.lock() = HandleState::Completed;
    }

    fn mark_failed(&self, retired: bool) {
        *self.state.lock() = HandleState::Failed { retired };
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.mark_failed(true);
    }
}

/// The `topic -> handle` map described in spec.md §3/§4.3.
///
/// Invariants maintained by this type:
/// - at most one handle per topic at any time (enforced by
///   [`InFlightRegistry::try_begin`]'s atomic entry check);
/// - a topic is present iff a fetch has been started and not yet retired;
/// - a `Completed` handle is retained for the residency of the topic and is
///   the authoritative "dictionary loaded" signal for callers that want to
///   avoid redundant enqueues.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    handles: DashMap<Topic, Arc<FetchHandle>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.handles.contains_key(topic)
    }

    pub fn get(&self, topic: &Topic) -> Option<Arc<FetchHandle>> {
        self.handles.get(topic).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// All topics currently tracked for a given store. Used by the change
    /// listener to compute the DROP-by-retirement set without requiring a
    /// secondary per-store index.
    pub fn topics_for_store(&self, store_name: &str) -> Vec<Topic> {
        self.handles
            .iter()
            .map(|e| e.key().clone())
            .filter(|topic| topic.store_name() == store_name)
            .collect()
    }

    /// Attempt to start a fetch for `topic`. Returns the existing handle
    /// (deduplication) if one is already present, otherwise inserts and
    /// returns a fresh `Pending` handle together with `true` to signal the
    /// caller that it won the race and must actually spawn the fetch.
    pub fn try_begin(&self, topic: &Topic) -> (Arc<FetchHandle>, bool) {
        match self.handles.entry(topic.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let handle = FetchHandle::new_pending();
                entry.insert(Arc::clone(&handle));
                (handle, true)
            }
        }
    }

    /// Records a successful fetch, but only if `handle` is still the
    /// registry's current handle for `topic` — a late-arriving success for
    /// a handle that retirement has already superseded must be discarded
    /// instead of resurrecting the topic.
    ///
    /// Returns `true` if the success was accepted.
    pub fn complete_if_current(&self, topic: &Topic, handle: &Arc<FetchHandle>) -> bool {
        let Some(entry) = self.handles.get(topic) else {
            return false;
        };

        if !Arc::ptr_eq(entry.value(), handle) {
            return false;
        }

        handle.mark_completed();
        true
    }

    /// Removes the handle for `topic` if it is still `handle`, in
    /// preparation for scheduling a retry. Returns `true` if the caller
    /// should proceed with scheduling a retry (the handle was current and
    /// not already cancelled by a concurrent retirement).
    pub fn fail_and_remove_if_current(&self, topic: &Topic, handle: &Arc<FetchHandle>) -> bool {
        let Some(entry) = self.handles.get(topic) else {
            return false;
        };

        if !Arc::ptr_eq(entry.value(), handle) {
            return false;
        }

        if handle.is_cancelled() {
            // Already retired/cancelled: the retirement path owns removal.
            return false;
        }

        handle.mark_failed(false);
        drop(entry);
        self.handles.remove(topic);
        true
    }

    /// Retires `topic`: cancels any in-flight handle and removes it from
    /// the registry. Idempotent — retiring a topic with no handle is a
    /// no-op.
    pub fn retire(&self, topic: &Topic) {
        if let Some((_, handle)) = self.handles.remove(topic) {
            handle.cancel();
        }
    }

    /// Retires every topic for which `predicate` returns true. Used by
    /// `stop()` to cancel all handles with the "stopped" cause.
    pub fn retire_all(&self) {
        let topics: Vec<Topic> = self.handles.iter().map(|e| e.key().clone()).collect();
        for topic in topics {
            self.retire(&topic);
        }
    }
}
