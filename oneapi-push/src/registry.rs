//! Listener registration with per-domain isolation
//!
//! This module provides the ordered, internally synchronized listener sets
//! the dispatcher fans notifications out to. Mutation and snapshot on one
//! domain are mutually exclusive; different domains never share a lock.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::decoder::DecodeError;
use crate::domain::NotificationDomain;
use crate::model::Notification;

/// What a push listener receives: the decoded notification, or the reason
/// the body could not be decoded.
pub type Delivery = Result<Notification, DecodeError>;

/// A stored listener callback.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Source of every [`ListenerId`] in the process.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration.
///
/// Ids are unique across every [`ListenerSet`] in the process, so a handle
/// issued by one dispatcher or retriever never matches a listener of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Opaque removal handle for a push listener.
///
/// Removal goes through the handle rather than the callback itself, since
/// closures cannot be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    domain: NotificationDomain,
    id: ListenerId,
}

impl ListenerHandle {
    pub(crate) fn new(domain: NotificationDomain, id: ListenerId) -> Self {
        Self { domain, id }
    }

    /// Domain the listener was registered on
    pub fn domain(&self) -> NotificationDomain {
        self.domain
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

struct Entry<T> {
    id: ListenerId,
    /// Cleared on removal so an in-flight snapshot skips the listener
    active: Arc<AtomicBool>,
    listener: Listener<T>,
}

/// Ordered set of listeners for one domain.
///
/// Insertion order is dispatch order. Duplicate registrations of the same
/// callback are separate entries and are each invoked.
pub struct ListenerSet<T> {
    entries: RwLock<Vec<Entry<T>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Always succeeds.
    pub fn add(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push(Entry {
            id,
            active: Arc::new(AtomicBool::new(true)),
            listener,
        });
        id
    }

    /// Remove a listener. Returns `false` if it was already gone, or if `id`
    /// was issued by another set.
    ///
    /// Snapshots taken earlier check each listener's flag right before
    /// calling it, so an in-flight fan-out skips a listener removed before
    /// its turn. Removal does not wait for a call already under way: if a
    /// fan-out on another thread has passed the check, the listener may
    /// still start once after this returns. A listener may remove itself.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                let entry = entries.remove(index);
                entry.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Remove every listener, returning how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        for entry in entries.iter() {
            entry.active.store(false, Ordering::Release);
        }
        let count = entries.len();
        entries.clear();
        count
    }

    /// Point-in-time copy of the set, in registration order.
    pub fn snapshot(&self) -> Snapshot<T> {
        let entries = self.entries.read();
        Snapshot {
            entries: entries
                .iter()
                .map(|e| (e.active.clone(), e.listener.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Listeners captured for one fan-out.
pub struct Snapshot<T> {
    entries: Vec<(Arc<AtomicBool>, Listener<T>)>,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Listeners that were called
    pub invoked: usize,
    /// Called listeners that panicked
    pub failed: usize,
    /// Listeners removed after the snapshot was taken and therefore skipped
    pub skipped: usize,
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke every captured listener in order with `value`.
    ///
    /// A panicking listener is logged under `source` and does not stop the
    /// remaining listeners.
    pub fn deliver(&self, value: &T, source: &str) -> FanOutReport {
        let mut report = FanOutReport::default();

        for (index, (active, listener)) in self.entries.iter().enumerate() {
            if !active.load(Ordering::Acquire) {
                report.skipped += 1;
                continue;
            }

            report.invoked += 1;
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| listener(value))) {
                report.failed += 1;
                tracing::error!(
                    source,
                    listener = index,
                    "Listener invocation failed: {}",
                    panic_message(panic.as_ref())
                );
            }
        }

        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Domain-keyed registry of push listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    domains: DashMap<NotificationDomain, Arc<ListenerSet<Delivery>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The listener set for `domain`, created on first use.
    pub fn set(&self, domain: NotificationDomain) -> Arc<ListenerSet<Delivery>> {
        self.domains.entry(domain).or_default().clone()
    }

    pub fn add_listener(
        &self,
        domain: NotificationDomain,
        listener: Listener<Delivery>,
    ) -> ListenerHandle {
        let id = self.set(domain).add(listener);
        tracing::debug!(%domain, %id, "Listener added");
        ListenerHandle::new(domain, id)
    }

    /// Remove the listener behind `handle`; a no-op if already removed.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let removed = self.set(handle.domain).remove(handle.id);
        if removed {
            tracing::debug!(domain = %handle.domain, id = %handle.id, "Listener removed");
        }
        removed
    }

    /// Clear every listener on `domain`, returning how many were removed.
    pub fn remove_all(&self, domain: NotificationDomain) -> usize {
        self.set(domain).clear()
    }

    pub fn snapshot(&self, domain: NotificationDomain) -> Snapshot<Delivery> {
        self.set(domain).snapshot()
    }

    pub fn len(&self, domain: NotificationDomain) -> usize {
        self.set(domain).len()
    }

    pub fn is_empty(&self, domain: NotificationDomain) -> bool {
        self.set(domain).is_empty()
    }
}
