//! Keyed, TTL-bound store of items and negative results, with a
//! lookup-or-populate, single-flight contract.
//!
//! Modelled on the call-or-compute ergonomics of the teacher's
//! `MemoBuilder::get_or` (`rootsignal-core::memo`), but backed by an
//! in-memory map instead of Postgres: persistence beyond the in-process
//! cache is explicitly out of scope (spec.md §1, Non-goals).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::error::QueryError;
use crate::item::{Item, QueryMethod};
use crate::scope::Scope;

/// `(adapterName, method, scope, itemType, query)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub adapter_name: String,
    pub method: QueryMethod,
    pub scope: Scope,
    pub item_type: String,
    /// `None` for LIST, which has no query string.
    pub query: Option<String>,
}

impl CacheKey {
    pub fn new(
        adapter_name: impl Into<String>,
        method: QueryMethod,
        scope: Scope,
        item_type: impl Into<String>,
        query: Option<String>,
    ) -> Self {
        Self {
            adapter_name: adapter_name.into(),
            method,
            scope,
            item_type: item_type.into(),
            query,
        }
    }
}

#[derive(Clone)]
enum CacheValue {
    Items(Vec<Item>),
    Error(QueryError),
}

enum Slot {
    /// A populating call is in flight; waiters block on the `Notify`.
    Pending(Arc<Notify>),
    Ready(CacheValue, Instant),
}

/// The outcome of a [`ItemCache::lookup`] call.
pub enum LookupOutcome {
    /// Cache hit with a stored item list.
    ///
    /// Per spec.md §4.2, a cached `NOT_FOUND` on a LIST lookup is folded
    /// into `Items(vec![])` rather than `Error` — see [`ItemCache::lookup`].
    Items(Vec<Item>),
    /// Cache hit with a stored (cacheable) error.
    Error(QueryError),
    /// No usable cache entry; the caller should populate it.
    Miss,
}

pub struct ItemCache {
    entries: Mutex<HashMap<CacheKey, Slot>>,
}

impl Default for ItemCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up `key`. If `ignore_cache` is true, always returns `Miss`
    /// without consulting or reserving a single-flight slot (property 6).
    ///
    /// Otherwise: on a cold or expired key, reserves a pending slot (so a
    /// concurrent second caller waits rather than racing the cloud call)
    /// and returns `Miss`. Every such `Miss` MUST be followed by exactly one
    /// of [`Self::store_item`], [`Self::store_error`], or [`Self::release`]
    /// -- any other path out of the populate call leaks the pending slot and
    /// hangs every future waiter.
    pub async fn lookup(&self, key: &CacheKey, ignore_cache: bool) -> LookupOutcome {
        if ignore_cache {
            return LookupOutcome::Miss;
        }

        loop {
            let mut guard = self.entries.lock().await;
            match guard.get(key) {
                Some(Slot::Ready(value, expires_at)) => {
                    if Instant::now() < *expires_at {
                        debug!(adapter = %key.adapter_name, method = %key.method, item_type = %key.item_type, "cache hit");
                        let value = value.clone();
                        return match value {
                            CacheValue::Items(items) => LookupOutcome::Items(items),
                            CacheValue::Error(err) => {
                                // Backward-compat policy: a cached NOT_FOUND on
                                // a LIST lookup is surfaced as an empty hit
                                // with no error.
                                if err.kind == crate::error::QueryErrorKind::NotFound
                                    && key.method == QueryMethod::List
                                {
                                    LookupOutcome::Items(Vec::new())
                                } else {
                                    LookupOutcome::Error(err)
                                }
                            }
                        };
                    }
                    debug!(adapter = %key.adapter_name, method = %key.method, item_type = %key.item_type, "cache expired, reserving populate slot");
                    guard.remove(key);
                    let notify = Arc::new(Notify::new());
                    guard.insert(key.clone(), Slot::Pending(notify));
                    return LookupOutcome::Miss;
                }
                Some(Slot::Pending(notify)) => {
                    // Register interest while still holding the lock so a
                    // `notify_waiters()` from a concurrent store call can
                    // never land in the gap between dropping the guard and
                    // awaiting -- `Notify` only guarantees no missed wakeup
                    // once `notified()` itself has been called.
                    debug!(adapter = %key.adapter_name, method = %key.method, item_type = %key.item_type, "single-flight wait on in-flight populate");
                    let notified = notify.notified();
                    drop(guard);
                    notified.await;
                    continue;
                }
                None => {
                    debug!(adapter = %key.adapter_name, method = %key.method, item_type = %key.item_type, "cache miss, reserving populate slot");
                    let notify = Arc::new(Notify::new());
                    guard.insert(key.clone(), Slot::Pending(notify));
                    return LookupOutcome::Miss;
                }
            }
        }
    }

    /// Appends `item` under `key`, extending or creating the entry and its
    /// expiry. Completes (and wakes) any single-flight waiters.
    pub async fn store_item(&self, key: &CacheKey, item: Item, ttl: Duration) {
        let mut guard = self.entries.lock().await;
        let notify = Self::take_waiters(&mut guard, key);
        let expires_at = Instant::now() + ttl;
        match guard.get_mut(key) {
            Some(Slot::Ready(CacheValue::Items(items), exp)) => {
                items.push(item);
                *exp = expires_at;
            }
            _ => {
                guard.insert(key.clone(), Slot::Ready(CacheValue::Items(vec![item]), expires_at));
            }
        }
        drop(guard);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// Caches `err` under `key` only when its kind is cacheable
    /// (`NOT_FOUND`/`NO_SCOPE`); otherwise this is a no-op that still
    /// releases any single-flight slot held for `key`, so waiters retry
    /// rather than block forever on an error that was never persisted.
    pub async fn store_error(&self, key: &CacheKey, err: QueryError, ttl: Duration) {
        let mut guard = self.entries.lock().await;
        let notify = Self::take_waiters(&mut guard, key);
        if err.is_cacheable() {
            guard.insert(
                key.clone(),
                Slot::Ready(CacheValue::Error(err), Instant::now() + ttl),
            );
        } else {
            guard.remove(key);
        }
        drop(guard);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    /// Releases a `Pending` slot reserved by `lookup` without storing
    /// anything under `key`, waking any waiters so they retry rather than
    /// block forever. A no-op if `key` is no longer `Pending` -- e.g. a
    /// partial populate already called `store_item` for an earlier page
    /// before failing on a later one, in which case those stored items must
    /// survive. Every non-`ignore_cache` `Miss` from `lookup` must be
    /// followed by exactly one of `store_item`/`store_error`/`release`.
    pub async fn release(&self, key: &CacheKey) {
        let mut guard = self.entries.lock().await;
        let notify = Self::take_waiters(&mut guard, key);
        if notify.is_some() {
            guard.remove(key);
        }
        drop(guard);
        if let Some(notify) = notify {
            notify.notify_waiters();
        }
    }

    fn take_waiters(guard: &mut HashMap<CacheKey, Slot>, key: &CacheKey) -> Option<Arc<Notify>> {
        match guard.get(key) {
            Some(Slot::Pending(notify)) => Some(Arc::clone(notify)),
            _ => None,
        }
    }
}
