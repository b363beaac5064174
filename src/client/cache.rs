//! Query cache with invalidate-then-refetch semantics.
//!
//! Entries are keyed by an explicit `(operation, scope)` pair, where the scope
//! is the principal id. A completion for one principal therefore never lands
//! in another principal's entry.
//!
//! Concurrent reads of one key coalesce: the first caller fetches while the
//! others wait on the key's fetch lock and then take its result.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as FetchLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub operation: &'static str,
    pub scope: String,
}

impl QueryKey {
    pub fn new(operation: &'static str, scope: impl Into<String>) -> Self {
        Self {
            operation,
            scope: scope.into(),
        }
    }

    /// The testimonial list owned by `principal_id`.
    pub fn testimonials(principal_id: &str) -> Self {
        Self::new("testimonials", principal_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState<T> {
    /// Never fetched, or the read is disabled (no principal yet).
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }
}

struct Entry<T> {
    state: QueryState<T>,
    stale: bool,
    /// Number of fetches that have finished for this key.
    completed: u64,
    /// Bumped by every invalidation, so a fetch that straddles one does not
    /// mark its (possibly outdated) result fresh.
    invalidations: u64,
    lock: Arc<FetchLock<()>>,
}

impl<T> Entry<T> {
    fn invalidate(&mut self) {
        self.stale = true;
        self.invalidations += 1;
    }
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            state: QueryState::Idle,
            stale: true,
            completed: 0,
            invalidations: 0,
            lock: Arc::new(FetchLock::new(())),
        }
    }
}

pub struct QueryCache<T> {
    entries: DashMap<QueryKey, Entry<T>>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: Clone + Send + Sync> QueryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `key`. A stale entry still reports its last state;
    /// use [`QueryCache::fetch`] to get data that is safe to show.
    pub fn state(&self, key: &QueryKey) -> QueryState<T> {
        self.entries
            .get(key)
            .map(|entry| entry.state.clone())
            .unwrap_or(QueryState::Idle)
    }

    /// Whether the next [`QueryCache::fetch`] of `key` will go to the server.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.stale || !matches!(entry.state, QueryState::Ready(_)))
            .unwrap_or(true)
    }

    /// Return fresh data for `key`, running `fetcher` if the entry is missing
    /// or stale. Callers that arrive while a fetch is running wait for it and
    /// share its outcome instead of issuing another request.
    pub async fn fetch<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let (lock, seen) = {
            let entry = self.entries.entry(key.clone()).or_default();
            (entry.lock.clone(), entry.completed)
        };

        let _guard = lock.lock().await;

        if let Some(entry) = self.entries.get(key) {
            let fresh = !entry.stale && matches!(entry.state, QueryState::Ready(_));
            // Someone else finished a fetch while we waited: share its outcome.
            let joined = entry.completed != seen && !entry.stale;
            if fresh || joined {
                return entry.state.clone();
            }
        }

        let epoch = self
            .update(key, |entry| {
                entry.state = QueryState::Loading;
                entry.invalidations
            })
            .unwrap_or_default();

        let state = match fetcher().await {
            Ok(data) => QueryState::Ready(data),
            Err(e) => {
                log::warn!("Query {}/{} failed: {}", key.operation, key.scope, e);
                QueryState::Failed(e.to_string())
            }
        };

        self.update(key, |entry| {
            entry.stale = entry.invalidations != epoch;
            entry.completed += 1;
            entry.state = state.clone();
        });
        state
    }

    /// Mark `key` stale so the next fetch goes to the server.
    pub fn invalidate(&self, key: &QueryKey) {
        self.update(key, Entry::invalidate);
    }

    /// Mark every entry belonging to `scope` stale.
    pub fn invalidate_scope(&self, scope: &str) {
        for mut entry in self.entries.iter_mut() {
            if entry.key().scope == scope {
                entry.invalidate();
            }
        }
    }

    fn update<R>(&self, key: &QueryKey, f: impl FnOnce(&mut Entry<T>) -> R) -> Option<R> {
        self.entries.get_mut(key).map(|mut entry| f(&mut entry))
    }
}
