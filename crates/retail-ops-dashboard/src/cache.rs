//! Query cache for dashboard reads.
//!
//! Results are memoized by [`QueryKey`] for a fixed TTL. Concurrent reads of
//! the same key share one request, and the last good value stays readable
//! while a refetch is in flight or after it fails.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use retail_ops_client::{ClientError, TableQuery};

/// Identity of a cached query: the table it reads plus its canonical filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    table: String,
    key: String,
}

impl QueryKey {
    /// Build a key from a table name and a canonical request identity.
    #[must_use]
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }

    /// The table this key reads.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl From<&TableQuery> for QueryKey {
    fn from(query: &TableQuery) -> Self {
        Self::new(query.table.clone(), query.cache_key())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// What a view sees for one key: the last good data, whether a request is
/// running, and the last error.
#[derive(Debug)]
pub struct QueryState<T> {
    /// Last successfully fetched value, possibly stale.
    pub data: Option<Arc<T>>,
    /// A request for this key is in flight.
    pub is_loading: bool,
    /// Error of the most recent request, cleared by the next success.
    pub error: Option<ClientError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

type Fetch<T> = Shared<BoxFuture<'static, Result<Arc<T>, ClientError>>>;

struct Entry<T> {
    data: Option<Arc<T>>,
    fetched_at: Option<Instant>,
    error: Option<ClientError>,
    in_flight: Option<(u64, Fetch<T>)>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            error: None,
            in_flight: None,
        }
    }
}

impl<T> Entry<T> {
    /// Whether the entry must survive a sweep: it holds fresh data or has a
    /// request running.
    fn is_live(&self, ttl: Duration) -> bool {
        self.in_flight.is_some() || self.fresh(ttl).is_some()
    }

    fn fresh(&self, ttl: Duration) -> Option<Arc<T>> {
        match (&self.data, self.fetched_at) {
            (Some(data), Some(at)) if at.elapsed() < ttl => Some(Arc::clone(data)),
            _ => None,
        }
    }
}

struct Inner<T> {
    entries: RwLock<HashMap<QueryKey, Entry<T>>>,
    next_request: AtomicU64,
}

impl<T> Inner<T> {
    /// Store the outcome of request `request_id`, unless the entry was
    /// invalidated or cleared while it ran.
    fn complete(&self, key: &QueryKey, request_id: u64, result: &Result<Arc<T>, ClientError>) {
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(key = %key, "Dropping result for cleared query");
            return;
        };
        if entry.in_flight.as_ref().map(|(id, _)| *id) != Some(request_id) {
            tracing::debug!(key = %key, "Dropping result for invalidated query");
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.fetched_at = Some(Instant::now());
                entry.error = None;
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Query failed");
                entry.error = Some(err.clone());
            }
        }
    }
}

fn evict_stale<T>(entries: &mut HashMap<QueryKey, Entry<T>>, ttl: Duration) {
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(ttl));
    let evicted = before - entries.len();
    if evicted > 0 {
        tracing::debug!(evicted, remaining = entries.len(), "Evicted stale queries");
    }
}

/// A TTL cache of query results with in-flight request sharing.
///
/// The cache is owned by the application context and passed by handle;
/// clones share the same entries.
pub struct QueryCache<T> {
    inner: Arc<Inner<T>>,
    ttl: Duration,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
        }
    }
}

impl<T> fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.inner.entries.read().len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
    /// Create an empty cache whose entries stay fresh for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                next_request: AtomicU64::new(0),
            }),
            ttl,
        }
    }

    /// Get the value for `key`.
    ///
    /// Inserting a new key first drops every entry that is neither fresh nor
    /// in flight, so the cache holds at most the live working set.
    ///
    /// Returns fresh cached data without calling `fetcher`. If a request for
    /// `key` is already running, waits for it instead of starting another.
    /// Otherwise calls `fetcher` and caches the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error of the request this call waited on. The error is
    /// also recorded for [`snapshot`](Self::snapshot); cached data is kept.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let request = {
            let mut entries = self.inner.entries.write();
            if !entries.contains_key(&key) {
                evict_stale(&mut entries, self.ttl);
            }
            let entry = entries.entry(key.clone()).or_default();

            if let Some(data) = entry.fresh(self.ttl) {
                tracing::trace!(key = %key, "Query cache hit");
                return Ok(data);
            }

            if let Some((_, running)) = &entry.in_flight {
                tracing::debug!(key = %key, "Joining in-flight query");
                running.clone()
            } else {
                let request_id = self.inner.next_request.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let pending = fetcher();
                let request_key = key.clone();
                let request = async move {
                    let result = pending.await.map(Arc::new);
                    inner.complete(&request_key, request_id, &result);
                    result
                }
                .boxed()
                .shared();

                tracing::debug!(key = %key, stale = entry.data.is_some(), "Starting query");
                entry.in_flight = Some((request_id, request.clone()));
                request
            }
        };

        request.await
    }

    /// The current state of `key`.
    #[must_use]
    pub fn snapshot(&self, key: &QueryKey) -> QueryState<T> {
        self.inner
            .entries
            .read()
            .get(key)
            .map(|entry| QueryState {
                data: entry.data.clone(),
                is_loading: entry.in_flight.is_some(),
                error: entry.error.clone(),
            })
            .unwrap_or_default()
    }

    /// Mark `key` stale. Its data stays readable until the next fetch
    /// replaces it; a request already in flight will not be cached.
    ///
    /// Returns `true` if the key was cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut entries = self.inner.entries.write();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        entry.fetched_at = None;
        entry.in_flight = None;
        true
    }

    /// Mark every key reading `table` stale. Returns how many were affected.
    pub fn invalidate_table(&self, table: &str) -> usize {
        let mut entries = self.inner.entries.write();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.table == table {
                entry.fetched_at = None;
                entry.in_flight = None;
                count += 1;
            }
        }
        tracing::debug!(table = %table, count, "Invalidated queries");
        count
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.entries.write().clear();
    }

    /// Get the number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// How long an entry stays fresh.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn key(table: &str) -> QueryKey {
        QueryKey::from(&TableQuery::new(table))
    }

    fn counting(calls: &Arc<AtomicUsize>, value: i32) -> impl Future<Output = Result<i32, ClientError>> {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    #[tokio::test]
    async fn fresh_hit_skips_fetcher() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache.fetch(key("tasks"), || counting(&calls, 1)).await.unwrap();
        let second = cache.fetch(key("tasks"), || counting(&calls, 2)).await.unwrap();

        assert_eq!((*first, *second), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let cache = QueryCache::new(Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key("tasks"), || counting(&calls, 1)).await.unwrap();
        let second = cache.fetch(key("tasks"), || counting(&calls, 2)).await.unwrap();

        assert_eq!(*second, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_keys_fetch_separately() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let a = TableQuery::new("tasks").eq("store_id", 1);
        let b = TableQuery::new("tasks").eq("store_id", 2);
        cache.fetch(QueryKey::from(&a), || counting(&calls, 1)).await.unwrap();
        cache.fetch(QueryKey::from(&b), || counting(&calls, 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_request() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let slow = |value: i32| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, ClientError>(value)
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch(key("tasks"), || slow(1)),
            cache.fetch(key("tasks"), || slow(2)),
        );

        assert_eq!((*a.unwrap(), *b.unwrap()), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_data_visible_during_refetch() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.fetch(key("tasks"), || async { Ok(1) }).await.unwrap();
        assert!(cache.invalidate(&key("tasks")));

        let (tx, rx) = oneshot::channel::<()>();
        let refetch = cache.fetch(key("tasks"), move || async move {
            rx.await.ok();
            Ok(2)
        });
        tokio::pin!(refetch);
        assert!(futures::poll!(&mut refetch).is_pending());

        let state = cache.snapshot(&key("tasks"));
        assert_eq!(state.data.as_deref(), Some(&1));
        assert!(state.is_loading);
        assert!(state.error.is_none());

        tx.send(()).unwrap();
        assert_eq!(*refetch.await.unwrap(), 2);

        let state = cache.snapshot(&key("tasks"));
        assert_eq!(state.data.as_deref(), Some(&2));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn errors_are_values_and_keep_data() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.fetch(key("tasks"), || async { Ok(1) }).await.unwrap();
        cache.invalidate(&key("tasks"));

        let err = cache
            .fetch(key("tasks"), || async { Err(ClientError::Transport("offline".into())) })
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Transport("offline".into()));

        let state = cache.snapshot(&key("tasks"));
        assert_eq!(state.data.as_deref(), Some(&1));
        assert!(!state.is_loading);
        assert_eq!(state.error, Some(ClientError::Transport("offline".into())));

        cache.fetch(key("tasks"), || async { Ok(3) }).await.unwrap();
        assert!(cache.snapshot(&key("tasks")).error.is_none());
    }

    #[tokio::test]
    async fn invalidated_request_is_not_cached() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let (tx, rx) = oneshot::channel::<()>();
        let request = cache.fetch(key("tasks"), move || async move {
            rx.await.ok();
            Ok(1)
        });
        tokio::pin!(request);
        assert!(futures::poll!(&mut request).is_pending());

        cache.invalidate(&key("tasks"));
        tx.send(()).unwrap();
        assert_eq!(*request.await.unwrap(), 1);

        let state = cache.snapshot(&key("tasks"));
        assert!(state.data.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn invalidate_table_only_touches_that_table() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key("tasks"), || counting(&calls, 1)).await.unwrap();
        cache.fetch(key("job_logs"), || counting(&calls, 1)).await.unwrap();
        assert_eq!(cache.invalidate_table("tasks"), 1);

        cache.fetch(key("tasks"), || counting(&calls, 2)).await.unwrap();
        cache.fetch(key("job_logs"), || counting(&calls, 2)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn new_key_evicts_stale_entries() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.fetch(key("tasks"), || async { Ok(1) }).await.unwrap();
        cache.fetch(key("job_logs"), || async { Ok(2) }).await.unwrap();
        cache.invalidate(&key("tasks"));

        cache.fetch(key("checklists"), || async { Ok(3) }).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.snapshot(&key("tasks")).data.is_none());
        assert_eq!(cache.snapshot(&key("job_logs")).data.as_deref(), Some(&2));
    }

    #[tokio::test]
    async fn expired_entries_do_not_accumulate() {
        let cache = QueryCache::new(Duration::ZERO);
        for days in 1..=20 {
            let query = TableQuery::new("tasks").gte("created_at", days);
            cache.fetch(QueryKey::from(&query), || async move { Ok(days) }).await.unwrap();
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn eviction_keeps_in_flight_entries() {
        let cache = QueryCache::new(Duration::ZERO);
        let (tx, rx) = oneshot::channel::<()>();
        let slow = cache.fetch(key("tasks"), move || async move {
            rx.await.ok();
            Ok(1)
        });
        tokio::pin!(slow);
        assert!(futures::poll!(&mut slow).is_pending());

        cache.fetch(key("job_logs"), || async { Ok(2) }).await.unwrap();
        assert!(cache.snapshot(&key("tasks")).is_loading);

        tx.send(()).unwrap();
        assert_eq!(*slow.await.unwrap(), 1);
        assert_eq!(cache.snapshot(&key("tasks")).data.as_deref(), Some(&1));
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.fetch(key("tasks"), || async { Ok(1) }).await.unwrap();
        assert!(!cache.is_empty());

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.snapshot(&key("tasks")).data.is_none());
        assert!(!cache.invalidate(&key("tasks")));
    }
}
