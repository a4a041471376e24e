//! In-memory query cache with in-flight deduplication.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::api::ApiError;
use crate::session::Session;

type Fetched<T> = Result<Arc<T>, Arc<ApiError>>;
type SharedFetch<T> = Shared<BoxFuture<'static, Fetched<T>>>;

/// Snapshot of a cache entry.
#[derive(Debug)]
pub struct QueryResult<T> {
  /// Last successfully fetched data, kept while refetching or after an error
  pub data: Option<Arc<T>>,
  /// A fetch for this key is in flight
  pub is_fetching: bool,
  /// Error from the most recent fetch, cleared by the next success
  pub error: Option<Arc<ApiError>>,
}

impl<T> QueryResult<T> {
  fn idle() -> Self {
    Self {
      data: None,
      is_fetching: false,
      error: None,
    }
  }
}

impl<T> Clone for QueryResult<T> {
  fn clone(&self) -> Self {
    Self {
      data: self.data.clone(),
      is_fetching: self.is_fetching,
      error: self.error.clone(),
    }
  }
}

struct Entry<T> {
  data: Option<Arc<T>>,
  fetched_at: Option<Instant>,
  stale: bool,
  error: Option<Arc<ApiError>>,
  /// Fetch in progress and the generation it started under
  in_flight: Option<(SharedFetch<T>, u64)>,
  /// Bumped by every invalidation. A fetch from an older generation is
  /// never joined and settles as stale.
  generation: u64,
}

impl<T> Default for Entry<T> {
  fn default() -> Self {
    Self {
      data: None,
      fetched_at: None,
      stale: true,
      error: None,
      in_flight: None,
      generation: 0,
    }
  }
}

impl<T> Entry<T> {
  fn snapshot(&self) -> QueryResult<T> {
    QueryResult {
      data: self.data.clone(),
      is_fetching: self.in_flight.is_some(),
      error: self.error.clone(),
    }
  }
}

/// Cache of one resource type, keyed by [`QueryKey`].
///
/// Reads only run while the session holds a credential.
pub struct QueryCache<T> {
  entries: Arc<Mutex<HashMap<QueryKey, Entry<T>>>>,
  session: Session,
  /// Age after which fresh data is refetched anyway; `None` keeps data
  /// fresh until invalidated
  stale_time: Option<Duration>,
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      session: self.session.clone(),
      stale_time: self.stale_time,
    }
  }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
  pub fn new(session: Session) -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      session,
      stale_time: None,
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_fresh(&self, entry: &Entry<T>) -> bool {
    if entry.stale || entry.data.is_none() {
      return false;
    }
    match (self.stale_time, entry.fetched_at) {
      (Some(limit), Some(at)) => at.elapsed() <= limit,
      _ => true,
    }
  }

  /// Current state of `key` without fetching.
  pub fn peek(&self, key: &QueryKey) -> QueryResult<T> {
    self
      .lock()
      .get(key)
      .map(Entry::snapshot)
      .unwrap_or_else(QueryResult::idle)
  }

  /// Read `key`, fetching when the entry is missing or stale.
  ///
  /// Concurrent reads of the same key share a single fetch. `fetcher` is
  /// only called when this read starts a new fetch. A fetch that started
  /// before an invalidation is not joined; the read starts its own. Without a credential
  /// nothing is fetched and the current snapshot is returned.
  pub async fn read<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if !self.session.is_authenticated() {
      debug!(key = %key, "read skipped, no credential");
      return self.peek(key);
    }

    let (fetch, generation) = {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_default();

      let joinable = entry
        .in_flight
        .as_ref()
        .filter(|(_, started)| *started == entry.generation)
        .map(|(fetch, _)| fetch.clone());

      if let Some(in_flight) = joinable {
        debug!(key = %key, "joining in-flight fetch");
        (in_flight, entry.generation)
      } else if entry.in_flight.is_none() && self.is_fresh(entry) {
        return entry.snapshot();
      } else {
        if entry.in_flight.is_some() {
          debug!(key = %key, "in-flight fetch predates invalidation, refetching");
        } else {
          debug!(key = %key, "fetching");
        }
        let fetch = fetcher()
          .map(|result| result.map(Arc::new).map_err(Arc::new))
          .boxed()
          .shared();
        entry.in_flight = Some((fetch.clone(), entry.generation));
        (fetch, entry.generation)
      }
    };

    let result = fetch.clone().await;

    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_default();
    let owns_fetch = entry
      .in_flight
      .as_ref()
      .map(|(f, _)| f.ptr_eq(&fetch))
      .unwrap_or(false);

    if owns_fetch {
      entry.in_flight = None;
      match result {
        Ok(data) => {
          entry.data = Some(data);
          entry.fetched_at = Some(Instant::now());
          entry.error = None;
          entry.stale = entry.generation != generation;
        }
        Err(e) => {
          warn!(key = %key, error = %e, "fetch failed");
          entry.error = Some(e);
        }
      }
    }

    entry.snapshot()
  }

  /// Mark every entry under `prefix` stale. Returns how many were marked.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.lock();
    let mut count = 0;
    for (key, entry) in entries.iter_mut() {
      if prefix.is_prefix_of(key) {
        entry.stale = true;
        entry.generation += 1;
        count += 1;
      }
    }
    count
  }

  /// Whether `key` would refetch on its next read.
  pub fn is_stale(&self, key: &QueryKey) -> bool {
    self
      .lock()
      .get(key)
      .map(|entry| !self.is_fresh(entry))
      .unwrap_or(true)
  }

  /// Drop every entry.
  pub fn clear(&self) {
    self.lock().clear();
  }
}
