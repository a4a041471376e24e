//! Observer over a [`QueryCache`] that follows one key at a time.
//!
//! Inspired by TanStack Query's `keepPreviousData`: when the parameters
//! change (say, the page is turned) the previous data stays displayable as a
//! placeholder until the new key resolves, instead of flashing empty.
//!
//! # Example
//!
//! ```ignore
//! let client = api.clone();
//! let mut query = ListQuery::new(queries.flights.clone(), flight_keys::list, move |filter| {
//!     let client = client.clone();
//!     async move { client.list_flights(&filter).await }
//! });
//!
//! query.set_params(sync.filter().clone());
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, re-render
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;

use crate::api::ApiError;
use crate::cache::{QueryCache, QueryKey, QueryResult};

/// The state of a query
#[derive(Debug)]
pub enum QueryState<T> {
  /// Query has not been started, or is gated
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(Arc<T>),
  /// Query failed with an error
  Error(Arc<ApiError>),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }
}

type FetcherFn<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Follows the cache entry for the current parameters.
///
/// Results that arrive for parameters that have since been replaced are
/// dropped unread.
pub struct ListQuery<P, T> {
  cache: QueryCache<T>,
  key_fn: fn(&P) -> QueryKey,
  fetcher: FetcherFn<P, T>,
  params: Option<P>,
  key: Option<QueryKey>,
  state: QueryState<T>,
  /// Data from the previous key, shown while the current key loads
  placeholder: Option<Arc<T>>,
  receiver: Option<mpsc::UnboundedReceiver<QueryResult<T>>>,
}

impl<P, T> ListQuery<P, T>
where
  P: Clone + Send + 'static,
  T: Send + Sync + 'static,
{
  pub fn new<F, Fut>(cache: QueryCache<T>, key_fn: fn(&P) -> QueryKey, fetcher: F) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      cache,
      key_fn,
      fetcher: Arc::new(move |params: P| fetcher(params).boxed()),
      params: None,
      key: None,
      state: QueryState::Idle,
      placeholder: None,
      receiver: None,
    }
  }

  /// Data to display: the current key's data, or the last data shown
  /// while a fetch is pending.
  pub fn data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data.as_ref()),
      _ => self.placeholder.as_deref(),
    }
  }

  /// Whether [`ListQuery::data`] is showing data from before the current fetch.
  pub fn is_placeholder(&self) -> bool {
    !self.state.is_success() && self.placeholder.is_some()
  }

  pub fn is_fetching(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      QueryState::Error(e) => Some(e.as_ref()),
      _ => None,
    }
  }

  /// Follow a new set of parameters. A no-op when they map to the key
  /// already followed and that entry is still fresh.
  pub fn set_params(&mut self, params: P) {
    let key = (self.key_fn)(&params);
    if self.key.as_ref() == Some(&key) && !self.cache.is_stale(&key) {
      return;
    }

    self.params = Some(params);
    self.key = Some(key);
    self.start_fetch();
  }

  /// Re-read the current key. Fresh entries are served from cache.
  pub fn refetch(&mut self) {
    if self.params.is_some() {
      self.start_fetch();
    }
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in your event loop.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        self.settle(result);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        self.state = QueryState::Idle;
        true
      }
    }
  }

  /// Wait for the pending fetch, if any.
  pub async fn settled(&mut self) {
    if let Some(rx) = &mut self.receiver {
      let result = rx.recv().await;
      self.receiver = None;
      match result {
        Some(result) => self.settle(result),
        None => self.state = QueryState::Idle,
      }
    }
  }

  fn settle(&mut self, result: QueryResult<T>) {
    self.state = match (result.data, result.error) {
      (_, Some(error)) => QueryState::Error(error),
      (Some(data), None) => {
        self.placeholder = None;
        QueryState::Success(data)
      }
      // Gated: no credential, nothing fetched
      (None, None) => QueryState::Idle,
    };
  }

  fn start_fetch(&mut self) {
    let (Some(params), Some(key)) = (self.params.clone(), self.key.clone()) else {
      return;
    };

    if let QueryState::Success(data) = &self.state {
      self.placeholder = Some(Arc::clone(data));
    }

    // Replacing the receiver drops any result still owed to an older key
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let cache = self.cache.clone();
    let fetcher = Arc::clone(&self.fetcher);
    tokio::spawn(async move {
      let result = cache.read(&key, move || fetcher(params)).await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<P, T> std::fmt::Debug for ListQuery<P, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ListQuery")
      .field("key", &self.key)
      .field("placeholder", &self.placeholder.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::{ErrorBody, HttpFailure};
  use crate::cache::flight_keys;
  use crate::filters::FlightFilter;
  use crate::session::{MemoryTokenStore, Session};
  use std::time::Duration;

  fn page(n: u32) -> FlightFilter {
    FlightFilter {
      page: n,
      ..FlightFilter::default()
    }
  }

  fn query(session: Session, delay_ms: u64) -> ListQuery<FlightFilter, u32> {
    ListQuery::new(QueryCache::new(session), flight_keys::list, move |filter: FlightFilter| async move {
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      Ok(filter.page * 100)
    })
  }

  fn authed() -> Session {
    Session::new(MemoryTokenStore::with_token("t"))
  }

  #[tokio::test]
  async fn test_query_success() {
    let mut query = query(authed(), 0);
    assert!(matches!(&query.state, QueryState::Idle));

    query.set_params(page(1));
    assert!(query.is_fetching());

    query.settled().await;
    assert!(query.state.is_success());
    assert_eq!(query.data(), Some(&100));
    assert!(!query.is_placeholder());
  }

  #[tokio::test]
  async fn test_previous_page_kept_while_loading() {
    let mut query = query(authed(), 20);
    query.set_params(page(1));
    query.settled().await;

    query.set_params(page(2));
    assert!(query.is_fetching());
    assert!(query.is_placeholder());
    assert_eq!(query.data(), Some(&100));

    query.settled().await;
    assert!(!query.is_placeholder());
    assert_eq!(query.data(), Some(&200));
  }

  #[tokio::test]
  async fn test_superseded_result_discarded() {
    let mut query = query(authed(), 30);
    query.set_params(page(1));
    tokio::time::sleep(Duration::from_millis(5)).await;
    query.set_params(page(3));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&300));
    assert_eq!(query.key.as_ref(), Some(&flight_keys::list(&page(3))));
  }

  #[tokio::test]
  async fn test_same_params_do_not_refetch() {
    let mut query = query(authed(), 0);
    query.set_params(page(1));
    query.settled().await;

    query.set_params(page(1));
    assert!(!query.is_fetching());
    assert!(!query.poll());
  }

  #[tokio::test]
  async fn test_refetch_after_invalidation() {
    let session = authed();
    let cache: QueryCache<u32> = QueryCache::new(session);
    let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let c = counter.clone();
    let mut query: ListQuery<FlightFilter, u32> = ListQuery::new(cache.clone(), flight_keys::list, move |_f: FlightFilter| {
      let c = c.clone();
      async move { Ok(c.fetch_add(1, std::sync::atomic::Ordering::SeqCst)) }
    });

    query.set_params(page(1));
    query.settled().await;
    assert_eq!(query.data(), Some(&0));

    cache.invalidate(&flight_keys::lists());
    query.set_params(page(1));
    query.settled().await;
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_gated_query_stays_idle() {
    let mut query = query(Session::new(MemoryTokenStore::default()), 0);
    query.set_params(page(1));
    query.settled().await;
    assert!(matches!(&query.state, QueryState::Idle));
    assert!(query.data().is_none());
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: ListQuery<FlightFilter, u32> =
      ListQuery::new(QueryCache::new(authed()), flight_keys::list, |_f: FlightFilter| async {
        Err(ApiError::Http(HttpFailure {
          status: 503,
          status_text: "Service Unavailable".into(),
          url: "http://api/x".into(),
          body: ErrorBody::Text(String::new()),
        }))
      });

    query.set_params(page(1));
    query.settled().await;
    assert!(matches!(&query.state, QueryState::Error(_)));
    assert_eq!(query.error().and_then(|e| e.status()), Some(503));
  }
}
