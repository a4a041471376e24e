//! Entry point tying the session, API client and query caches together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::types::{City, Country, FlightsPage, LoginRequest, LoginResponse, User};
use crate::api::{ApiClient, ApiError};
use crate::cache::{dictionary_keys, flight_keys, QueryCache, QueryClient, QueryKey};
use crate::editor::FlightEditor;
use crate::filters::{FilterSync, FlightFilter};
use crate::guard::{self, intercept, RequestError};
use crate::mutations::FlightMutations;
use crate::query::ListQuery;
use crate::session::{Session, TokenStoreError};
use crate::validation::{validate_login, ValidationError};

#[derive(Debug, Error)]
pub enum LoginError {
  #[error(transparent)]
  Invalid(#[from] ValidationError),
  /// The server answered with `type: "error"`
  #[error("{0}")]
  Rejected(String),
  #[error(transparent)]
  Request(#[from] RequestError),
  #[error(transparent)]
  Store(#[from] TokenStoreError),
}

#[derive(Clone)]
pub struct Console {
  client: ApiClient,
  queries: QueryClient,
  per_page: u32,
}

impl Console {
  pub fn new(base_url: &str, session: Session, per_page: u32) -> Result<Self, url::ParseError> {
    let client = ApiClient::new(base_url, session.clone())?;
    Ok(Self {
      client,
      queries: QueryClient::new(session),
      per_page,
    })
  }

  pub fn session(&self) -> &Session {
    self.client.session()
  }

  /// Refetch cached reads once they are older than `stale_time`.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.queries = self.queries.with_stale_time(stale_time);
    self
  }

  /// Authenticate and keep the granted token.
  ///
  /// Cached reads from any previous session are dropped.
  pub async fn login(&self, user_name: &str, password: &str) -> Result<User, LoginError> {
    let request = LoginRequest::admin(user_name, password);
    validate_login(&request)?;

    let response = self
      .client
      .login(&request)
      .await
      .map_err(|e| intercept(self.session(), "login", &e))?;

    match response {
      LoginResponse::Success(grant) => {
        self.session().set_token(&grant.token)?;
        self.queries.clear();
        info!(user = %grant.user.user_name, "logged in");
        Ok(grant.user)
      }
      LoginResponse::Error(message) => {
        warn!(message = %message, "login rejected");
        Err(LoginError::Rejected(message))
      }
    }
  }

  pub fn logout(&self) -> Result<(), TokenStoreError> {
    self.session().clear()?;
    self.queries.clear();
    info!("logged out");
    Ok(())
  }

  pub fn require_session(&self) -> Result<(), RequestError> {
    guard::require_session(self.session())
  }

  pub async fn flights(&self, filter: &FlightFilter) -> Result<Arc<FlightsPage>, RequestError> {
    let client = self.client.clone();
    let filter = filter.canonical();
    let key = flight_keys::list(&filter);
    read(self.session(), "list flights", &self.queries.flights, &key, move || async move {
      client.list_flights(&filter).await
    })
    .await
  }

  pub async fn countries(&self) -> Result<Arc<Vec<Country>>, RequestError> {
    let client = self.client.clone();
    read(
      self.session(),
      "list countries",
      &self.queries.countries,
      &dictionary_keys::countries(),
      move || async move { client.countries().await },
    )
    .await
  }

  pub async fn cities(&self) -> Result<Arc<Vec<City>>, RequestError> {
    let client = self.client.clone();
    read(
      self.session(),
      "list cities",
      &self.queries.cities,
      &dictionary_keys::cities(),
      move || async move { client.cities().await },
    )
    .await
  }

  /// Observer over flight pages that keeps the previous page on screen
  /// while the next one loads.
  pub fn flights_query(&self) -> ListQuery<FlightFilter, FlightsPage> {
    let client = self.client.clone();
    ListQuery::new(self.queries.flights.clone(), flight_keys::list, move |filter: FlightFilter| {
      let client = client.clone();
      async move { client.list_flights(&filter).await }
    })
  }

  pub fn filter_sync(&self, query: &str) -> FilterSync {
    FilterSync::from_query(query, self.per_page)
  }

  pub fn mutations(&self) -> FlightMutations {
    FlightMutations::new(self.client.clone(), self.queries.clone())
  }

  pub fn editor(&self) -> FlightEditor {
    FlightEditor::new(self.mutations())
  }
}

/// Read through `cache`, routing failures through the session.
async fn read<T, F, Fut>(
  session: &Session,
  operation: &str,
  cache: &QueryCache<T>,
  key: &QueryKey,
  fetcher: F,
) -> Result<Arc<T>, RequestError>
where
  T: Send + Sync + 'static,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  guard::require_session(session)?;

  let result = cache.read(key, fetcher).await;
  if let Some(err) = result.error {
    return Err(intercept(session, operation, &err));
  }
  // No data and no error: the credential went away mid-read
  result.data.ok_or(RequestError::LoginRequired)
}
