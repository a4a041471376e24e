//! Flight writes and their effect on cached reads.

use tracing::info;

use crate::api::types::{Ack, FlightForm};
use crate::api::{ApiClient, ApiError, ApiErrorKind};
use crate::cache::{flight_keys, QueryClient};
use crate::guard::{intercept, RequestError};

/// Create/update/delete against the API.
///
/// A successful write marks every cached flight list stale, whatever filter
/// or page it was read with. Failed writes leave the cache alone.
#[derive(Clone)]
pub struct FlightMutations {
  client: ApiClient,
  queries: QueryClient,
}

impl FlightMutations {
  pub fn new(client: ApiClient, queries: QueryClient) -> Self {
    Self { client, queries }
  }

  pub async fn create(&self, form: &FlightForm) -> Result<Ack, RequestError> {
    let result = self.client.register_flight(form).await;
    self.settle("create", result)
  }

  pub async fn update(&self, id: u64, form: &FlightForm) -> Result<Ack, RequestError> {
    let result = self.client.change_flight(id, form).await;
    self.settle("update", result)
  }

  pub async fn delete(&self, id: u64) -> Result<Ack, RequestError> {
    let result = self.client.delete_flight(id).await;
    self.settle("delete", result)
  }

  fn settle(&self, operation: &str, result: Result<Ack, ApiError>) -> Result<Ack, RequestError> {
    match result {
      Ok(ack) => {
        let invalidated = self.queries.invalidate(&flight_keys::lists());
        info!(operation, invalidated, message = %ack.message, "flight write succeeded");
        Ok(ack)
      }
      Err(e) => Err(intercept(self.client.session(), operation, &e)),
    }
  }
}

/// Lifecycle of a single write.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MutationState {
  #[default]
  Idle,
  Pending,
  Success(Ack),
  Unauthorized,
  HttpFailure(String),
  NetworkFailure(String),
}

/// Tracks the outcome of the most recent write until it is reset.
#[derive(Debug, Default)]
pub struct Mutation {
  state: MutationState,
}

impl Mutation {
  pub fn state(&self) -> &MutationState {
    &self.state
  }

  /// Message of the last failure, if the last write failed.
  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::HttpFailure(msg) | MutationState::NetworkFailure(msg) => Some(msg),
      MutationState::Unauthorized => Some("Unauthorized or session expired"),
      _ => None,
    }
  }

  /// Back to `Idle`, e.g. when the editing surface is reopened.
  pub fn reset(&mut self) {
    self.state = MutationState::Idle;
  }

  /// Run a write, recording its outcome.
  pub async fn run<Fut>(&mut self, write: Fut) -> Result<Ack, RequestError>
  where
    Fut: std::future::Future<Output = Result<Ack, RequestError>>,
  {
    self.state = MutationState::Pending;
    let result = write.await;
    self.state = match &result {
      Ok(ack) => MutationState::Success(ack.clone()),
      Err(RequestError::LoginRequired) => MutationState::Unauthorized,
      Err(RequestError::Failed {
        kind: ApiErrorKind::Network,
        message,
      }) => MutationState::NetworkFailure(message.clone()),
      Err(RequestError::Failed { message, .. }) => MutationState::HttpFailure(message.clone()),
    };
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{AckType, FlightsPage};
  use crate::filters::FlightFilter;
  use crate::session::{MemoryTokenStore, Session, SessionEvent};
  use crate::test_support::{Hits, TestServer};
  use axum::http::StatusCode;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::json;

  fn form() -> FlightForm {
    FlightForm {
      flight_number: "GA1".into(),
      flight_date: "2024-05-01 10:30:00".into(),
      from_country_id: 1,
      from_city_id: 11,
      to_country_id: 2,
      to_city_id: 21,
    }
  }

  fn ack() -> Json<serde_json::Value> {
    Json(json!({ "type": "success", "message": "ok", "isLoading": false }))
  }

  fn router(hits: Hits) -> Router {
    Router::new()
      .route(
        "/admin/flight/get_flights",
        get(move || {
          let hits = hits.clone();
          async move {
            let n = hits.bump();
            Json(json!({
              "recordsNumber": n,
              "currentPage": 1,
              "perPage": 10,
              "flights": []
            }))
          }
        }),
      )
      .route("/admin/flight/register_flight", post(|| async { ack() }))
      .route("/admin/flight/change_flight", post(|| async { ack() }))
      .route(
        "/admin/flight/delete_flight",
        post(|| async {
          (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "expired" })),
          )
        }),
      )
      .route(
        "/admin/flight/fail",
        post(|| async { (StatusCode::CONFLICT, "duplicate flight") }),
      )
  }

  async fn read_page(queries: &QueryClient, client: &ApiClient, filter: FlightFilter) -> u64 {
    let client = client.clone();
    let key = flight_keys::list(&filter);
    let result = queries
      .flights
      .read(&key, move || async move { client.list_flights(&filter).await })
      .await;
    result
      .data
      .map(|page: std::sync::Arc<FlightsPage>| page.records_number)
      .unwrap_or_default()
  }

  #[tokio::test]
  async fn test_successful_write_invalidates_every_list() {
    let hits = Hits::default();
    let server = TestServer::spawn(router(hits.clone())).await;
    let client = server.client();
    let queries = QueryClient::new(client.session().clone());
    let mutations = FlightMutations::new(client.clone(), queries.clone());

    let first = FlightFilter::default();
    let second = FlightFilter {
      page: 2,
      from_country_id: Some(3),
      ..FlightFilter::default()
    };

    read_page(&queries, &client, first.clone()).await;
    read_page(&queries, &client, second.clone()).await;
    read_page(&queries, &client, first.clone()).await;
    assert_eq!(hits.get(), 2);

    let ack = mutations.create(&form()).await.unwrap();
    assert_eq!(ack.kind, AckType::Success);

    assert!(queries.flights.is_stale(&flight_keys::list(&first)));
    assert!(queries.flights.is_stale(&flight_keys::list(&second)));

    read_page(&queries, &client, second).await;
    assert_eq!(hits.get(), 3);

    mutations.update(5, &form()).await.unwrap();
    read_page(&queries, &client, first).await;
    assert_eq!(hits.get(), 4);
  }

  #[tokio::test]
  async fn test_unauthorized_write_ends_session() {
    let server = TestServer::spawn(router(Hits::default())).await;
    let (session, mut rx) = Session::with_events(MemoryTokenStore::with_token("t"));
    let client = server.client_with(session.clone());
    let queries = QueryClient::new(session.clone());
    let mutations = FlightMutations::new(client, queries);

    let err = mutations.delete(3).await.unwrap_err();
    assert_eq!(err, RequestError::LoginRequired);
    assert!(!session.is_authenticated());
    assert_eq!(rx.try_recv().ok(), Some(SessionEvent::LoginRequired));
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_failed_write_keeps_cache_and_session() {
    let hits = Hits::default();
    let server = TestServer::spawn(router(hits.clone())).await;
    let client = server.client();
    let queries = QueryClient::new(client.session().clone());
    let mutations = FlightMutations::new(client.clone(), queries.clone());

    read_page(&queries, &client, FlightFilter::default()).await;

    let result: Result<Ack, ApiError> = client.post("/admin/flight/fail", &form()).await;
    let err = mutations.settle("create", result).unwrap_err();
    match err {
      RequestError::Failed { kind, message } => {
        assert_eq!(kind, ApiErrorKind::Http);
        assert!(message.contains("409"));
      }
      other => panic!("unexpected: {:?}", other),
    }

    assert!(client.session().is_authenticated());
    assert!(!queries.flights.is_stale(&flight_keys::list(&FlightFilter::default())));
  }

  #[tokio::test]
  async fn test_concurrent_writes_invalidate_consistently() {
    let hits = Hits::default();
    let server = TestServer::spawn(router(hits.clone())).await;
    let client = server.client();
    let queries = QueryClient::new(client.session().clone());
    let mutations = FlightMutations::new(client.clone(), queries.clone());

    read_page(&queries, &client, FlightFilter::default()).await;

    let form = form();
    let (a, b) = tokio::join!(mutations.create(&form), mutations.update(9, &form));
    assert!(a.is_ok() && b.is_ok());
    assert!(queries.flights.is_stale(&flight_keys::list(&FlightFilter::default())));
  }

  #[tokio::test]
  async fn test_mutation_state_transitions() {
    let mut mutation = Mutation::default();
    assert_eq!(mutation.state(), &MutationState::Idle);

    let ack = Ack {
      kind: AckType::Success,
      message: "ok".into(),
      is_loading: false,
    };
    let result = mutation.run(async { Ok(ack.clone()) }).await;
    assert!(result.is_ok());
    assert_eq!(mutation.state(), &MutationState::Success(ack));

    let _ = mutation
      .run(async {
        Err(RequestError::Failed {
          kind: ApiErrorKind::Network,
          message: "Network request failed for x".into(),
        })
      })
      .await;
    assert_eq!(
      mutation.state(),
      &MutationState::NetworkFailure("Network request failed for x".into())
    );
    // Error persists until reset
    assert_eq!(mutation.error(), Some("Network request failed for x"));

    let _ = mutation.run(async { Err(RequestError::LoginRequired) }).await;
    assert_eq!(mutation.state(), &MutationState::Unauthorized);

    mutation.reset();
    assert_eq!(mutation.state(), &MutationState::Idle);
    assert!(mutation.error().is_none());
  }
}
