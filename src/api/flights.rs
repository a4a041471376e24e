use tracing::debug;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{Ack, ChangeFlightBody, DeleteFlightBody, FlightForm, FlightsPage};
use crate::filters::FlightFilter;

const GET_FLIGHTS: &str = "/admin/flight/get_flights";
const REGISTER_FLIGHT: &str = "/admin/flight/register_flight";
const CHANGE_FLIGHT: &str = "/admin/flight/change_flight";
const DELETE_FLIGHT: &str = "/admin/flight/delete_flight";

impl ApiClient {
  /// Fetch one page of flights matching `filter`.
  pub async fn list_flights(&self, filter: &FlightFilter) -> Result<FlightsPage, ApiError> {
    let query = filter.to_query_string();
    debug!(query = %query, "listing flights");
    self.get(&format!("{}?{}", GET_FLIGHTS, query)).await
  }

  pub async fn register_flight(&self, form: &FlightForm) -> Result<Ack, ApiError> {
    self.post(REGISTER_FLIGHT, form).await
  }

  pub async fn change_flight(&self, id: u64, form: &FlightForm) -> Result<Ack, ApiError> {
    self.post(CHANGE_FLIGHT, &ChangeFlightBody { form, id }).await
  }

  pub async fn delete_flight(&self, id: u64) -> Result<Ack, ApiError> {
    self.post(DELETE_FLIGHT, &DeleteFlightBody { id }).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::AckType;
  use crate::test_support::TestServer;
  use axum::extract::RawQuery;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::{json, Value};

  #[tokio::test]
  async fn test_list_sends_canonical_query() {
    let server = TestServer::spawn(Router::new().route(
      GET_FLIGHTS,
      get(|RawQuery(query): RawQuery| async move {
        Json(json!({
          "recordsNumber": 0,
          "currentPage": 1,
          "perPage": 10,
          "flights": [],
          "echo": query,
        }))
      }),
    ))
    .await;

    // Echo the query back through a raw read so it can be inspected
    let filter = FlightFilter {
      from_country_id: Some(5),
      from_city_id: Some(0),
      flight_number: Some(String::new()),
      ..FlightFilter::default()
    };
    let url = format!("{}?{}", GET_FLIGHTS, filter.to_query_string());
    let raw: Value = server.client().get(&url).await.unwrap();
    assert_eq!(raw["echo"], "fromCountryId=5&page=1&perPage=10");

    let page = server.client().list_flights(&filter).await.unwrap();
    assert!(page.flights.is_empty());
    assert!(!page.has_next());
  }

  #[tokio::test]
  async fn test_write_bodies() {
    let server = TestServer::spawn(
      Router::new()
        .route(
          REGISTER_FLIGHT,
          post(|Json(body): Json<Value>| async move {
            Json(json!({ "type": "success", "message": body["flightNumber"], "isLoading": false }))
          }),
        )
        .route(
          CHANGE_FLIGHT,
          post(|Json(body): Json<Value>| async move {
            Json(json!({ "type": "success", "message": format!("changed {}", body["id"]), "isLoading": false }))
          }),
        )
        .route(
          DELETE_FLIGHT,
          post(|Json(body): Json<Value>| async move {
            let keys: Vec<String> = body.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default();
            Json(json!({ "type": "success", "message": keys.join(","), "isLoading": false }))
          }),
        ),
    )
    .await;

    let client = server.client();
    let form = FlightForm {
      flight_number: "GA9".into(),
      flight_date: "2024-05-01 10:30:00".into(),
      from_country_id: 1,
      from_city_id: 11,
      to_country_id: 2,
      to_city_id: 21,
    };

    let ack = client.register_flight(&form).await.unwrap();
    assert_eq!(ack.kind, AckType::Success);
    assert_eq!(ack.message, "GA9");

    let ack = client.change_flight(42, &form).await.unwrap();
    assert_eq!(ack.message, "changed 42");

    let ack = client.delete_flight(42).await.unwrap();
    assert_eq!(ack.message, "id");
  }
}
