//! Add/edit flow for a single flight.
//!
//! The editor is either closed, open for a new flight, or open on an
//! existing one. Submitting while editing an existing flight changes it;
//! otherwise a new flight is registered.

use thiserror::Error;

use crate::api::types::{Ack, Flight, FlightForm};
use crate::guard::RequestError;
use crate::mutations::{FlightMutations, Mutation};
use crate::validation::ValidationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
  #[error(transparent)]
  Invalid(#[from] ValidationError),
  #[error(transparent)]
  Request(#[from] RequestError),
}

pub struct FlightEditor {
  mutations: FlightMutations,
  open: bool,
  editing: Option<Flight>,
  invalid: Option<ValidationError>,
  mutation: Mutation,
}

impl FlightEditor {
  pub fn new(mutations: FlightMutations) -> Self {
    Self {
      mutations,
      open: false,
      editing: None,
      invalid: None,
      mutation: Mutation::default(),
    }
  }

  pub fn open_add(&mut self) {
    self.editing = None;
    self.open = true;
    self.reset();
  }

  pub fn open_edit(&mut self, flight: Flight) {
    self.editing = Some(flight);
    self.open = true;
    self.reset();
  }

  pub fn close(&mut self) {
    self.open = false;
    self.editing = None;
    self.reset();
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  /// The flight being edited, `None` when adding.
  pub fn editing(&self) -> Option<&Flight> {
    self.editing.as_ref()
  }

  /// Form prefilled from the flight being edited, or blank.
  pub fn initial_form(&self) -> FlightForm {
    self.editing.as_ref().map(FlightForm::from).unwrap_or_default()
  }

  pub fn mutation(&self) -> &Mutation {
    &self.mutation
  }

  /// Error from the last submit; cleared on open or close.
  pub fn form_error(&self) -> Option<String> {
    match &self.invalid {
      Some(e) => Some(e.to_string()),
      None => self.mutation.error().map(str::to_string),
    }
  }

  pub async fn submit(&mut self, form: &FlightForm) -> Result<Ack, SubmitError> {
    let form = match form.validated() {
      Ok(form) => form,
      Err(e) => {
        self.invalid = Some(e.clone());
        return Err(e.into());
      }
    };
    self.invalid = None;

    let result = match self.editing.as_ref().map(|f| f.id) {
      Some(id) if id != 0 => self.mutation.run(self.mutations.update(id, &form)).await,
      _ => self.mutation.run(self.mutations.create(&form)).await,
    };

    let ack = result?;
    self.open = false;
    self.editing = None;
    Ok(ack)
  }

  fn reset(&mut self) {
    self.invalid = None;
    self.mutation.reset();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryClient;
  use crate::mutations::MutationState;
  use crate::test_support::TestServer;
  use axum::http::StatusCode;
  use axum::routing::post;
  use axum::{Json, Router};
  use serde_json::{json, Value};
  use std::sync::{Arc, Mutex};

  type Calls = Arc<Mutex<Vec<(&'static str, Value)>>>;

  fn router(calls: Calls) -> Router {
    let register = calls.clone();
    let change = calls;
    Router::new()
      .route(
        "/admin/flight/register_flight",
        post(move |Json(body): Json<Value>| {
          let calls = register.clone();
          async move {
            calls.lock().unwrap().push(("register", body));
            Json(json!({ "type": "success", "message": "Flight registered", "isLoading": false }))
          }
        }),
      )
      .route(
        "/admin/flight/change_flight",
        post(move |Json(body): Json<Value>| {
          let calls = change.clone();
          async move {
            calls.lock().unwrap().push(("change", body.clone()));
            if body["id"] == 13 {
              return (StatusCode::CONFLICT, Json(json!({ "message": "Flight number taken" })));
            }
            (
              StatusCode::OK,
              Json(json!({ "type": "success", "message": "Flight changed", "isLoading": false })),
            )
          }
        }),
      )
  }

  async fn editor() -> (TestServer, FlightEditor, Calls) {
    let calls = Calls::default();
    let server = TestServer::spawn(router(calls.clone())).await;
    let client = server.client();
    let queries = QueryClient::new(client.session().clone());
    let editor = FlightEditor::new(FlightMutations::new(client, queries));
    (server, editor, calls)
  }

  fn form() -> FlightForm {
    FlightForm {
      flight_number: "GA1".into(),
      flight_date: "2024-05-01T10:30".into(),
      from_country_id: 1,
      from_city_id: 11,
      to_country_id: 2,
      to_city_id: 21,
    }
  }

  fn flight(id: u64) -> Flight {
    serde_json::from_value(json!({
      "id": id,
      "flightNumber": "GA7",
      "flightDate": "2024-05-01 10:30:00",
      "fromCountryId": 1,
      "fromCityId": 11,
      "toCountryId": 2,
      "toCityId": 21,
      "actions": ["edit"]
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn test_add_registers_and_closes() {
    let (_server, mut editor, calls) = editor().await;
    editor.open_add();
    assert!(editor.is_open());
    assert_eq!(editor.initial_form(), FlightForm::default());

    let ack = editor.submit(&form()).await.unwrap();
    assert_eq!(ack.message, "Flight registered");
    assert!(!editor.is_open());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "register");
    assert_eq!(calls[0].1["flightDate"], "2024-05-01 10:30:00");
  }

  #[tokio::test]
  async fn test_edit_changes_by_id() {
    let (_server, mut editor, calls) = editor().await;
    editor.open_edit(flight(7));
    assert_eq!(editor.initial_form().flight_number, "GA7");

    editor.submit(&form()).await.unwrap();
    assert!(editor.editing().is_none());

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].0, "change");
    assert_eq!(calls[0].1["id"], 7);
  }

  #[tokio::test]
  async fn test_invalid_form_sends_nothing() {
    let (_server, mut editor, calls) = editor().await;
    editor.open_add();

    let mut bad = form();
    bad.flight_date = "tomorrow".into();
    let err = editor.submit(&bad).await.unwrap_err();
    assert!(matches!(err, SubmitError::Invalid(ValidationError::InvalidDate { .. })));
    assert!(editor.is_open());
    assert!(editor.form_error().is_some());
    assert!(calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_failure_persists_until_reopen() {
    let (_server, mut editor, _calls) = editor().await;
    editor.open_edit(flight(13));

    let err = editor.submit(&form()).await.unwrap_err();
    assert!(matches!(err, SubmitError::Request(RequestError::Failed { .. })));
    assert!(editor.is_open());
    assert_eq!(editor.form_error().as_deref(), Some("Flight number taken"));
    assert!(matches!(editor.mutation().state(), MutationState::HttpFailure(_)));

    editor.open_add();
    assert!(editor.form_error().is_none());
    assert_eq!(editor.mutation().state(), &MutationState::Idle);
  }
}
