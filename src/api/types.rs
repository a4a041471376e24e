//! Wire types for the flight admin API.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use validator::Validate;

// ============================================================================
// Flights
// ============================================================================

/// Action an operator may take on a flight row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightAction {
  Edit,
  Delete,
}

/// A flight as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
  pub id: u64,
  pub flight_number: String,
  /// `YYYY-MM-DD HH:MM:SS`
  pub flight_date: String,
  pub from_country_id: u64,
  #[serde(default)]
  pub from_country_dictionary_key: String,
  pub from_city_id: u64,
  #[serde(default)]
  pub from_city_dictionary_key: String,
  pub to_country_id: u64,
  #[serde(default)]
  pub to_country_dictionary_key: String,
  pub to_city_id: u64,
  #[serde(default)]
  pub to_city_dictionary_key: String,
  /// Creation timestamp
  #[serde(default)]
  pub inp_date: String,
  #[serde(default)]
  pub actions: Vec<FlightAction>,
}

impl Flight {
  pub fn can_edit(&self) -> bool {
    self.actions.contains(&FlightAction::Edit)
  }

  pub fn can_delete(&self) -> bool {
    self.actions.contains(&FlightAction::Delete)
  }
}

/// One page of flights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightsPage {
  pub records_number: u64,
  pub current_page: u32,
  pub per_page: u32,
  pub flights: Vec<Flight>,
}

impl FlightsPage {
  /// Whether another page is likely to exist.
  ///
  /// The server does not flag this; a full page is taken to mean more
  /// records follow. An exactly-full last page therefore reports `true`.
  pub fn has_next(&self) -> bool {
    self.flights.len() == self.per_page as usize
  }

  pub fn has_previous(&self) -> bool {
    self.current_page > 1
  }
}

/// Payload for registering or changing a flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlightForm {
  #[validate(length(min = 1, message = "Flight number is required."))]
  pub flight_number: String,
  /// `YYYY-MM-DD HH:MM:SS`
  #[validate(length(min = 1, message = "Flight date is required."))]
  pub flight_date: String,
  #[validate(range(min = 1, message = "Origin country is required."))]
  pub from_country_id: u64,
  #[validate(range(min = 1, message = "Origin city is required."))]
  pub from_city_id: u64,
  #[validate(range(min = 1, message = "Destination country is required."))]
  pub to_country_id: u64,
  #[validate(range(min = 1, message = "Destination city is required."))]
  pub to_city_id: u64,
}

impl From<&Flight> for FlightForm {
  fn from(flight: &Flight) -> Self {
    FlightForm {
      flight_number: flight.flight_number.clone(),
      flight_date: flight.flight_date.clone(),
      from_country_id: flight.from_country_id,
      from_city_id: flight.from_city_id,
      to_country_id: flight.to_country_id,
      to_city_id: flight.to_city_id,
    }
  }
}

/// Body of a change request: the form plus the target id.
#[derive(Debug, Serialize)]
pub(crate) struct ChangeFlightBody<'a> {
  #[serde(flatten)]
  pub form: &'a FlightForm,
  pub id: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteFlightBody {
  pub id: u64,
}

// ============================================================================
// Acknowledgements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckType {
  Success,
  Error,
}

/// Uniform acknowledgement returned by write endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
  #[serde(rename = "type")]
  pub kind: AckType,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub is_loading: bool,
}

// ============================================================================
// Dictionaries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
  pub country_id: u64,
  pub country_name: String,
  #[serde(default)]
  pub country_dictionary_key: String,
  #[serde(with = "yes_no")]
  pub send_allowed: bool,
  #[serde(with = "yes_no")]
  pub received_allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
  pub city_id: u64,
  pub country_id: u64,
  pub city_name: String,
  #[serde(default)]
  pub city_dictionary_key: String,
  #[serde(with = "yes_no")]
  pub send_allowed: bool,
  #[serde(with = "yes_no")]
  pub received_allowed: bool,
}

/// `"Y"` / `"N"` flags.
mod yes_no {
  use super::*;

  pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "Y" } else { "N" })
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    Ok(s.eq_ignore_ascii_case("y"))
  }
}

// ============================================================================
// Authentication
// ============================================================================

/// Channel value the admin console logs in with.
pub const ADMIN_CHANNEL: &str = "ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LoginRequest {
  #[validate(
    length(min = 1, message = "Email is required."),
    email(message = "Invalid email format.")
  )]
  pub user_name: String,
  #[validate(length(min = 1, message = "Password is required."))]
  pub password: String,
  pub channel: String,
}

impl LoginRequest {
  pub fn admin(user_name: &str, password: &str) -> Self {
    Self {
      user_name: user_name.to_string(),
      password: password.to_string(),
      channel: ADMIN_CHANNEL.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: u64,
  pub user_name: String,
  #[serde(default)]
  pub first_name_en: String,
  #[serde(default)]
  pub last_name_en: String,
  #[serde(default)]
  pub first_name_ge: String,
  #[serde(default)]
  pub last_name_ge: String,
  #[serde(default)]
  pub company_name_en: Option<String>,
  #[serde(default)]
  pub company_name_ge: Option<String>,
  #[serde(default)]
  pub gender: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub room_number: String,
  #[serde(default)]
  pub user_type_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginGrant {
  pub token: String,
  pub user: User,
}

/// Login outcome, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum LoginResponse {
  Success(LoginGrant),
  Error(String),
}
