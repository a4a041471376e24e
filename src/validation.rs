//! Client-side input checks. Failures here never reach the network.

use chrono::NaiveDateTime;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::api::types::{FlightForm, LoginRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  /// A field check failed; `field` names the struct field
  #[error("{message}")]
  Field { field: &'static str, message: String },
  #[error("{field}: invalid date '{value}'")]
  InvalidDate { field: &'static str, value: String },
  #[error("From date must not be after to date.")]
  DateRange,
}

/// Formats accepted for a flight date, most specific first.
const FLIGHT_DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
];

/// Wire format for flight timestamps.
pub const FLIGHT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a flight date in any accepted format and render it in wire form.
pub fn normalize_flight_date(value: &str) -> Result<String, ValidationError> {
  let value = value.trim();
  FLIGHT_DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    .map(|dt| dt.format(FLIGHT_DATE_FORMAT).to_string())
    .ok_or_else(|| ValidationError::InvalidDate {
      field: "flightDate",
      value: value.to_string(),
    })
}

const LOGIN_FIELDS: &[&str] = &["user_name", "password"];

const FORM_FIELDS: &[&str] = &[
  "flight_number",
  "flight_date",
  "from_country_id",
  "from_city_id",
  "to_country_id",
  "to_city_id",
];

/// First failure in form order. Presence is reported before format.
fn first_failure(errors: &ValidationErrors, order: &[&'static str]) -> ValidationError {
  let fields = errors.field_errors();
  order
    .iter()
    .find_map(|field| {
      let failures = fields.get(*field)?;
      let failure = failures
        .iter()
        .find(|f| f.code != "email")
        .or_else(|| failures.first())?;
      Some(ValidationError::Field {
        field: *field,
        message: failure
          .message
          .as_deref()
          .unwrap_or("Invalid value.")
          .to_string(),
      })
    })
    .unwrap_or_else(|| ValidationError::Field {
      field: "",
      message: errors.to_string(),
    })
}

/// Check login input.
pub fn validate_login(request: &LoginRequest) -> Result<(), ValidationError> {
  request
    .validate()
    .map_err(|errors| first_failure(&errors, LOGIN_FIELDS))
}

impl FlightForm {
  /// Check required fields and normalize the date to wire form.
  pub fn validated(&self) -> Result<FlightForm, ValidationError> {
    let form = FlightForm {
      flight_number: self.flight_number.trim().to_string(),
      flight_date: self.flight_date.trim().to_string(),
      ..self.clone()
    };
    form
      .validate()
      .map_err(|errors| first_failure(&errors, FORM_FIELDS))?;

    Ok(FlightForm {
      flight_date: normalize_flight_date(&form.flight_date)?,
      ..form
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form() -> FlightForm {
    FlightForm {
      flight_number: "GA100".into(),
      flight_date: "2024-05-01T10:30".into(),
      from_country_id: 1,
      from_city_id: 11,
      to_country_id: 2,
      to_city_id: 21,
    }
  }

  fn field_of(err: ValidationError) -> &'static str {
    match err {
      ValidationError::Field { field, .. } => field,
      other => panic!("unexpected: {:?}", other),
    }
  }

  #[test]
  fn test_login_validation() {
    let login = |user: &str, password: &str| validate_login(&LoginRequest::admin(user, password));

    assert_eq!(
      login("", "x").unwrap_err().to_string(),
      "Email is required."
    );
    assert_eq!(
      login("ops", "x").unwrap_err().to_string(),
      "Invalid email format."
    );
    assert_eq!(
      login("ops@example.com", "").unwrap_err(),
      ValidationError::Field {
        field: "password",
        message: "Password is required.".into()
      }
    );
    assert!(login("ops@example.com", "secret").is_ok());
  }

  #[test]
  fn test_flight_date_normalized() {
    assert_eq!(
      normalize_flight_date("2024-05-01T10:30").unwrap(),
      "2024-05-01 10:30:00"
    );
    assert_eq!(
      normalize_flight_date("2024-05-01 10:30:15").unwrap(),
      "2024-05-01 10:30:15"
    );
    assert!(normalize_flight_date("tomorrow").is_err());
  }

  #[test]
  fn test_form_valid() {
    let validated = form().validated().unwrap();
    assert_eq!(validated.flight_date, "2024-05-01 10:30:00");
    assert_eq!(validated.to_city_id, 21);
  }

  #[test]
  fn test_form_required_fields() {
    let mut f = form();
    f.flight_number = "  ".into();
    assert_eq!(f.validated().unwrap_err().to_string(), "Flight number is required.");

    let mut f = form();
    f.from_city_id = 0;
    assert_eq!(field_of(f.validated().unwrap_err()), "from_city_id");

    let mut f = form();
    f.flight_date = String::new();
    assert_eq!(field_of(f.validated().unwrap_err()), "flight_date");
  }

  #[test]
  fn test_form_reports_first_field_in_order() {
    let mut f = form();
    f.to_city_id = 0;
    f.from_country_id = 0;
    f.to_country_id = 0;
    assert_eq!(
      f.validated().unwrap_err().to_string(),
      "Origin country is required."
    );
  }
}
