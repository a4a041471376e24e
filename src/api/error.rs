//! Failure taxonomy for API calls.

use serde_json::Value;
use thiserror::Error;

/// Shared discriminator across all [`ApiError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
  /// The request never produced a usable response
  Network,
  /// Non-2xx status other than 401
  Http,
  /// HTTP 401
  Unauthorized,
}

/// Body of a failed response, decoded as far as the content type allows.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
  Json(Value),
  Text(String),
}

impl ErrorBody {
  /// Placeholder used when the error body itself could not be read.
  pub fn unreadable(status: u16) -> Self {
    ErrorBody::Text(format!(
      "Could not parse response body (status {})",
      status
    ))
  }

  /// Server-provided `message` field, if the body is JSON and has one.
  pub fn message(&self) -> Option<&str> {
    match self {
      ErrorBody::Json(v) => v.get("message").and_then(|m| m.as_str()),
      ErrorBody::Text(_) => None,
    }
  }
}

/// Response metadata carried by HTTP-level failures.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
  pub status: u16,
  pub status_text: String,
  pub url: String,
  pub body: ErrorBody,
}

#[derive(Debug, Error)]
pub enum NetworkCause {
  #[error(transparent)]
  Transport(#[from] reqwest::Error),
  #[error("failed to decode response body: {0}")]
  Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Network request failed for {url}")]
  Network {
    url: String,
    #[source]
    source: NetworkCause,
  },
  #[error("API Error: {} {} for {}", .0.status, .0.status_text, .0.url)]
  Http(HttpFailure),
  #[error("Unauthorized or session expired")]
  Unauthorized(HttpFailure),
}

impl ApiError {
  pub fn kind(&self) -> ApiErrorKind {
    match self {
      ApiError::Network { .. } => ApiErrorKind::Network,
      ApiError::Http(_) => ApiErrorKind::Http,
      ApiError::Unauthorized(_) => ApiErrorKind::Unauthorized,
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    self.kind() == ApiErrorKind::Unauthorized
  }

  /// Response details for the two HTTP kinds.
  pub fn http(&self) -> Option<&HttpFailure> {
    match self {
      ApiError::Http(f) | ApiError::Unauthorized(f) => Some(f),
      ApiError::Network { .. } => None,
    }
  }

  pub fn status(&self) -> Option<u16> {
    self.http().map(|f| f.status)
  }

  /// Human-readable message for display to the operator.
  ///
  /// Prefers a server-supplied `message` over the generic description.
  pub fn message(&self) -> String {
    match self.http().and_then(|f| f.body.message()) {
      Some(msg) => msg.to_string(),
      None => self.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn failure(status: u16, body: ErrorBody) -> HttpFailure {
    HttpFailure {
      status,
      status_text: "Internal Server Error".to_string(),
      url: "http://api/x".to_string(),
      body,
    }
  }

  #[test]
  fn test_kinds() {
    let http = ApiError::Http(failure(500, ErrorBody::Text("boom".into())));
    assert_eq!(http.kind(), ApiErrorKind::Http);
    assert_eq!(http.status(), Some(500));

    let unauthorized = ApiError::Unauthorized(failure(401, ErrorBody::Text(String::new())));
    assert!(unauthorized.is_unauthorized());
    assert_eq!(unauthorized.status(), Some(401));

    let decode = serde_json::from_str::<Value>("{").unwrap_err();
    let network = ApiError::Network {
      url: "http://api/x".into(),
      source: decode.into(),
    };
    assert_eq!(network.kind(), ApiErrorKind::Network);
    assert_eq!(network.status(), None);
    assert_eq!(network.to_string(), "Network request failed for http://api/x");
  }

  #[test]
  fn test_default_messages() {
    let http = ApiError::Http(failure(500, ErrorBody::Text("boom".into())));
    assert_eq!(
      http.message(),
      "API Error: 500 Internal Server Error for http://api/x"
    );

    let unauthorized = ApiError::Unauthorized(failure(401, ErrorBody::Json(json!({}))));
    assert_eq!(unauthorized.message(), "Unauthorized or session expired");
  }

  #[test]
  fn test_server_message_preferred() {
    let err = ApiError::Http(failure(
      400,
      ErrorBody::Json(json!({ "message": "Flight already exists" })),
    ));
    assert_eq!(err.message(), "Flight already exists");
  }

  #[test]
  fn test_unreadable_placeholder() {
    assert_eq!(
      ErrorBody::unreadable(502),
      ErrorBody::Text("Could not parse response body (status 502)".to_string())
    );
  }
}
