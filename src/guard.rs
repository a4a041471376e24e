//! Uniform handling of failed reads and writes.
//!
//! An unauthorized response always ends the session, whatever the caller
//! was doing. Everything else is reported as a message and leaves the
//! credential alone.

use thiserror::Error;
use tracing::error;

use crate::api::{ApiError, ApiErrorKind};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
  /// No credential, or the server rejected it; authenticate again.
  #[error("Unauthorized or session expired")]
  LoginRequired,
  #[error("{message}")]
  Failed { kind: ApiErrorKind, message: String },
}

/// Route an API failure through the session.
pub fn intercept(session: &Session, operation: &str, err: &ApiError) -> RequestError {
  if err.is_unauthorized() {
    session.expire();
    return RequestError::LoginRequired;
  }

  error!(operation, status = ?err.status(), error = %err, "request failed");
  RequestError::Failed {
    kind: err.kind(),
    message: err.message(),
  }
}

/// Entry check for pages that need a credential.
pub fn require_session(session: &Session) -> Result<(), RequestError> {
  if session.is_authenticated() {
    Ok(())
  } else {
    Err(RequestError::LoginRequired)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::{ErrorBody, HttpFailure};
  use crate::session::{MemoryTokenStore, SessionEvent};

  fn failure(status: u16) -> HttpFailure {
    HttpFailure {
      status,
      status_text: String::new(),
      url: "http://api/x".into(),
      body: ErrorBody::Text(String::new()),
    }
  }

  #[test]
  fn test_unauthorized_expires_session() {
    let (session, mut rx) = Session::with_events(MemoryTokenStore::with_token("t"));
    let err = ApiError::Unauthorized(failure(401));

    assert_eq!(intercept(&session, "read", &err), RequestError::LoginRequired);
    assert_eq!(intercept(&session, "read", &err), RequestError::LoginRequired);

    assert!(!session.is_authenticated());
    assert_eq!(rx.try_recv().ok(), Some(SessionEvent::LoginRequired));
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_http_error_keeps_session() {
    let session = Session::new(MemoryTokenStore::with_token("t"));
    let err = ApiError::Http(failure(409));

    let routed = intercept(&session, "write", &err);
    assert_eq!(
      routed,
      RequestError::Failed {
        kind: ApiErrorKind::Http,
        message: err.message(),
      }
    );
    assert!(session.is_authenticated());
  }

  #[test]
  fn test_require_session() {
    assert!(require_session(&Session::new(MemoryTokenStore::with_token("t"))).is_ok());
    assert_eq!(
      require_session(&Session::new(MemoryTokenStore::default())),
      Err(RequestError::LoginRequired)
    );
  }
}
