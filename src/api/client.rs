use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use super::error::{ApiError, ErrorBody, HttpFailure, NetworkCause};
use crate::session::Session;

/// Normalized success body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
  /// Response declared a JSON content type
  Json(Value),
  /// Anything else, returned verbatim
  Text(String),
}

impl ResponseBody {
  /// Decode into a typed value. Text bodies decode as a JSON string.
  pub fn decode<T: DeserializeOwned>(self, url: &str) -> Result<T, ApiError> {
    let value = match self {
      ResponseBody::Json(v) => v,
      ResponseBody::Text(s) => Value::String(s),
    };
    serde_json::from_value(value).map_err(|e| {
      error!(url, error = %e, "response did not match expected shape");
      network_error(url, e.into())
    })
  }
}

/// HTTP client for the flight admin API.
///
/// Reads the bearer token from the [`Session`] on every call.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  session: Session,
}

impl ApiClient {
  pub fn new(base_url: &str, session: Session) -> Result<Self, url::ParseError> {
    // Validate up front so request URLs are always well-formed
    let parsed = Url::parse(base_url)?;

    Ok(Self {
      http: reqwest::Client::new(),
      base_url: parsed.as_str().trim_end_matches('/').to_string(),
      session,
    })
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  fn url(&self, endpoint: &str) -> String {
    format!("{}{}", self.base_url, endpoint)
  }

  /// Merge caller headers with the bearer token, if one is present.
  fn headers(&self, extra: Option<HeaderMap>) -> HeaderMap {
    let mut headers = extra.unwrap_or_default();
    if let Some(token) = self.session.token() {
      match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(value) => {
          headers.insert(AUTHORIZATION, value);
        }
        Err(_) => warn!("stored token is not a valid header value, sending without it"),
      }
    }
    headers
  }

  /// GET a JSON resource.
  pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
    self
      .request::<T, ()>(Method::GET, endpoint, None, None)
      .await
  }

  /// POST a JSON body and decode the response.
  pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    self
      .request(Method::POST, endpoint, Some(body), None)
      .await
  }

  /// Issue a request and decode the response into `T`.
  pub async fn request<T, B>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<&B>,
    headers: Option<HeaderMap>,
  ) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    let url = self.url(endpoint);
    self.send(method, endpoint, body, headers).await?.decode(&url)
  }

  /// Submit a multipart form and decode the response into `T`.
  pub async fn request_form<T: DeserializeOwned>(
    &self,
    endpoint: &str,
    form: Form,
    headers: Option<HeaderMap>,
  ) -> Result<T, ApiError> {
    let url = self.url(endpoint);
    self.send_form(endpoint, form, headers).await?.decode(&url)
  }

  /// Issue a request and return the normalized body.
  pub async fn send<B: Serialize + ?Sized>(
    &self,
    method: Method,
    endpoint: &str,
    body: Option<&B>,
    headers: Option<HeaderMap>,
  ) -> Result<ResponseBody, ApiError> {
    let url = self.url(endpoint);
    debug!(method = %method.as_str(), url = %url, "sending request");

    let mut builder = self.http.request(method, &url).headers(self.headers(headers));
    if let Some(body) = body {
      builder = builder.json(body);
    }

    self.execute(builder, &url).await
  }

  /// POST a multipart form and return the normalized body.
  ///
  /// The multipart content type (with its boundary) is always set by the
  /// transport; a caller-supplied multipart content type is dropped.
  pub async fn send_form(
    &self,
    endpoint: &str,
    form: Form,
    headers: Option<HeaderMap>,
  ) -> Result<ResponseBody, ApiError> {
    let url = self.url(endpoint);
    debug!(url = %url, "sending form");

    let mut headers = self.headers(headers);
    let declares_multipart = headers
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.trim_start().starts_with("multipart/form-data"))
      .unwrap_or(false);
    if declares_multipart {
      headers.remove(CONTENT_TYPE);
    }

    let builder = self.http.post(&url).headers(headers).multipart(form);
    self.execute(builder, &url).await
  }

  async fn execute(&self, builder: RequestBuilder, url: &str) -> Result<ResponseBody, ApiError> {
    let response = builder.send().await.map_err(|e| {
      error!(url, error = %e, "request failed");
      network_error(url, e.into())
    })?;

    if !response.status().is_success() {
      return Err(classify_failure(response).await);
    }

    let json = is_json(response.headers());
    let text = response.text().await.map_err(|e| {
      error!(url, error = %e, "failed to read response body");
      network_error(url, e.into())
    })?;

    if json {
      if text.trim().is_empty() {
        return Ok(ResponseBody::Json(Value::Null));
      }
      serde_json::from_str(&text)
        .map(ResponseBody::Json)
        .map_err(|e| {
          error!(url, error = %e, "failed to decode JSON response");
          network_error(url, e.into())
        })
    } else {
      warn!(url, "received non-JSON success response, parsing as text");
      Ok(ResponseBody::Text(text))
    }
  }
}

fn network_error(url: &str, source: NetworkCause) -> ApiError {
  ApiError::Network {
    url: url.to_string(),
    source,
  }
}

fn is_json(headers: &HeaderMap) -> bool {
  headers
    .get(CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.contains("application/json"))
    .unwrap_or(false)
}

/// Turn a non-2xx response into an [`ApiError`].
async fn classify_failure(response: Response) -> ApiError {
  let status = response.status();
  let failure = HttpFailure {
    status: status.as_u16(),
    status_text: status.canonical_reason().unwrap_or_default().to_string(),
    url: response.url().to_string(),
    body: read_error_body(response).await,
  };

  warn!(status = failure.status, url = %failure.url, "request returned error status");

  if failure.status == 401 {
    ApiError::Unauthorized(failure)
  } else {
    ApiError::Http(failure)
  }
}

/// Read an error body without ever failing the call.
async fn read_error_body(response: Response) -> ErrorBody {
  let status = response.status().as_u16();
  let url = response.url().to_string();
  let json = is_json(response.headers());

  let text = match response.text().await {
    Ok(text) => text,
    Err(e) => {
      error!(url = %url, error = %e, "failed to read error response body");
      return ErrorBody::unreadable(status);
    }
  };

  if !json {
    return ErrorBody::Text(text);
  }

  match serde_json::from_str(&text) {
    Ok(value) => ErrorBody::Json(value),
    Err(e) => {
      error!(url = %url, error = %e, "failed to parse error response body");
      ErrorBody::unreadable(status)
    }
  }
}
