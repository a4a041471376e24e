use reqwest::multipart::Form;

use super::client::ApiClient;
use super::error::ApiError;
use super::types::{LoginRequest, LoginResponse};

const LOGIN: &str = "/admin/login";

impl ApiClient {
  /// Submit credentials as multipart form fields.
  pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
    let form = Form::new()
      .text("userName", request.user_name.clone())
      .text("password", request.password.clone())
      .text("channel", request.channel.clone());

    self.request_form(LOGIN, form, None).await
  }
}
