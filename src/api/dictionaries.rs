use super::client::ApiClient;
use super::error::ApiError;
use super::types::{City, Country};

const COUNTRIES: &str = "/admin/flight/get_countries";
const CITIES: &str = "/admin/flight/get_cities";

impl ApiClient {
  pub async fn countries(&self) -> Result<Vec<Country>, ApiError> {
    self.get(COUNTRIES).await
  }

  pub async fn cities(&self) -> Result<Vec<City>, ApiError> {
    self.get(CITIES).await
  }
}
