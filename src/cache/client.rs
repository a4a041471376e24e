//! One cache per resource, behind a single invalidation entry point.

use std::time::Duration;

use tracing::debug;

use super::key::QueryKey;
use super::store::QueryCache;
use crate::api::types::{City, Country, FlightsPage};
use crate::session::Session;

#[derive(Clone)]
pub struct QueryClient {
  pub flights: QueryCache<FlightsPage>,
  pub countries: QueryCache<Vec<Country>>,
  pub cities: QueryCache<Vec<City>>,
}

impl QueryClient {
  pub fn new(session: Session) -> Self {
    Self {
      flights: QueryCache::new(session.clone()),
      countries: QueryCache::new(session.clone()),
      cities: QueryCache::new(session),
    }
  }

  /// Apply one stale time to every resource.
  pub fn with_stale_time(self, stale_time: Duration) -> Self {
    Self {
      flights: self.flights.with_stale_time(stale_time),
      countries: self.countries.with_stale_time(stale_time),
      cities: self.cities.with_stale_time(stale_time),
    }
  }

  /// Mark every entry under `prefix` stale, across all resources.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let count =
      self.flights.invalidate(prefix) + self.countries.invalidate(prefix) + self.cities.invalidate(prefix);
    debug!(prefix = %prefix, count, "invalidated queries");
    count
  }

  pub fn clear(&self) {
    self.flights.clear();
    self.countries.clear();
    self.cities.clear();
  }
}
