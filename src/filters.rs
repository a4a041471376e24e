//! Flight list filter and its query-string form.
//!
//! The query string is the source of truth for what list is on screen:
//! [`FilterSync::apply`], [`FilterSync::change_page`] and [`FilterSync::reset`]
//! only compute the location to navigate to, and [`FilterSync::sync`] folds
//! the location back into the current [`FlightFilter`].

use std::fmt;

use chrono::NaiveDate;
use url::form_urlencoded;

use crate::validation::ValidationError;

/// Page size used when neither the query string nor config provides one.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Filter and pagination for the flight list.
///
/// Empty strings and zero ids mean "no constraint"; [`FlightFilter::canonical`]
/// removes them so equivalent filters compare and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlightFilter {
  pub flight_number: Option<String>,
  /// `YYYY-MM-DD`
  pub from_date: Option<String>,
  /// `YYYY-MM-DD`
  pub to_date: Option<String>,
  pub from_country_id: Option<u64>,
  pub from_city_id: Option<u64>,
  pub to_country_id: Option<u64>,
  pub to_city_id: Option<u64>,
  pub page: u32,
  pub per_page: u32,
}

impl Default for FlightFilter {
  fn default() -> Self {
    Self::new(DEFAULT_PER_PAGE)
  }
}

fn non_empty(value: &Option<String>) -> Option<String> {
  value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn non_zero(value: Option<u64>) -> Option<u64> {
  value.filter(|v| *v != 0)
}

impl FlightFilter {
  /// Unfiltered first page.
  pub fn new(per_page: u32) -> Self {
    Self {
      flight_number: None,
      from_date: None,
      to_date: None,
      from_country_id: None,
      from_city_id: None,
      to_country_id: None,
      to_city_id: None,
      page: 1,
      per_page: per_page.max(1),
    }
  }

  /// Parse a query string (with or without the leading `?`).
  ///
  /// Missing page is 1, missing page size is `default_per_page`. Values
  /// that don't parse as positive integers are treated as unset. Unknown
  /// keys are ignored; for repeated keys the first occurrence wins.
  pub fn from_query(query: &str, default_per_page: u32) -> Self {
    let mut filter = Self::new(default_per_page);
    let mut seen: Vec<String> = Vec::new();

    let query = query.trim_start_matches('?');
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
      if seen.iter().any(|k| *k == key) {
        continue;
      }
      seen.push(key.to_string());

      let text = Some(value.to_string()).filter(|s| !s.is_empty());
      let id = value.parse::<u64>().ok().filter(|v| *v > 0);
      let count = value.parse::<u32>().ok().filter(|v| *v > 0);

      match key.as_ref() {
        "flightNumber" => filter.flight_number = text,
        "fromDate" => filter.from_date = text,
        "toDate" => filter.to_date = text,
        "fromCountryId" => filter.from_country_id = id,
        "fromCityId" => filter.from_city_id = id,
        "toCountryId" => filter.to_country_id = id,
        "toCityId" => filter.to_city_id = id,
        "page" => filter.page = count.unwrap_or(1),
        "perPage" => filter.per_page = count.unwrap_or(filter.per_page),
        _ => {}
      }
    }

    filter
  }

  /// Drop empty and zero-valued optional fields.
  pub fn canonical(&self) -> Self {
    Self {
      flight_number: non_empty(&self.flight_number),
      from_date: non_empty(&self.from_date),
      to_date: non_empty(&self.to_date),
      from_country_id: non_zero(self.from_country_id),
      from_city_id: non_zero(self.from_city_id),
      to_country_id: non_zero(self.to_country_id),
      to_city_id: non_zero(self.to_city_id),
      page: self.page.max(1),
      per_page: self.per_page.max(1),
    }
  }

  /// Canonical pairs in a fixed order.
  fn pairs(&self, include_page: bool, include_per_page: bool) -> Vec<(&'static str, String)> {
    let c = self.canonical();
    let mut pairs = Vec::new();

    if let Some(v) = c.flight_number {
      pairs.push(("flightNumber", v));
    }
    if let Some(v) = c.from_date {
      pairs.push(("fromDate", v));
    }
    if let Some(v) = c.to_date {
      pairs.push(("toDate", v));
    }
    let ids = [
      ("fromCountryId", c.from_country_id),
      ("fromCityId", c.from_city_id),
      ("toCountryId", c.to_country_id),
      ("toCityId", c.to_city_id),
    ];
    for (name, id) in ids {
      if let Some(v) = id {
        pairs.push((name, v.to_string()));
      }
    }
    if include_page {
      pairs.push(("page", c.page.to_string()));
    }
    if include_per_page {
      pairs.push(("perPage", c.per_page.to_string()));
    }

    pairs
  }

  fn encode(pairs: Vec<(&'static str, String)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
      serializer.append_pair(k, &v);
    }
    serializer.finish()
  }

  /// Full query string for the list endpoint, pagination always included.
  pub fn to_query_string(&self) -> String {
    Self::encode(self.pairs(true, true))
  }

  /// Minimal location form: pagination is omitted when it equals the
  /// defaults [`FlightFilter::from_query`] would restore.
  pub fn to_location(&self, default_per_page: u32) -> String {
    let c = self.canonical();
    Self::encode(self.pairs(c.page != 1, c.per_page != default_per_page.max(1)))
  }
}

impl fmt::Display for FlightFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_query_string())
  }
}

/// Partial change to a filter.
///
/// `None` leaves a field untouched; `Some("")` or `Some(0)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
  pub flight_number: Option<String>,
  pub from_date: Option<String>,
  pub to_date: Option<String>,
  pub from_country_id: Option<u64>,
  pub from_city_id: Option<u64>,
  pub to_country_id: Option<u64>,
  pub to_city_id: Option<u64>,
  pub per_page: Option<u32>,
}

fn check_date(field: &'static str, value: &Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
  match value.as_deref() {
    None | Some("") => Ok(None),
    Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
      .map(Some)
      .map_err(|_| ValidationError::InvalidDate {
        field,
        value: v.to_string(),
      }),
  }
}

impl FilterUpdate {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  /// Check date bounds before the update is applied.
  pub fn validate(&self) -> Result<(), ValidationError> {
    let from = check_date("fromDate", &self.from_date)?;
    let to = check_date("toDate", &self.to_date)?;
    if let (Some(from), Some(to)) = (from, to) {
      if from > to {
        return Err(ValidationError::DateRange);
      }
    }
    Ok(())
  }

  /// Merge into `filter`. A country change without an explicit city clears
  /// the city, since a city only applies within its own country.
  fn merge_into(&self, filter: &mut FlightFilter) {
    fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
      if let Some(v) = value {
        *slot = Some(v.clone());
      }
    }

    if self.from_country_id.is_some()
      && self.from_city_id.is_none()
      && non_zero(self.from_country_id) != non_zero(filter.from_country_id)
    {
      filter.from_city_id = None;
    }
    if self.to_country_id.is_some()
      && self.to_city_id.is_none()
      && non_zero(self.to_country_id) != non_zero(filter.to_country_id)
    {
      filter.to_city_id = None;
    }

    set(&mut filter.flight_number, &self.flight_number);
    set(&mut filter.from_date, &self.from_date);
    set(&mut filter.to_date, &self.to_date);
    set(&mut filter.from_country_id, &self.from_country_id);
    set(&mut filter.from_city_id, &self.from_city_id);
    set(&mut filter.to_country_id, &self.to_country_id);
    set(&mut filter.to_city_id, &self.to_city_id);
    if let Some(per_page) = self.per_page.filter(|p| *p > 0) {
      filter.per_page = per_page;
    }
  }
}

/// Keeps the current filter in step with its serialized location.
#[derive(Debug, Clone)]
pub struct FilterSync {
  filter: FlightFilter,
  default_per_page: u32,
}

impl FilterSync {
  /// Start from an existing location.
  pub fn from_query(query: &str, default_per_page: u32) -> Self {
    Self {
      filter: FlightFilter::from_query(query, default_per_page).canonical(),
      default_per_page: default_per_page.max(1),
    }
  }

  /// Current canonical filter.
  pub fn filter(&self) -> &FlightFilter {
    &self.filter
  }

  /// Current location in minimal form.
  pub fn location(&self) -> String {
    self.filter.to_location(self.default_per_page)
  }

  /// Reparse `query` and commit it if it differs by value.
  ///
  /// Returns whether the filter changed; an unchanged result must not
  /// trigger a refetch.
  pub fn sync(&mut self, query: &str) -> bool {
    let next = FlightFilter::from_query(query, self.default_per_page).canonical();
    if next == self.filter {
      return false;
    }
    self.filter = next;
    true
  }

  /// Location after merging `update`. Pagination restarts at page 1.
  pub fn apply(&self, update: &FilterUpdate) -> String {
    let mut next = self.filter.clone();
    update.merge_into(&mut next);
    if update.per_page == Some(0) {
      next.per_page = self.default_per_page;
    }
    next.page = 1;
    next.canonical().to_location(self.default_per_page)
  }

  /// Location for page `page` with everything else unchanged.
  pub fn change_page(&self, page: u32) -> String {
    let mut next = self.filter.clone();
    next.page = page;
    next.canonical().to_location(self.default_per_page)
  }

  /// Location with all constraints cleared, keeping the page size.
  pub fn reset(&self) -> String {
    FlightFilter::new(self.filter.per_page).to_location(self.default_per_page)
  }
}
