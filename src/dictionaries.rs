//! Origin/destination eligibility over the country and city dictionaries.
//!
//! A country or city may appear as a departure choice only when sending is
//! allowed, and as an arrival choice only when receiving is allowed. City
//! choices are scoped to one country; without a country there are none.

use crate::api::types::{City, Country};

pub fn from_countries(countries: &[Country]) -> Vec<&Country> {
  countries.iter().filter(|c| c.send_allowed).collect()
}

pub fn to_countries(countries: &[Country]) -> Vec<&Country> {
  countries.iter().filter(|c| c.received_allowed).collect()
}

pub fn from_cities(cities: &[City], country_id: Option<u64>) -> Vec<&City> {
  cities_of(cities, country_id, |c| c.send_allowed)
}

pub fn to_cities(cities: &[City], country_id: Option<u64>) -> Vec<&City> {
  cities_of(cities, country_id, |c| c.received_allowed)
}

fn cities_of(cities: &[City], country_id: Option<u64>, allowed: impl Fn(&City) -> bool) -> Vec<&City> {
  match country_id {
    Some(id) if id != 0 => cities
      .iter()
      .filter(|c| c.country_id == id && allowed(c))
      .collect(),
    _ => Vec::new(),
  }
}

/// Display name of a country, falling back to its id.
pub fn country_name(countries: &[Country], id: u64) -> String {
  countries
    .iter()
    .find(|c| c.country_id == id)
    .map(|c| c.country_name.clone())
    .unwrap_or_else(|| format!("#{}", id))
}

/// Display name of a city, falling back to its id.
pub fn city_name(cities: &[City], id: u64) -> String {
  cities
    .iter()
    .find(|c| c.city_id == id)
    .map(|c| c.city_name.clone())
    .unwrap_or_else(|| format!("#{}", id))
}
