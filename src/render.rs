//! Plain-text rendering of lists for the terminal.

use std::fmt::Write;

use crate::api::types::{City, Country, Flight, FlightsPage};
use crate::dictionaries::{city_name, country_name};
use crate::filters::FlightFilter;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Host part of the API URL, for the header line
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

pub fn header(api_url: &str, filter: &FlightFilter) -> String {
  let location = filter.to_location(filter.per_page);
  if location.is_empty() {
    format!("flightdesk | {} | all flights", extract_domain(api_url))
  } else {
    format!("flightdesk | {} | {}", extract_domain(api_url), location)
  }
}

fn actions(flight: &Flight) -> &'static str {
  match (flight.can_edit(), flight.can_delete()) {
    (true, true) => "edit,delete",
    (true, false) => "edit",
    (false, true) => "delete",
    (false, false) => "-",
  }
}

fn route(countries: &[Country], cities: &[City], country_id: u64, city_id: u64) -> String {
  format!(
    "{}, {}",
    city_name(cities, city_id),
    country_name(countries, country_id)
  )
}

/// Table of one page of flights, with a pagination footer.
pub fn flights_page(page: &FlightsPage, countries: &[Country], cities: &[City]) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:>6}  {:<10}  {:<19}  {:<24}  {:<24}  {}",
    "ID", "FLIGHT", "DATE", "FROM", "TO", "ACTIONS"
  );

  if page.flights.is_empty() {
    let _ = writeln!(out, "(no flights)");
  }
  for flight in &page.flights {
    let from = route(countries, cities, flight.from_country_id, flight.from_city_id);
    let to = route(countries, cities, flight.to_country_id, flight.to_city_id);
    let _ = writeln!(
      out,
      "{:>6}  {:<10}  {:<19}  {:<24}  {:<24}  {}",
      flight.id,
      truncate(&flight.flight_number, 10),
      flight.flight_date,
      truncate(&from, 24),
      truncate(&to, 24),
      actions(flight)
    );
  }

  let mut footer = format!("page {} | {} records", page.current_page, page.records_number);
  if page.has_previous() {
    footer.push_str(" | prev");
  }
  if page.has_next() {
    footer.push_str(" | next");
  }
  let _ = write!(out, "{}", footer);
  out
}

pub fn countries(countries: &[Country]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{:>6}  {:<24}  {:<4}  {}", "ID", "COUNTRY", "FROM", "TO");
  for c in countries {
    let _ = writeln!(
      out,
      "{:>6}  {:<24}  {:<4}  {}",
      c.country_id,
      truncate(&c.country_name, 24),
      yes_no(c.send_allowed),
      yes_no(c.received_allowed)
    );
  }
  out.trim_end().to_string()
}

pub fn cities(cities: &[City]) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:>6}  {:<24}  {:>7}  {:<4}  {}",
    "ID", "CITY", "COUNTRY", "FROM", "TO"
  );
  for c in cities {
    let _ = writeln!(
      out,
      "{:>6}  {:<24}  {:>7}  {:<4}  {}",
      c.city_id,
      truncate(&c.city_name, 24),
      c.country_id,
      yes_no(c.send_allowed),
      yes_no(c.received_allowed)
    );
  }
  out.trim_end().to_string()
}

fn yes_no(flag: bool) -> &'static str {
  if flag {
    "yes"
  } else {
    "no"
  }
}
