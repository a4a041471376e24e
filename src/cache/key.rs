//! Hierarchical query keys.
//!
//! A key is a path of segments such as `flights / list / {filter}`. Any
//! leading part of a key is itself a key and addresses every entry below it,
//! which is how invalidation targets "all flight lists" at once.

use std::fmt;

use crate::filters::FlightFilter;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
  Name(&'static str),
  /// Canonical filter; never holds a non-canonical value
  Filter(FlightFilter),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
  pub fn root(name: &'static str) -> Self {
    Self(vec![KeySegment::Name(name)])
  }

  pub fn child(mut self, name: &'static str) -> Self {
    self.0.push(KeySegment::Name(name));
    self
  }

  /// Refine by a filter. The filter is canonicalized first, so filters that
  /// differ only in empty/zero fields share a key.
  pub fn with_filter(mut self, filter: &FlightFilter) -> Self {
    self.0.push(KeySegment::Filter(filter.canonical()));
    self
  }

  /// Whether `self` equals `other` or is an ancestor of it.
  pub fn is_prefix_of(&self, other: &QueryKey) -> bool {
    other.0.starts_with(&self.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, segment) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      match segment {
        KeySegment::Name(name) => f.write_str(name)?,
        KeySegment::Filter(filter) => write!(f, "{{{}}}", filter)?,
      }
    }
    Ok(())
  }
}

/// Keys for flight reads.
pub mod flight_keys {
  use super::*;

  pub fn all() -> QueryKey {
    QueryKey::root("flights")
  }

  /// Prefix covering every flight list regardless of filter.
  pub fn lists() -> QueryKey {
    all().child("list")
  }

  pub fn list(filter: &FlightFilter) -> QueryKey {
    lists().with_filter(filter)
  }
}

/// Keys for dictionary reads.
pub mod dictionary_keys {
  use super::*;

  pub fn all() -> QueryKey {
    QueryKey::root("dictionaries")
  }

  pub fn countries() -> QueryKey {
    all().child("countries")
  }

  pub fn cities() -> QueryKey {
    all().child("cities")
  }
}
