//! Client-side cache of server reads.
//!
//! This module provides:
//! - Hierarchical query keys whose prefixes address groups of entries
//! - At most one fetch in flight per key, shared by concurrent readers
//! - Stale marking by key prefix, triggered after writes
//! - Reads gated on the presence of a credential

mod client;
pub mod key;
mod store;

pub use client::QueryClient;
pub use key::{dictionary_keys, flight_keys, QueryKey};
pub use store::{QueryCache, QueryResult};
