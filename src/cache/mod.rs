//! Short-lived memoization of record fetches.

pub mod query_cache;
