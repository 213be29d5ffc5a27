//! Aggregation, log filtering, and the analytics façade.

pub mod aggregate;
pub mod logs;
pub mod service;
