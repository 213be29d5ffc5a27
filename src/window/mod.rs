//! Time windows: period boundaries, ISO weeks, and continuous bucket skeletons.

pub mod ranges;
pub mod series;
