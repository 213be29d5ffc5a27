//! Record model, normalization from raw hits, and the sources that supply them.

pub mod jsonl;
pub mod model;
pub mod normalize;
pub mod source;
#[cfg(feature = "sqlite")]
pub mod sqlite;
