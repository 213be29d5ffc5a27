//! Activity logging: append-only JSONL writer fed by a non-blocking logger thread.

pub mod activity;
pub mod jsonl;
