//! Adapters between files/streams and the application layer.

pub mod csv;
pub mod jsonl;
