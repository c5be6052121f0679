//! Runtime layer for Chat Analyzer.
//!
//! Fans transcript pipelines out over tokio's blocking pool and serves the
//! latest snapshot to report consumers through a TTL cache.

pub mod batch;
pub mod table_manager;

pub use chat_core as core;
pub use chat_data as data;
