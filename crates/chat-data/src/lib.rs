//! Data pipeline for Chat Analyzer.
//!
//! Parses exported chat transcripts, resolves the two participants, merges
//! messages into blocks, derives per-block features and aggregates them
//! into summary metrics. Also owns the snapshot table consumers query.

pub mod analysis;
pub mod blocks;
pub mod emoji;
pub mod features;
pub mod metrics;
pub mod participants;
pub mod table;
pub mod transcript;

pub use chat_core as core;
