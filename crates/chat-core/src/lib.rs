//! Core domain layer for Chat Analyzer.
//!
//! Holds the record types that flow through the pipeline, the ordered
//! calendar enums, the error taxonomy, CLI settings and display helpers.

pub mod calendar;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{AnalyzerError, Result};
