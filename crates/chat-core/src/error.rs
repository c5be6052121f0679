use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the chat analyzer.
///
/// The three pipeline variants (`Format`, `EmptyInput`,
/// `UnsupportedConversation`) are fatal for the transcript they name and
/// always carry that transcript's name.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A transcript timestamp contradicts the format established by the
    /// first parsed line, or cannot be parsed strictly at all.
    #[error("{source_name}: line {line}: timestamp \"{value}\" {reason}")]
    Format {
        source_name: String,
        line: usize,
        value: String,
        reason: String,
    },

    /// No line of the transcript matched the message pattern.
    #[error("{source_name}: no parseable message lines found")]
    EmptyInput { source_name: String },

    /// The conversation does not have exactly two participants.
    #[error(
        "{source_name}: group chats and monologues are not supported, expected 2 participants but found {}: [{}]",
        participants.len(),
        participants.join(", ")
    )]
    UnsupportedConversation {
        source_name: String,
        participants: Vec<String>,
    },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// No snapshot file exists in the output directory.
    #[error("No snapshot found in {0}")]
    SnapshotNotFound(PathBuf),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Name of the transcript a pipeline error refers to, if any.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::Format { source_name, .. }
            | Self::EmptyInput { source_name }
            | Self::UnsupportedConversation { source_name, .. } => Some(source_name),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, AnalyzerError>;
