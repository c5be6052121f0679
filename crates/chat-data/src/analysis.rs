//! Single-transcript analysis pipeline for Chat Analyzer.
//!
//! Runs parse → resolve → aggregate → derive for one conversation and
//! discovers transcript files on disk.

use std::path::{Path, PathBuf};

use chat_core::error::{AnalyzerError, Result};
use chat_core::models::FeatureRecord;
use chat_core::settings::PipelineConfig;
use tracing::{debug, warn};

use crate::blocks::BlockAggregator;
use crate::features::FeatureDeriver;
use crate::participants::ParticipantResolver;
use crate::transcript::parse_transcript;

// ── Public API ────────────────────────────────────────────────────────────────

/// Run the full pipeline over transcript `text`.
///
/// `source` names the transcript in errors and logs.
pub fn analyze_transcript(
    text: &str,
    source: &str,
    config: &PipelineConfig,
) -> Result<Vec<FeatureRecord>> {
    let messages = parse_transcript(text, source)?;
    let resolved = ParticipantResolver::new(config.self_names.iter().cloned())
        .resolve(&messages, source)?;
    let blocks = BlockAggregator::new(config.merge_window()).aggregate(&resolved);
    let records = FeatureDeriver::derive(&blocks);

    debug!(
        "{}: processed {} messages into {} blocks",
        source,
        messages.len(),
        records.len()
    );
    Ok(records)
}

/// Read the transcript at `path` (UTF-8) and analyze it.
///
/// The file name is used as the source name.
pub fn analyze_file(path: &Path, config: &PipelineConfig) -> Result<Vec<FeatureRecord>> {
    let text = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    analyze_transcript(&text, &source_name(path), config)
}

/// Find all `.txt` files recursively under `dir`, sorted by path.
pub fn find_transcripts(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Transcript directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "txt")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Display name of a transcript file.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
