//! Parallel batch driver.
//!
//! Runs the single-transcript pipeline for many files on tokio's blocking
//! pool. Pipelines share no mutable state; results are joined and
//! concatenated in input file order once every task has finished.

use std::path::PathBuf;
use std::sync::Arc;

use chat_core::error::{AnalyzerError, Result};
use chat_core::models::FeatureRecord;
use chat_core::settings::PipelineConfig;
use chat_data::analysis::analyze_file;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// What to do when a transcript fails to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure in the report and keep the other files' records.
    SkipAndContinue,
    /// Fail the whole run with the first failure in file order.
    AbortOnError,
}

/// A transcript that could not be processed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    /// Rendered error, naming the file and the violated rule.
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Records of every successful file, in file order.
    pub records: Vec<FeatureRecord>,
    /// Files that were processed successfully, in file order.
    pub processed: Vec<PathBuf>,
    /// Files that failed, in file order.
    pub failures: Vec<FileFailure>,
}

// ── BatchRunner ───────────────────────────────────────────────────────────────

/// Fans per-file pipelines out over the blocking pool.
pub struct BatchRunner {
    config: Arc<PipelineConfig>,
    policy: FailurePolicy,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig, policy: FailurePolicy) -> Self {
        Self {
            config: Arc::new(config),
            policy,
        }
    }

    /// Process `files` concurrently and join the results in input order.
    ///
    /// # Errors
    ///
    /// Only under [`FailurePolicy::AbortOnError`]: the error of the first
    /// failing file in input order.
    pub async fn run(&self, files: &[PathBuf]) -> Result<BatchReport> {
        let mut tasks = JoinSet::new();

        for (idx, path) in files.iter().cloned().enumerate() {
            let config = Arc::clone(&self.config);
            tasks.spawn_blocking(move || {
                let result = analyze_file(&path, &config);
                (idx, path, result)
            });
        }

        let mut outcomes: Vec<(usize, PathBuf, Result<Vec<FeatureRecord>>)> =
            Vec::with_capacity(files.len());
        while let Some(joined) = tasks.join_next().await {
            // A panicking pipeline is a bug; surface it as an I/O-level failure.
            let outcome = joined.map_err(|e| AnalyzerError::Io(e.into()))?;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut report = BatchReport::default();
        for (_, path, result) in outcomes {
            match result {
                Ok(records) => {
                    debug!("{}: {} records", path.display(), records.len());
                    report.records.extend(records);
                    report.processed.push(path);
                }
                Err(e) if self.policy == FailurePolicy::AbortOnError => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.failures.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Processed {} records from {} files ({} skipped)",
            report.records.len(),
            report.processed.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
