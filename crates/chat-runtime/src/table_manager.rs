//! TTL-cached access to the latest feature snapshot.
//!
//! Consumers call [`TableManager::get_table`] to obtain a fresh-or-cached
//! [`FeatureTable`] loaded from the newest snapshot in the output directory.
//! On load failure the previous cache, if any, is returned and the error is
//! kept for inspection.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chat_core::error::Result;
use chat_data::table::{latest_snapshot, FeatureTable};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

// ── TableManager ──────────────────────────────────────────────────────────────

/// TTL-cached loader for the newest snapshot in a directory.
///
/// # Example
/// ```no_run
/// use chat_runtime::table_manager::TableManager;
///
/// let mut mgr = TableManager::new(30, "/tmp/snapshots");
/// if let Some(table) = mgr.get_table(false) {
///     println!("chats: {:?}", table.chats());
/// }
/// ```
pub struct TableManager {
    /// Maximum age of cached data before it is considered stale.
    cache_ttl: Duration,
    /// Directory holding `features_*.json` snapshots.
    output_dir: PathBuf,
    cache: Option<FeatureTable>,
    /// Snapshot the cache was loaded from.
    cache_source: Option<PathBuf>,
    cache_timestamp: Option<Instant>,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
}

impl TableManager {
    pub fn new(cache_ttl_secs: u64, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            output_dir: output_dir.into(),
            cache: None,
            cache_source: None,
            cache_timestamp: None,
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the table, using the cache when it is still valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed. On load failure
    /// the previous cache (if any) is returned as a fallback.
    pub fn get_table(&mut self, force_refresh: bool) -> Option<&FeatureTable> {
        if !force_refresh && self.is_cache_valid() {
            tracing::debug!("returning cached feature table");
            return self.cache.as_ref();
        }

        match self.fetch_fresh() {
            Ok((path, table)) => {
                tracing::debug!(
                    records = table.len(),
                    snapshot = %path.display(),
                    "feature table cache updated"
                );
                self.cache = Some(table);
                self.cache_source = Some(path);
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
                self.cache.as_ref()
            }
            Err(e) => {
                tracing::warn!(error = %e, "snapshot load failed; falling back to cached table");
                self.last_error = Some(e.to_string());
                self.cache.as_ref()
            }
        }
    }

    /// Discard the current cache, forcing the next [`get_table`](Self::get_table)
    /// call to reload.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        self.cache_source = None;
        self.cache_timestamp = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current cache entry, or `None` if nothing has been loaded.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache_timestamp.map(|ts| ts.elapsed())
    }

    /// Snapshot the cached table was loaded from.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.cache_source.as_deref()
    }

    /// Human-readable description of the last load error, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn is_cache_valid(&self) -> bool {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.cache_ttl,
            _ => false,
        }
    }

    fn fetch_fresh(&self) -> Result<(PathBuf, FeatureTable)> {
        let path = latest_snapshot(&self.output_dir)?;
        let table = FeatureTable::load(&path)?;
        Ok((path, table))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::settings::PipelineConfig;
    use chat_data::analysis::analyze_transcript;
    use chat_data::table::save_snapshot_at;
    use chrono::NaiveDate;
    use std::thread;
    use tempfile::TempDir;

    const TRANSCRIPT: &str = "\
21/06/2020, 23:39 - Max: Hi
22/06/2020, 07:00 - Me: Who?
";

    fn write_snapshot(dir: &Path, minute: u32) -> PathBuf {
        let records =
            analyze_transcript(TRANSCRIPT, "max.txt", &PipelineConfig::default()).unwrap();
        let stamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap();
        save_snapshot_at(dir, &records, stamp).unwrap()
    }

    fn make_manager_with_dir(ttl_secs: u64) -> (TableManager, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        write_snapshot(dir.path(), 0);
        let mgr = TableManager::new(ttl_secs, dir.path());
        (mgr, dir)
    }

    // ── cache miss on first call ──────────────────────────────────────────

    #[test]
    fn test_cache_miss_on_first_call() {
        let (mgr, _dir) = make_manager_with_dir(30);
        assert!(!mgr.is_cache_valid());
        assert!(mgr.cache_age().is_none());
        assert!(mgr.last_error().is_none());
    }

    // ── cache valid within TTL ────────────────────────────────────────────

    #[test]
    fn test_cache_valid_within_ttl() {
        let (mut mgr, dir) = make_manager_with_dir(30);

        let first = mgr.get_table(false).map(|t| t.len());
        assert_eq!(first, Some(2));

        // A newer snapshot is not picked up while the cache is fresh.
        write_snapshot(dir.path(), 5);
        let second = mgr.get_table(false).map(|t| t.len());
        assert_eq!(second, first);
        assert!(mgr
            .snapshot_path()
            .unwrap()
            .ends_with("features_20240101-120000.json"));
    }

    // ── cache expired after TTL ───────────────────────────────────────────

    #[test]
    fn test_cache_expired_reloads_newest() {
        let (mut mgr, dir) = make_manager_with_dir(0);

        mgr.get_table(false);
        assert!(!mgr.is_cache_valid());

        write_snapshot(dir.path(), 5);
        mgr.get_table(false);
        assert!(mgr
            .snapshot_path()
            .unwrap()
            .ends_with("features_20240101-120500.json"));
    }

    // ── manual cache invalidation ─────────────────────────────────────────

    #[test]
    fn test_invalidate_cache() {
        let (mut mgr, _dir) = make_manager_with_dir(30);

        mgr.get_table(false);
        assert!(mgr.cache.is_some());

        mgr.invalidate_cache();
        assert!(mgr.cache.is_none());
        assert!(mgr.cache_age().is_none());
        assert!(mgr.snapshot_path().is_none());
    }

    // ── force_refresh bypasses valid cache ────────────────────────────────

    #[test]
    fn test_force_refresh_bypasses_cache() {
        let (mut mgr, _dir) = make_manager_with_dir(60);

        mgr.get_table(false);
        let ts1 = mgr.cache_timestamp.unwrap();

        thread::sleep(Duration::from_millis(10));

        mgr.get_table(true);
        let ts2 = mgr.cache_timestamp.unwrap();
        assert!(ts2 > ts1);
    }

    // ── failure handling ──────────────────────────────────────────────────

    #[test]
    fn test_missing_snapshot_records_error() {
        let dir = TempDir::new().unwrap();
        let mut mgr = TableManager::new(30, dir.path());

        assert!(mgr.get_table(false).is_none());
        assert!(mgr.last_error().unwrap().contains("No snapshot found"));
    }

    #[test]
    fn test_failure_falls_back_to_previous_cache() {
        let (mut mgr, dir) = make_manager_with_dir(30);
        mgr.get_table(false);

        // Newest snapshot is corrupt.
        std::fs::write(dir.path().join("features_20240101-130000.json"), "{bad").unwrap();
        let table = mgr.get_table(true).map(|t| t.len());

        assert_eq!(table, Some(2));
        assert!(mgr.last_error().unwrap().contains("Failed to parse JSON"));
    }
}
