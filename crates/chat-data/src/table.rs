//! The feature table: filtering and snapshot persistence.
//!
//! Each aggregation run writes one JSON snapshot named after its generation
//! time, `features_<YYYYmmdd-HHMMSS>.json`. Consumers load the newest one and
//! narrow it down with a [`TableFilter`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chat_core::error::{AnalyzerError, Result};
use chat_core::models::FeatureRecord;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

const SNAPSHOT_PREFIX: &str = "features_";
const SNAPSHOT_SUFFIX: &str = ".json";
const SNAPSHOT_STAMP: &str = "%Y%m%d-%H%M%S";

// ── TableFilter ───────────────────────────────────────────────────────────────

/// Record selection by chat, sender, receiver and time range.
///
/// Empty name sets place no constraint. `start` is inclusive and `end`
/// exclusive. All constraints must hold, so the order in which they are
/// added does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub chats: BTreeSet<String>,
    pub senders: BTreeSet<String>,
    pub receivers: BTreeSet<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chats<I, S>(mut self, chats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chats.extend(chats.into_iter().map(Into::into));
        self
    }

    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.senders.extend(senders.into_iter().map(Into::into));
        self
    }

    pub fn with_receivers<I, S>(mut self, receivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receivers.extend(receivers.into_iter().map(Into::into));
        self
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    /// `true` when the filter lets every record through.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    /// Whether `record` satisfies every constraint.
    pub fn matches(&self, record: &FeatureRecord) -> bool {
        name_matches(&self.chats, record.chat())
            && name_matches(&self.senders, Some(record.sender()))
            && name_matches(&self.receivers, record.receiver())
            && self.start.map_or(true, |start| record.datetime() >= start)
            && self.end.map_or(true, |end| record.datetime() < end)
    }

    /// Lazily yield the matching records, in order.
    pub fn apply<'a, I>(&'a self, records: I) -> impl Iterator<Item = &'a FeatureRecord> + 'a
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |r| self.matches(r))
    }
}

fn name_matches(allowed: &BTreeSet<String>, value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.contains(v))
}

// ── FeatureTable ──────────────────────────────────────────────────────────────

/// An in-memory feature table, usually loaded from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(records: Vec<FeatureRecord>) -> Self {
        Self { records }
    }

    /// Load a table from a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        load_snapshot(path).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `filter`, in table order.
    pub fn filter<'a>(&'a self, filter: &'a TableFilter) -> impl Iterator<Item = &'a FeatureRecord> + 'a {
        filter.apply(&self.records)
    }

    /// Distinct chat labels, sorted.
    pub fn chats(&self) -> Vec<String> {
        self.distinct(|r| r.chat())
    }

    /// Distinct senders, sorted.
    pub fn senders(&self) -> Vec<String> {
        self.distinct(|r| Some(r.sender()))
    }

    /// Distinct receivers, sorted.
    pub fn receivers(&self) -> Vec<String> {
        self.distinct(|r| r.receiver())
    }

    fn distinct<'a>(&'a self, f: impl Fn(&'a FeatureRecord) -> Option<&'a str>) -> Vec<String> {
        self.records
            .iter()
            .filter_map(f)
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

// ── Snapshot persistence ──────────────────────────────────────────────────────

/// Write `records` to a new snapshot in `dir`, stamped with the current
/// local time. Returns the snapshot path.
pub fn save_snapshot(dir: &Path, records: &[FeatureRecord]) -> Result<PathBuf> {
    save_snapshot_at(dir, records, Local::now().naive_local())
}

/// Write `records` to the snapshot for `generated_at` in `dir`.
///
/// The file is written to a temporary name and renamed into place, so
/// readers never see a partial snapshot. A snapshot with the same stamp is
/// replaced.
pub fn save_snapshot_at(
    dir: &Path,
    records: &[FeatureRecord],
    generated_at: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(snapshot_file_name(generated_at));
    let json = serde_json::to_string(records)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(path)
}

/// The newest snapshot in `dir`, judged by the timestamp in its name.
///
/// Files not following the snapshot naming convention are ignored.
///
/// # Errors
///
/// [`AnalyzerError::SnapshotNotFound`] when `dir` is missing or holds no
/// snapshot.
pub fn latest_snapshot(dir: &Path) -> Result<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AnalyzerError::SnapshotNotFound(dir.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let stamp = entry.file_name().to_str().and_then(parse_snapshot_name)?;
            Some((stamp, entry.path()))
        })
        .max_by_key(|(stamp, _)| *stamp);

    match latest {
        Some((stamp, path)) => {
            debug!("Latest snapshot {} ({})", path.display(), stamp);
            Ok(path)
        }
        None => Err(AnalyzerError::SnapshotNotFound(dir.to_path_buf())),
    }
}

/// Read a snapshot written by [`save_snapshot`].
pub fn load_snapshot(path: &Path) -> Result<Vec<FeatureRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| AnalyzerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<FeatureRecord> = serde_json::from_str(&content)?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn snapshot_file_name(generated_at: NaiveDateTime) -> String {
    format!(
        "{}{}{}",
        SNAPSHOT_PREFIX,
        generated_at.format(SNAPSHOT_STAMP),
        SNAPSHOT_SUFFIX
    )
}

fn parse_snapshot_name(name: &str) -> Option<NaiveDateTime> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(SNAPSHOT_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_STAMP).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::calendar::{Month, Weekday};
    use chat_core::models::Block;
    use chrono::{NaiveDate, TimeDelta};
    use tempfile::TempDir;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn make_record(dt: NaiveDateTime, sender: &str, receiver: &str, chat: &str) -> FeatureRecord {
        FeatureRecord {
            block: Block {
                datetime: dt,
                datetime_last: dt,
                sender: sender.to_string(),
                receiver: Some(receiver.to_string()),
                chat: Some(chat.to_string()),
                message: "hello".to_string(),
                n_block: 1,
                block_duration: TimeDelta::zero(),
            },
            week: "2020-25".to_string(),
            month: Month::June,
            weekday: Weekday::Monday,
            hour: 12,
            n_symbols: 5,
            emojis: vec![],
            n_emojis: 0,
            duration_since_their_last: TimeDelta::minutes(3),
            duration_to_reply: Some(TimeDelta::minutes(3)),
        }
    }

    fn sample() -> Vec<FeatureRecord> {
        vec![
            make_record(at(20, 12), "Me", "Max", "Max"),
            make_record(at(21, 12), "Max", "Me", "Max"),
            make_record(at(22, 12), "Me", "Eve", "Eve"),
            make_record(at(23, 12), "Eve", "Me", "Eve"),
        ]
    }

    // ── TableFilter ───────────────────────────────────────────────────────────

    #[test]
    fn test_empty_filter_passes_everything() {
        let records = sample();
        let filter = TableFilter::new();
        assert!(filter.is_unconstrained());
        assert_eq!(filter.apply(&records).count(), 4);
    }

    #[test]
    fn test_filter_by_chat() {
        let records = sample();
        let filter = TableFilter::new().with_chats(["Eve"]);
        let senders: Vec<&str> = filter.apply(&records).map(|r| r.sender()).collect();
        assert_eq!(senders, vec!["Me", "Eve"]);
    }

    #[test]
    fn test_filter_by_sender_and_receiver() {
        let records = sample();
        let filter = TableFilter::new()
            .with_senders(["Me"])
            .with_receivers(["Max", "Nobody"]);
        let matched: Vec<_> = filter.apply(&records).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].datetime(), at(20, 12));
    }

    #[test]
    fn test_filter_range_start_inclusive_end_exclusive() {
        let records = sample();
        let filter = TableFilter::new().with_start(at(21, 12)).with_end(at(23, 12));
        let dates: Vec<_> = filter.apply(&records).map(|r| r.datetime()).collect();
        assert_eq!(dates, vec![at(21, 12), at(22, 12)]);
    }

    #[test]
    fn test_filter_composition_is_order_independent() {
        let records = sample();
        let a = TableFilter::new().with_chats(["Max"]).with_start(at(21, 0));
        let b = TableFilter::new().with_start(at(21, 0)).with_chats(["Max"]);
        assert_eq!(a, b);
        let from_a: Vec<_> = a.apply(&records).collect();
        let from_b: Vec<_> = b.apply(&records).collect();
        assert_eq!(from_a, from_b);
        assert_eq!(from_a.len(), 1);
    }

    #[test]
    fn test_filter_rejects_missing_receiver_when_constrained() {
        let mut record = make_record(at(20, 12), "Me", "Max", "Max");
        record.block.receiver = None;
        let filter = TableFilter::new().with_receivers(["Max"]);
        assert!(!filter.matches(&record));
        assert!(TableFilter::new().matches(&record));
    }

    // ── FeatureTable ──────────────────────────────────────────────────────────

    #[test]
    fn test_table_distinct_values_sorted() {
        let table = FeatureTable::new(sample());
        assert_eq!(table.chats(), vec!["Eve", "Max"]);
        assert_eq!(table.senders(), vec!["Eve", "Max", "Me"]);
        assert_eq!(table.receivers(), vec!["Eve", "Max", "Me"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_table_filter() {
        let table = FeatureTable::new(sample());
        let filter = TableFilter::new().with_senders(["Max"]);
        assert_eq!(table.filter(&filter).count(), 1);
    }

    // ── snapshots ─────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_name_roundtrip() {
        let dt = at(22, 13);
        let name = snapshot_file_name(dt);
        assert_eq!(name, "features_20200622-130000.json");
        assert_eq!(parse_snapshot_name(&name), Some(dt));
        assert_eq!(parse_snapshot_name("notes.json"), None);
        assert_eq!(parse_snapshot_name("features_garbage.json"), None);
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let tmp = TempDir::new().expect("tempdir");
        let records = sample();

        let path = save_snapshot(tmp.path(), &records).expect("save");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = load_snapshot(&path).expect("load");
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_latest_snapshot_uses_embedded_timestamp() {
        let tmp = TempDir::new().expect("tempdir");
        let records = sample();

        let newest = save_snapshot_at(tmp.path(), &records, at(22, 13)).unwrap();
        // Written later, but stamped earlier.
        save_snapshot_at(tmp.path(), &records, at(21, 13)).unwrap();
        std::fs::write(tmp.path().join("zzz_notes.json"), "[]").unwrap();

        assert_eq!(latest_snapshot(tmp.path()).unwrap(), newest);
    }

    #[test]
    fn test_latest_snapshot_empty_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let err = latest_snapshot(tmp.path()).unwrap_err();
        assert!(matches!(err, AnalyzerError::SnapshotNotFound(_)));
    }

    #[test]
    fn test_latest_snapshot_missing_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let err = latest_snapshot(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, AnalyzerError::SnapshotNotFound(_)));
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = load_snapshot(&tmp.path().join("features_20200101-000000.json")).unwrap_err();
        assert!(matches!(err, AnalyzerError::FileRead { .. }));
    }

    #[test]
    fn test_load_snapshot_corrupt_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("features_20200101-000000.json");
        std::fs::write(&path, "{oops").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, AnalyzerError::JsonParse(_)));
    }

    #[test]
    fn test_feature_table_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = save_snapshot_at(tmp.path(), &sample(), at(22, 13)).unwrap();
        let table = FeatureTable::load(&path).unwrap();
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
    }
}
