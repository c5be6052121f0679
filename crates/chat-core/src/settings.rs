use chrono::{NaiveDate, TimeDelta};
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default merge window in seconds.
pub const DEFAULT_MERGE_WINDOW_SECS: u64 = 60;

/// Name of the per-user data directory under the home directory.
const APP_DIR: &str = ".chat-analyzer";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Behavioral statistics for exported two-person chat transcripts
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chat-analyzer",
    about = "Behavioral statistics for exported two-person chat transcripts",
    version
)]
pub struct Settings {
    /// What to do: build a snapshot, or report on the latest one
    #[arg(long, default_value = "aggregate", value_parser = ["aggregate", "metrics", "hourly", "weekday", "daily"])]
    pub view: String,

    /// Directory searched recursively for `.txt` transcripts
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory snapshots are written to and read from
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Your own display name in the transcripts (repeatable)
    #[arg(long = "self-name")]
    pub self_names: Vec<String>,

    /// Maximum gap in seconds between merged same-sender messages
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    pub merge_window: u64,

    /// Abort the whole run on the first malformed transcript
    #[arg(long)]
    pub fail_fast: bool,

    /// Only include these chats (repeatable)
    #[arg(long = "chat")]
    pub chats: Vec<String>,

    /// Only include blocks sent by these participants (repeatable)
    #[arg(long = "sender")]
    pub senders: Vec<String>,

    /// Only include blocks received by these participants (repeatable)
    #[arg(long = "receiver")]
    pub receivers: Vec<String>,

    /// Only include blocks starting on or after this date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Only include blocks starting before this date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.chat-analyzer/last_used.json`.
///
/// Only pipeline inputs are kept. The view always defaults to `aggregate`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub self_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_window: Option<u64>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.chat-analyzer/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR).join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the default config file if it exists.
    pub fn clear() -> Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, fill in default directories, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
            &home_dir(),
        )
    }

    /// Full implementation; accepts args, an explicit config path and the
    /// base directory that default input/output directories hang off.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
        base_dir: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_defaults(settings, base_dir);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. View, filters and dates are never persisted.
        if settings.input_dir.is_none() {
            settings.input_dir = last.input_dir;
        }
        if settings.output_dir.is_none() {
            settings.output_dir = last.output_dir;
        }
        // clap stores the arg id under the field name, not the flag spelling.
        if !is_arg_explicitly_set(&matches, "self_names") {
            settings.self_names = last.self_names;
        }
        if !is_arg_explicitly_set(&matches, "merge_window") {
            if let Some(v) = last.merge_window.filter(|v| *v > 0) {
                settings.merge_window = v;
            }
        }

        settings = Self::resolve_defaults(settings, base_dir);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Fill in default directories and apply the `--debug` flag.
    fn resolve_defaults(mut settings: Settings, base_dir: &Path) -> Settings {
        let app_dir = base_dir.join(APP_DIR);
        if settings.input_dir.is_none() {
            settings.input_dir = Some(app_dir.join("transcripts"));
        }
        if settings.output_dir.is_none() {
            settings.output_dir = Some(app_dir.join("snapshots"));
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Transcript directory, falling back to `~/.chat-analyzer/transcripts`.
    pub fn input_dir(&self) -> PathBuf {
        self.input_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR).join("transcripts"))
    }

    /// Snapshot directory, falling back to `~/.chat-analyzer/snapshots`.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR).join("snapshots"))
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Explicit configuration threaded through every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Sender names that identify the operator.
    pub self_names: Vec<String>,
    /// Maximum gap between merged same-sender messages.
    pub merge_window_secs: u64,
}

impl PipelineConfig {
    pub fn new(self_names: Vec<String>, merge_window_secs: u64) -> Self {
        Self {
            self_names,
            merge_window_secs,
        }
    }

    /// The merge window as a duration.
    pub fn merge_window(&self) -> TimeDelta {
        TimeDelta::seconds(self.merge_window_secs.min(i64::MAX as u64 / 1000) as i64)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_MERGE_WINDOW_SECS)
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            input_dir: s.input_dir.clone(),
            output_dir: s.output_dir.clone(),
            self_names: s.self_names.clone(),
            merge_window: Some(s.merge_window),
        }
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(s: &Settings) -> Self {
        PipelineConfig::new(s.self_names.clone(), s.merge_window)
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
