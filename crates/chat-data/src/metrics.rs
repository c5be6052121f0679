//! Metric aggregation over feature records.
//!
//! Rolls block-level features up into summary statistics per group. The
//! grouping key is arbitrary; groups come back sorted by key.

use std::collections::BTreeMap;

use chat_core::calendar::Weekday;
use chat_core::models::FeatureRecord;
use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

// ── ChatMetrics ───────────────────────────────────────────────────────────────

/// Summary statistics of a group of feature records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMetrics {
    /// Number of blocks in the group.
    pub total_messages: usize,
    pub total_symbols: usize,
    pub avg_symbols_per_message: f64,
    pub total_emojis: usize,
    /// Mean over blocks that have a reply latency; `None` if none do.
    #[serde(with = "chat_core::models::optional_duration_secs")]
    pub avg_time_to_reply: Option<TimeDelta>,
    #[serde(with = "chat_core::models::optional_duration_secs")]
    pub avg_time_since_their_last: Option<TimeDelta>,
    /// Blocks without a reply latency, i.e. not the first of their run.
    pub n_follow_up_messages: usize,
}

// ── MetricsAccumulator ────────────────────────────────────────────────────────

/// Running totals from which [`ChatMetrics`] are computed.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    count: usize,
    symbols: usize,
    emojis: usize,
    reply_count: usize,
    reply_ms: i64,
    since_ms: i64,
}

impl MetricsAccumulator {
    /// Add a single record to the running totals.
    pub fn add(&mut self, record: &FeatureRecord) {
        self.count += 1;
        self.symbols += record.n_symbols;
        self.emojis += record.n_emojis;
        self.since_ms += record.duration_since_their_last.num_milliseconds();
        if let Some(reply) = record.duration_to_reply {
            self.reply_count += 1;
            self.reply_ms += reply.num_milliseconds();
        }
    }

    pub fn finish(&self) -> ChatMetrics {
        ChatMetrics {
            total_messages: self.count,
            total_symbols: self.symbols,
            avg_symbols_per_message: if self.count == 0 {
                0.0
            } else {
                self.symbols as f64 / self.count as f64
            },
            total_emojis: self.emojis,
            avg_time_to_reply: mean_duration(self.reply_ms, self.reply_count),
            avg_time_since_their_last: mean_duration(self.since_ms, self.count),
            n_follow_up_messages: self.count - self.reply_count,
        }
    }
}

fn mean_duration(total_ms: i64, count: usize) -> Option<TimeDelta> {
    if count == 0 {
        return None;
    }
    Some(TimeDelta::milliseconds(total_ms / count as i64))
}

// ── MetricGroup ───────────────────────────────────────────────────────────────

/// Metrics for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricGroup<K> {
    pub key: K,
    pub metrics: ChatMetrics,
}

/// Number of blocks started on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub n_messages: usize,
}

// ── MetricAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that groups feature records and reduces each group.
pub struct MetricAggregator;

impl MetricAggregator {
    /// Group `records` by `key_fn` and compute metrics per group.
    ///
    /// Returns groups sorted by key (ascending).
    pub fn aggregate_by<'a, I, K, F>(records: I, key_fn: F) -> Vec<MetricGroup<K>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
        K: Ord,
        F: Fn(&FeatureRecord) -> K,
    {
        let mut map: BTreeMap<K, MetricsAccumulator> = BTreeMap::new();

        for record in records {
            map.entry(key_fn(record)).or_default().add(record);
        }

        map.into_iter()
            .map(|(key, acc)| MetricGroup {
                key,
                metrics: acc.finish(),
            })
            .collect()
    }

    /// Metrics over all records as a single group.
    pub fn calculate_totals<'a, I>(records: I) -> ChatMetrics
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        let mut acc = MetricsAccumulator::default();
        for record in records {
            acc.add(record);
        }
        acc.finish()
    }

    /// Grouped by sender.
    pub fn by_sender<'a, I>(records: I) -> Vec<MetricGroup<String>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        Self::aggregate_by(records, |r| r.block.sender.clone())
    }

    /// Grouped by `(sender, receiver)`.
    pub fn by_sender_receiver<'a, I>(records: I) -> Vec<MetricGroup<(String, String)>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        Self::aggregate_by(records, |r| {
            (
                r.block.sender.clone(),
                r.block.receiver.clone().unwrap_or_default(),
            )
        })
    }

    /// Grouped by `(hour, sender)`.
    pub fn hourly_statistics<'a, I>(records: I) -> Vec<MetricGroup<(u32, String)>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        Self::aggregate_by(records, |r| (r.hour, r.block.sender.clone()))
    }

    /// Grouped by `(weekday, sender)`, Monday first.
    pub fn by_weekday<'a, I>(records: I) -> Vec<MetricGroup<(Weekday, String)>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        Self::aggregate_by(records, |r| (r.weekday, r.block.sender.clone()))
    }

    /// Grouped by the calendar date the block started on.
    pub fn by_date<'a, I>(records: I) -> Vec<MetricGroup<NaiveDate>>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        Self::aggregate_by(records, |r| r.block.datetime.date())
    }

    /// Block count per calendar date, ascending. Days without blocks are
    /// omitted.
    pub fn messages_per_day<'a, I>(records: I) -> Vec<DailyCount>
    where
        I: IntoIterator<Item = &'a FeatureRecord>,
    {
        let mut map: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for record in records {
            *map.entry(record.block.datetime.date()).or_default() += 1;
        }
        map.into_iter()
            .map(|(date, n_messages)| DailyCount { date, n_messages })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
