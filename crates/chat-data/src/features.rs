//! Feature derivation for Chat Analyzer.
//!
//! Widens each [`Block`] into a [`FeatureRecord`] with calendar fields,
//! content counts and the two latency measures. Blocks are grouped into
//! *runs*: maximal sequences of consecutive blocks from one sender. Latency
//! is always measured against the end of the other participant's most
//! recent completed run.

use chat_core::calendar;
use chat_core::models::{Block, FeatureRecord};
use chrono::{NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::emoji::extract_emojis;

// ── FeatureDeriver ────────────────────────────────────────────────────────────

/// Stateless feature derivation over an ordered block sequence.
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive one record per block, in input order.
    pub fn derive(blocks: &[Block]) -> Vec<FeatureRecord> {
        let since = duration_since_their_last(blocks);
        let reply = duration_to_reply(blocks);

        let records: Vec<FeatureRecord> = blocks
            .iter()
            .zip(since)
            .zip(reply)
            .map(|((block, since), reply)| Self::derive_one(block, since, reply))
            .collect();

        debug!("FeatureDeriver: derived {} records", records.len());
        records
    }

    fn derive_one(
        block: &Block,
        duration_since_their_last: TimeDelta,
        duration_to_reply: Option<TimeDelta>,
    ) -> FeatureRecord {
        let dt = &block.datetime;
        let emojis = extract_emojis(&block.message);
        FeatureRecord {
            week: calendar::week_label(dt),
            month: calendar::month_of(dt),
            weekday: calendar::weekday_of(dt),
            hour: calendar::hour_of(dt),
            n_symbols: block.message.chars().count(),
            n_emojis: emojis.len(),
            emojis,
            duration_since_their_last,
            duration_to_reply,
            block: block.clone(),
        }
    }
}

// ── Latency derivations ───────────────────────────────────────────────────────

/// Time from the end of the other sender's most recent completed run to the
/// start of each block.
///
/// Blocks of the opening run have no prior run and get zero. Consecutive
/// same-sender blocks all measure against the same prior run.
pub fn duration_since_their_last(blocks: &[Block]) -> Vec<TimeDelta> {
    prior_run_ends(blocks)
        .into_iter()
        .zip(blocks)
        .map(|(end, block)| end.map_or_else(TimeDelta::zero, |end| block.datetime - end))
        .collect()
}

/// Reply latency, defined only on the first block of each run.
///
/// Equals the gap to the end of the preceding run at every sender change,
/// `None` on follow-up blocks, and zero on the very first block.
pub fn duration_to_reply(blocks: &[Block]) -> Vec<Option<TimeDelta>> {
    prior_run_ends(blocks)
        .into_iter()
        .enumerate()
        .map(|(i, end)| {
            if i == 0 {
                return Some(TimeDelta::zero());
            }
            if blocks[i].sender == blocks[i - 1].sender {
                return None;
            }
            end.map(|end| blocks[i].datetime - end)
        })
        .collect()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// For each block, the latest `datetime_last` of the most recent run that
/// completed before the block's own run started.
fn prior_run_ends(blocks: &[Block]) -> Vec<Option<NaiveDateTime>> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut prior_end: Option<NaiveDateTime> = None;
    let mut run_end: Option<NaiveDateTime> = None;
    let mut run_sender: Option<&str> = None;

    for block in blocks {
        if run_sender != Some(block.sender.as_str()) {
            if run_sender.is_some() {
                prior_end = run_end;
            }
            run_sender = Some(block.sender.as_str());
            run_end = Some(block.datetime_last);
        } else {
            run_end = run_end.max(Some(block.datetime_last));
        }
        out.push(prior_end);
    }

    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
