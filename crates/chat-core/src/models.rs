//! Domain records flowing through the pipeline: messages, blocks and feature rows.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::calendar::{Month, Weekday};

/// A single line of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Local wall-clock time the message was sent.
    pub datetime: NaiveDateTime,
    /// Display name of the author.
    pub sender: String,
    /// Raw message text, possibly empty.
    pub message: String,
    /// The other participant; set by participant resolution.
    #[serde(default)]
    pub receiver: Option<String>,
    /// Conversation label; set by participant resolution.
    #[serde(default)]
    pub chat: Option<String>,
}

impl Message {
    /// Unresolved message as produced by the transcript parser.
    pub fn new(datetime: NaiveDateTime, sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            datetime,
            sender: sender.into(),
            message: message.into(),
            receiver: None,
            chat: None,
        }
    }
}

/// Consecutive messages from one sender merged into a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Timestamp of the first message in the block.
    pub datetime: NaiveDateTime,
    /// Timestamp of the last message in the block.
    pub datetime_last: NaiveDateTime,
    pub sender: String,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub chat: Option<String>,
    /// Constituent message texts joined with `'\n'`.
    pub message: String,
    /// Number of messages merged into this block (at least 1).
    pub n_block: usize,
    /// `datetime_last - datetime`, never negative.
    #[serde(with = "duration_secs")]
    pub block_duration: TimeDelta,
}

/// A block widened with calendar, content and latency features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(flatten)]
    pub block: Block,
    /// `"%Y-%U"` label of the block start.
    pub week: String,
    pub month: Month,
    pub weekday: Weekday,
    /// Hour of day of the block start, `0..=23`.
    pub hour: u32,
    /// Unicode scalar count of the block text, newlines included.
    pub n_symbols: usize,
    /// Emoji grapheme clusters in order of appearance.
    pub emojis: Vec<String>,
    pub n_emojis: usize,
    /// Time since the other participant's most recent completed run ended.
    #[serde(with = "duration_secs")]
    pub duration_since_their_last: TimeDelta,
    /// Reply latency; present only on the first block of a run.
    #[serde(with = "optional_duration_secs")]
    pub duration_to_reply: Option<TimeDelta>,
}

impl FeatureRecord {
    /// Shortcut to the block start timestamp.
    pub fn datetime(&self) -> NaiveDateTime {
        self.block.datetime
    }

    pub fn sender(&self) -> &str {
        &self.block.sender
    }

    pub fn receiver(&self) -> Option<&str> {
        self.block.receiver.as_deref()
    }

    pub fn chat(&self) -> Option<&str> {
        self.block.chat.as_deref()
    }
}

// ── Duration serde ────────────────────────────────────────────────────────────

/// Serialize a [`TimeDelta`] as signed whole seconds.
pub mod duration_secs {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TimeDelta, D::Error> {
        let secs = i64::deserialize(d)?;
        TimeDelta::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("duration out of range: {secs}s")))
    }
}

/// Serialize an optional [`TimeDelta`] as signed whole seconds or `null`.
pub mod optional_duration_secs {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.num_seconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
        match Option::<i64>::deserialize(d)? {
            Some(secs) => TimeDelta::try_seconds(secs).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("duration out of range: {secs}s"))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 6, 22)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn make_record(to_reply: Option<TimeDelta>) -> FeatureRecord {
        FeatureRecord {
            block: Block {
                datetime: at(11, 43, 0),
                datetime_last: at(11, 44, 0),
                sender: "Max Mustermann".to_string(),
                receiver: Some("Anna".to_string()),
                chat: Some("Max Mustermann".to_string()),
                message: "Leave\nNow".to_string(),
                n_block: 2,
                block_duration: TimeDelta::minutes(1),
            },
            week: "2020-25".to_string(),
            month: Month::June,
            weekday: Weekday::Monday,
            hour: 11,
            n_symbols: 9,
            emojis: vec![],
            n_emojis: 0,
            duration_since_their_last: TimeDelta::hours(4),
            duration_to_reply: to_reply,
        }
    }

    // ── Message ───────────────────────────────────────────────────────────────

    #[test]
    fn test_message_new_is_unresolved() {
        let msg = Message::new(at(7, 0, 0), "B", "Who?");
        assert_eq!(msg.sender, "B");
        assert_eq!(msg.message, "Who?");
        assert!(msg.receiver.is_none());
        assert!(msg.chat.is_none());
    }

    // ── FeatureRecord serde ───────────────────────────────────────────────────

    #[test]
    fn test_feature_record_flattens_block() {
        let value = serde_json::to_value(make_record(None)).unwrap();
        assert_eq!(value["sender"], "Max Mustermann");
        assert_eq!(value["n_block"], 2);
        assert_eq!(value["datetime"], "2020-06-22T11:43:00");
        assert!(value.get("block").is_none());
    }

    #[test]
    fn test_durations_serialize_as_seconds() {
        let value = serde_json::to_value(make_record(Some(TimeDelta::seconds(90)))).unwrap();
        assert_eq!(value["block_duration"], 60);
        assert_eq!(value["duration_since_their_last"], 14_400);
        assert_eq!(value["duration_to_reply"], 90);
    }

    #[test]
    fn test_missing_reply_serializes_as_null() {
        let value = serde_json::to_value(make_record(None)).unwrap();
        assert!(value["duration_to_reply"].is_null());
    }

    #[test]
    fn test_calendar_fields_serialize_as_names() {
        let value = serde_json::to_value(make_record(None)).unwrap();
        assert_eq!(value["month"], "June");
        assert_eq!(value["weekday"], "Monday");
    }

    #[test]
    fn test_feature_record_json_roundtrip() {
        let record = make_record(Some(TimeDelta::minutes(20)));
        let json = serde_json::to_string(&record).unwrap();
        let back: FeatureRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_accessors() {
        let record = make_record(None);
        assert_eq!(record.datetime(), at(11, 43, 0));
        assert_eq!(record.sender(), "Max Mustermann");
        assert_eq!(record.receiver(), Some("Anna"));
        assert_eq!(record.chat(), Some("Max Mustermann"));
    }
}
