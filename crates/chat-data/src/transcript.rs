//! Transcript parsing for Chat Analyzer.
//!
//! Turns the raw text of an exported chat log into ordered [`Message`]
//! records. Each message line has the shape
//!
//! ```text
//! 21/06/2020, 23:39 - Max Mustermann: Hi
//! ```
//!
//! Lines that do not match (encryption notices, continuation lines of
//! multi-line messages) are dropped. The timestamp layout is fixed by the
//! first matching line and every later line must follow it exactly.

use std::fmt;
use std::sync::OnceLock;

use chat_core::error::{AnalyzerError, Result};
use chat_core::models::Message;
use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, trace};

// ── TimestampFormat ───────────────────────────────────────────────────────────

/// The layout of transcript timestamps, established from the first message.
///
/// Dates are always day-first. Only the year width, the comma after the
/// date and the clock style vary between exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormat {
    /// `true` for 4-digit years (`%Y`), `false` for 2-digit years (`%y`).
    pub four_digit_year: bool,
    /// Whether a comma separates date and time.
    pub comma: bool,
    /// 12-hour clock with an AM/PM suffix.
    pub twelve_hour: bool,
}

impl TimestampFormat {
    /// Derive the layout from a raw timestamp such as `"21/06/2020, 23:39"`.
    ///
    /// Returns a human-readable reason when the year width is neither 2 nor 4.
    pub fn detect(raw: &str) -> std::result::Result<Self, String> {
        let date = raw.split([',', ' ']).next().unwrap_or(raw);
        let year_digits = date.rsplit('/').next().map(str::len).unwrap_or(0);
        let four_digit_year = match year_digits {
            2 => false,
            4 => true,
            n => return Err(format!("has a {n}-digit year, expected 2 or 4 digits")),
        };

        Ok(Self {
            four_digit_year,
            comma: raw.contains(','),
            twelve_hour: has_meridiem(raw),
        })
    }

    /// The equivalent chrono format string, e.g. `"%d/%m/%Y, %H:%M"`.
    pub fn chrono_format(&self) -> String {
        format!(
            "%d/%m/{}{} {}",
            if self.four_digit_year { "%Y" } else { "%y" },
            if self.comma { "," } else { "" },
            if self.twelve_hour { "%I:%M %p" } else { "%H:%M" },
        )
    }

    /// Parse `raw` strictly against this layout.
    pub fn parse(&self, raw: &str) -> std::result::Result<NaiveDateTime, String> {
        let fmt = self.chrono_format();
        match Self::detect(raw) {
            Ok(shape) if shape == *self => {}
            _ => return Err(format!("does not match format \"{fmt}\"")),
        }
        NaiveDateTime::parse_from_str(raw, &fmt)
            .map_err(|e| format!("does not match format \"{fmt}\": {e}"))
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chrono_format())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse transcript text into messages in input order.
///
/// `source` names the transcript in error messages.
///
/// # Errors
///
/// * [`AnalyzerError::EmptyInput`] when no line matches the message pattern.
/// * [`AnalyzerError::Format`] when a timestamp has an unsupported year
///   width, deviates from the layout of the first message, names an
///   impossible date, or is earlier than its predecessor.
pub fn parse_transcript(text: &str, source: &str) -> Result<Vec<Message>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut messages: Vec<Message> = Vec::new();
    let mut format: Option<TimestampFormat> = None;
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let Some(caps) = message_pattern().captures(line) else {
            trace!("{}: skipping line {}", source, line_no);
            skipped += 1;
            continue;
        };

        let raw_ts = &caps[1];
        let format_error = |reason: String| AnalyzerError::Format {
            source_name: source.to_string(),
            line: line_no,
            value: raw_ts.to_string(),
            reason,
        };

        let fmt = match format {
            Some(fmt) => fmt,
            None => {
                let detected = TimestampFormat::detect(raw_ts).map_err(format_error)?;
                debug!("{}: timestamp format {}", source, detected);
                format = Some(detected);
                detected
            }
        };

        let datetime = fmt.parse(raw_ts).map_err(format_error)?;

        if let Some(prev) = messages.last() {
            if datetime < prev.datetime {
                return Err(format_error(format!(
                    "is earlier than the previous message ({})",
                    prev.datetime
                )));
            }
        }

        messages.push(Message::new(datetime, &caps[2], &caps[3]));
    }

    if messages.is_empty() {
        return Err(AnalyzerError::EmptyInput {
            source_name: source.to_string(),
        });
    }

    debug!(
        "{}: parsed {} messages ({} lines skipped)",
        source,
        messages.len(),
        skipped
    );
    Ok(messages)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2}/\d{1,2}/\d{2,4},? \d{1,2}:\d{2}(?: [AaPp][Mm])?) - ([^:]+): (.+)$")
            .expect("regex is valid")
    })
}

fn has_meridiem(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.ends_with(" am") || lower.ends_with(" pm")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
