//! Canonical timestamp rendering.
//!
//! Every timestamp that ends up in a catalog is rendered as
//! `YYYY-MM-DDTHH:MM:SS.ffffff+00:00`. Input offsets are dropped and the
//! civil time is kept as-is; all store and chain timestamps are UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

const FRACTION_DIGITS: usize = 6;

/// Outcome of parsing a timestamp string.
///
/// A string that cannot be parsed is carried through unchanged together
/// with the parse failure, so one bad value never aborts a catalog build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Canonical(String),
    Unparsed { original: String, reason: String },
}

impl Normalized {
    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Canonical(value) => value,
            Self::Unparsed { original, .. } => original,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Canonical(value) => value,
            Self::Unparsed { original, .. } => original,
        }
    }
}

/// Parse `raw` into the canonical form, keeping the original on failure.
pub fn parse_timestamp(raw: &str) -> Normalized {
    match parse_civil(raw) {
        Ok(naive) => Normalized::Canonical(naive.format(CANONICAL_FORMAT).to_string()),
        Err(reason) => Normalized::Unparsed {
            original: raw.to_string(),
            reason,
        },
    }
}

/// Like [`parse_timestamp`], but logs the failure and returns a plain string.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Normalized::Canonical(value) => value,
        Normalized::Unparsed { original, reason } => {
            tracing::warn!("Failed to normalize timestamp '{}': {}", original, reason);
            original
        }
    }
}

pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.naive_utc().format(CANONICAL_FORMAT).to_string()
}

fn parse_civil(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim();
    let without_zone = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
        .unwrap_or(trimmed);

    let Some(split) = without_zone.find(['T', ' ']) else {
        let date = NaiveDate::parse_from_str(without_zone, "%Y-%m-%d")
            .map_err(|error| format!("invalid date: {}", error))?;
        return date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| "invalid midnight".to_string());
    };

    let date = &without_zone[..split];
    let time = strip_offset(&without_zone[split + 1..]);

    let (clock, fraction) = time.split_once('.').unwrap_or((time, ""));
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid fractional seconds: '{}'", fraction));
    }

    // Truncate, never round.
    let mut micros: String = fraction.chars().take(FRACTION_DIGITS).collect();
    while micros.len() < FRACTION_DIGITS {
        micros.push('0');
    }

    let clock = if clock.matches(':').count() == 1 {
        format!("{}:00", clock)
    } else {
        clock.to_string()
    };

    let candidate = format!("{}T{}.{}", date, clock, micros);
    NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|error| format!("invalid date-time: {}", error))
}

fn strip_offset(time: &str) -> &str {
    match time.rfind(['+', '-']) {
        Some(pos) if is_numeric_offset(&time[pos + 1..]) => &time[..pos],
        _ => time,
    }
}

fn is_numeric_offset(offset: &str) -> bool {
    let bytes = offset.as_bytes();
    match bytes.len() {
        2 | 4 => bytes.iter().all(u8::is_ascii_digit),
        5 => {
            bytes[2] == b':'
                && bytes[..2].iter().all(u8::is_ascii_digit)
                && bytes[3..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}
