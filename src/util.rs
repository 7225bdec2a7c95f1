use crate::error::{AuthorstatError, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Shorten an email to its first three plus last three characters.
///
/// This is a display-level obfuscation, not anonymization: collisions are
/// possible and accepted, and the transform must stay stable because the
/// result is the author's identity in every output.
pub fn obfuscate_email(email: &str) -> String {
    let chars: Vec<char> = email.chars().collect();
    let head: String = chars.iter().take(3).collect();
    let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
    format!("{head}{tail}")
}

pub fn epoch_to_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AuthorstatError::Parse(format!("bad epoch timestamp: {raw:?}")))?;
    DateTime::from_timestamp(secs as i64, 0)
        .ok_or_else(|| AuthorstatError::Parse(format!("epoch timestamp out of range: {raw:?}")))
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Parse a `--since`/`--until` argument: RFC3339 first, then `YYYY-MM-DD`
/// at midnight UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    Err(AuthorstatError::InvalidDate(format!(
        "Could not parse '{input}' as RFC3339 or YYYY-MM-DD"
    )))
}
