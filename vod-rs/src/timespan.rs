//! Serde codec for `std::time::Duration` in the `[d.]hh:mm:ss[.fffffff]` layout
//!
//! Metadata documents written by the desktop client store durations in this
//! TimeSpan-style form (seven fractional digits). Durations finer than 100ns
//! are written with nine digits. Readers additionally accept a bare number of
//! seconds.
//!
//! Use with `#[serde(with = "squadov_vod::timespan")]`.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use std::time::Duration;

const SECS_PER_DAY: u64 = 86_400;
const NANOS_PER_TICK: u32 = 100;

/// Render a duration as `[d.]hh:mm:ss[.fffffff]`
pub fn to_timespan_string(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let nanos = duration.subsec_nanos();

    let mut out = if days > 0 {
        format!("{}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    };
    if nanos % NANOS_PER_TICK != 0 {
        // Finer than a tick; keep full precision
        out.push_str(&format!(".{:09}", nanos));
    } else if nanos > 0 {
        out.push_str(&format!(".{:07}", nanos / NANOS_PER_TICK));
    }
    out
}

/// Parse the `[d.]hh:mm:ss[.fffffff]` layout
pub fn parse_timespan(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.starts_with('-') {
        return Err(format!("negative duration not supported: {}", input));
    }

    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("expected hh:mm:ss, got {}", input));
    }

    let number = |s: &str| {
        s.parse::<u64>()
            .map_err(|e| format!("invalid component {:?} in {}: {}", s, input, e))
    };

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (number(d)?, number(h)?),
        None => (0, number(parts[0])?),
    };
    let minutes = number(parts[1])?;
    let (seconds, nanos) = match parts[2].split_once('.') {
        Some((s, frac)) => (number(s)?, fraction_to_nanos(frac, input)?),
        None => (number(parts[2])?, 0),
    };

    if minutes >= 60 || seconds >= 60 {
        return Err(format!("minutes and seconds must be below 60: {}", input));
    }

    let secs = days
        .checked_mul(SECS_PER_DAY)
        .and_then(|d| hours.checked_mul(3600).and_then(|h| d.checked_add(h)))
        .and_then(|s| s.checked_add(minutes * 60 + seconds))
        .ok_or_else(|| format!("duration out of range: {}", input))?;
    Ok(Duration::new(secs, nanos))
}

fn fraction_to_nanos(frac: &str, input: &str) -> Result<u32, String> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid fractional seconds in {}", input));
    }
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    digits
        .parse::<u32>()
        .map_err(|e| format!("invalid fractional seconds in {}: {}", input, e))
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_timespan_string(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(TimespanVisitor)
}

struct TimespanVisitor;

impl<'de> Visitor<'de> for TimespanVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a [d.]hh:mm:ss[.fffffff] string or a number of seconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        parse_timespan(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        Ok(Duration::from_secs(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("negative duration: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
        Duration::try_from_secs_f64(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short_and_long() {
        assert_eq!(to_timespan_string(Duration::from_secs(0)), "00:00:00");
        assert_eq!(to_timespan_string(Duration::from_secs(754)), "00:12:34");
        assert_eq!(
            to_timespan_string(Duration::from_secs(SECS_PER_DAY + 3661)),
            "1.01:01:01"
        );
        assert_eq!(
            to_timespan_string(Duration::from_millis(1500)),
            "00:00:01.5000000"
        );
        assert_eq!(
            to_timespan_string(Duration::new(2, 123_456_789)),
            "00:00:02.123456789"
        );
    }

    #[test]
    fn test_nanosecond_durations_survive() {
        let duration = Duration::new(754, 987_654_321);
        assert_eq!(parse_timespan(&to_timespan_string(duration)).unwrap(), duration);
    }

    #[test]
    fn test_parse_dotnet_layouts() {
        assert_eq!(parse_timespan("00:12:34").unwrap(), Duration::from_secs(754));
        assert_eq!(
            parse_timespan("00:00:01.5000000").unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            parse_timespan("2.03:00:00").unwrap(),
            Duration::from_secs(2 * SECS_PER_DAY + 3 * 3600)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timespan("12:34").is_err());
        assert!(parse_timespan("-00:00:01").is_err());
        assert!(parse_timespan("00:61:00").is_err());
        assert!(parse_timespan("00:00:01.x").is_err());
    }

    #[test]
    fn test_parse_rejects_overflowing_components() {
        let err = parse_timespan("999999999999999.00:00:00").unwrap_err();
        assert!(err.contains("out of range"));
        assert!(parse_timespan("18446744073709551615:00:00").is_err());
    }
}
