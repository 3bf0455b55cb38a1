//! Human-readable duration parsing.
//!
//! Accepts plain seconds (`"1.5"`) and concatenated unit segments such as
//! `"2h5m"`, `"-2h5m"` or `"1d12h"`. Results are signed milliseconds.

use std::time::Duration;

use crate::error::{Error, Result};

/// Parses `s` into signed milliseconds.
///
/// The `i` suffix counts steps of `step_ms` milliseconds. Once a negative
/// segment is seen every later segment is negated, so `-2h5m` is the
/// negation of `2h5m`.
pub fn parse_duration(s: &str, step_ms: i64) -> Result<i64> {
    if s.is_empty() {
        return Err(Error::duration(s, "duration cannot be empty"));
    }

    let last = s.as_bytes()[s.len() - 1];
    if last.is_ascii_digit() || last == b'.' {
        if let Ok(secs) = s.parse::<f64>() {
            return Ok((secs * 1000.0) as i64);
        }
    }

    let mut rest = s;
    let mut negative = false;
    let mut total = 0f64;
    while !rest.is_empty() {
        let n = scan_segment(rest)
            .ok_or_else(|| Error::duration(s, format!("cannot parse segment {:?}", rest)))?;
        let (segment, tail) = rest.split_at(n);
        rest = tail;

        let mut ms = parse_segment(segment, step_ms)?;
        if negative && ms > 0.0 {
            ms = -ms;
        }
        if ms < 0.0 {
            negative = true;
        }
        total += ms;
    }

    if total.abs() > i64::MAX as f64 {
        return Err(Error::duration(s, format!("too big duration {:.0}ms", total)));
    }
    Ok(total as i64)
}

/// Parses `s` as a non-negative duration for configuration values.
pub fn parse_positive_duration(s: &str) -> Result<Duration> {
    let ms = parse_duration(s.trim(), 0)?;
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| Error::duration(s, "duration must not be negative"))
}

/// Formats `d` in a form [`parse_duration`] reads back.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 {
        "0".to_string()
    } else if ms % 1000 != 0 {
        format!("{}ms", ms)
    } else {
        format!("{}s", ms / 1000)
    }
}

/// Milliseconds for a single `[-]digits[.digits]suffix` segment.
fn parse_segment(segment: &str, step_ms: i64) -> Result<f64> {
    let lower = segment.to_ascii_lowercase();
    let number = &lower[..lower.len() - 1];
    let number = number.strip_suffix('m').unwrap_or(number);
    let value: f64 = number
        .parse()
        .map_err(|e| Error::duration(segment, format!("{}", e)))?;

    let secs = match &lower[number.len()..] {
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 60.0 * 60.0,
        "d" => 24.0 * 60.0 * 60.0,
        "w" => 7.0 * 24.0 * 60.0 * 60.0,
        "y" => 365.0 * 24.0 * 60.0 * 60.0,
        "i" => step_ms as f64 / 1e3,
        _ => return Err(Error::duration(segment, "invalid duration suffix")),
    };
    Ok(secs * value * 1e3)
}

/// Length of the leading segment of `s`, or `None` if it has none.
fn scan_segment(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    let mut i = 0;
    if b.first() == Some(&b'-') {
        i += 1;
    }
    i += count_digits(&b[i..]);
    if i == 0 || i == b.len() {
        return None;
    }
    if b[i] == b'.' {
        let dot = i;
        i += 1;
        i += count_digits(&b[i..]);
        if i == dot + 1 || i == b.len() {
            return None;
        }
    }

    match b[i].to_ascii_lowercase() {
        b'm' => {
            match b.get(i + 1).map(u8::to_ascii_lowercase) {
                Some(b's') => return Some(i + 2),
                // `Mi` and `MB` are size suffixes, not durations.
                Some(b'i') | Some(b'b') => return None,
                _ => {}
            }
            // Upper-case `M` means millions, so only `m` is minutes.
            (b[i] == b'm').then_some(i + 1)
        }
        b's' | b'h' | b'd' | b'w' | b'y' | b'i' => Some(i + 1),
        _ => None,
    }
}

fn count_digits(b: &[u8]) -> usize {
    b.iter().take_while(|c| c.is_ascii_digit()).count()
}
