//! Timestamp formatting and parsing in ffmpeg's `HH:MM:SS.mmm` notation.

use std::time::Duration;

/// Format a duration as `HH:MM:SS.mmm` for use as an ffmpeg argument.
///
/// Hours are zero-padded to two digits but not capped at 24; sub-millisecond
/// precision is truncated.
///
/// ```
/// use std::time::Duration;
/// use ffstage_core::format_timestamp;
///
/// assert_eq!(format_timestamp(Duration::from_secs(30)), "00:00:30.000");
/// assert_eq!(format_timestamp(Duration::from_millis(90_061_005)), "25:01:01.005");
/// ```
pub fn format_timestamp(d: Duration) -> String {
    let total_ms = d.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Parse a `H:MM:SS[.fraction]` timestamp as written in ffmpeg's
/// `out_time=` progress records.
///
/// Returns `None` for `N/A`, negative timestamps (ffmpeg reports these
/// before the first frame is muxed) and anything else malformed.
pub fn parse_timestamp(s: &str) -> Option<Duration> {
    let s = s.trim();
    let mut parts = s.splitn(3, ':');
    let h = parts.next()?;
    let m = parts.next()?;
    let sec = parts.next()?;

    if h.starts_with('-') {
        return None;
    }
    let h: u64 = h.parse().ok()?;
    let m: u64 = m.parse().ok()?;
    if m >= 60 {
        return None;
    }

    let (whole, frac) = match sec.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (sec, ""),
    };
    let whole: u64 = whole.parse().ok()?;
    if whole >= 60 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    // Keep at most nanosecond precision.
    let digits = &frac[..frac.len().min(9)];
    let nanos = if digits.is_empty() {
        0
    } else {
        let scale = 10u32.pow(9 - digits.len() as u32);
        digits.parse::<u32>().ok()? * scale
    };

    let secs = h.checked_mul(3600)?.checked_add(m * 60 + whole)?;
    Some(Duration::new(secs, nanos))
}
