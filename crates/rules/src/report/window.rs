//! Report lookback windows such as `24h`, `7d` or `1d12h`.

use std::time::Duration;

/// Longest lookback a report may cover (ten years).
pub const MAX_WINDOW: Duration = Duration::from_secs(3_650 * 86_400);

/// Parse a human-readable duration string into a [`Duration`].
///
/// Supports components: `Xd` (days), `Xh` (hours), `Xm` (minutes), `Xs` (seconds).
/// Components can be combined: "2h30m", "1d12h", "90s". A bare number is
/// seconds. Returns `None` if the string is empty, unparseable or zero.
pub fn parse_window(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
        } else {
            let n: u64 = num_buf.parse().ok()?;
            num_buf.clear();
            let secs = match ch {
                'd' => n.checked_mul(86_400)?,
                'h' => n.checked_mul(3_600)?,
                'm' => n.checked_mul(60)?,
                's' => n,
                _ => return None,
            };
            total_secs = total_secs.checked_add(secs)?;
            found_unit = true;
        }
    }

    if !num_buf.is_empty() {
        if found_unit {
            // "30m15" is ambiguous.
            return None;
        }
        total_secs = num_buf.parse().ok()?;
    }

    if total_secs == 0 {
        return None;
    }

    Some(Duration::from_secs(total_secs))
}
