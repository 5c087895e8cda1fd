//! Formatting helpers for summary output.
//!
//! Small, consistent formatters for the counts, byte totals, and
//! transfer rates the commands log when a run finishes.

use std::time::Duration;

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use fswap_lib::logging::format_count;
///
/// assert_eq!(format_count(999), "999");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a byte count in human-readable binary units.
///
/// # Examples
///
/// ```
/// use fswap_lib::logging::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(8192), "8.0 KiB");
/// assert_eq!(format_bytes(16 * 1024 * 1024), "16.0 MiB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use fswap_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(350)), "0.35s");
/// assert_eq!(format_duration(Duration::from_secs(45)), "45.0s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 1.0 {
        format!("{secs:.2}s")
    } else if secs < 60.0 {
        format!("{secs:.1}s")
    } else {
        let mins = duration.as_secs() / 60;
        let remaining = duration.as_secs() % 60;
        format!("{mins}m {remaining}s")
    }
}

/// Formats a transfer rate from a byte total and elapsed time.
///
/// # Examples
///
/// ```
/// use fswap_lib::logging::format_transfer_rate;
/// use std::time::Duration;
///
/// assert_eq!(
///     format_transfer_rate(64 * 1024 * 1024, Duration::from_secs(2)),
///     "32.0 MiB/s"
/// );
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_transfer_rate(bytes: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        return format!("{}/s", format_bytes(bytes));
    }
    format!("{}/s", format_bytes((bytes as f64 / secs) as u64))
}
