//! Human-readable time formatting
//!
//! Recordings reviewed here are seconds to minutes long, so two formats cover
//! every field: `X.XXs` under 100 seconds and `M:SS.SS` above.

/// Values below this many seconds use the short `X.XXs` format
const SHORT_FORMAT_MAX: f64 = 100.0;

/// Format seconds for display.
///
/// # Examples
///
/// ```
/// use switchcrop_common::human_time::format_seconds;
///
/// assert_eq!(format_seconds(5.5), "5.50s");
/// assert_eq!(format_seconds(125.25), "2:05.25");
/// assert_eq!(format_seconds(-0.5), "-0.50s");
/// ```
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "n/a".to_string();
    }

    // Round to the displayed precision before picking a format
    let abs_seconds = (seconds.abs() * 100.0).round() / 100.0;
    let is_negative = seconds < 0.0 && abs_seconds > 0.0;

    let formatted = if abs_seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", abs_seconds)
    } else {
        let minutes = (abs_seconds / 60.0).floor();
        let secs = abs_seconds - minutes * 60.0;
        format!("{}:{:05.2}", minutes as u64, secs)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Format an interval as `start - end (length)`
///
/// ```
/// use switchcrop_common::human_time::format_interval;
///
/// assert_eq!(format_interval(5.5, 6.5), "5.50s - 6.50s (1.00s)");
/// ```
pub fn format_interval(start: f64, end: f64) -> String {
    format!(
        "{} - {} ({})",
        format_seconds(start),
        format_seconds(end),
        format_seconds(end - start)
    )
}

/// Format a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
