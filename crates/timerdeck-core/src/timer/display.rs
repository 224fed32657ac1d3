//! Display formatting for remaining time.
//!
//! Rounding here is presentation only; the engine keeps full precision.

/// Slack so that values like `12.3 * 10.0` don't round up a whole unit.
const ROUNDING_SLACK: f64 = 1e-6;

/// Format seconds as `MM:SS` (or `H:MM:SS` once past an hour), rounded up to
/// the whole second. With `show_decimals` one tenth digit is appended and the
/// value is rounded up to the tenth instead.
///
/// Rounding up keeps a running timer from showing `00:00` before it completes.
pub fn format_remaining(secs: f64, show_decimals: bool) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    if show_decimals {
        let tenths = (secs * 10.0 - ROUNDING_SLACK).ceil().max(0.0) as u64;
        format!("{}.{}", clock_face(tenths / 10), tenths % 10)
    } else {
        let whole = (secs - ROUNDING_SLACK).ceil().max(0.0) as u64;
        clock_face(whole)
    }
}

fn clock_face(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
