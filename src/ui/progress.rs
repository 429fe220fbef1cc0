//! Progress text helpers.

use std::time::Duration;

/// Format a duration for display.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", d.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// `[3/13]`, with `index` zero-based. The current number is padded to the
/// width of the total.
pub fn format_counter(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{}]", index + 1, total, width = width)
}
