//! Pace and duration formatting.

/// Returned by [`format_pace`] when the speed has no meaningful pace.
pub const NO_PACE: &str = "--:--";

/// Format a speed in m/s as a `mm:ss` per-kilometre pace.
///
/// Zero, negative and non-finite speeds return [`NO_PACE`]. A rounded
/// seconds value of 60 carries into the minutes.
///
/// # Example
/// ```
/// use run_analyzer::{format_pace, NO_PACE};
///
/// assert_eq!(format_pace(10.0 / 3.0), "05:00");
/// assert_eq!(format_pace(0.0), NO_PACE);
/// ```
pub fn format_pace(speed: f64) -> String {
    if !speed.is_finite() || speed <= 0.0 {
        return NO_PACE.to_string();
    }

    let decimal_minutes = 60.0 / (speed * 3.6);
    if !decimal_minutes.is_finite() {
        return NO_PACE.to_string();
    }

    let mut minutes = decimal_minutes.floor() as u64;
    let mut seconds = ((decimal_minutes - minutes as f64) * 60.0).round() as u64;
    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }
    format!("{:02}:{:02}", minutes, seconds)
}

/// Format whole seconds as `mm:ss` (minutes are not wrapped into hours).
pub fn format_duration(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
