//! Human-readable elapsed time formatting
//!
//! Used in progress messages and timeout errors ("waited 10:00").

use std::time::Duration;

/// Format a duration as `M:SS` below one hour and `H:MM:SS` above.
///
/// Sub-second remainders are truncated.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ridecast_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(Duration::from_secs(5)), "0:05");
/// assert_eq!(format_elapsed(Duration::from_secs(600)), "10:00");
/// assert_eq!(format_elapsed(Duration::from_secs(3725)), "1:02:05");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
