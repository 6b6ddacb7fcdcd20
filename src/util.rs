/// Format a second count as mm:ss for the countdown display.
pub fn format_duration(seconds: u32) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}", mins, secs)
}

/// Round a second count to whole minutes, half up.
pub fn whole_minutes(seconds: u64) -> u32 {
    ((seconds as f64) / 60.0).round() as u32
}
