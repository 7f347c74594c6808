/// Format seconds as HH:MM:SS for the file list
pub fn format_duration(seconds: f64) -> String {
    if !(seconds >= 0.0) {
        return "N/A".to_string();
    }

    let total_seconds = seconds.floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(65.9), "00:01:05");
        assert_eq!(format_duration(3661.123), "01:01:01");
        assert_eq!(format_duration(-1.0), "N/A");
        assert_eq!(format_duration(f64::NAN), "N/A");
    }
}
