const TIME_MARKER: &str = "time=";
/// Length of `HH:MM:SS.ff`
const TIME_VALUE_LEN: usize = 11;

/// Find the first `time=HH:MM:SS.ff` marker in an FFmpeg status line and return
/// it in seconds. FFmpeg outputs lines such as:
/// `frame=  123 fps= 30 q=28.0 size=    1234kB time=00:00:05.00 bitrate= 2000.0kbits/s`
pub fn parse_time_marker(line: &str) -> Option<f64> {
    line.match_indices(TIME_MARKER).find_map(|(pos, _)| {
        let value = line.get(pos + TIME_MARKER.len()..)?.get(..TIME_VALUE_LEN)?;
        if is_clock_value(value) {
            clock_seconds(value)
        } else {
            None
        }
    })
}

fn clock_seconds(value: &str) -> Option<f64> {
    let mut fields = value.splitn(3, ':');
    let hours: f64 = fields.next()?.parse().ok()?;
    let minutes: f64 = fields.next()?.parse().ok()?;
    let seconds: f64 = fields.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// `DD:DD:DD.DD`
fn is_clock_value(value: &str) -> bool {
    value.bytes().enumerate().all(|(i, b)| match i {
        2 | 5 => b == b':',
        8 => b == b'.',
        _ => b.is_ascii_digit(),
    })
}

/// `clamp(floor(elapsed / total * 100), 0, 100)`, or None when the total duration is unknown
pub fn percent_of(elapsed: f64, total_duration: f64) -> Option<u8> {
    if total_duration > 0.0 {
        let percent = (elapsed * 100.0 / total_duration).floor();
        Some(percent.clamp(0.0, 100.0) as u8)
    } else {
        None
    }
}

/// Turns status lines into progress updates that never go backwards.
///
/// FFmpeg occasionally reports a timestamp smaller than an earlier one; those
/// are swallowed so the displayed percentage only moves forward.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_duration: f64,
    reported: u8,
}

impl ProgressTracker {
    pub fn new(total_duration: f64) -> Self {
        Self {
            total_duration,
            reported: 0,
        }
    }

    /// Returns the new percentage when the line carries a marker past the previous maximum
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        let elapsed = parse_time_marker(line)?;
        let percent = percent_of(elapsed, self.total_duration)?;
        if percent > self.reported {
            self.reported = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Whole-batch progress: `floor(((completed + current / 100) / total) * 100)`.
///
/// Computed in integers so values such as 29% of a single file do not round down to 28.
pub fn aggregate_percent(completed: usize, current_percent: Option<u8>, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let current = u64::from(current_percent.unwrap_or(0).min(100));
    let scaled = (completed as u64 * 100 + current) / total as u64;
    scaled.min(100) as u8
}
