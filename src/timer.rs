//! Wall-clock timer used by the printer.

use chrono::{DateTime, Local, TimeDelta};

/// Display format for start/stop times.
pub const DATE_TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";
/// Display format for clock times.
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Format used in file names.
pub const TIME_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Which format `Timer::now` renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    DateTime,
    Time,
    Timestamp,
}

/// Measures elapsed time from `start` to `stop`, plus optional laps.
#[derive(Debug, Clone)]
pub struct Timer {
    fmt: String,
    ts_fmt: String,
    start: Option<DateTime<Local>>,
    end: Option<DateTime<Local>>,
    lap_start: Option<DateTime<Local>>,
    lap_duration: Option<TimeDelta>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DATE_TIME_FORMAT, TIME_STAMP_FORMAT)
    }
}

impl Timer {
    pub fn new(fmt: impl Into<String>, ts_fmt: impl Into<String>) -> Self {
        Self {
            fmt: fmt.into(),
            ts_fmt: ts_fmt.into(),
            start: None,
            end: None,
            lap_start: None,
            lap_duration: None,
        }
    }

    /// Start the timer. Returns the formatted start time, or `None` if already started.
    pub fn start(&mut self) -> Option<String> {
        if self.start.is_some() {
            return None;
        }
        let now = Local::now();
        self.start = Some(now);
        Some(now.format(&self.fmt).to_string())
    }

    pub fn is_started(&self) -> bool {
        self.start.is_some()
    }

    pub fn start_lap(&mut self) {
        self.lap_start = Some(Local::now());
    }

    /// Stop the running lap and return its duration.
    pub fn stop_lap(&mut self) -> Option<TimeDelta> {
        let lap_start = self.lap_start.take()?;
        let duration = Local::now() - lap_start;
        self.lap_duration = Some(duration);
        Some(duration)
    }

    pub fn last_lap(&self) -> Option<TimeDelta> {
        self.lap_duration
    }

    /// Start time in file-name format.
    pub fn timestamp(&self) -> Option<String> {
        self.start.map(|s| s.format(&self.ts_fmt).to_string())
    }

    /// Time elapsed since start.
    pub fn state(&self) -> Option<String> {
        self.start.map(|s| format_duration(Local::now() - s))
    }

    /// Stop the timer (once) and return the formatted stop time.
    pub fn stop(&mut self) -> String {
        let end = *self.end.get_or_insert_with(Local::now);
        end.format(&self.fmt).to_string()
    }

    /// Total time between start and stop.
    pub fn delta(&self) -> Option<String> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(format_duration(end - start)),
            _ => None,
        }
    }

    pub fn now(&self, format: TimeFormat) -> String {
        let fmt = match format {
            TimeFormat::DateTime => self.fmt.as_str(),
            TimeFormat::Time => TIME_FORMAT,
            TimeFormat::Timestamp => self.ts_fmt.as_str(),
        };
        Local::now().format(fmt).to_string()
    }
}

/// Render a duration as `H:MM:SS.ffffff`.
pub fn format_duration(delta: TimeDelta) -> String {
    let micros = delta.num_microseconds().unwrap_or(i64::MAX).max(0);
    let total_secs = micros / 1_000_000;
    let frac = micros % 1_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{frac:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::zero()), "0:00:00.000000");
        assert_eq!(
            format_duration(TimeDelta::milliseconds(3_723_250)),
            "1:02:03.250000"
        );
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0:00:00.000000");
    }

    #[test]
    fn test_start_is_once() {
        let mut timer = Timer::default();
        assert!(timer.timestamp().is_none());
        assert!(timer.state().is_none());
        assert!(timer.start().is_some());
        assert!(timer.start().is_none());
        assert_eq!(timer.timestamp().unwrap().len(), "20240101-120000".len());
    }

    #[test]
    fn test_stop_and_delta() {
        let mut timer = Timer::default();
        assert!(timer.delta().is_none());
        timer.start();
        let first = timer.stop();
        let second = timer.stop();
        assert_eq!(first, second);
        assert!(timer.delta().unwrap().starts_with("0:00:0"));
    }

    #[test]
    fn test_laps() {
        let mut timer = Timer::default();
        assert!(timer.stop_lap().is_none());
        timer.start_lap();
        let lap = timer.stop_lap().unwrap();
        assert!(lap >= TimeDelta::zero());
        assert_eq!(timer.last_lap(), Some(lap));
        assert!(timer.stop_lap().is_none());
    }
}
