use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Owns the run's log sink and clocks. Created once before the loop,
/// finished once after export; there is no implicit process-wide state
/// beyond the subscriber it installs.
pub struct RunContext {
    pub started_at: DateTime<Local>,
    clock: Instant,
}

impl RunContext {
    /// Open today's log file (append mode, so runs on the same day share
    /// it) and install the subscriber over it.
    pub fn begin(log_dir: &Path) -> Result<Self> {
        let started_at = Local::now();
        let log_path = log_dir.join(format!("refscraper_{}.log", started_at.format("%Y-%m-%d")));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("cannot open log file {}", log_path.display()))?;

        let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt::Subscriber::builder()
            .with_env_filter(env)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();

        info!("run started at {}", started_at.format("%Y-%m-%d %H:%M:%S"));
        Ok(Self {
            started_at,
            clock: Instant::now(),
        })
    }

    /// Record end timestamp and total elapsed duration.
    pub fn finish(self) {
        let ended_at = Local::now();
        info!("processing started at: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"));
        info!("processing completed at: {}", ended_at.format("%Y-%m-%d %H:%M:%S"));
        info!("run took: {}", format_duration(self.clock.elapsed().as_secs_f64()));
    }
}

/// Render an elapsed duration in the unit its magnitude calls for:
/// seconds up to a minute, minutes up to an hour, hours beyond that.
pub fn format_duration(secs: f64) -> String {
    if secs > 3600.0 {
        format!("{:.2} hours", secs / 3600.0)
    } else if secs > 60.0 {
        format!("{:.2} minutes", secs / 60.0)
    } else {
        format!("{:.2} seconds", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_runs_log_seconds() {
        assert_eq!(format_duration(45.0), "45.00 seconds");
        assert_eq!(format_duration(60.0), "60.00 seconds");
    }

    #[test]
    fn mid_runs_log_minutes() {
        assert_eq!(format_duration(200.0), "3.33 minutes");
        assert_eq!(format_duration(3600.0), "60.00 minutes");
    }

    #[test]
    fn long_runs_log_hours() {
        assert_eq!(format_duration(4000.0), "1.11 hours");
    }
}
