use crate::error::ValidationError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Air traffic simulator", long_about = None)]
pub struct Args {
    /// Path to a JSON scenario file to load at startup
    #[arg(short, long, value_name = "FILE")]
    pub scenario: Option<PathBuf>,

    /// Wall-clock milliseconds between two ticks
    #[arg(long, value_name = "MS", default_value_t = 200)]
    pub tick_ms: u64,

    /// Virtual minutes that pass per wall-clock second
    #[arg(long, default_value_t = 10.0)]
    pub ratio: f64,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn clock_config(&self) -> Result<ClockConfig, ValidationError> {
        ClockConfig::new(Duration::from_millis(self.tick_ms), self.ratio)
    }
}

/// Pace of a simulation run: how often it ticks and how much virtual time one tick covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    tick_interval: Duration,
    ratio: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            tick_interval: Duration::from_millis(200),
            ratio: 10.0,
        }
    }
}

impl ClockConfig {
    pub fn new(tick_interval: Duration, ratio: f64) -> Result<ClockConfig, ValidationError> {
        if tick_interval.as_millis() == 0 {
            return Err(ValidationError::InvalidTickInterval);
        }
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ValidationError::InvalidRatio(ratio));
        }
        Ok(ClockConfig {
            tick_interval,
            ratio,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Never below one: a tick always makes progress, however low the ratio.
    pub fn minutes_per_tick(&self) -> u64 {
        let minutes = (self.tick_interval.as_secs_f64() * self.ratio).round();
        (minutes as u64).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ms: u64, ratio: f64) -> ClockConfig {
        ClockConfig::new(Duration::from_millis(ms), ratio).unwrap()
    }

    #[test]
    fn test_minutes_per_tick() {
        assert_eq!(2, ClockConfig::default().minutes_per_tick());
        assert_eq!(1, config(100, 1.0).minutes_per_tick());
        assert_eq!(3, config(1000, 2.5).minutes_per_tick());
        assert_eq!(1, config(1, 0.001).minutes_per_tick());
        assert_eq!(600, config(60_000, 10.0).minutes_per_tick());
    }

    #[test]
    fn test_rejects_bad_pace() {
        assert_eq!(
            Err(ValidationError::InvalidTickInterval),
            ClockConfig::new(Duration::ZERO, 1.0)
        );
        assert!(matches!(
            ClockConfig::new(Duration::from_millis(10), 0.0),
            Err(ValidationError::InvalidRatio(_))
        ));
        assert!(matches!(
            ClockConfig::new(Duration::from_millis(10), f64::NAN),
            Err(ValidationError::InvalidRatio(_))
        ));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["skylane"]);
        assert_eq!(None, args.scenario);
        assert_eq!(ClockConfig::default(), args.clock_config().unwrap());

        let args = Args::parse_from(["skylane", "--tick-ms", "50", "--ratio", "60", "-v"]);
        assert!(args.verbose);
        assert_eq!(3, args.clock_config().unwrap().minutes_per_tick());
    }
}
