use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Simulation time in virtual minutes since the run started.
#[derive(Debug, Clone, Copy, Default, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    /// Minutes elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(self, earlier: Time) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / 1440;
        let remaining = self.0 % 1440;
        let hours = remaining / 60;
        let mins = remaining % 60;
        write!(f, "DAY{} {:02}:{:02}", days + 1, hours, mins)
    }
}

impl Add<u64> for Time {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Time(self.0 + rhs)
    }
}

impl Sub<Time> for Time {
    type Output = u64;

    fn sub(self, rhs: Time) -> Self::Output {
        self.0 - rhs.0
    }
}

impl AddAssign<u64> for Time {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Scheduled take-off as a wall time of day, `HH:MM`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TakeOff {
    hours: u8,
    minutes: u8,
}

impl TakeOff {
    pub fn new(hours: u8, minutes: u8) -> Result<TakeOff, ValidationError> {
        if hours > 23 || minutes > 59 {
            return Err(ValidationError::InvalidTime(format!("{hours}:{minutes}")));
        }
        Ok(TakeOff { hours, minutes })
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    /// Virtual minute at which the flight becomes due, counted from 00:00.
    pub fn as_time(&self) -> Time {
        Time(self.hours as u64 * 60 + self.minutes as u64)
    }
}

impl FromStr for TakeOff {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (hh, mm) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hours = hh.trim().parse::<u8>().map_err(|_| invalid())?;
        let minutes = mm.trim().parse::<u8>().map_err(|_| invalid())?;
        TakeOff::new(hours, minutes).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TakeOff {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TakeOff> for String {
    fn from(value: TakeOff) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TakeOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}
