use thiserror::Error;

/// Rejected registration or configuration input. Never fatal to a running simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("airport code must be exactly 3 letters (A-Z), got {0:?}")]
    InvalidCode(String),
    #[error("{axis} coordinate must be in range -90..90, got {value}")]
    CoordinateOutOfRange { axis: char, value: f64 },
    #[error("take-off time must be HH:MM between 00:00 and 23:59, got {0:?}")]
    InvalidTime(String),
    #[error("flight duration must be a positive number of minutes, got {0}")]
    NonPositiveDuration(i64),
    #[error("departure and destination airports must be different ({0})")]
    SameAirport(String),
    #[error("airport {0} does not exist")]
    UnknownAirport(String),
    #[error("tick interval must be at least 1 ms")]
    InvalidTickInterval,
    #[error("time ratio must be a finite number above zero, got {0}")]
    InvalidRatio(f64),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("clock is already running")]
    ClockAlreadyRunning,
    #[error("failed to spawn clock thread: {0}")]
    ClockSpawn(#[source] std::io::Error),
    #[error("tick failed: {0}")]
    TickFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SimError::Validation(_) | SimError::Duplicate(_))
    }
}
