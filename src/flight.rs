use crate::airport::AirportId;
use crate::position::Position;
use crate::time::{TakeOff, Time};
use std::fmt;
use std::sync::Arc;
use tabled::Tabled;

pub type FlightId = Arc<str>;

/// A registered flight. Immutable once scheduled; the moving part lives in [`FlightMotion`].
#[derive(Clone, Debug, PartialEq, Tabled)]
pub struct Flight {
    pub id: FlightId,
    pub origin_id: AirportId,
    pub destination_id: AirportId,
    pub takeoff: TakeOff,
    pub duration: u64,
    #[tabled(skip)]
    pub origin: Position,
    #[tabled(skip)]
    pub destination: Position,
}

impl Flight {
    pub fn departure_time(&self) -> Time {
        self.takeoff.as_time()
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} -> {}] {} | {} min",
            self.origin_id, self.destination_id, self.takeoff, self.duration
        )
    }
}

/// In-flight state of one departed flight.
///
/// Parked at the origin until [`activate`](FlightMotion::activate), then moved by a fixed
/// per-minute velocity on every [`advance`](FlightMotion::advance). Arrival snaps the
/// position onto the destination so incremental steps never leave residual drift.
#[derive(Clone, Debug)]
pub struct FlightMotion {
    flight: Arc<Flight>,
    started_at: Option<Time>,
    last_update: Time,
    position: Position,
    velocity: Position,
    in_flight: bool,
}

impl FlightMotion {
    pub fn new(flight: Arc<Flight>) -> FlightMotion {
        let position = flight.origin;
        FlightMotion {
            flight,
            started_at: None,
            last_update: Time::ZERO,
            position,
            velocity: Position::default(),
            in_flight: false,
        }
    }

    pub fn flight(&self) -> &Arc<Flight> {
        &self.flight
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn started_at(&self) -> Option<Time> {
        self.started_at
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn activate(&mut self, now: Time) {
        self.started_at = Some(now);
        self.last_update = now;
        self.position = self.flight.origin;
        self.velocity = if self.flight.duration > 0 {
            (self.flight.destination - self.flight.origin) / self.flight.duration as f64
        } else {
            Position::default()
        };
        self.in_flight = true;
    }

    pub fn advance(&mut self, now: Time) {
        if !self.in_flight || now <= self.last_update {
            return;
        }
        let delta = now - self.last_update;
        self.position += self.velocity * delta as f64;
        self.last_update = now;

        let elapsed = self.started_at.map_or(0, |start| now.since(start));
        if elapsed >= self.flight.duration {
            self.position = self.flight.destination;
            self.in_flight = false;
        }
    }

    /// Puts the flight back on the ground at its origin, as if it never departed.
    pub fn restore(&mut self) {
        self.position = self.flight.origin;
        self.velocity = Position::default();
        self.started_at = None;
        self.last_update = Time::ZERO;
        self.in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(origin: Position, destination: Position, duration: u64) -> Arc<Flight> {
        Arc::new(Flight {
            id: Arc::from("FL001"),
            origin_id: Arc::from("KRK"),
            destination_id: Arc::from("WAW"),
            takeoff: TakeOff::new(0, 0).unwrap(),
            duration,
            origin,
            destination,
        })
    }

    #[test]
    fn test_parked_at_origin_until_activated() {
        let mut motion = FlightMotion::new(flight(Position::new(1.0, 2.0), Position::new(4.0, 6.0), 30));
        motion.advance(Time(50));
        assert!(!motion.is_in_flight());
        assert_eq!(Position::new(1.0, 2.0), motion.position());
    }

    #[test]
    fn test_linear_interpolation() {
        let mut motion = FlightMotion::new(flight(Position::new(0.0, 0.0), Position::new(30.0, -60.0), 30));
        motion.activate(Time(5));
        assert_eq!(Position::new(0.0, 0.0), motion.position());

        motion.advance(Time(15));
        assert!(motion.is_in_flight());
        assert!((motion.position().x - 10.0).abs() < 1e-9);
        assert!((motion.position().y + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_and_stale_advance_is_noop() {
        let mut motion = FlightMotion::new(flight(Position::new(0.0, 0.0), Position::new(30.0, 0.0), 30));
        motion.activate(Time(10));
        motion.advance(Time(20));
        let at = motion.position();
        motion.advance(Time(20));
        motion.advance(Time(15));
        assert_eq!(at, motion.position());
    }

    #[test]
    fn test_arrival_snaps_to_destination() {
        let destination = Position::new(0.1, 0.7);
        let mut motion = FlightMotion::new(flight(Position::new(0.3, 0.2), destination, 7));
        motion.activate(Time(0));
        for now in (3..=9).step_by(3) {
            motion.advance(Time(now));
        }
        assert!(!motion.is_in_flight());
        assert_eq!(destination, motion.position());
    }

    #[test]
    fn test_coarse_tick_overshoot_still_arrives() {
        let mut motion = FlightMotion::new(flight(Position::new(0.0, 0.0), Position::new(10.0, 10.0), 10));
        motion.activate(Time(0));
        motion.advance(Time(25));
        assert!(!motion.is_in_flight());
        assert_eq!(Position::new(10.0, 10.0), motion.position());
    }

    #[test]
    fn test_restore_returns_to_origin() {
        let mut motion = FlightMotion::new(flight(Position::new(1.0, 1.0), Position::new(5.0, 5.0), 20));
        motion.activate(Time(0));
        motion.advance(Time(10));
        motion.restore();
        assert!(!motion.is_in_flight());
        assert_eq!(None, motion.started_at());
        assert_eq!(Position::new(1.0, 1.0), motion.position());

        motion.activate(Time(100));
        motion.advance(Time(110));
        assert!((motion.position().x - 3.0).abs() < 1e-9);
    }
}
