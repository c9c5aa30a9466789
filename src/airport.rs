use crate::departure::DepartureQueue;
use crate::error::ValidationError;
use crate::flight::Flight;
use crate::position::Position;
use crate::time::Time;
use std::fmt;
use std::fmt::Formatter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type AirportId = Arc<str>;

/// Upper-cases and checks a three letter airport code.
pub fn normalize_code(code: &str) -> Result<AirportId, ValidationError> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(ValidationError::MissingField("airport code"));
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidCode(code));
    }
    Ok(Arc::from(code))
}

#[derive(Debug)]
pub struct Airport {
    pub id: AirportId,
    pub name: String,
    pub position: Position,
    visible: AtomicBool,
    departures: Mutex<DepartureQueue>,
}

impl Airport {
    pub fn new(id: AirportId, name: String, position: Position) -> Airport {
        Airport {
            id,
            name,
            position,
            visible: AtomicBool::new(true),
            departures: Mutex::new(DepartureQueue::new()),
        }
    }

    fn departures(&self) -> MutexGuard<'_, DepartureQueue> {
        self.departures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_flight(&self, flight: Arc<Flight>) {
        self.departures().push(flight);
    }

    /// Departure admission for this airport at virtual time `now`.
    pub fn send_airplane(&self, now: Time) -> Option<Arc<Flight>> {
        self.departures().send(now)
    }

    pub fn reset(&self) {
        self.departures().reset();
    }

    pub fn pending(&self) -> usize {
        self.departures().len()
    }

    pub fn scheduled(&self) -> usize {
        self.departures().scheduled()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }
}

impl fmt::Display for Airport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.id, self.name, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TakeOff;
    use std::thread;

    #[test]
    fn test_normalize_code() {
        assert_eq!(Ok("KRK"), normalize_code(" krk ").as_deref());
        assert_eq!(Err(ValidationError::MissingField("airport code")), normalize_code("  "));
        assert!(matches!(normalize_code("KR"), Err(ValidationError::InvalidCode(_))));
        assert!(matches!(normalize_code("KRK1"), Err(ValidationError::InvalidCode(_))));
        assert!(matches!(normalize_code("K1K"), Err(ValidationError::InvalidCode(_))));
    }

    #[test]
    fn test_concurrent_registration_and_admission() {
        let airport = Arc::new(Airport::new(Arc::from("KRK"), "Krakow".into(), Position::new(0.0, 0.0)));
        let writers = (0..4)
            .map(|w| {
                let airport = Arc::clone(&airport);
                thread::spawn(move || {
                    for i in 0..25 {
                        airport.add_flight(Arc::new(Flight {
                            id: Arc::from(format!("FL{w}_{i}")),
                            origin_id: Arc::from("KRK"),
                            destination_id: Arc::from("WAW"),
                            takeoff: TakeOff::new(0, 0).unwrap(),
                            duration: 10,
                            origin: Position::new(0.0, 0.0),
                            destination: Position::new(1.0, 0.0),
                        }));
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut sent = 0;
        let mut now = Time(0);
        while sent < 100 {
            if airport.send_airplane(now).is_some() {
                sent += 1;
            }
            now += 10;
            if now > Time(100_000) {
                break;
            }
        }
        writers.into_iter().for_each(|w| w.join().unwrap());

        assert_eq!(100, sent + airport.pending());
        assert_eq!(100, airport.scheduled());
    }
}
