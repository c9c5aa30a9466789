use crate::airport::{Airport, normalize_code};
use crate::error::{SimError, ValidationError};
use crate::flight::Flight;
use crate::position::Position;
use crate::schedule::{Scenario, Schedule, check_coordinate};
use crate::time::TakeOff;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Outcome of importing a scenario; rows that failed are reported, not fatal.
#[derive(Debug, Default, PartialEq)]
pub struct ImportReport {
    pub airports: usize,
    pub flights: usize,
    pub errors: Vec<String>,
}

/// Text-facing registration used by the shell and scenario import.
///
/// Parses raw input, rejects duplicates (an airport at the same coordinates, or a flight
/// with the same route, take-off and duration) and hands valid entries to the [`Schedule`].
pub struct RegistrationService {
    schedule: Arc<Schedule>,
    // check-then-insert has to be atomic across callers
    guard: Mutex<()>,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    match value.trim() {
        "" => Err(ValidationError::MissingField(field)),
        value => Ok(value),
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ValidationError> {
    let value = required(field, value)?;
    value.parse().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl RegistrationService {
    pub fn new(schedule: Arc<Schedule>) -> RegistrationService {
        RegistrationService {
            schedule,
            guard: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.schedule
    }

    pub fn register_airport(&self, code: &str, x: &str, y: &str, name: &str) -> Result<Arc<Airport>, SimError> {
        let code = normalize_code(code)?;
        let x = check_coordinate('x', number("x coordinate", x)?)?;
        let y = check_coordinate('y', number("y coordinate", y)?)?;
        let position = Position::new(x, y);

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if self.schedule.airports().iter().any(|a| a.position == position) {
            return Err(SimError::Duplicate(format!(
                "an airport already exists at coordinates {position}"
            )));
        }
        self.schedule.add_airport(&code, name, position)
    }

    pub fn register_flight(
        &self,
        origin: &str,
        destination: &str,
        takeoff: &str,
        duration: &str,
    ) -> Result<Arc<Flight>, SimError> {
        let origin = normalize_code(required("departure airport", origin)?)?;
        let destination = normalize_code(required("destination airport", destination)?)?;
        let takeoff: TakeOff = required("take-off time", takeoff)?.parse()?;
        let duration: i64 = number("duration", duration)?;

        let _guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let duplicate = self.schedule.flights().iter().any(|f| {
            f.origin_id == origin
                && f.destination_id == destination
                && f.takeoff == takeoff
                && f.duration as i64 == duration
        });
        if duplicate {
            return Err(SimError::Duplicate(format!(
                "a flight {origin} -> {destination} at {takeoff} lasting {duration} min already exists"
            )));
        }
        self.schedule.add_flight(&origin, &destination, takeoff, duration)
    }

    /// Registers every entry of `scenario`, airports first, collecting per-row errors.
    pub fn import(&self, scenario: &Scenario) -> ImportReport {
        let mut report = ImportReport::default();
        for (i, a) in scenario.airports.iter().enumerate() {
            match self.register_airport(&a.code, &a.x.to_string(), &a.y.to_string(), &a.name) {
                Ok(_) => report.airports += 1,
                Err(e) => report.errors.push(format!("airport #{}: {e}", i + 1)),
            }
        }
        for (i, f) in scenario.flights.iter().enumerate() {
            match self.register_flight(&f.origin, &f.destination, &f.takeoff, &f.duration.to_string()) {
                Ok(_) => report.flights += 1,
                Err(e) => report.errors.push(format!("flight #{}: {e}", i + 1)),
            }
        }
        report
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, SimError> {
        let path = path.as_ref();
        let report = self.import(&Scenario::load_from_file(path)?);
        info!(
            path = %path.display(),
            airports = report.airports,
            flights = report.flights,
            "scenario loaded"
        );
        report.errors.iter().for_each(|e| warn!("skipped {e}"));
        Ok(report)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        self.schedule.scenario().save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::Listeners;
    use crate::schedule::{AirportRecord, FlightRecord};

    fn service() -> RegistrationService {
        RegistrationService::new(Arc::new(Schedule::new(Arc::new(Listeners::new()))))
    }

    #[test]
    fn test_airport_input_parsing() {
        let service = service();
        let airport = service.register_airport(" waw ", "52.1", " 20.9 ", "Warsaw").unwrap();
        assert_eq!(Position::new(52.1, 20.9), airport.position);

        assert!(matches!(
            service.register_airport("KRK", "", "1", "Krakow"),
            Err(SimError::Validation(ValidationError::MissingField("x coordinate")))
        ));
        assert!(matches!(
            service.register_airport("KRK", "1", "north", "Krakow"),
            Err(SimError::Validation(ValidationError::InvalidNumber { field: "y coordinate", .. }))
        ));
        assert!(matches!(
            service.register_airport("KRK", "52.1", "20.9", "Krakow"),
            Err(SimError::Duplicate(_))
        ));
    }

    #[test]
    fn test_flight_input_parsing_and_duplicates() {
        let service = service();
        service.register_airport("KRK", "0", "0", "").unwrap();
        service.register_airport("WAW", "10", "0", "").unwrap();

        service.register_flight("krk", "waw", "8:05", "40").unwrap();
        let dup = service.register_flight("KRK", "WAW", "08:05", "40");
        assert!(matches!(dup, Err(SimError::Duplicate(_))), "{dup:?}");
        assert!(dup.unwrap_err().is_validation());

        service.register_flight("KRK", "WAW", "08:05", "41").unwrap();
        assert!(matches!(
            service.register_flight("KRK", "WAW", "8.05", "40"),
            Err(SimError::Validation(ValidationError::InvalidTime(_)))
        ));
        assert!(matches!(
            service.register_flight("KRK", "WAW", "09:00", "-5"),
            Err(SimError::Validation(ValidationError::NonPositiveDuration(-5)))
        ));
        assert!(matches!(
            service.register_flight("", "WAW", "09:00", "5"),
            Err(SimError::Validation(ValidationError::MissingField("departure airport")))
        ));
        assert_eq!(2, service.schedule().flights().len());
    }

    #[test]
    fn test_import_collects_row_errors() {
        let service = service();
        let scenario = Scenario {
            airports: vec![
                AirportRecord { code: "KRK".into(), name: "Krakow".into(), x: 0.0, y: 0.0 },
                AirportRecord { code: "WAW".into(), name: "Warsaw".into(), x: 10.0, y: 0.0 },
                AirportRecord { code: "XX".into(), name: "Broken".into(), x: 5.0, y: 5.0 },
                AirportRecord { code: "GDN".into(), name: "Gdansk".into(), x: 0.0, y: 0.0 },
            ],
            flights: vec![
                FlightRecord { origin: "KRK".into(), destination: "WAW".into(), takeoff: "00:00".into(), duration: 30 },
                FlightRecord { origin: "KRK".into(), destination: "GDN".into(), takeoff: "00:00".into(), duration: 30 },
                FlightRecord { origin: "WAW".into(), destination: "KRK".into(), takeoff: "25:00".into(), duration: 30 },
            ],
        };

        let report = service.import(&scenario);
        assert_eq!(2, report.airports);
        assert_eq!(1, report.flights);
        assert_eq!(4, report.errors.len());
        assert!(report.errors[0].starts_with("airport #3"));
        assert!(report.errors[1].starts_with("airport #4"));
        assert!(report.errors[2].starts_with("flight #2"));
        assert!(report.errors[3].starts_with("flight #3"));
    }

    #[test]
    fn test_load_file_rejects_malformed_json() {
        let service = service();
        let path = std::env::temp_dir().join(format!("skylane-broken-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = service.load_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(SimError::Json(_))));
        assert!(matches!(service.load_file("/nonexistent/skylane.json"), Err(SimError::Io(_))));
    }
}
