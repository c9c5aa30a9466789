use crate::airport::{Airport, AirportId, normalize_code};
use crate::error::{SimError, ValidationError};
use crate::flight::{Flight, FlightId};
use crate::listener::Listeners;
use crate::position::Position;
use crate::time::TakeOff;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

pub const COORDINATE_LIMIT: f64 = 90.0;

pub fn check_coordinate(axis: char, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() || value.abs() > COORDINATE_LIMIT {
        return Err(ValidationError::CoordinateOutOfRange { axis, value });
    }
    Ok(value)
}

/// Registered airports and flights.
///
/// Airports are kept ordered by code, which is also the order in which the simulation
/// polls them for departures. Every flight is queued at its origin when registered.
pub struct Schedule {
    airports: RwLock<BTreeMap<AirportId, Arc<Airport>>>,
    flights: RwLock<Vec<Arc<Flight>>>,
    next_flight: AtomicU64,
    listeners: Arc<Listeners>,
}

impl Schedule {
    pub fn new(listeners: Arc<Listeners>) -> Schedule {
        Schedule {
            airports: RwLock::new(BTreeMap::new()),
            flights: RwLock::new(Vec::new()),
            next_flight: AtomicU64::new(1),
            listeners,
        }
    }

    pub fn add_airport(&self, code: &str, name: &str, position: Position) -> Result<Arc<Airport>, SimError> {
        let id = normalize_code(code)?;
        let position = Position::new(check_coordinate('x', position.x)?, check_coordinate('y', position.y)?);
        let name = match name.trim() {
            "" => id.to_string(),
            name => name.to_string(),
        };

        let airport = {
            let mut airports = self.airports.write().unwrap_or_else(PoisonError::into_inner);
            if airports.contains_key(&id) {
                return Err(SimError::Duplicate(format!("airport with code {id} already exists")));
            }
            let airport = Arc::new(Airport::new(id.clone(), name, position));
            airports.insert(id, Arc::clone(&airport));
            airport
        };
        debug!(airport = %airport, "airport registered");
        self.listeners.notify();
        Ok(airport)
    }

    pub fn add_flight(
        &self,
        origin: &str,
        destination: &str,
        takeoff: TakeOff,
        duration: i64,
    ) -> Result<Arc<Flight>, SimError> {
        let from = self.lookup(origin)?;
        let to = self.lookup(destination)?;
        if from.id == to.id {
            return Err(ValidationError::SameAirport(from.id.to_string()).into());
        }
        if duration <= 0 {
            return Err(ValidationError::NonPositiveDuration(duration).into());
        }

        let flight = {
            let mut flights = self.flights.write().unwrap_or_else(PoisonError::into_inner);
            let seq = self.next_flight.fetch_add(1, Ordering::Relaxed);
            let flight = Arc::new(Flight {
                id: FlightId::from(format!("FL{seq:03}")),
                origin_id: from.id.clone(),
                destination_id: to.id.clone(),
                takeoff,
                duration: duration as u64,
                origin: from.position,
                destination: to.position,
            });
            flights.push(Arc::clone(&flight));
            from.add_flight(Arc::clone(&flight));
            flight
        };
        debug!(flight = %flight.id, route = %flight, "flight scheduled");
        self.listeners.notify();
        Ok(flight)
    }

    fn lookup(&self, code: &str) -> Result<Arc<Airport>, ValidationError> {
        let id = normalize_code(code)?;
        self.airport(&id)
            .ok_or_else(|| ValidationError::UnknownAirport(id.to_string()))
    }

    pub fn airport(&self, code: &str) -> Option<Arc<Airport>> {
        let code = code.trim().to_ascii_uppercase();
        self.airports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code.as_str())
            .cloned()
    }

    pub fn airports(&self) -> Vec<Arc<Airport>> {
        self.airports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn flights(&self) -> Vec<Arc<Flight>> {
        self.flights.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_airport_visible(&self, code: &str, visible: bool) -> Result<(), SimError> {
        let airport = self.lookup(code)?;
        airport.set_visible(visible);
        Ok(())
    }

    /// Puts every airport's departure queue back to its full original schedule.
    pub fn reset(&self) {
        self.airports().iter().for_each(|a| a.reset());
    }

    pub fn scenario(&self) -> Scenario {
        Scenario {
            airports: self
                .airports()
                .iter()
                .map(|a| AirportRecord {
                    code: a.id.clone(),
                    name: a.name.clone(),
                    x: a.position.x,
                    y: a.position.y,
                })
                .collect(),
            flights: self
                .flights()
                .iter()
                .map(|f| FlightRecord {
                    origin: f.origin_id.clone(),
                    destination: f.destination_id.clone(),
                    takeoff: f.takeoff.to_string(),
                    duration: f.duration as i64,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub code: Arc<str>,
    #[serde(default)]
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// Flight as written in a scenario file; kept textual so that a bad row can be
/// reported on its own instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub origin: Arc<str>,
    pub destination: Arc<str>,
    pub takeoff: String,
    pub duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub airports: Vec<AirportRecord>,
    #[serde(default)]
    pub flights: Vec<FlightRecord>,
}

impl Scenario {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Scenario, SimError> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }
}
