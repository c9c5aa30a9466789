use crate::airport::{Airport, AirportId};
use crate::flight::{FlightId, FlightMotion};
use crate::position::Position;
use crate::time::{TakeOff, Time};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

/// Point-in-time copy of one airborne flight, safe to hold on any thread.
#[derive(Clone, Debug, PartialEq, Serialize, Tabled)]
pub struct FlightView {
    pub id: FlightId,
    pub origin: AirportId,
    pub destination: AirportId,
    pub takeoff: TakeOff,
    pub duration: u64,
    pub departed: Time,
    pub position: Position,
    pub visible: bool,
}

impl FlightView {
    pub(crate) fn of(motion: &FlightMotion, visible: bool) -> FlightView {
        let flight = motion.flight();
        FlightView {
            id: flight.id.clone(),
            origin: flight.origin_id.clone(),
            destination: flight.destination_id.clone(),
            takeoff: flight.takeoff,
            duration: flight.duration,
            departed: motion.started_at().unwrap_or_default(),
            position: motion.position(),
            visible,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Tabled)]
pub struct AirportView {
    pub code: AirportId,
    pub name: String,
    pub position: Position,
    pub visible: bool,
    pub pending: usize,
    pub scheduled: usize,
}

impl From<&Airport> for AirportView {
    fn from(airport: &Airport) -> Self {
        AirportView {
            code: airport.id.clone(),
            name: airport.name.clone(),
            position: airport.position,
            visible: airport.is_visible(),
            pending: airport.pending(),
            scheduled: airport.scheduled(),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, Serialize)]
pub struct Scene {
    pub minutes: Time,
    pub airports: Vec<AirportView>,
    pub flights: Arc<[FlightView]>,
}
