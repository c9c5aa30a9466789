pub mod controller;
pub mod snapshot;


pub use controller::{RunStatus, Simulation};
pub use snapshot::{AirportView, FlightView, Scene};
