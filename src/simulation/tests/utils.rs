use crate::config::ClockConfig;
use crate::flight::FlightId;
use crate::listener::Listeners;
use crate::position::Position;
use crate::schedule::Schedule;
use crate::simulation::{FlightView, Simulation};
use crate::time::Time;
use proptest::prelude::Strategy;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub fn simulation() -> Simulation {
    let listeners = Arc::new(Listeners::new());
    let schedule = Arc::new(Schedule::new(Arc::clone(&listeners)));
    let config = ClockConfig::new(Duration::from_millis(5), 1000.0).unwrap();
    Simulation::new(schedule, listeners, config)
}

pub fn add_airport(sim: &Simulation, code: &str, x: f64, y: f64) {
    sim.schedule()
        .add_airport(code, "", Position::new(x, y))
        .unwrap();
}

pub fn add_flight(sim: &Simulation, origin: &str, destination: &str, takeoff: &str, duration: i64) -> FlightId {
    sim.schedule()
        .add_flight(origin, destination, takeoff.parse().unwrap(), duration)
        .unwrap()
        .id
        .clone()
}

pub fn active(sim: &Simulation, id: &FlightId) -> Option<FlightView> {
    sim.active_flights().iter().find(|f| f.id == *id).cloned()
}

pub fn departure(id: &FlightId, origin: &str, at: u64) -> (FlightId, Arc<str>, Time) {
    (id.clone(), Arc::from(origin), Time(at))
}

/// Ticks from `from` to `to` inclusive in steps of `step`, returning every departure
/// as (flight, origin, departed) in the order observed.
pub fn run_ticks(sim: &Simulation, from: u64, to: u64, step: u64) -> Vec<(FlightId, Arc<str>, Time)> {
    let mut departures: Vec<(FlightId, Arc<str>, Time)> = vec![];
    let mut now = from;
    while now <= to {
        sim.tick_at(Time(now)).unwrap();
        for view in sim.active_flights().iter() {
            if !departures.iter().any(|(id, _, _)| *id == view.id) {
                departures.push((view.id.clone(), view.origin.clone(), view.departed));
            }
        }
        now += step;
    }
    departures
}

pub fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

pub fn arb_code() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(vec!["KRK", "WAW", "GDN"])
}
