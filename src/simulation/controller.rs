use crate::airport::AirportId;
use crate::clock::{ClockState, VirtualClock};
use crate::config::ClockConfig;
use crate::error::SimError;
use crate::flight::FlightMotion;
use crate::listener::Listeners;
use crate::schedule::Schedule;
use crate::simulation::snapshot::{AirportView, FlightView, Scene};
use crate::time::Time;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Paused,
    // clock handed off, teardown not finished yet
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Paused,
    /// A tick failed; the clock stopped itself and the run waits for `stop`.
    Failed(String),
}

struct Run {
    phase: Phase,
    clock: Option<VirtualClock>,
}

/// State touched by the tick thread.
struct Engine {
    schedule: Arc<Schedule>,
    listeners: Arc<Listeners>,
    // mutated only by `tick` and `teardown`
    active: Mutex<Vec<FlightMotion>>,
    published: RwLock<Arc<[FlightView]>>,
}

impl Engine {
    fn active(&self) -> MutexGuard<'_, Vec<FlightMotion>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, now: Time) -> Result<(), SimError> {
        {
            let mut active = self.active();
            for airport in self.schedule.airports() {
                if let Some(flight) = airport.send_airplane(now) {
                    if flight.origin_id != airport.id {
                        return Err(SimError::TickFailed(format!(
                            "flight {} queued at {} but departs from {}",
                            flight.id, airport.id, flight.origin_id
                        )));
                    }
                    debug!(flight = %flight.id, route = %flight, minutes = now.0, "departed");
                    let mut motion = FlightMotion::new(flight);
                    motion.activate(now);
                    active.push(motion);
                }
            }

            active.iter_mut().for_each(|m| m.advance(now));
            active.retain(|m| {
                if !m.is_in_flight() {
                    debug!(flight = %m.flight().id, minutes = now.0, "arrived");
                }
                m.is_in_flight()
            });

            self.assert_invariants(&active);
            self.publish(&active);
        }
        self.listeners.notify();
        Ok(())
    }

    fn publish(&self, active: &[FlightMotion]) {
        let visibility = self
            .schedule
            .airports()
            .iter()
            .map(|a| (a.id.clone(), a.is_visible()))
            .collect::<HashMap<_, _>>();
        let visible = |code: &AirportId| visibility.get(code).copied().unwrap_or(false);
        let views = active
            .iter()
            .map(|m| {
                let flight = m.flight();
                FlightView::of(m, visible(&flight.origin_id) && visible(&flight.destination_id))
            })
            .collect::<Arc<[FlightView]>>();
        *self.published.write().unwrap_or_else(PoisonError::into_inner) = views;
    }

    /// Grounds every airborne flight and refills the departure queues.
    fn teardown(&self) {
        let mut active = self.active();
        for motion in active.iter_mut() {
            debug!(flight = %motion.flight().id, "returned to origin");
            motion.restore();
        }
        active.clear();
        self.schedule.reset();
        self.publish(&active);
    }

    fn snapshot(&self) -> Arc<[FlightView]> {
        self.published.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self, active: &[FlightMotion]) {
        debug_assert!(
            active.iter().all(|m| m.is_in_flight()),
            "Arrived flight left in active set"
        );
        let mut ids = active.iter().map(|m| &m.flight().id).collect::<Vec<_>>();
        ids.sort();
        debug_assert!(
            ids.windows(2).all(|w| w[0] != w[1]),
            "Flight active twice"
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_invariants(&self, _active: &[FlightMotion]) {}
}

/// Owner of a simulation run.
///
/// `start` spins up a fresh [`VirtualClock`] whose ticks release due flights from every
/// airport, move airborne flights and retire the ones that arrived. `stop` tears the run
/// down so that the next `start` replays the same schedule from virtual minute zero.
/// Renderers read [`active_flights`](Simulation::active_flights) or
/// [`scene`](Simulation::scene), which never expose the live flight set.
pub struct Simulation {
    config: ClockConfig,
    engine: Arc<Engine>,
    run: Mutex<Run>,
}

impl Simulation {
    pub fn new(schedule: Arc<Schedule>, listeners: Arc<Listeners>, config: ClockConfig) -> Simulation {
        Simulation {
            config,
            engine: Arc::new(Engine {
                schedule,
                listeners,
                active: Mutex::new(Vec::new()),
                published: RwLock::new(Arc::from(Vec::new())),
            }),
            run: Mutex::new(Run {
                phase: Phase::Idle,
                clock: None,
            }),
        }
    }

    fn run(&self) -> MutexGuard<'_, Run> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.engine.schedule
    }

    pub fn listeners(&self) -> &Arc<Listeners> {
        &self.engine.listeners
    }

    pub fn start(&self) -> Result<(), SimError> {
        let mut run = self.run();
        if run.phase != Phase::Idle {
            return Ok(());
        }
        {
            let mut active = self.engine.active();
            active.clear();
            self.engine.publish(&active);
        }

        let engine = Arc::clone(&self.engine);
        let clock = VirtualClock::new(self.config, move |now| engine.tick(now));
        clock.start()?;
        info!(
            tick_ms = self.config.tick_interval().as_millis() as u64,
            minutes_per_tick = clock.minutes_per_tick(),
            "simulation started"
        );
        run.clock = Some(clock);
        run.phase = Phase::Running;
        Ok(())
    }

    /// Pauses a running simulation or resumes a paused one; ignored while idle.
    pub fn pause_toggle(&self) -> bool {
        let mut guard = self.run();
        let run = &mut *guard;
        let Some(clock) = run.clock.as_ref() else {
            return false;
        };
        match run.phase {
            Phase::Running => {
                clock.pause();
                run.phase = Phase::Paused;
                info!(minutes = clock.minutes().0, "simulation paused");
            }
            Phase::Paused => {
                clock.resume();
                run.phase = Phase::Running;
                info!(minutes = clock.minutes().0, "simulation resumed");
            }
            Phase::Idle | Phase::Stopping => {}
        }
        run.phase == Phase::Paused
    }

    /// Ends the run and resets every airport to its original schedule.
    ///
    /// Waits for a tick in progress before touching any state. Does nothing unless a run
    /// is active, so concurrent or repeated calls are harmless.
    pub fn stop(&self) {
        let clock = {
            let mut run = self.run();
            if !matches!(run.phase, Phase::Running | Phase::Paused) {
                return;
            }
            run.phase = Phase::Stopping;
            run.clock.take()
        };
        let minutes = clock.as_ref().map_or(Time::ZERO, |c| c.minutes());
        if let Some(clock) = clock {
            clock.stop();
        }

        {
            let mut run = self.run();
            self.engine.teardown();
            run.phase = Phase::Idle;
        }
        info!(minutes = minutes.0, "simulation stopped");
        self.engine.listeners.notify();
    }

    pub fn is_running(&self) -> bool {
        matches!(self.run().phase, Phase::Running | Phase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.run().phase == Phase::Paused
    }

    pub fn status(&self) -> RunStatus {
        let run = self.run();
        match (run.phase, run.clock.as_ref()) {
            (Phase::Running | Phase::Paused, Some(clock)) if clock.state() == ClockState::Stopped => {
                RunStatus::Failed(clock.failure().unwrap_or_default())
            }
            (Phase::Running, _) => RunStatus::Running,
            (Phase::Paused, _) => RunStatus::Paused,
            (Phase::Idle | Phase::Stopping, _) => RunStatus::Idle,
        }
    }

    pub fn minutes(&self) -> Time {
        self.run().clock.as_ref().map_or(Time::ZERO, |c| c.minutes())
    }

    /// Immutable copy of the airborne flights as of the last completed tick.
    pub fn active_flights(&self) -> Arc<[FlightView]> {
        self.engine.snapshot()
    }

    pub fn airports(&self) -> Vec<AirportView> {
        self.engine
            .schedule
            .airports()
            .iter()
            .map(|a| AirportView::from(a.as_ref()))
            .collect()
    }

    pub fn scene(&self) -> Scene {
        Scene {
            minutes: self.minutes(),
            airports: self.airports(),
            flights: self.active_flights(),
        }
    }

    /// Shows or hides an airport; flights touching a hidden airport are not drawn.
    pub fn set_airport_visible(&self, code: &str, visible: bool) -> Result<(), SimError> {
        self.engine.schedule.set_airport_visible(code, visible)?;
        {
            let active = self.engine.active();
            self.engine.publish(&active);
        }
        self.engine.listeners.notify();
        Ok(())
    }

    /// Runs one tick at `now` on the caller's thread, bypassing the clock.
    #[cfg(test)]
    pub(crate) fn tick_at(&self, now: Time) -> Result<(), SimError> {
        self.engine.tick(now)
    }

    #[cfg(test)]
    pub(crate) fn reset(&self) {
        self.engine.teardown();
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop();
    }
}
