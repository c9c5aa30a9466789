use crate::config::ClockConfig;
use crate::error::SimError;
use crate::time::Time;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

pub type TickFn = dyn FnMut(Time) -> Result<(), SimError> + Send;

struct State {
    minutes: Time,
    phase: ClockState,
    // bumped on every start so a worker left over from a previous run exits instead of ticking
    generation: u64,
    failure: Option<String>,
}

struct Shared {
    state: Mutex<State>,
    gate: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-step virtual clock driven by a dedicated thread.
///
/// Every `tick_interval` of wall-clock time the clock adds `minutes_per_tick` virtual
/// minutes and then calls the tick callback outside its lock, passing the new time.
/// A paused clock parks its thread on a condition variable and does not tick until
/// resumed or stopped. A callback that fails or panics stops the clock.
pub struct VirtualClock {
    config: ClockConfig,
    shared: Arc<Shared>,
    on_tick: Arc<Mutex<Box<TickFn>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VirtualClock {
    pub fn new(
        config: ClockConfig,
        on_tick: impl FnMut(Time) -> Result<(), SimError> + Send + 'static,
    ) -> VirtualClock {
        VirtualClock {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    minutes: Time::ZERO,
                    phase: ClockState::Stopped,
                    generation: 0,
                    failure: None,
                }),
                gate: Condvar::new(),
            }),
            on_tick: Arc::new(Mutex::new(Box::new(on_tick))),
            worker: Mutex::new(None),
        }
    }

    pub fn minutes_per_tick(&self) -> u64 {
        self.config.minutes_per_tick()
    }

    pub fn start(&self) -> Result<(), SimError> {
        let generation = {
            let mut state = self.shared.lock();
            match state.phase {
                ClockState::Running => return Err(SimError::ClockAlreadyRunning),
                ClockState::Paused => {
                    state.phase = ClockState::Running;
                    self.shared.gate.notify_all();
                    return Ok(());
                }
                ClockState::Stopped => {}
            }
            state.generation += 1;
            state.minutes = Time::ZERO;
            state.failure = None;
            state.phase = ClockState::Running;
            state.generation
        };
        self.join_worker();

        let shared = Arc::clone(&self.shared);
        let on_tick = Arc::clone(&self.on_tick);
        let config = self.config;
        let handle = thread::Builder::new()
            .name("virtual-clock".to_string())
            .spawn(move || run(shared, on_tick, config, generation))
            .map_err(|e| {
                self.shared.lock().phase = ClockState::Stopped;
                SimError::ClockSpawn(e)
            })?;
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    pub fn pause(&self) {
        let mut state = self.shared.lock();
        if state.phase == ClockState::Running {
            state.phase = ClockState::Paused;
        }
    }

    pub fn resume(&self) {
        let mut state = self.shared.lock();
        if state.phase == ClockState::Paused {
            state.phase = ClockState::Running;
            self.shared.gate.notify_all();
        }
    }

    /// Stops ticking and waits for an in-progress tick to finish.
    ///
    /// Safe to call repeatedly and from any thread, including from inside the tick
    /// callback, in which case the worker exits once the callback returns.
    pub fn stop(&self) {
        {
            let mut state = self.shared.lock();
            state.phase = ClockState::Stopped;
            self.shared.gate.notify_all();
        }
        self.join_worker();
    }

    pub fn minutes(&self) -> Time {
        self.shared.lock().minutes
    }

    pub fn state(&self) -> ClockState {
        self.shared.lock().phase
    }

    /// Why the clock stopped on its own, if a tick failed.
    pub fn failure(&self) -> Option<String> {
        self.shared.lock().failure.clone()
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("clock worker exited abnormally");
            }
        }
    }
}

impl Drop for VirtualClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: Arc<Shared>, on_tick: Arc<Mutex<Box<TickFn>>>, config: ClockConfig, generation: u64) {
    let per_tick = config.minutes_per_tick();
    debug!(generation, per_tick, "clock started");
    loop {
        let now = {
            let state = shared.lock();
            let mut state = shared
                .gate
                .wait_while(state, |s| s.generation == generation && s.phase == ClockState::Paused)
                .unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation || state.phase == ClockState::Stopped {
                break;
            }
            state.minutes += per_tick;
            state.minutes
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut callback = on_tick.lock().unwrap_or_else(PoisonError::into_inner);
            callback(now)
        }));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(reason) = failure {
            error!(minutes = now.0, %reason, "tick failed, stopping clock");
            let mut state = shared.lock();
            if state.generation == generation {
                state.phase = ClockState::Stopped;
                state.failure = Some(reason);
            }
            shared.gate.notify_all();
            break;
        }

        let state = shared.lock();
        let _ = shared
            .gate
            .wait_timeout_while(state, config.tick_interval(), |s| {
                s.generation == generation && s.phase == ClockState::Running
            })
            .unwrap_or_else(PoisonError::into_inner);
    }
    debug!(generation, "clock stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tick panicked".to_string())
}
