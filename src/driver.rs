use std::path::Path;

use crate::{
    event::ScheduledEvent,
    scheduler::{Counters, ScheduleError, Scheduler, SchedulerConfig},
    simulation::{Action, Simulation},
    time::Time,
};

#[derive(
    Debug, Clone, Default, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize,
)]
#[serde(default)]
pub struct Config {
    #[builder(default)]
    pub scheduler: SchedulerConfig,

    /// Events scheduled after this time are left pending.
    #[builder(default, setter(into, strip_option))]
    pub timeout: Option<Time>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Time of the last fired event, or `Time::MIN` if nothing fired.
    pub end_time: Time,
    /// Number of actions fired.
    pub fired: u64,
    /// Scheduler counters at the end of the run.
    pub counters: Counters,
}

/// Schedules every `(event, time)` pair in `seed` and runs the simulation to completion.
pub fn run<A: Action>(
    cfg: Config,
    seed: impl IntoIterator<Item = (ScheduledEvent<A>, Time)>,
) -> Result<Report, Error> {
    let mut scheduler = Scheduler::with_config(cfg.scheduler);
    for (event, time) in seed {
        scheduler.insert(&event, time)?;
    }
    let sim = Simulation::builder()
        .scheduler(scheduler)
        .timeout(cfg.timeout)
        .build();
    sim.run()
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("scheduling error")]
    Schedule(#[from] ScheduleError),

    #[error("event at {time} popped after simulated time reached {now}")]
    Causality { now: Time, time: Time },

    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}
