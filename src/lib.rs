pub mod driver;
pub mod event;
pub mod scheduler;
pub mod simulation;
pub mod time;

pub use driver::{Config, Error, Report};
pub use event::ScheduledEvent;
pub use scheduler::{CancelStrategy, Counters, ScheduleError, Scheduler, SchedulerConfig};
pub use simulation::{Action, Context, Request, Requests};
pub use time::{Delta, Time};
