use smallvec::SmallVec;
use tracing::{debug, info};

use crate::{
    driver::{Error, Report},
    event::ScheduledEvent,
    scheduler::Scheduler,
    time::{Delta, Time},
};

// Most actions will not yield very many requests
pub type Requests<A> = SmallVec<[Request<A>; 4]>;

/// The payload of a scheduled event.
pub trait Action: Sized {
    /// Runs the action for `event`, which has just been popped and may be scheduled again.
    #[must_use]
    fn fire(&self, event: &ScheduledEvent<Self>, ctx: Context<Self>) -> Requests<Self>;
}

/// A change to the schedule requested by a firing action.
#[derive(Debug, Clone, derive_new::new)]
pub enum Request<A> {
    Insert { event: ScheduledEvent<A>, time: Time },
    Cancel(ScheduledEvent<A>),
}

#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Simulation<A: Action> {
    // Run-time
    #[builder(default = Time::MIN, setter(skip))]
    cur_time: Time,
    #[builder(default, setter(skip))]
    fired: u64,
    scheduler: Scheduler<A>,

    // Used for termination
    #[builder(default)]
    timeout: Option<Time>,
}

impl<A: Action> Simulation<A> {
    pub fn run(mut self) -> Result<Report, Error> {
        info!(pending = self.scheduler.len(), timeout = ?self.timeout, "simulation start");
        while !self.should_stop() {
            self.step()?;
        }
        let report = self.finish();
        info!(end = %report.end_time, fired = report.fired, "simulation done");
        Ok(report)
    }

    fn step(&mut self) -> Result<(), Error> {
        let Some(event) = self.scheduler.pop_next() else {
            return Ok(());
        };

        let time = event.time();
        if time < self.cur_time {
            return Err(Error::Causality {
                now: self.cur_time,
                time,
            });
        }
        self.cur_time = time;
        self.fired += 1;

        let requests = event.action().fire(&event, self.context());
        debug!(%time, requests = requests.len(), "fired");
        for req in requests.into_iter() {
            self.apply(req)?;
        }
        Ok(())
    }

    fn apply(&mut self, req: Request<A>) -> Result<(), Error> {
        match req {
            Request::Insert { event, time } => self.scheduler.insert(&event, time)?,
            Request::Cancel(event) => {
                self.scheduler.cancel(&event);
            }
        }
        Ok(())
    }

    // Stale entries at the front are dropped here, so an exhausted queue stops the run
    fn should_stop(&mut self) -> bool {
        let timeout = self.timeout.unwrap_or(Time::MAX);
        match self.scheduler.peek_next() {
            Some(next) => next.time() > timeout,
            None => true,
        }
    }

    fn context(&self) -> Context<A> {
        Context {
            cur_time: self.cur_time,
            requests: Requests::new(),
        }
    }

    fn finish(self) -> Report {
        Report {
            end_time: self.cur_time,
            fired: self.fired,
            counters: self.scheduler.counters(),
        }
    }
}

#[derive(Debug)]
pub struct Context<A> {
    pub cur_time: Time,
    requests: Requests<A>,
}

impl<A> Context<A> {
    pub fn schedule(&mut self, event: &ScheduledEvent<A>, delta: Delta) {
        let time = self.cur_time.saturating_add(delta);
        self.schedule_at(event, time);
    }

    pub fn schedule_now(&mut self, event: &ScheduledEvent<A>) {
        self.schedule(event, Delta::ZERO);
    }

    pub fn schedule_at(&mut self, event: &ScheduledEvent<A>, time: Time) {
        self.requests.push(Request::new_insert(event.clone(), time));
    }

    pub fn cancel(&mut self, event: &ScheduledEvent<A>) {
        self.requests.push(Request::new_cancel(event.clone()));
    }

    pub fn into_requests(self) -> Requests<A> {
        self.requests
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use crate::scheduler::ScheduleError;

    use super::*;

    type Log = Rc<RefCell<Vec<(Time, &'static str)>>>;

    #[derive(Debug)]
    enum Job {
        Tick { period: Delta, log: Log },
        Kick { target: ScheduledEvent<Job>, log: Log },
        Bark { log: Log },
        Rewind,
        Steal { target: ScheduledEvent<Job> },
    }

    impl Action for Job {
        fn fire(&self, event: &ScheduledEvent<Self>, mut ctx: Context<Self>) -> Requests<Self> {
            match self {
                Job::Tick { period, log } => {
                    log.borrow_mut().push((ctx.cur_time, "tick"));
                    ctx.schedule(event, *period);
                }
                Job::Kick { target, log } => {
                    log.borrow_mut().push((ctx.cur_time, "kick"));
                    ctx.cancel(target);
                }
                Job::Bark { log } => log.borrow_mut().push((ctx.cur_time, "bark")),
                Job::Rewind => ctx.schedule_at(event, ctx.cur_time - Delta::ONE),
                Job::Steal { target } => ctx.schedule_now(target),
            }
            ctx.into_requests()
        }
    }

    fn simulate(
        seed: &[(&ScheduledEvent<Job>, i64)],
        timeout: Option<Time>,
    ) -> Result<Report, Error> {
        let mut scheduler = Scheduler::new();
        for &(event, t) in seed {
            scheduler.insert(event, Time::new(t))?;
        }
        Simulation::builder()
            .scheduler(scheduler)
            .timeout(timeout)
            .build()
            .run()
    }

    #[test]
    fn periodic_timer_stops_at_timeout() -> anyhow::Result<()> {
        let log = Log::default();
        let tick = ScheduledEvent::new(Job::Tick {
            period: Delta::new(10),
            log: log.clone(),
        });
        let report = simulate(&[(&tick, 0)], Some(Time::new(25)))?;

        let times: Vec<_> = log.borrow().iter().map(|&(t, _)| t.into_i64()).collect();
        assert_eq!(times, [0, 10, 20]);
        assert_eq!(report.end_time, Time::new(20));
        assert_eq!(report.fired, 3);
        assert_eq!(report.counters.inserts, 4);
        assert_eq!(report.counters.pops, 3);
        // The next tick is still pending when the run stops
        assert!(tick.is_valid());
        assert_eq!(tick.time(), Time::new(30));
        Ok(())
    }

    #[test]
    fn action_cancels_another_event() -> anyhow::Result<()> {
        let log = Log::default();
        let bark = ScheduledEvent::new(Job::Bark { log: log.clone() });
        let kick = ScheduledEvent::new(Job::Kick {
            target: bark.clone(),
            log: log.clone(),
        });
        let report = simulate(&[(&bark, 15), (&kick, 5)], None)?;

        assert_eq!(*log.borrow(), [(Time::new(5), "kick")]);
        assert_eq!(report.fired, 1);
        assert_eq!(report.counters.removals, 1);
        assert!(!bark.is_present());
        Ok(())
    }

    #[test]
    fn scheduling_into_the_past_fails() {
        let rewind = ScheduledEvent::new(Job::Rewind);
        let err = simulate(&[(&rewind, 3)], None).unwrap_err();
        assert!(matches!(
            err,
            Error::Causality { now, time } if now == Time::new(3) && time == Time::new(2)
        ));
    }

    #[test]
    fn rescheduling_a_pending_event_fails() {
        let log = Log::default();
        let bark = ScheduledEvent::new(Job::Bark { log });
        let steal = ScheduledEvent::new(Job::Steal {
            target: bark.clone(),
        });
        let err = simulate(&[(&steal, 1), (&bark, 9)], None).unwrap_err();
        assert!(matches!(
            err,
            Error::Schedule(ScheduleError::InvalidState { time }) if time == Time::new(9)
        ));
    }

    #[test]
    fn negative_times_are_delivered() -> anyhow::Result<()> {
        let log = Log::default();
        let bark = ScheduledEvent::new(Job::Bark { log: log.clone() });
        let report = simulate(&[(&bark, -100)], None)?;
        assert_eq!(*log.borrow(), [(Time::new(-100), "bark")]);
        assert_eq!(report.end_time, Time::new(-100));
        Ok(())
    }
}
