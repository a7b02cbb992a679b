//! Fixed daily triggers driven by a cooperative polling loop.
//!
//! The job runs inline on the polling task, so at most one run is ever in
//! flight. Triggers that pass while a run is still going are not queued;
//! they move on to their next daily occurrence.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::fetcher::Fetcher;
use crate::loader::Loader;
use crate::pipeline::Pipeline;

/// Work the scheduler triggers.
#[allow(async_fn_in_trait)]
pub trait ScheduledJob {
    async fn run(&self);
}

impl<F: Fetcher, L: Loader> ScheduledJob for Pipeline<F, L> {
    async fn run(&self) {
        self.run_logged().await;
    }
}

/// Source of "now" in the process's local time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Next occurrence of `at` strictly after `now`.
pub fn next_occurrence(at: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        (now.date() + ChronoDuration::days(1)).and_time(at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub at: NaiveTime,
    pub next_run: NaiveDateTime,
}

impl Trigger {
    pub fn new(at: NaiveTime, now: NaiveDateTime) -> Self {
        Self {
            at,
            next_run: next_occurrence(at, now),
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_run
    }
}

pub struct Scheduler {
    triggers: Vec<Trigger>,
    poll_interval: Duration,
    clock: Clock,
}

impl Scheduler {
    pub fn new(times: &[NaiveTime], poll_interval: Duration) -> Self {
        Self::with_clock(times, poll_interval, local_clock())
    }

    pub fn with_clock(times: &[NaiveTime], poll_interval: Duration, clock: Clock) -> Self {
        let now = clock();
        Self {
            triggers: times.iter().map(|&at| Trigger::new(at, now)).collect(),
            poll_interval,
            clock,
        }
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Earliest upcoming trigger.
    pub fn next_run(&self) -> Option<NaiveDateTime> {
        self.triggers.iter().map(|t| t.next_run).min()
    }

    /// Run `job` once if any trigger is due at `now`. Returns whether it ran.
    pub async fn run_pending<J: ScheduledJob>(&mut self, now: NaiveDateTime, job: &J) -> bool {
        let due: Vec<NaiveTime> = self
            .triggers
            .iter()
            .filter(|t| t.is_due(now))
            .map(|t| t.at)
            .collect();
        if due.is_empty() {
            return false;
        }

        info!("Trigger {} reached, starting run", due[0].format("%H:%M"));
        job.run().await;

        let finished = (self.clock)();
        for trigger in self.triggers.iter_mut().filter(|t| t.is_due(finished)) {
            if !due.contains(&trigger.at) {
                warn!(
                    "Run overlapped the {} trigger; skipping it until {}",
                    trigger.at.format("%H:%M"),
                    next_occurrence(trigger.at, finished)
                );
            }
            trigger.next_run = next_occurrence(trigger.at, finished);
        }
        if let Some(next) = self.next_run() {
            info!("Next run scheduled for {}", next);
        }
        true
    }

    /// Poll forever. Callers stop it by dropping the future.
    pub async fn run_forever<J: ScheduledJob>(&mut self, job: &J) {
        let times: Vec<String> = self
            .triggers
            .iter()
            .map(|t| t.at.format("%H:%M").to_string())
            .collect();
        info!(
            "Scheduler initialized. Runs at {} daily (poll interval: {:?})",
            times.join(", "),
            self.poll_interval
        );
        if let Some(next) = self.next_run() {
            info!("Next run scheduled for {}", next);
        }

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = (self.clock)();
            if !self.run_pending(now, job).await {
                debug!("No trigger due at {}", now);
            }
        }
    }
}
