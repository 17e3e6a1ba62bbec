//! Countdown used by timed practice steps.
//!
//! Each timer owns at most one ticking task. The task is aborted on pause,
//! reset, dispose and drop, so a timer can never outlive the screen that owns
//! it. `start`/`pause`/`reset` must be called from inside a tokio runtime.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// Not counting. Covers both "never started" and "paused mid-run".
    Paused,
    Running,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub remaining_secs: u32,
    pub total_secs: u32,
}

impl TimerSnapshot {
    pub fn is_idle(&self) -> bool {
        self.status == TimerStatus::Paused && self.remaining_secs == self.total_secs
    }
}

type CompletionCallback = Arc<dyn Fn() + Send + Sync>;

pub struct PracticeTimer {
    state: Arc<watch::Sender<TimerSnapshot>>,
    ticker: Option<JoinHandle<()>>,
    tick: Duration,
    on_complete: Option<CompletionCallback>,
}

impl PracticeTimer {
    pub fn new(total_secs: u32) -> Self {
        let (state, _) = watch::channel(TimerSnapshot {
            status: TimerStatus::Paused,
            remaining_secs: total_secs,
            total_secs,
        });
        Self {
            state: Arc::new(state),
            ticker: None,
            tick: Duration::from_secs(1),
            on_complete: None,
        }
    }

    /// Overrides the one-second tick. Zero is raised to one millisecond.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_TICK);
        self
    }

    /// Fires once each time a run reaches zero.
    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().status == TimerStatus::Running
            && self
                .ticker
                .as_ref()
                .is_some_and(|ticker| !ticker.is_finished())
    }

    /// Returns `false` when the timer was already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.stop_ticker();

        let mut expired_now = false;
        self.state.send_modify(|state| {
            if state.status == TimerStatus::Expired || state.remaining_secs == 0 {
                state.remaining_secs = state.total_secs;
            }
            if state.remaining_secs == 0 {
                state.status = TimerStatus::Expired;
                expired_now = true;
            } else {
                state.status = TimerStatus::Running;
            }
        });
        if expired_now {
            self.fire_completion();
            return true;
        }

        debug!(remaining = self.snapshot().remaining_secs, "timer: started");
        self.ticker = Some(spawn_ticker(
            Arc::clone(&self.state),
            self.tick,
            self.on_complete.clone(),
        ));
        true
    }

    pub fn pause(&mut self) {
        self.stop_ticker();
        self.state.send_modify(|state| {
            if state.status == TimerStatus::Running {
                state.status = TimerStatus::Paused;
            }
        });
    }

    pub fn reset(&mut self) {
        self.stop_ticker();
        self.state.send_modify(|state| {
            state.status = TimerStatus::Paused;
            state.remaining_secs = state.total_secs;
        });
    }

    /// Stops ticking for good; the last snapshot stays readable.
    pub fn dispose(&mut self) {
        self.pause();
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn fire_completion(&self) {
        if let Some(callback) = &self.on_complete {
            callback();
        }
    }
}

impl Drop for PracticeTimer {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

fn spawn_ticker(
    state: Arc<watch::Sender<TimerSnapshot>>,
    tick: Duration,
    on_complete: Option<CompletionCallback>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + tick, tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut expired = false;
            let mut stopped = false;
            state.send_modify(|snapshot| {
                if snapshot.status != TimerStatus::Running {
                    stopped = true;
                    return;
                }
                snapshot.remaining_secs = snapshot.remaining_secs.saturating_sub(1);
                if snapshot.remaining_secs == 0 {
                    snapshot.status = TimerStatus::Expired;
                    expired = true;
                }
            });
            if stopped {
                break;
            }
            if expired {
                info!("timer: expired");
                if let Some(callback) = &on_complete {
                    callback();
                }
                break;
            }
        }
    })
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
#[path = "tests/timer_tests.rs"]
mod tests;
