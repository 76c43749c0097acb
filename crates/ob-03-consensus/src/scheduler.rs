//! Round pacing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Decides when the next round starts.
#[async_trait]
pub trait RoundScheduler: Send {
    /// Resolve when the next round is due.
    async fn tick(&mut self);
}

/// Fixed-period rounds. The first round starts one period after creation;
/// a round that overruns delays the next tick instead of bursting.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl RoundScheduler for IntervalScheduler {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Rounds on demand, for tests and single-stepping.
pub struct ManualScheduler {
    triggers: mpsc::UnboundedReceiver<()>,
}

/// Sending half of a `ManualScheduler`.
#[derive(Clone)]
pub struct ManualTrigger {
    sender: mpsc::UnboundedSender<()>,
}

impl ManualScheduler {
    pub fn new() -> (Self, ManualTrigger) {
        let (sender, triggers) = mpsc::unbounded_channel();
        (Self { triggers }, ManualTrigger { sender })
    }
}

impl ManualTrigger {
    /// Queue one round. Returns false once the scheduler is gone.
    pub fn trigger(&self) -> bool {
        self.sender.send(()).is_ok()
    }
}

#[async_trait]
impl RoundScheduler for ManualScheduler {
    /// Pends forever once every trigger is dropped.
    async fn tick(&mut self) {
        if self.triggers.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
