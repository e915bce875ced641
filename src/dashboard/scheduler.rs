//! Periodic tick sources for the presenter.
//!
//! The presenter asks for one tick at a time, so its data and clock callbacks
//! can never overlap regardless of which event loop produces the ticks.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Which periodic callback is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Reconnect if needed, drain the link, update sensors
    Data,
    /// Refresh the clock display
    Clock,
}

/// Source of periodic ticks.
pub trait Scheduler {
    /// Wait for the next due tick. `None` ends the presenter loop.
    fn next_tick(&mut self) -> impl Future<Output = Option<TickKind>> + Send;
}

/// Two independent tokio intervals. Late ticks are delayed, never bursted.
#[derive(Debug)]
pub struct IntervalScheduler {
    data: Interval,
    clock: Interval,
}

impl IntervalScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(data_period: Duration, clock_period: Duration) -> Self {
        let mut data = time::interval(data_period);
        data.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut clock = time::interval(clock_period);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { data, clock }
    }

    pub fn from_config(config: &crate::config::DashboardConfig) -> Self {
        Self::new(
            Duration::from_millis(config.data_interval_ms),
            Duration::from_millis(config.clock_interval_ms),
        )
    }
}

impl Scheduler for IntervalScheduler {
    async fn next_tick(&mut self) -> Option<TickKind> {
        tokio::select! {
            biased;
            _ = self.data.tick() => Some(TickKind::Data),
            _ = self.clock.tick() => Some(TickKind::Clock),
        }
    }
}

/// A fixed sequence of ticks, delivered immediately. Ends when exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScheduler {
    ticks: VecDeque<TickKind>,
}

impl ScriptedScheduler {
    pub fn new(ticks: impl IntoIterator<Item = TickKind>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }
}

impl Scheduler for ScriptedScheduler {
    async fn next_tick(&mut self) -> Option<TickKind> {
        self.ticks.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_scheduler_drains_in_order() {
        let mut scheduler = ScriptedScheduler::new([TickKind::Data, TickKind::Clock]);
        assert_eq!(tokio_test::block_on(scheduler.next_tick()), Some(TickKind::Data));
        assert_eq!(tokio_test::block_on(scheduler.next_tick()), Some(TickKind::Clock));
        assert_eq!(tokio_test::block_on(scheduler.next_tick()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_scheduler_alternates() {
        let mut scheduler =
            IntervalScheduler::new(Duration::from_secs(1), Duration::from_secs(1));

        // Both intervals fire immediately; data wins the tie.
        assert_eq!(scheduler.next_tick().await, Some(TickKind::Data));
        assert_eq!(scheduler.next_tick().await, Some(TickKind::Clock));
        assert_eq!(scheduler.next_tick().await, Some(TickKind::Data));
        assert_eq!(scheduler.next_tick().await, Some(TickKind::Clock));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_scheduler_respects_periods() {
        let mut scheduler =
            IntervalScheduler::new(Duration::from_millis(250), Duration::from_secs(1));
        let mut data = 0;
        let mut clock = 0;
        for _ in 0..10 {
            match scheduler.next_tick().await {
                Some(TickKind::Data) => data += 1,
                Some(TickKind::Clock) => clock += 1,
                None => unreachable!(),
            }
        }
        assert!(data > clock * 2, "data={data} clock={clock}");
    }
}
