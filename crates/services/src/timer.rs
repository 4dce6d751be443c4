use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

//
// ─── TIMER EVENTS ──────────────────────────────────────────────────────────────
//

/// Events emitted by a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One-second cadence update with the floored whole seconds left.
    Tick { remaining_seconds: u32 },
    /// The deadline passed. Emitted exactly once; the countdown then ends.
    Expired,
}

//
// ─── COUNTDOWN TIMER ───────────────────────────────────────────────────────────
//

/// Deadline-based countdown with one-second display resolution.
///
/// The deadline is captured once at start; every tick recomputes the remaining
/// time from it, so delayed or coalesced ticks can never stretch the wall-clock
/// duration. Callers own the pace: events are read with [`next_event`].
///
/// [`next_event`]: CountdownTimer::next_event
#[derive(Debug)]
pub struct CountdownTimer {
    events: mpsc::Receiver<TimerEvent>,
    task: JoinHandle<()>,
    stopped: bool,
}

impl CountdownTimer {
    /// Start a countdown over the given number of seconds.
    ///
    /// A zero duration expires on the first event.
    #[must_use]
    pub fn start(duration_seconds: u32) -> Self {
        let (events_tx, events_rx) = mpsc::channel(32);
        let deadline = Instant::now() + Duration::from_secs(u64::from(duration_seconds));
        let task = tokio::spawn(run(deadline, events_tx));
        Self {
            events: events_rx,
            task,
            stopped: false,
        }
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the countdown expired or was stopped.
    pub async fn next_event(&mut self) -> Option<TimerEvent> {
        if self.stopped {
            return None;
        }
        self.events.recv().await
    }

    /// Cancel the countdown. Stopping an expired timer is a no-op.
    pub fn stop(&mut self) {
        self.task.abort();
        self.stopped = true;
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(deadline: Instant, events: mpsc::Sender<TimerEvent>) {
    let mut ticks = time::interval(Duration::from_secs(1));
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticks.tick().await;
        let now = Instant::now();
        if now >= deadline {
            let _ = events.send(TimerEvent::Expired).await;
            return;
        }
        let event = TimerEvent::Tick {
            remaining_seconds: whole_seconds_left(deadline, now),
        };
        if events.send(event).await.is_err() {
            return;
        }
    }
}

/// Floor of the time left in whole seconds. A tick that lands mid-second
/// reports the lower bound, never the second still in progress.
fn whole_seconds_left(deadline: Instant, now: Instant) -> u32 {
    let left = deadline.saturating_duration_since(now);
    u32::try_from(left.as_secs()).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(timer: &mut CountdownTimer) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Some(event) = timer.next_event().await {
            let done = event == TimerEvent::Expired;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_count_down_and_expiry_fires_once() {
        let mut timer = CountdownTimer::start(3);
        let events = collect(&mut timer).await;

        assert_eq!(
            events,
            vec![
                TimerEvent::Tick {
                    remaining_seconds: 3
                },
                TimerEvent::Tick {
                    remaining_seconds: 2
                },
                TimerEvent::Tick {
                    remaining_seconds: 1
                },
                TimerEvent::Expired,
            ]
        );
        assert_eq!(timer.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_expires_immediately() {
        let mut timer = CountdownTimer::start(0);
        assert_eq!(timer.next_event().await, Some(TimerEvent::Expired));
        assert_eq!(timer.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_events() {
        let mut timer = CountdownTimer::start(60);
        assert_eq!(
            timer.next_event().await,
            Some(TimerEvent::Tick {
                remaining_seconds: 60
            })
        );

        timer.stop();
        assert_eq!(timer.next_event().await, None);
        assert!(timer.is_stopped());

        // Stopping again changes nothing.
        timer.stop();
        assert_eq!(timer.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn late_ticks_report_the_floor() {
        let mut timer = CountdownTimer::start(5);
        assert_eq!(
            timer.next_event().await,
            Some(TimerEvent::Tick {
                remaining_seconds: 5
            })
        );

        // Land mid-second: 3.5s left reads as 3, not 4.
        time::advance(Duration::from_millis(1500)).await;
        assert_eq!(
            timer.next_event().await,
            Some(TimerEvent::Tick {
                remaining_seconds: 3
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_never_increases() {
        let mut timer = CountdownTimer::start(5);
        let mut last = u32::MAX;
        for event in collect(&mut timer).await {
            if let TimerEvent::Tick { remaining_seconds } = event {
                assert!(remaining_seconds <= last);
                last = remaining_seconds;
            }
        }
        assert_eq!(last, 1);
    }
}
