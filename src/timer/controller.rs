use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use log::debug;
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::report::Notifier;

use super::{FocusTimerState, TimerStatus};

/// Point-in-time view of the timer, with the derived display fields the
/// configuration surface renders.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: FocusTimerState,
    pub progress: f64,
    pub formatted_remaining: String,
}

impl TimerSnapshot {
    fn of(state: &FocusTimerState) -> Self {
        Self {
            progress: state.progress(),
            formatted_remaining: state.formatted_remaining(),
            state: state.clone(),
        }
    }
}

/// Drives a [`FocusTimerState`] with a 1-second tokio ticker and publishes
/// snapshots on a watch channel. The completion signal goes to the injected
/// [`Notifier`] exactly once per session.
#[derive(Clone)]
pub struct FocusTimer {
    state: Arc<Mutex<FocusTimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    notifier: Arc<dyn Notifier>,
    snapshot_tx: watch::Sender<TimerSnapshot>,
}

impl FocusTimer {
    pub fn new(notifier: Arc<dyn Notifier>, tick_interval: Duration) -> Self {
        let initial = FocusTimerState::new();
        let (snapshot_tx, _) = watch::channel(TimerSnapshot::of(&initial));
        Self {
            state: Arc::new(Mutex::new(initial)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
            notifier,
            snapshot_tx,
        }
    }

    /// Snapshot stream; the monitoring layer watches this for the
    /// running/not-running boolean, the UI for the countdown display.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn get_state(&self) -> FocusTimerState {
        self.state.lock().await.clone()
    }

    pub async fn set_duration(&self, minutes: u32) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.status != TimerStatus::Idle {
            bail!("timer already active");
        }
        state.set_duration(minutes);
        self.publish(&state);
        Ok(())
    }

    /// Strict mode is advisory: it tells callers that early termination
    /// should be refused while running. The timer itself never enforces it.
    pub async fn set_strict_mode(&self, strict: bool) {
        let mut state = self.state.lock().await;
        state.strict_mode = strict;
        self.publish(&state);
    }

    pub async fn is_strict(&self) -> bool {
        self.state.lock().await.strict_mode
    }

    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Idle {
                bail!("timer already active");
            }
            if !state.start(Utc::now()) {
                debug!("focus timer start ignored: no duration configured");
                return Ok(());
            }
            self.publish(&state);
        }
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Running {
                bail!("timer is not running");
            }
            state.pause(Utc::now());
            self.publish(&state);
        }
        self.cancel_ticker().await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Paused {
                bail!("timer is not paused");
            }
            state.resume(Utc::now());
            self.publish(&state);
        }
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.status == TimerStatus::Idle {
                bail!("no active session to stop");
            }
            state.stop();
            self.publish(&state);
        }
        self.cancel_ticker().await;
        Ok(())
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = Arc::clone(&self.state);
        let snapshot_tx = self.snapshot_tx.clone();
        let notifier = Arc::clone(&self.notifier);
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.tick().await; // first tick resolves immediately
            loop {
                interval.tick().await;

                let completed = {
                    let mut guard = state.lock().await;
                    if guard.status != TimerStatus::Running {
                        break;
                    }
                    let completed = guard.tick(Utc::now());
                    let _ = snapshot_tx.send(TimerSnapshot::of(&guard));
                    completed
                };

                if completed {
                    notifier.focus_session_complete();
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish(&self, state: &FocusTimerState) {
        let _ = self.snapshot_tx.send(TimerSnapshot::of(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::report::Violation;

    #[derive(Default)]
    struct RecordingNotifier {
        completions: StdMutex<u32>,
    }

    impl Notifier for RecordingNotifier {
        fn violation(&self, _violation: &Violation) {}

        fn focus_session_complete(&self) {
            *self.completions.lock().unwrap() += 1;
        }
    }

    fn timer() -> (FocusTimer, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let timer = FocusTimer::new(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            Duration::from_millis(20),
        );
        (timer, notifier)
    }

    #[tokio::test]
    async fn start_requires_a_duration() {
        let (timer, _) = timer();
        timer.start().await.unwrap();
        assert_eq!(timer.get_state().await.status, TimerStatus::Idle);
    }

    #[tokio::test]
    async fn transitions_follow_the_state_machine() {
        let (timer, _) = timer();
        timer.set_duration(25).await.unwrap();
        timer.start().await.unwrap();
        assert_eq!(timer.get_state().await.status, TimerStatus::Running);
        assert!(timer.set_duration(50).await.is_err());
        assert!(timer.resume().await.is_err());

        timer.pause().await.unwrap();
        assert_eq!(timer.get_state().await.status, TimerStatus::Paused);
        assert!(timer.pause().await.is_err());

        timer.resume().await.unwrap();
        assert_eq!(timer.get_state().await.status, TimerStatus::Running);

        timer.stop().await.unwrap();
        let state = timer.get_state().await;
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.remaining_seconds, state.duration_seconds);
        assert!(timer.stop().await.is_err());
    }

    #[tokio::test]
    async fn snapshots_reach_subscribers() {
        let (timer, _) = timer();
        let mut rx = timer.subscribe();
        timer.set_duration(25).await.unwrap();
        timer.start().await.unwrap();

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.state.status, TimerStatus::Running);
    }

    #[tokio::test]
    async fn strict_mode_is_advisory_only() {
        let (timer, _) = timer();
        timer.set_strict_mode(true).await;
        timer.set_duration(25).await.unwrap();
        timer.start().await.unwrap();

        assert!(timer.is_strict().await);
        // The timer itself still honors stop; refusing it is the caller's job.
        timer.stop().await.unwrap();
        assert_eq!(timer.get_state().await.status, TimerStatus::Idle);
    }
}
