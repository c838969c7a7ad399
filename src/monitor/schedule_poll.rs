use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::debug;
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex, Notify},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::policy::{
    schedule::{active_schedule, local_weekday_minute, next_upcoming},
    PolicyHandle, Schedule,
};

/// Result of one evaluation pass over the schedule list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    /// First schedule (in list order) covering the current instant.
    pub active: Option<Schedule>,
    /// Enabled, currently-inactive schedule that starts soonest.
    pub next: Option<Schedule>,
}

/// Re-evaluates the schedule list on a fixed interval and publishes the
/// result. Schedule boundaries are wall-clock, not OS-signaled, so this is
/// a poll; edits to the list should call [`refresh`] for an immediate pass.
///
/// [`refresh`]: SchedulePoller::refresh
pub struct SchedulePoller {
    status_tx: watch::Sender<ScheduleStatus>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulePoller {
    pub fn spawn(policy: PolicyHandle, poll_interval: Duration) -> Self {
        let (status_tx, _) = watch::channel(ScheduleStatus::default());
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(poll_loop(
            policy,
            poll_interval,
            status_tx.clone(),
            Arc::clone(&refresh),
            cancel.clone(),
        ));

        Self {
            status_tx,
            refresh,
            cancel,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScheduleStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status_tx.borrow().clone()
    }

    /// Trigger an evaluation pass now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
    }
}

async fn poll_loop(
    policy: PolicyHandle,
    poll_interval: Duration,
    status_tx: watch::Sender<ScheduleStatus>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        evaluate(&policy, &status_tx);

        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                debug!("schedule list changed, re-evaluating");
            }
            _ = cancel.cancelled() => {
                debug!("schedule poll loop shutting down");
                break;
            }
        }
    }
}

fn evaluate(policy: &PolicyHandle, status_tx: &watch::Sender<ScheduleStatus>) {
    let schedules = policy.schedules();
    let (weekday, minute) = local_weekday_minute(Local::now());

    let status = ScheduleStatus {
        active: active_schedule(&schedules, weekday, minute).cloned(),
        next: next_upcoming(&schedules, weekday, minute).cloned(),
    };

    status_tx.send_if_modified(|current| {
        if *current == status {
            return false;
        }
        *current = status;
        true
    });
}
