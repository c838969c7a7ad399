use std::sync::{Arc, Mutex as StdMutex};

use log::info;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    browser::BrowserRegistry,
    config::WardenConfig,
    monitor::{ActivationAggregator, EnforcementEngine, SchedulePoller, ScheduleStatus},
    platform::{ActivationSource, ProcessControl},
    policy::PolicyHandle,
    report::{Notifier, Violation},
    timer::{FocusTimer, TimerStatus},
};

/// Composition root: owns every component of the enforcement core and the
/// plumbing between them. The aggregator's three inputs come from the
/// manual toggle (direct call), the focus timer and the schedule poller
/// (forwarder tasks watching their snapshot channels).
pub struct Warden {
    policy: PolicyHandle,
    timer: FocusTimer,
    engine: Arc<EnforcementEngine>,
    aggregator: Arc<ActivationAggregator>,
    schedules: Arc<SchedulePoller>,
    forwarders: StdMutex<Vec<JoinHandle<()>>>,
}

impl Warden {
    pub fn new(
        config: WardenConfig,
        policy: PolicyHandle,
        source: Arc<dyn ActivationSource>,
        browsers: Arc<BrowserRegistry>,
        processes: Arc<dyn ProcessControl>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let timer = FocusTimer::new(Arc::clone(&notifier), config.timer_tick);

        let (monitoring_tx, monitoring_rx) = watch::channel(false);
        let engine = Arc::new(EnforcementEngine::spawn(
            config.engine,
            policy.clone(),
            browsers,
            processes,
            notifier,
            monitoring_rx,
        ));
        let aggregator = Arc::new(ActivationAggregator::new(
            source,
            engine.activation_callback(),
            monitoring_tx,
        ));
        let schedules = Arc::new(SchedulePoller::spawn(policy.clone(), config.schedule_poll));

        let mut forwarders = Vec::new();

        // Each forwarder applies the current value before waiting, so a
        // snapshot published between spawn and subscribe is not lost.
        let mut timer_rx = timer.subscribe();
        let agg = Arc::clone(&aggregator);
        forwarders.push(tokio::spawn(async move {
            loop {
                let running = timer_rx.borrow_and_update().state.status == TimerStatus::Running;
                agg.set_timer_running(running);
                if timer_rx.changed().await.is_err() {
                    break;
                }
            }
        }));

        let mut schedule_rx = schedules.subscribe();
        let agg = Arc::clone(&aggregator);
        forwarders.push(tokio::spawn(async move {
            loop {
                let active = schedule_rx.borrow_and_update().active.is_some();
                agg.set_schedule_active(active);
                if schedule_rx.changed().await.is_err() {
                    break;
                }
            }
        }));

        Self {
            policy,
            timer,
            engine,
            aggregator,
            schedules,
            forwarders: StdMutex::new(forwarders),
        }
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    pub fn set_manual_enabled(&self, enabled: bool) {
        self.aggregator.set_manual_enabled(enabled);
    }

    pub fn is_monitoring(&self) -> bool {
        self.aggregator.is_monitoring()
    }

    pub fn monitoring_watch(&self) -> watch::Receiver<bool> {
        self.aggregator.watch()
    }

    pub fn schedule_status(&self) -> ScheduleStatus {
        self.schedules.status()
    }

    /// Call after editing the schedule list so the change applies now
    /// rather than on the next poll.
    pub fn refresh_schedules(&self) {
        self.schedules.refresh();
    }

    pub fn last_violation(&self) -> Option<Violation> {
        self.engine.last_violation()
    }

    pub async fn shutdown(&self) {
        info!("shutting down enforcement core");
        let handles = {
            let mut guard = self
                .forwarders
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            handle.abort();
        }

        let _ = self.timer.stop().await;
        self.schedules.shutdown().await;
        self.aggregator.set_manual_enabled(false);
        self.engine.shutdown().await;
    }
}
