use std::sync::{Arc, Mutex};

use log::{error, info};
use tokio::sync::watch;

use crate::platform::{ActivationCallback, ActivationSource};

#[derive(Debug, Default)]
struct Inputs {
    manual_enabled: bool,
    timer_running: bool,
    schedule_active: bool,
    /// Last value acted upon. Side effects fire on changes of the OR'd
    /// boolean, never on input changes that leave it the same.
    committed: bool,
}

impl Inputs {
    fn combined(&self) -> bool {
        self.manual_enabled || self.timer_running || self.schedule_active
    }
}

/// Reduces the three activation inputs (manual toggle, focus timer,
/// schedule) into the single "monitoring" boolean and owns the activation
/// subscription: the source is subscribed on the false→true edge and
/// unsubscribed on true→false, so one OS event never reaches the engine
/// twice.
pub struct ActivationAggregator {
    inputs: Mutex<Inputs>,
    source: Arc<dyn ActivationSource>,
    on_event: ActivationCallback,
    monitoring_tx: watch::Sender<bool>,
}

impl ActivationAggregator {
    /// `monitoring_tx` publishes the committed boolean; the engine holds the
    /// receiving end for its stale-result guard.
    pub fn new(
        source: Arc<dyn ActivationSource>,
        on_event: ActivationCallback,
        monitoring_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            inputs: Mutex::new(Inputs::default()),
            source,
            on_event,
            monitoring_tx,
        }
    }

    pub fn set_manual_enabled(&self, enabled: bool) {
        self.apply(|inputs| inputs.manual_enabled = enabled);
    }

    pub fn set_timer_running(&self, running: bool) {
        self.apply(|inputs| inputs.timer_running = running);
    }

    pub fn set_schedule_active(&self, active: bool) {
        self.apply(|inputs| inputs.schedule_active = active);
    }

    pub fn is_monitoring(&self) -> bool {
        self.lock().committed
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.monitoring_tx.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inputs> {
        self.inputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(&self, set: impl FnOnce(&mut Inputs)) {
        let mut inputs = self.lock();
        set(&mut inputs);

        let fresh = inputs.combined();
        if fresh == inputs.committed {
            return;
        }
        inputs.committed = fresh;

        // Publish before touching the subscription so events delivered
        // right after subscribing already see monitoring == true, and
        // queued events after unsubscribing see false.
        let _ = self.monitoring_tx.send(fresh);

        if fresh {
            if let Err(err) = self.source.subscribe(Arc::clone(&self.on_event)) {
                error!("failed to subscribe to activation events: {err:#}");
            }
            info!("monitoring started");
        } else {
            self.source.unsubscribe();
            info!("monitoring stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;

    #[derive(Default)]
    struct CountingSource {
        subscribes: AtomicUsize,
        unsubscribes: AtomicUsize,
    }

    impl ActivationSource for CountingSource {
        fn subscribe(&self, _on_event: ActivationCallback) -> Result<()> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn unsubscribe(&self) {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn aggregator() -> (ActivationAggregator, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::default());
        let (tx, _) = watch::channel(false);
        let aggregator =
            ActivationAggregator::new(Arc::clone(&source) as Arc<dyn ActivationSource>, Arc::new(|_| {}), tx);
        (aggregator, source)
    }

    #[test]
    fn manual_toggle_produces_one_subscribe_and_one_unsubscribe() {
        let (aggregator, source) = aggregator();

        aggregator.set_manual_enabled(true);
        assert!(aggregator.is_monitoring());
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 1);

        aggregator.set_manual_enabled(false);
        assert!(!aggregator.is_monitoring());
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(source.unsubscribes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn redundant_input_changes_do_not_resubscribe() {
        let (aggregator, source) = aggregator();

        aggregator.set_manual_enabled(true);
        aggregator.set_manual_enabled(true);
        aggregator.set_timer_running(true);
        aggregator.set_schedule_active(true);
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(source.unsubscribes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn overlapping_inputs_unsubscribe_only_when_all_clear() {
        let (aggregator, source) = aggregator();

        aggregator.set_manual_enabled(true);
        aggregator.set_timer_running(true);
        aggregator.set_manual_enabled(false);
        assert!(aggregator.is_monitoring());
        assert_eq!(source.unsubscribes.load(Ordering::SeqCst), 0);

        aggregator.set_timer_running(false);
        assert!(!aggregator.is_monitoring());
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 1);
        assert_eq!(source.unsubscribes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watch_channel_tracks_the_committed_boolean() {
        let (aggregator, _source) = aggregator();
        let rx = aggregator.watch();

        aggregator.set_schedule_active(true);
        assert!(*rx.borrow());

        aggregator.set_schedule_active(false);
        assert!(!*rx.borrow());
    }
}
