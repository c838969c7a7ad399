use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, warn};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    browser::{Browser, BrowserRegistry},
    config::EngineConfig,
    platform::{ActivationCallback, ActivationEvent, ProcessControl},
    policy::PolicyHandle,
    report::{Notifier, Violation},
};

/// Everything the engine consumes arrives on one queue: activation events
/// from the OS subscription and the results of spawned tab checks. A single
/// consumer drains it, so violations are reported in occurrence order and
/// the debounce timestamp has exactly one writer.
enum EngineEvent {
    Activation(ActivationEvent),
    TabChecked(TabCheckOutcome),
}

struct TabCheckOutcome {
    browser_name: String,
    matched_keyword: Option<String>,
    tab_closed: bool,
}

struct EngineCtx {
    config: EngineConfig,
    policy: PolicyHandle,
    browsers: Arc<BrowserRegistry>,
    processes: Arc<dyn ProcessControl>,
    notifier: Arc<dyn Notifier>,
    monitoring: watch::Receiver<bool>,
    last_violation: Arc<StdMutex<Option<Violation>>>,
    tx: mpsc::Sender<EngineEvent>,
}

/// Reacts to foreground-app switches while monitoring is active: blocked
/// apps are terminated on the spot, known browsers get an asynchronous
/// active-tab check against the effective keyword set.
pub struct EnforcementEngine {
    tx: mpsc::Sender<EngineEvent>,
    last_violation: Arc<StdMutex<Option<Violation>>>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EnforcementEngine {
    pub fn spawn(
        config: EngineConfig,
        policy: PolicyHandle,
        browsers: Arc<BrowserRegistry>,
        processes: Arc<dyn ProcessControl>,
        notifier: Arc<dyn Notifier>,
        monitoring: watch::Receiver<bool>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let last_violation = Arc::new(StdMutex::new(None));
        let cancel = CancellationToken::new();

        let ctx = EngineCtx {
            config,
            policy,
            browsers,
            processes,
            notifier,
            monitoring,
            last_violation: Arc::clone(&last_violation),
            tx: tx.clone(),
        };

        let handle = tokio::spawn(engine_loop(rx, ctx, cancel.clone()));

        Self {
            tx,
            last_violation,
            cancel,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Entry point handed to the activation source. Delivery is lossy under
    /// backpressure; rapid-fire events would be debounced away anyway.
    pub fn activation_callback(&self) -> ActivationCallback {
        let tx = self.tx.clone();
        Arc::new(move |event: ActivationEvent| {
            if tx.try_send(EngineEvent::Activation(event)).is_err() {
                debug!("engine queue unavailable, dropping activation event");
            }
        })
    }

    /// The single retained violation slot.
    pub fn last_violation(&self) -> Option<Violation> {
        self.last_violation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(err) = handle.await {
                warn!("enforcement loop failed to join: {err}");
            }
        }
    }
}

async fn engine_loop(
    mut rx: mpsc::Receiver<EngineEvent>,
    ctx: EngineCtx,
    cancel: CancellationToken,
) {
    let mut last_processed: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("enforcement loop shutting down");
                break;
            }
            received = rx.recv() => {
                let Some(event) = received else { break };
                match event {
                    EngineEvent::Activation(activation) => {
                        handle_activation(&ctx, &mut last_processed, activation);
                    }
                    EngineEvent::TabChecked(outcome) => {
                        handle_tab_checked(&ctx, outcome);
                    }
                }
            }
        }
    }
}

fn handle_activation(
    ctx: &EngineCtx,
    last_processed: &mut Option<Instant>,
    event: ActivationEvent,
) {
    if !*ctx.monitoring.borrow() {
        debug!("ignoring activation of {} while monitoring is off", event.bundle_id);
        return;
    }
    if ctx.config.self_bundle_id.as_deref() == Some(event.bundle_id.as_str()) {
        return;
    }

    // Coalesce window-manager event storms: anything inside the debounce
    // window of the previously processed event is dropped.
    if let Some(processed_at) = *last_processed {
        if processed_at.elapsed() < ctx.config.debounce {
            debug!("debounced activation of {}", event.bundle_id);
            return;
        }
    }
    *last_processed = Some(Instant::now());

    if ctx.policy.is_blocked(&event.bundle_id) {
        if !ctx.processes.terminate(event.pid) {
            warn!("failed to terminate {} (pid {})", event.bundle_id, event.pid);
        }
        let violation = Violation::new(
            event.display_name.clone(),
            format!("Blocked app launched: {}", event.display_name),
        );
        emit_violation(ctx, violation);
        return;
    }

    if let Some(browser) = ctx.browsers.get(&event.bundle_id) {
        let keywords = ctx.policy.effective_keywords();
        if keywords.is_empty() {
            return;
        }
        spawn_tab_check(ctx, Arc::clone(browser), keywords);
    }
}

/// Runs concurrently with later events. The settle delay lets the browser
/// finish navigating before its active tab is queried; the query itself is
/// blocking AppleScript, so it goes to a blocking worker and the result is
/// posted back onto the engine queue.
fn spawn_tab_check(ctx: &EngineCtx, browser: Arc<dyn Browser>, keywords: Vec<String>) {
    let tx = ctx.tx.clone();
    let settle_delay = ctx.config.settle_delay;
    let browser_name = browser.display_name().to_string();

    tokio::spawn(async move {
        time::sleep(settle_delay).await;

        let name = browser_name.clone();
        let inspected = tokio::task::spawn_blocking(move || {
            let Some(url) = browser.active_url() else {
                return TabCheckOutcome {
                    browser_name: name,
                    matched_keyword: None,
                    tab_closed: false,
                };
            };
            let lower = url.to_lowercase();
            let matched = keywords.iter().find(|k| lower.contains(k.as_str())).cloned();
            // Closing is attempted here, decoupled from the report: a failed
            // close still counts as a violation.
            let closed = matched.is_some() && browser.close_active_tab();
            TabCheckOutcome {
                browser_name: name,
                matched_keyword: matched,
                tab_closed: closed,
            }
        })
        .await;

        match inspected {
            Ok(outcome) => {
                if tx.send(EngineEvent::TabChecked(outcome)).await.is_err() {
                    debug!("engine gone, dropping tab check result for {browser_name}");
                }
            }
            Err(err) => warn!("tab inspection worker failed: {err}"),
        }
    });
}

fn handle_tab_checked(ctx: &EngineCtx, outcome: TabCheckOutcome) {
    // Stale-result guard: checks dispatched before monitoring was switched
    // off complete normally, but their findings are discarded.
    if !*ctx.monitoring.borrow() {
        debug!(
            "discarding tab check result from {}: monitoring is off",
            outcome.browser_name
        );
        return;
    }

    let Some(keyword) = outcome.matched_keyword else {
        return;
    };
    if !outcome.tab_closed {
        debug!("could not close blocked tab in {}", outcome.browser_name);
    }

    let violation = Violation::new(
        outcome.browser_name.clone(),
        format!(
            "Blocked URL keyword \"{}\" in {}",
            keyword, outcome.browser_name
        ),
    );
    emit_violation(ctx, violation);
}

fn emit_violation(ctx: &EngineCtx, violation: Violation) {
    debug!("violation detected: {}", violation.reason);
    *ctx.last_violation
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(violation.clone());
    ctx.notifier.violation(&violation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticBrowser {
        url: Option<String>,
        close_calls: AtomicUsize,
    }

    impl StaticBrowser {
        fn new(url: Option<&str>) -> Self {
            Self {
                url: url.map(String::from),
                close_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Browser for StaticBrowser {
        fn display_name(&self) -> &str {
            "TestBrowser"
        }

        fn bundle_id(&self) -> &str {
            "com.test.browser"
        }

        fn active_url(&self) -> Option<String> {
            self.url.clone()
        }

        fn close_active_tab(&self) -> bool {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[derive(Default)]
    struct RecordingProcessControl {
        terminated: StdMutex<Vec<i32>>,
    }

    impl ProcessControl for RecordingProcessControl {
        fn terminate(&self, pid: i32) -> bool {
            self.terminated.lock().unwrap().push(pid);
            true
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        violations: StdMutex<Vec<Violation>>,
    }

    impl Notifier for RecordingNotifier {
        fn violation(&self, violation: &Violation) {
            self.violations.lock().unwrap().push(violation.clone());
        }

        fn focus_session_complete(&self) {}
    }

    struct Harness {
        engine: EnforcementEngine,
        browser: Arc<StaticBrowser>,
        processes: Arc<RecordingProcessControl>,
        notifier: Arc<RecordingNotifier>,
        monitoring_tx: watch::Sender<bool>,
        callback: ActivationCallback,
    }

    fn harness(policy: PolicyHandle, browser_url: Option<&str>) -> Harness {
        let config = EngineConfig {
            debounce: Duration::from_millis(100),
            settle_delay: Duration::from_millis(20),
            self_bundle_id: Some("com.test.warden".to_string()),
        };
        let browser = Arc::new(StaticBrowser::new(browser_url));
        let registry = Arc::new(BrowserRegistry::from_browsers(vec![
            Arc::clone(&browser) as Arc<dyn Browser>
        ]));
        let processes = Arc::new(RecordingProcessControl::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let (monitoring_tx, monitoring_rx) = watch::channel(true);

        let engine = EnforcementEngine::spawn(
            config,
            policy,
            registry,
            Arc::clone(&processes) as Arc<dyn ProcessControl>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            monitoring_rx,
        );
        let callback = engine.activation_callback();

        Harness {
            engine,
            browser,
            processes,
            notifier,
            monitoring_tx,
            callback,
        }
    }

    fn activation(pid: i32, bundle_id: &str, name: &str) -> ActivationEvent {
        ActivationEvent {
            pid,
            bundle_id: bundle_id.to_string(),
            display_name: name.to_string(),
        }
    }

    fn blocked_app_policy() -> PolicyHandle {
        let policy = PolicyHandle::default();
        policy.update(|p| p.toggle_app("com.evil.app"));
        policy
    }

    async fn settle() {
        time::sleep(Duration::from_millis(80)).await;
    }

    #[tokio::test]
    async fn blocked_app_is_terminated_and_reported() {
        let h = harness(blocked_app_policy(), None);

        (h.callback)(activation(4242, "com.evil.app", "Evil App"));
        settle().await;

        assert_eq!(*h.processes.terminated.lock().unwrap(), vec![4242]);
        let violations = h.notifier.violations.lock().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].reason, "Blocked app launched: Evil App");
        assert_eq!(
            h.engine.last_violation().map(|v| v.app_name),
            Some("Evil App".to_string())
        );
    }

    #[tokio::test]
    async fn rapid_events_are_debounced() {
        let h = harness(blocked_app_policy(), None);

        (h.callback)(activation(1, "com.evil.app", "Evil App"));
        (h.callback)(activation(2, "com.evil.app", "Evil App"));
        settle().await;
        assert_eq!(h.processes.terminated.lock().unwrap().len(), 1);

        // Past the debounce window the next event is processed again.
        time::sleep(Duration::from_millis(120)).await;
        (h.callback)(activation(3, "com.evil.app", "Evil App"));
        settle().await;
        assert_eq!(h.processes.terminated.lock().unwrap().len(), 2);
        assert_eq!(h.notifier.violations.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn browser_with_blocked_url_loses_its_tab() {
        let policy = PolicyHandle::default();
        policy.update(|p| {
            p.add_keyword("reddit.com");
        });
        let h = harness(policy, Some("https://REDDIT.com/r/rust"));

        (h.callback)(activation(7, "com.test.browser", "TestBrowser"));
        settle().await;

        assert_eq!(h.browser.close_calls.load(Ordering::SeqCst), 1);
        assert!(h.processes.terminated.lock().unwrap().is_empty());
        let violations = h.notifier.violations.lock().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].reason,
            "Blocked URL keyword \"reddit.com\" in TestBrowser"
        );
    }

    #[tokio::test]
    async fn stale_tab_result_is_discarded() {
        let policy = PolicyHandle::default();
        policy.update(|p| {
            p.add_keyword("reddit.com");
        });
        let h = harness(policy, Some("https://reddit.com/r/rust"));

        (h.callback)(activation(7, "com.test.browser", "TestBrowser"));
        // Monitoring goes off while the check is still settling.
        time::sleep(Duration::from_millis(5)).await;
        h.monitoring_tx.send(false).unwrap();
        settle().await;

        assert!(h.notifier.violations.lock().unwrap().is_empty());
        assert!(h.engine.last_violation().is_none());
    }

    #[tokio::test]
    async fn clean_url_produces_no_violation() {
        let policy = PolicyHandle::default();
        policy.update(|p| {
            p.add_keyword("reddit.com");
        });
        let h = harness(policy, Some("https://docs.rs"));

        (h.callback)(activation(7, "com.test.browser", "TestBrowser"));
        settle().await;

        assert_eq!(h.browser.close_calls.load(Ordering::SeqCst), 0);
        assert!(h.notifier.violations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_keyword_set_skips_the_tab_check() {
        let h = harness(PolicyHandle::default(), Some("https://reddit.com"));

        (h.callback)(activation(7, "com.test.browser", "TestBrowser"));
        settle().await;

        assert_eq!(h.browser.close_calls.load(Ordering::SeqCst), 0);
        assert!(h.notifier.violations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blocked_browser_is_terminated_without_tab_check() {
        let policy = PolicyHandle::default();
        policy.update(|p| {
            p.toggle_app("com.test.browser");
            p.add_keyword("reddit.com");
        });
        let h = harness(policy, Some("https://reddit.com"));

        (h.callback)(activation(9, "com.test.browser", "TestBrowser"));
        settle().await;

        assert_eq!(*h.processes.terminated.lock().unwrap(), vec![9]);
        assert_eq!(h.browser.close_calls.load(Ordering::SeqCst), 0);
        let violations = h.notifier.violations.lock().unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].reason.starts_with("Blocked app launched"));
    }

    #[tokio::test]
    async fn own_bundle_id_is_ignored() {
        let policy = PolicyHandle::default();
        policy.update(|p| p.toggle_app("com.test.warden"));
        let h = harness(policy, None);

        (h.callback)(activation(1, "com.test.warden", "Warden"));
        settle().await;

        assert!(h.processes.terminated.lock().unwrap().is_empty());
        assert!(h.notifier.violations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_while_monitoring_off_are_dropped() {
        let h = harness(blocked_app_policy(), None);
        h.monitoring_tx.send(false).unwrap();

        (h.callback)(activation(1, "com.evil.app", "Evil App"));
        settle().await;

        assert!(h.processes.terminated.lock().unwrap().is_empty());
        assert!(h.notifier.violations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_joins_the_worker() {
        let h = harness(PolicyHandle::default(), None);
        h.engine.shutdown().await;

        // Events after shutdown are dropped without panicking.
        (h.callback)(activation(1, "com.evil.app", "Evil App"));
    }
}
