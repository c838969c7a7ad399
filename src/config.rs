use std::time::Duration;

/// Timing knobs for the enforcement engine.
///
/// The defaults match the values the enforcement flow was tuned against, but
/// the right numbers depend on OS and browser latency, so callers can inject
/// their own.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum gap between two processed activation events. Activations
    /// arriving closer together than this are dropped to coalesce
    /// window-manager event storms.
    pub debounce: Duration,
    /// Wait before querying a browser's active tab, giving the browser time
    /// to finish navigating after it comes to the foreground.
    pub settle_delay: Duration,
    /// Bundle id of this process. Activations of the daemon itself are
    /// ignored so it never reacts to its own windows.
    pub self_bundle_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            settle_delay: Duration::from_millis(300),
            self_bundle_id: None,
        }
    }
}

/// Top-level configuration for a [`crate::daemon::Warden`].
#[derive(Debug, Clone)]
pub struct WardenConfig {
    pub engine: EngineConfig,
    /// How often the schedule list is re-evaluated against the wall clock.
    /// Schedule boundaries are not OS-signaled, so this is a poll.
    pub schedule_poll: Duration,
    /// Focus timer countdown resolution.
    pub timer_tick: Duration,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            schedule_poll: Duration::from_secs(30),
            timer_tick: Duration::from_secs(1),
        }
    }
}
