use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

/// A foreground-application switch reported by the OS. Transient; never
/// persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationEvent {
    pub pid: i32,
    pub bundle_id: String,
    pub display_name: String,
}

pub type ActivationCallback = Arc<dyn Fn(ActivationEvent) + Send + Sync>;

/// Source of activation events. Both operations are idempotent: subscribing
/// while subscribed must not double-deliver, unsubscribing while
/// unsubscribed is a no-op.
pub trait ActivationSource: Send + Sync {
    fn subscribe(&self, on_event: ActivationCallback) -> Result<()>;
    fn unsubscribe(&self);
}

/// Best-effort process termination. Returns false when the process could
/// not be found or the signal could not be delivered; failures are not
/// retried.
pub trait ProcessControl: Send + Sync {
    fn terminate(&self, pid: i32) -> bool;
}
